//! Delegated OAuth2 action broker for MediaWiki: per-user credential lifecycle,
//! session-token caching, and the privileged write actions a chat-platform bot performs on
//! a user's behalf.

#![deny(clippy::all, missing_docs)]

pub mod actions;
pub mod auth;
pub mod context;
pub mod error;
pub mod flows;
pub mod http;
pub mod msg;
pub mod oauth;
pub mod obs;
pub mod site;
pub mod store;
pub mod token;

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::Client as ReqwestClient;
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
