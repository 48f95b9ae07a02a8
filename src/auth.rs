//! Identity and credential primitives shared across the broker.

pub mod credential;
pub mod id;
pub mod secret;

pub use credential::Credential;
pub use id::{IdentifierError, SiteId, UserId};
pub use secret::TokenSecret;
