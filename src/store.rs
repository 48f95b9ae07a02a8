//! Storage contract and built-in store implementation for delegated credentials.

pub mod memory;

pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{Credential, SiteId, UserId},
};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistence contract for delegated credentials, implemented by the durable backend.
///
/// The broker reads once per cold cache miss and writes on refresh, revoke, and initial
/// grant; in-memory state stays authoritative for the process lifetime, so callers treat
/// write failures as log-worthy but non-fatal.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Fetches the credential stored for the user + site, if present.
	fn find<'a>(
		&'a self,
		user_id: &'a UserId,
		site: &'a SiteId,
	) -> StoreFuture<'a, Option<Credential>>;

	/// Persists or replaces the credential for its `(user_id, site)` key.
	fn upsert(&self, credential: Credential) -> StoreFuture<'_, ()>;

	/// Removes the credential for the user + site. Deleting a missing row is not an error.
	fn delete<'a>(&'a self, user_id: &'a UserId, site: &'a SiteId) -> StoreFuture<'a, ()>;
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Unique key identifying a stored credential.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreKey {
	/// User component.
	pub user_id: UserId,
	/// Site component.
	pub site: SiteId,
}
impl StoreKey {
	/// Builds a key from the provided user and site.
	pub fn new(user_id: &UserId, site: &SiteId) -> Self {
		Self { user_id: user_id.clone(), site: site.clone() }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn store_key_distinguishes_sites() {
		let user = UserId::new("123456").expect("User fixture should be valid.");
		let site_a = SiteId::new("wikimedia").expect("First site fixture should be valid.");
		let site_b = SiteId::new("miraheze").expect("Second site fixture should be valid.");

		assert_eq!(StoreKey::new(&user, &site_a), StoreKey::new(&user, &site_a));
		assert_ne!(StoreKey::new(&user, &site_a), StoreKey::new(&user, &site_b));
	}
}
