//! Thread-safe in-memory [`CredentialStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{Credential, SiteId, UserId},
	store::{CredentialStore, StoreError, StoreFuture, StoreKey},
};

type StoreMap = Arc<RwLock<HashMap<StoreKey, Credential>>>;

/// Thread-safe storage backend that keeps credentials in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Returns the number of stored credentials.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when no credential is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn find_now(map: StoreMap, user_id: UserId, site: SiteId) -> Option<Credential> {
		let key = StoreKey::new(&user_id, &site);

		map.read().get(&key).cloned()
	}

	fn upsert_now(map: StoreMap, credential: Credential) -> Result<(), StoreError> {
		let key = StoreKey::new(&credential.user_id, &credential.site);

		map.write().insert(key, credential);

		Ok(())
	}

	fn delete_now(map: StoreMap, user_id: UserId, site: SiteId) -> Result<(), StoreError> {
		let key = StoreKey::new(&user_id, &site);

		map.write().remove(&key);

		Ok(())
	}
}
impl CredentialStore for MemoryStore {
	fn find<'a>(
		&'a self,
		user_id: &'a UserId,
		site: &'a SiteId,
	) -> StoreFuture<'a, Option<Credential>> {
		let map = self.0.clone();
		let user_id = user_id.to_owned();
		let site = site.to_owned();

		Box::pin(async move { Ok(Self::find_now(map, user_id, site)) })
	}

	fn upsert(&self, credential: Credential) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::upsert_now(map, credential) })
	}

	fn delete<'a>(&'a self, user_id: &'a UserId, site: &'a SiteId) -> StoreFuture<'a, ()> {
		let map = self.0.clone();
		let user_id = user_id.to_owned();
		let site = site.to_owned();

		Box::pin(async move { Self::delete_now(map, user_id, site) })
	}
}
