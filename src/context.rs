//! Per-user-per-site credential handles and their process-wide identity registry.
//!
//! A [`Context`] is the live counterpart of one stored [`Credential`]: every concurrent
//! caller for the same `(user, site)` key shares the same instance, so a token refresh
//! performed through one handle is immediately visible through every other. Instances are
//! created through [`ContextRegistry::get_or_create`] (atomic check-then-insert; a second
//! construction for the same key inherits the canonical instance) and removed from the
//! registry only when the credential is dropped for good.

// std
use std::collections::hash_map::Entry;
// self
use crate::{
	_prelude::*,
	auth::{Credential, SiteId, TokenSecret, UserId},
	error::ConfigError,
	http::MwClient,
	oauth::{self, TokenGrant, TokenPair},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	site::{SiteDescriptor, SiteRegistry},
	store::CredentialStore,
};

/// Key identifying one context: one user on one OAuth2 site.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContextKey {
	/// User component.
	pub user_id: UserId,
	/// Site component.
	pub site: SiteId,
}

type ContextMap = Arc<Mutex<HashMap<ContextKey, Arc<Context>>>>;

struct LiveTokens {
	access: TokenSecret,
	refresh: TokenSecret,
}

/// Live credential handle for one user on one site.
///
/// Shared by reference between all concurrent callers for its key; never copied. Holds
/// the collaborators its own lifecycle needs (token endpoint client, store, registry map)
/// so `refresh`/`revoke` can run without reaching back into the broker.
pub struct Context {
	user_id: UserId,
	site: SiteId,
	descriptor: SiteDescriptor,
	redirect_uri: Url,
	http: MwClient,
	store: Arc<dyn CredentialStore>,
	registry: ContextMap,
	tokens: RwLock<LiveTokens>,
	locale: RwLock<String>,
	refresh_guard: AsyncMutex<()>,
}
impl Context {
	/// User the credential was delegated by.
	pub fn user_id(&self) -> &UserId {
		&self.user_id
	}

	/// Site the credential is valid for.
	pub fn site(&self) -> &SiteId {
		&self.site
	}

	/// Locale tag of the most recent interaction.
	pub fn locale(&self) -> String {
		self.locale.read().clone()
	}

	/// Updates the locale tag in place; empty tags are ignored.
	///
	/// Used instead of replacement when a construction race is lost, so fields set by the
	/// loser are not silently dropped.
	pub fn touch(&self, locale: &str) {
		if !locale.is_empty() {
			*self.locale.write() = locale.to_owned();
		}
	}

	/// Snapshot of the current access token.
	pub fn access_token(&self) -> TokenSecret {
		self.tokens.read().access.clone()
	}

	/// Installs a freshly granted pair; a missing refresh token keeps the previous one.
	pub(crate) fn install(&self, pair: TokenPair) {
		let mut tokens = self.tokens.write();

		tokens.access = pair.access_token;

		if let Some(refresh) = pair.refresh_token {
			tokens.refresh = refresh;
		}
	}

	fn key(&self) -> ContextKey {
		ContextKey { user_id: self.user_id.clone(), site: self.site.clone() }
	}

	fn credential(&self) -> Credential {
		let tokens = self.tokens.read();

		Credential {
			user_id: self.user_id.clone(),
			site: self.site.clone(),
			access_token: tokens.access.clone(),
			refresh_token: tokens.refresh.clone(),
		}
	}

	/// Exchanges the current refresh token for a fresh pair at the site's token endpoint.
	///
	/// At most one exchange runs per expiry: concurrent callers queue on an internal guard
	/// and return early once a queue predecessor already rotated the pair. On an ordinary
	/// rejection the stored credential is dropped (the next request restarts authorization)
	/// and the error propagates; the explicit revoked-consent shape yields
	/// [`Error::ReauthorizationRequired`]. Store writes are logged but never fatal.
	pub async fn refresh(&self, wiki: &Url) -> Result<()> {
		let span = FlowSpan::new(FlowKind::Refresh, "context_refresh");

		obs::record_flow_outcome(FlowKind::Refresh, FlowOutcome::Attempt);

		span.instrument(async move {
			let stale = self.access_token();
			let _guard = self.refresh_guard.lock().await;

			// A queue predecessor may have rotated the pair while we waited.
			if self.access_token() != stale {
				obs::record_flow_outcome(FlowKind::Refresh, FlowOutcome::Success);

				return Ok(());
			}

			let refresh_token = self.tokens.read().refresh.expose().to_owned();
			let exchanged = oauth::exchange(
				&self.http,
				wiki,
				&self.descriptor,
				&self.redirect_uri,
				TokenGrant::RefreshToken { refresh_token: &refresh_token },
			)
			.await;

			match exchanged {
				Ok(pair) => {
					self.install(pair);

					if let Err(err) = self.store.upsert(self.credential()).await {
						obs::record_store_failure("upsert", &err.to_string());
					}

					obs::record_flow_outcome(FlowKind::Refresh, FlowOutcome::Success);

					Ok(())
				},
				Err(Error::Revoked) => {
					obs::record_flow_outcome(FlowKind::Refresh, FlowOutcome::Failure);

					Err(self.revoke().await)
				},
				Err(err) => {
					self.forget().await;
					obs::record_flow_outcome(FlowKind::Refresh, FlowOutcome::Failure);

					Err(err)
				},
			}
		})
		.await
	}

	/// Unconditionally drops the credential everywhere and returns the refresh-impossible
	/// condition for the caller to propagate.
	pub async fn revoke(&self) -> Error {
		self.forget().await;

		Error::ReauthorizationRequired
	}

	async fn forget(&self) {
		self.registry.lock().remove(&self.key());

		if let Err(err) = self.store.delete(&self.user_id, &self.site).await {
			obs::record_store_failure("delete", &err.to_string());
		}
	}
}
impl Debug for Context {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Context")
			.field("user_id", &self.user_id)
			.field("site", &self.site)
			.field("locale", &self.locale.read().clone())
			.field("tokens", &"<redacted>")
			.finish()
	}
}

/// Process-wide identity map from [`ContextKey`] to its single live [`Context`].
#[derive(Clone)]
pub struct ContextRegistry {
	map: ContextMap,
	sites: SiteRegistry,
	redirect_uri: Url,
	http: MwClient,
	store: Arc<dyn CredentialStore>,
}
impl ContextRegistry {
	/// Creates an empty registry over the provided collaborators.
	pub fn new(
		sites: SiteRegistry,
		redirect_uri: Url,
		http: MwClient,
		store: Arc<dyn CredentialStore>,
	) -> Self {
		Self { map: Default::default(), sites, redirect_uri, http, store }
	}

	/// Returns the live context for the key, if one exists.
	pub fn get(&self, user_id: &UserId, site: &SiteId) -> Option<Arc<Context>> {
		let key = ContextKey { user_id: user_id.clone(), site: site.clone() };

		self.map.lock().get(&key).cloned()
	}

	/// Returns the canonical context for the credential's key, constructing it on demand.
	///
	/// Construction is idempotent under concurrency: the map lock covers only the
	/// check-then-insert instant, a race loser discards its locally built instance and
	/// inherits the canonical one (with its locale folded in via [`Context::touch`]).
	pub fn get_or_create(
		&self,
		credential: Credential,
		locale: &str,
	) -> Result<Arc<Context>, ConfigError> {
		let descriptor = self
			.sites
			.get(&credential.site)
			.cloned()
			.ok_or_else(|| ConfigError::UnknownSite { site: credential.site.to_string() })?;
		let key =
			ContextKey { user_id: credential.user_id.clone(), site: credential.site.clone() };
		let candidate = Arc::new(Context {
			user_id: credential.user_id,
			site: credential.site,
			descriptor,
			redirect_uri: self.redirect_uri.clone(),
			http: self.http.clone(),
			store: self.store.clone(),
			registry: self.map.clone(),
			tokens: RwLock::new(LiveTokens {
				access: credential.access_token,
				refresh: credential.refresh_token,
			}),
			locale: RwLock::new(locale.to_owned()),
			refresh_guard: AsyncMutex::new(()),
		});
		let existing = {
			let mut map = self.map.lock();

			match map.entry(key) {
				Entry::Occupied(entry) => Some(entry.get().clone()),
				Entry::Vacant(entry) => {
					entry.insert(candidate.clone());

					None
				},
			}
		};

		match existing {
			Some(canonical) => {
				canonical.touch(locale);

				Ok(canonical)
			},
			None => Ok(candidate),
		}
	}

	/// Returns the number of live contexts.
	pub fn len(&self) -> usize {
		self.map.lock().len()
	}

	/// Returns `true` when no context is live.
	pub fn is_empty(&self) -> bool {
		self.map.lock().is_empty()
	}
}
impl Debug for ContextRegistry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ContextRegistry").field("len", &self.len()).finish()
	}
}
