//! Broker facade: action submission, authorization begin/complete, and pending-request
//! resume.
//!
//! [`Broker::submit`] is the single entry point the surrounding chat layer calls. It
//! resolves a live [`Context`] (registry hit, store hit, or neither), runs the requested
//! action, and when no usable credential exists parks the request under a single-use
//! `state` nonce and hands back the site's authorization URL. Once the user finishes the
//! browser round trip, [`Broker::complete_authorization`] redeems the code, persists the
//! delegation, and replays the parked request so the user never has to repeat it.

// std
use std::collections::hash_map::Entry;
// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{
	_prelude::*,
	actions::{self, ActionEnv, ActionOutcome, ActionParams},
	auth::{Credential, SiteId, UserId},
	context::{Context, ContextRegistry},
	error::ConfigError,
	http::MwClient,
	msg::{DefaultMessages, MessageSource},
	oauth::{self, TokenGrant},
	obs::{self, FlowKind, FlowOutcome},
	site::{BrokerConfig, SiteRegistry},
	store::CredentialStore,
	token::TokenCache,
};

/// Length of the generated `state` nonce.
const STATE_LEN: usize = 32;
/// How long a parked request stays redeemable.
const PENDING_TTL: Duration = Duration::minutes(10);
/// Relative path of the authorization endpoint under the wiki base URL.
const AUTHORIZE_ENDPOINT: &str = "rest.php/oauth2/authorize";

/// Result of submitting an action request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dispatch {
	/// The action ran; show this localized text to the end user.
	Completed(String),
	/// No usable credential exists; send the end user to this authorization URL.
	AuthorizationRequired(Url),
}

/// One requested action with everything needed to run it now or after authorization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
	/// Chat-platform user requesting the action.
	pub user_id: UserId,
	/// Site whose OAuth2 client covers `wiki`.
	pub site: SiteId,
	/// Script-path base URL of the target wiki, ending in `/`.
	pub wiki: Url,
	/// Locale tag for response messages.
	pub locale: String,
	/// The action itself.
	pub action: ActionParams,
}

/// A request parked while its user completes the browser authorization round trip.
#[derive(Clone, Debug)]
pub struct PendingAuthorization {
	/// The original request, replayed verbatim on redemption.
	pub request: ActionRequest,
	/// Parking time; redemption past [`PENDING_TTL`] is refused.
	pub created_at: OffsetDateTime,
}
impl PendingAuthorization {
	/// Returns `true` when the parked request is no longer redeemable at `now`.
	pub fn is_expired(&self, now: OffsetDateTime) -> bool {
		now - self.created_at > PENDING_TTL
	}
}

/// Map from single-use `state` nonce to its parked request.
#[derive(Clone, Debug, Default)]
pub struct PendingAuthorizations(Arc<Mutex<HashMap<String, PendingAuthorization>>>);
impl PendingAuthorizations {
	/// Parks a request under a fresh nonce and returns the nonce.
	pub fn insert(&self, request: ActionRequest) -> String {
		self.insert_with(request, random_state)
	}

	// Nonce generation is injected so collision handling stays testable.
	fn insert_with(&self, request: ActionRequest, mut state: impl FnMut() -> String) -> String {
		let pending = PendingAuthorization { request, created_at: OffsetDateTime::now_utc() };
		let mut map = self.0.lock();
		let now = pending.created_at;

		map.retain(|_, parked| !parked.is_expired(now));

		loop {
			let candidate = state();

			if let Entry::Vacant(entry) = map.entry(candidate.clone()) {
				entry.insert(pending);

				return candidate;
			}
		}
	}

	/// Redeems a nonce, removing it so a replayed redirect finds nothing.
	pub fn take(&self, state: &str) -> Option<PendingAuthorization> {
		self.0.lock().remove(state)
	}

	/// Returns the number of parked requests.
	pub fn len(&self) -> usize {
		self.0.lock().len()
	}

	/// Returns `true` when no request is parked.
	pub fn is_empty(&self) -> bool {
		self.0.lock().is_empty()
	}
}

fn random_state() -> String {
	rand::rng().sample_iter(Alphanumeric).take(STATE_LEN).map(char::from).collect()
}

/// The broker itself: one instance serves every user, site, and wiki for the process.
pub struct Broker {
	store: Arc<dyn CredentialStore>,
	sites: SiteRegistry,
	contexts: ContextRegistry,
	env: ActionEnv,
	pending: PendingAuthorizations,
	redirect_uri: Url,
}
impl Broker {
	/// Builds a broker over the configuration and credential store.
	pub fn new(config: BrokerConfig, store: Arc<dyn CredentialStore>) -> Result<Self, ConfigError> {
		let http = MwClient::new(&config)?;
		let sites = SiteRegistry::new(config.sites);
		let contexts = ContextRegistry::new(
			sites.clone(),
			config.redirect_uri.clone(),
			http.clone(),
			store.clone(),
		);
		let env = ActionEnv {
			http,
			tokens: TokenCache::default(),
			messages: Arc::new(DefaultMessages),
		};

		Ok(Self {
			store,
			sites,
			contexts,
			env,
			pending: PendingAuthorizations::default(),
			redirect_uri: config.redirect_uri,
		})
	}

	/// Replaces the built-in English messages with a localization backend.
	pub fn with_messages(mut self, messages: Arc<dyn MessageSource>) -> Self {
		self.env.messages = messages;

		self
	}

	/// Live context registry, exposed for introspection.
	pub fn contexts(&self) -> &ContextRegistry {
		&self.contexts
	}

	/// Runs a requested action under the user's delegated credential.
	///
	/// Resolution order: live context, stored credential, fresh authorization. A store
	/// read failure is logged and treated as a miss, so a flaky backend degrades to an
	/// extra authorization round trip instead of an outage.
	pub async fn submit(&self, request: ActionRequest) -> Result<Dispatch> {
		if let Some(context) = self.contexts.get(&request.user_id, &request.site) {
			context.touch(&request.locale);

			return self.perform(&request, &context).await;
		}

		let found = match self.store.find(&request.user_id, &request.site).await {
			Ok(found) => found,
			Err(err) => {
				obs::record_store_failure("find", &err.to_string());

				None
			},
		};

		match found {
			Some(credential) => {
				let context = self.contexts.get_or_create(credential, &request.locale)?;

				self.perform(&request, &context).await
			},
			None => Ok(Dispatch::AuthorizationRequired(self.begin_authorization(request)?)),
		}
	}

	/// Redeems an authorization redirect and replays the parked request.
	///
	/// The nonce is single-use and parked requests expire after ten minutes; both refusals
	/// surface as [`Error::InvalidGrant`] without touching the token endpoint.
	pub async fn complete_authorization(&self, state: &str, code: &str) -> Result<Dispatch> {
		obs::record_flow_outcome(FlowKind::Authorization, FlowOutcome::Attempt);

		let outcome = self.redeem(state, code).await;

		match &outcome {
			Ok(_) => obs::record_flow_outcome(FlowKind::Authorization, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(FlowKind::Authorization, FlowOutcome::Failure),
		}

		outcome
	}

	async fn redeem(&self, state: &str, code: &str) -> Result<Dispatch> {
		let pending = self.pending.take(state).ok_or_else(|| Error::InvalidGrant {
			reason: "unknown or already used authorization state".into(),
		})?;

		if pending.is_expired(OffsetDateTime::now_utc()) {
			return Err(Error::InvalidGrant { reason: "authorization request expired".into() });
		}

		let request = pending.request;
		let descriptor = self
			.sites
			.get(&request.site)
			.cloned()
			.ok_or_else(|| ConfigError::UnknownSite { site: request.site.to_string() })?;
		let pair = oauth::exchange(
			&self.env.http,
			&request.wiki,
			&descriptor,
			&self.redirect_uri,
			TokenGrant::AuthorizationCode { code },
		)
		.await?;
		let refresh = pair.refresh_token.clone().ok_or_else(|| Error::InvalidGrant {
			reason: "token endpoint granted no refresh token".into(),
		})?;
		let credential = Credential {
			user_id: request.user_id.clone(),
			site: request.site.clone(),
			access_token: pair.access_token.clone(),
			refresh_token: refresh,
		};

		if let Err(err) = self.store.upsert(credential.clone()).await {
			obs::record_store_failure("upsert", &err.to_string());
		}

		let context = match self.contexts.get(&request.user_id, &request.site) {
			Some(existing) => {
				existing.install(pair);
				existing.touch(&request.locale);

				existing
			},
			None => self.contexts.get_or_create(credential, &request.locale)?,
		};

		self.perform(&request, &context).await
	}

	async fn perform(&self, request: &ActionRequest, context: &Context) -> Result<Dispatch> {
		match self.run_action(request, context).await {
			ActionOutcome::Message(message) => Ok(Dispatch::Completed(message)),
			ActionOutcome::ReauthorizationRequired =>
				Ok(Dispatch::AuthorizationRequired(self.begin_authorization(request.clone())?)),
		}
	}

	async fn run_action(&self, request: &ActionRequest, context: &Context) -> ActionOutcome {
		let env = &self.env;
		let wiki = &request.wiki;

		match &request.action {
			ActionParams::Block { target, reason, expiry } =>
				actions::block::block(env, wiki, context, target, reason, expiry).await,
			ActionParams::GlobalBlock { target, reason, expiry } =>
				actions::gblock::gblock(env, wiki, context, target, reason, expiry).await,
			ActionParams::Delete { page_id, reason } =>
				actions::delete::delete(env, wiki, context, *page_id, reason).await,
			ActionParams::Move { from_id, to, reason } =>
				actions::move_page::move_page(env, wiki, context, *from_id, to, reason).await,
			ActionParams::Rollback { page_id, user, summary } =>
				actions::rollback::rollback(env, wiki, context, *page_id, user, summary).await,
			ActionParams::Undo { page_id, revision, summary } =>
				actions::undo::undo(env, wiki, context, *page_id, *revision, summary).await,
			ActionParams::FileRevert { archive_name, comment } =>
				actions::filerevert::filerevert(env, wiki, context, archive_name, comment).await,
			ActionParams::Thank { target, id } =>
				actions::thank::thank(env, wiki, context, *target, *id).await,
		}
	}

	fn begin_authorization(&self, request: ActionRequest) -> Result<Url, ConfigError> {
		let descriptor = self
			.sites
			.get(&request.site)
			.ok_or_else(|| ConfigError::UnknownSite { site: request.site.to_string() })?;
		let client_id = descriptor.client_id.clone();
		let mut url = request.wiki.join(AUTHORIZE_ENDPOINT).map_err(|source| {
			ConfigError::InvalidEndpoint { endpoint: AUTHORIZE_ENDPOINT, source }
		})?;
		let state = self.pending.insert(request);

		url.query_pairs_mut()
			.append_pair("response_type", "code")
			.append_pair("redirect_uri", self.redirect_uri.as_str())
			.append_pair("client_id", &client_id)
			.append_pair("state", &state);

		Ok(url)
	}
}
impl Debug for Broker {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Broker")
			.field("contexts", &self.contexts)
			.field("pending", &self.pending.len())
			.finish()
	}
}
