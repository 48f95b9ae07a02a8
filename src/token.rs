//! Session-token cache for wiki write calls.
//!
//! MediaWiki write actions require a short-lived session token (CSRF or rollback) on top
//! of the bearer credential. Tokens are fetched through `action=query&meta=tokens`, cached
//! per `(wiki, user, site)`, and merged as supersets: a fetch for one kind never evicts
//! kinds cached earlier, so interleaved actions needing different kinds do not thrash.

// self
use crate::{
	_prelude::*,
	auth::{SiteId, TokenSecret, UserId},
	context::Context,
	error::TransientError,
	http::MwClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Session-token kinds the broker's actions consume.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
	/// General write token covering most `action=` endpoints.
	Csrf,
	/// Dedicated token for `action=rollback`.
	Rollback,
}
impl TokenKind {
	/// Value sent in the `type=` fetch parameter.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenKind::Csrf => "csrf",
			TokenKind::Rollback => "rollback",
		}
	}

	/// Field name carrying this kind in the `query.tokens` response object.
	pub const fn response_field(self) -> &'static str {
		match self {
			TokenKind::Csrf => "csrftoken",
			TokenKind::Rollback => "rollbacktoken",
		}
	}
}
impl Display for TokenKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Set of session tokens fetched for one cache key.
#[derive(Clone, Debug, Default)]
pub struct TokenBundle(HashMap<TokenKind, TokenSecret>);
impl TokenBundle {
	/// Returns the token of `kind`, if the bundle holds one.
	pub fn get(&self, kind: TokenKind) -> Option<&TokenSecret> {
		self.0.get(&kind)
	}

	/// Returns `true` when every requested kind is present.
	pub fn contains_all(&self, kinds: &[TokenKind]) -> bool {
		kinds.iter().all(|kind| self.0.contains_key(kind))
	}

	/// Folds `other` into `self`; kinds present in both take `other`'s value, kinds absent
	/// from `other` survive untouched.
	pub fn merge(&mut self, other: TokenBundle) {
		self.0.extend(other.0);
	}

	fn from_tokens_object(tokens: &Value) -> Self {
		let mut bundle = HashMap::new();

		for kind in [TokenKind::Csrf, TokenKind::Rollback] {
			if let Some(token) = tokens.get(kind.response_field()).and_then(Value::as_str) {
				bundle.insert(kind, TokenSecret::new(token));
			}
		}

		Self(bundle)
	}
}

/// Cache key: session tokens are scoped to one wiki under one user's credential.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TokenCacheKey {
	/// Wiki base URL the tokens were minted by.
	pub wiki: Url,
	/// User component of the owning credential.
	pub user_id: UserId,
	/// Site component of the owning credential.
	pub site: SiteId,
}

/// Process-wide cache of [`TokenBundle`]s with transparent fetch and superset merge.
#[derive(Clone, Debug, Default)]
pub struct TokenCache(Arc<Mutex<HashMap<TokenCacheKey, TokenBundle>>>);
impl TokenCache {
	/// Returns a bundle covering every kind in `kinds`, fetching from the wiki on a miss.
	///
	/// `force_refresh` bypasses the cached entry (the dispatcher sets it after a `badtoken`
	/// rejection) but the fetched kinds are still merged back in. An expired credential is
	/// refreshed once and the fetch retried; a revoked credential drops the context and
	/// propagates [`Error::ReauthorizationRequired`].
	pub async fn get(
		&self,
		http: &MwClient,
		wiki: &Url,
		context: &Context,
		kinds: &[TokenKind],
		force_refresh: bool,
	) -> Result<TokenBundle> {
		let key = TokenCacheKey {
			wiki: wiki.clone(),
			user_id: context.user_id().clone(),
			site: context.site().clone(),
		};

		if !force_refresh
			&& let Some(bundle) = self.0.lock().get(&key)
			&& bundle.contains_all(kinds)
		{
			return Ok(bundle.clone());
		}

		let span = FlowSpan::new(FlowKind::TokenFetch, "token_fetch");

		obs::record_flow_outcome(FlowKind::TokenFetch, FlowOutcome::Attempt);

		span.instrument(self.fetch(http, wiki, context, kinds, force_refresh, key)).await
	}

	async fn fetch(
		&self,
		http: &MwClient,
		wiki: &Url,
		context: &Context,
		kinds: &[TokenKind],
		force_refresh: bool,
		key: TokenCacheKey,
	) -> Result<TokenBundle> {
		let types = kinds.iter().map(|kind| kind.as_str()).collect::<Vec<_>>().join("|");
		let params = [
			("action", "query".to_owned()),
			("meta", "tokens".to_owned()),
			("type", types),
		];
		let mut refreshed = false;

		loop {
			let response = http.api_get(wiki, &params, &context.access_token()).await?;
			let tokens = response.body_ref().pointer("/query/tokens").cloned();

			if response.status == 200 && let Some(tokens) = tokens {
				let fetched = TokenBundle::from_tokens_object(&tokens);
				let merged = {
					let mut cache = self.0.lock();
					let entry = cache.entry(key).or_default();

					entry.merge(fetched);

					entry.clone()
				};

				if !merged.contains_all(kinds) {
					obs::record_flow_outcome(FlowKind::TokenFetch, FlowOutcome::Failure);

					return Err(TransientError::ApiEndpoint {
						message: "token fetch reply omitted a requested token kind".into(),
						status: Some(response.status),
					}
					.into());
				}

				obs::record_flow_outcome(FlowKind::TokenFetch, FlowOutcome::Success);

				return Ok(merged);
			}
			if response.has_revoked_consent() {
				obs::record_flow_outcome(FlowKind::TokenFetch, FlowOutcome::Failure);

				return Err(context.revoke().await);
			}
			if response.has_invalid_authorization() && !force_refresh && !refreshed {
				context.refresh(wiki).await?;

				refreshed = true;

				continue;
			}

			obs::record_remote_failure(
				"token_fetch",
				Some(response.status),
				&response.describe_errors(),
			);
			obs::record_flow_outcome(FlowKind::TokenFetch, FlowOutcome::Failure);

			return Err(TransientError::ApiEndpoint {
				message: response.describe_errors(),
				status: Some(response.status),
			}
			.into());
		}
	}

	/// Returns the number of cached bundles.
	pub fn len(&self) -> usize {
		self.0.lock().len()
	}

	/// Returns `true` when nothing is cached.
	pub fn is_empty(&self) -> bool {
		self.0.lock().is_empty()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn bundle(pairs: &[(TokenKind, &str)]) -> TokenBundle {
		TokenBundle(
			pairs.iter().map(|(kind, value)| (*kind, TokenSecret::new(*value))).collect(),
		)
	}

	#[test]
	fn merge_preserves_kinds_absent_from_the_update() {
		let mut cached = bundle(&[(TokenKind::Csrf, "csrf-1")]);

		cached.merge(bundle(&[(TokenKind::Rollback, "rollback-1")]));

		assert!(cached.contains_all(&[TokenKind::Csrf, TokenKind::Rollback]));
		assert_eq!(
			cached.get(TokenKind::Csrf).map(TokenSecret::expose),
			Some("csrf-1")
		);
	}

	#[test]
	fn merge_replaces_kinds_present_in_the_update() {
		let mut cached = bundle(&[(TokenKind::Csrf, "csrf-1")]);

		cached.merge(bundle(&[(TokenKind::Csrf, "csrf-2")]));

		assert_eq!(
			cached.get(TokenKind::Csrf).map(TokenSecret::expose),
			Some("csrf-2")
		);
	}

	#[test]
	fn tokens_object_parsing_ignores_unknown_fields() {
		let raw = serde_json::json!({
			"csrftoken": "csrf-1\\+",
			"watchtoken": "unused",
		});
		let parsed = TokenBundle::from_tokens_object(&raw);

		assert!(parsed.contains_all(&[TokenKind::Csrf]));
		assert!(!parsed.contains_all(&[TokenKind::Rollback]));
	}

	#[test]
	fn fetch_types_join_with_a_pipe() {
		let kinds = [TokenKind::Csrf, TokenKind::Rollback];
		let joined = kinds.iter().map(|kind| kind.as_str()).collect::<Vec<_>>().join("|");

		assert_eq!(joined, "csrf|rollback");
	}
}
