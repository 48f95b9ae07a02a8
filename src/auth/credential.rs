//! The persisted access/refresh token pair delegated by an end user.

// self
use crate::{
	_prelude::*,
	auth::{SiteId, TokenSecret, UserId},
};

/// Durable shadow of a live context: the delegated token pair for one user on one site.
///
/// Created on the first successful OAuth grant, mutated in place on refresh, and deleted
/// on revoke. Unique per `(user_id, site)`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
	/// Chat-platform user the credential was delegated by.
	pub user_id: UserId,
	/// OAuth2 site the credential is valid for.
	pub site: SiteId,
	/// Bearer token attached to every API call.
	pub access_token: TokenSecret,
	/// Long-lived secret exchanged for fresh pairs at the token endpoint.
	pub refresh_token: TokenSecret,
}
impl Credential {
	/// Bundles a freshly granted token pair for persistence.
	pub fn new(
		user_id: UserId,
		site: SiteId,
		access_token: impl Into<String>,
		refresh_token: impl Into<String>,
	) -> Self {
		Self {
			user_id,
			site,
			access_token: TokenSecret::new(access_token),
			refresh_token: TokenSecret::new(refresh_token),
		}
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("user_id", &self.user_id)
			.field("site", &self.site)
			.field("access_token", &"<redacted>")
			.field("refresh_token", &"<redacted>")
			.finish()
	}
}
