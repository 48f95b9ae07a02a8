//! OAuth2 token-endpoint exchanges against `{wiki}rest.php/oauth2/access_token`.
//!
//! Two grants exist: `authorization_code` for the initial delegation and `refresh_token`
//! for renewals. MediaWiki's REST token endpoint signals a withdrawn delegation through a
//! nonstandard `message` field on a `401 invalid_request` reply, which is why responses are
//! parsed by hand here instead of through a generic OAuth2 client.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::TransientError,
	http::{MwClient, RawResponse},
	site::SiteDescriptor,
};

/// Token pair returned by a successful grant.
#[derive(Clone, Debug)]
pub struct TokenPair {
	/// Fresh bearer token.
	pub access_token: TokenSecret,
	/// Fresh refresh token; endpoints may omit it on renewal, keeping the old one valid.
	pub refresh_token: Option<TokenSecret>,
}

/// Grant flavor submitted to the token endpoint.
#[derive(Clone, Copy, Debug)]
pub(crate) enum TokenGrant<'a> {
	/// Initial `grant_type=authorization_code` exchange after the browser redirect.
	AuthorizationCode {
		/// One-time code handed back by the redirect.
		code: &'a str,
	},
	/// `grant_type=refresh_token` renewal of an expired access token.
	RefreshToken {
		/// Current long-lived refresh secret.
		refresh_token: &'a str,
	},
}

#[derive(Debug, Deserialize)]
struct GrantReply {
	access_token: String,
	#[serde(default)]
	refresh_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GrantRejection {
	#[serde(default)]
	error: Option<String>,
	#[serde(default)]
	message: Option<String>,
}

/// Submits a grant and classifies the reply.
///
/// `wiki` must be the script-path base URL ending in `/`. Ordinary rejections become
/// [`Error::InvalidGrant`]; the explicit revoked-consent shape becomes [`Error::Revoked`];
/// malformed bodies and 5xx replies are [`TransientError`]s.
pub(crate) async fn exchange(
	http: &MwClient,
	wiki: &Url,
	site: &SiteDescriptor,
	redirect_uri: &Url,
	grant: TokenGrant<'_>,
) -> Result<TokenPair> {
	let redirect = redirect_uri.as_str();
	let mut form = vec![
		("redirect_uri", redirect),
		("client_id", site.client_id.as_str()),
		("client_secret", site.client_secret.expose()),
	];

	match grant {
		TokenGrant::AuthorizationCode { code } => {
			form.push(("grant_type", "authorization_code"));
			form.push(("code", code));
		},
		TokenGrant::RefreshToken { refresh_token } => {
			form.push(("grant_type", "refresh_token"));
			form.push(("refresh_token", refresh_token));
		},
	}

	let response = http.token_endpoint_post(wiki, &form).await?;

	parse_reply(response)
}

fn parse_reply(response: RawResponse) -> Result<TokenPair> {
	let RawResponse { status, bytes } = response;

	if status == 200 {
		let mut deserializer = serde_json::Deserializer::from_slice(&bytes);
		let reply: GrantReply = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| TransientError::TokenResponseParse {
				source,
				status: Some(status),
			})?;

		return Ok(TokenPair {
			access_token: TokenSecret::new(reply.access_token),
			refresh_token: reply.refresh_token.map(TokenSecret::new),
		});
	}

	let rejection: GrantRejection = serde_json::from_slice(&bytes).unwrap_or_default();

	Err(classify_rejection(status, rejection))
}

/// Response text marking the explicit "user revoked consent" rejection.
const REVOKED_MARKERS: &[&str] = &["refresh token is invalid", "did not approve"];

fn classify_rejection(status: u16, rejection: GrantRejection) -> Error {
	let error = rejection.error.unwrap_or_default();
	let message = rejection.message.unwrap_or_default();

	if status == 401
		&& error == "invalid_request"
		&& REVOKED_MARKERS.iter().any(|marker| message.contains(marker))
	{
		return Error::Revoked;
	}
	if (400..500).contains(&status) && !error.is_empty() {
		let reason = if message.is_empty() { error } else { message };

		return Error::InvalidGrant { reason };
	}

	TransientError::TokenEndpoint {
		message: if message.is_empty() { error } else { message },
		status: Some(status),
	}
	.into()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn raw(status: u16, body: &str) -> RawResponse {
		RawResponse { status, bytes: body.as_bytes().to_vec() }
	}

	#[test]
	fn successful_reply_may_omit_the_refresh_token() {
		let pair = parse_reply(raw(200, r#"{"access_token": "new-access"}"#))
			.expect("Reply with only an access token should parse.");

		assert_eq!(pair.access_token.expose(), "new-access");
		assert!(pair.refresh_token.is_none());

		let rotated = parse_reply(raw(
			200,
			r#"{"access_token": "new-access", "refresh_token": "new-refresh"}"#,
		))
		.expect("Reply with a rotated refresh token should parse.");

		assert_eq!(
			rotated.refresh_token.map(|secret| secret.expose().to_owned()),
			Some("new-refresh".to_owned())
		);
	}

	#[test]
	fn revoked_consent_shape_is_distinguished() {
		let err = parse_reply(raw(
			401,
			r#"{"error": "invalid_request", "message": "The refresh token is invalid."}"#,
		))
		.expect_err("Revoked-consent reply must be rejected.");

		assert!(matches!(err, Error::Revoked));
	}

	#[test]
	fn ordinary_rejection_is_an_invalid_grant() {
		let err = parse_reply(raw(
			400,
			r#"{"error": "invalid_grant", "message": "Authorization code expired."}"#,
		))
		.expect_err("Expired code must be rejected.");

		assert!(matches!(err, Error::InvalidGrant { reason } if reason.contains("expired")));
	}

	#[test]
	fn server_failures_are_transient() {
		let err = parse_reply(raw(503, "upstream unavailable"))
			.expect_err("5xx replies must not parse as grants.");

		assert!(matches!(
			err,
			Error::Transient(TransientError::TokenEndpoint { status: Some(503), .. })
		));
	}

	#[test]
	fn malformed_success_body_is_a_parse_failure() {
		let err = parse_reply(raw(200, r#"{"token": "wrong-shape"}"#))
			.expect_err("Missing access_token must fail parsing.");

		assert!(matches!(
			err,
			Error::Transient(TransientError::TokenResponseParse { status: Some(200), .. })
		));
	}
}
