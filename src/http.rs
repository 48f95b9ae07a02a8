//! Transport primitives for wiki API and token-endpoint calls.
//!
//! [`MwClient`] is a thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in
//! one place: the mandatory per-request timeout, the broker user agent, bearer-token
//! authorization, and the fixed machine-readable response format (`errorformat=plaintext`,
//! `formatversion=2`). Token-endpoint calls never follow redirects, matching OAuth 2.0
//! guidance that token endpoints return results directly.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{ConfigError, TransientError, TransportError},
	site::BrokerConfig,
};

/// Fixed query/form fields attached to every wiki API call.
const BASE_PARAMS: &[(&str, &str)] = &[
	("assert", "user"),
	("errorlang", "en"),
	("errorformat", "plaintext"),
	("formatversion", "2"),
	("format", "json"),
];
/// Response header carrying the legacy error code on some MediaWiki installations.
const API_ERROR_HEADER: &str = "mediawiki-api-error";

/// Shared HTTP client for wiki API and OAuth2 token-endpoint requests.
#[derive(Clone, Debug)]
pub struct MwClient {
	inner: ReqwestClient,
}
impl MwClient {
	/// Builds a client from the broker configuration (user agent, timeout, no redirects).
	pub fn new(config: &BrokerConfig) -> Result<Self, ConfigError> {
		let inner = ReqwestClient::builder()
			.user_agent(&config.user_agent)
			.timeout(config.timeout())
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.map_err(ConfigError::http_client_build)?;

		Ok(Self { inner })
	}

	/// Wraps an existing [`ReqwestClient`]; the caller is responsible for its timeout policy.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self { inner: client }
	}

	/// Issues an authenticated `GET {wiki}api.php` metadata/query call.
	pub(crate) async fn api_get(
		&self,
		wiki: &Url,
		params: &[(&str, String)],
		access: &TokenSecret,
	) -> Result<ApiResponse> {
		let endpoint = join_endpoint(wiki, "api.php")?;
		let request = self
			.inner
			.get(endpoint.clone())
			.query(params)
			.query(BASE_PARAMS)
			.bearer_auth(access.expose());

		Self::finish(endpoint, request).await
	}

	/// Issues an authenticated form-encoded `POST {wiki}api.php` write call.
	pub(crate) async fn api_post(
		&self,
		wiki: &Url,
		form: &[(&str, String)],
		access: &TokenSecret,
	) -> Result<ApiResponse> {
		let endpoint = join_endpoint(wiki, "api.php")?;
		let mut fields = form.to_vec();

		fields.extend(BASE_PARAMS.iter().map(|(key, value)| (*key, (*value).to_owned())));

		let request =
			self.inner.post(endpoint.clone()).form(&fields).bearer_auth(access.expose());

		Self::finish(endpoint, request).await
	}

	/// Issues an unauthenticated form-encoded POST against the site's OAuth2 token endpoint.
	pub(crate) async fn token_endpoint_post(
		&self,
		wiki: &Url,
		form: &[(&str, &str)],
	) -> Result<RawResponse> {
		let endpoint = join_endpoint(wiki, "rest.php/oauth2/access_token")?;
		let response = self
			.inner
			.post(endpoint.clone())
			.form(form)
			.send()
			.await
			.map_err(|err| map_send_error(&endpoint, err))?;
		let status = response.status().as_u16();
		let bytes =
			response.bytes().await.map_err(TransportError::from)?.to_vec();

		Ok(RawResponse { status, bytes })
	}

	async fn finish(endpoint: Url, request: reqwest::RequestBuilder) -> Result<ApiResponse> {
		let response = request.send().await.map_err(|err| map_send_error(&endpoint, err))?;
		let status = response.status().as_u16();
		let api_error_header = response
			.headers()
			.get(API_ERROR_HEADER)
			.and_then(|value| value.to_str().ok())
			.map(str::to_owned);
		let bytes = response.bytes().await.map_err(TransportError::from)?;
		let body = serde_json::from_slice::<Value>(&bytes).ok();

		Ok(ApiResponse { status, api_error_header, body })
	}
}

fn join_endpoint(wiki: &Url, endpoint: &'static str) -> Result<Url, ConfigError> {
	wiki.join(endpoint).map_err(|source| ConfigError::InvalidEndpoint { endpoint, source })
}

fn map_send_error(endpoint: &Url, err: reqwest::Error) -> Error {
	if err.is_timeout() {
		TransientError::Timeout { endpoint: endpoint.to_string() }.into()
	} else {
		TransportError::from(err).into()
	}
}

/// Raw token-endpoint reply left for [`crate::oauth`] to parse and classify.
#[derive(Clone, Debug)]
pub(crate) struct RawResponse {
	/// HTTP status code.
	pub status: u16,
	/// Unparsed response body.
	pub bytes: Vec<u8>,
}

/// One machine-readable `{code, text}` error object from a wiki API response.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ApiErrorEntry {
	/// Stable error code, e.g. `badtoken` or `alreadyblocked`.
	pub code: String,
	/// Human-readable English detail; server-side diagnostics only.
	#[serde(default, alias = "*")]
	pub text: String,
}

/// Parsed wiki API response with helpers for the dispatcher's classification step.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// Value of the `MediaWiki-API-Error` response header, when present.
	pub api_error_header: Option<String>,
	/// Response body, when it parsed as JSON.
	pub body: Option<Value>,
}
impl ApiResponse {
	/// Response text the revoked-consent error carries on its `mwoauth-invalid-authorization`
	/// code; distinguishes a withdrawn delegation from an ordinary expired access token.
	const REVOKED_CONSENT_MARKER: &'static str = "did not approve issuing this access token";

	/// Returns the parsed body, or [`Value::Null`] when the body was not JSON.
	pub fn body_ref(&self) -> &Value {
		self.body.as_ref().unwrap_or(&Value::Null)
	}

	/// Collects the `{code, text}` error objects, including the legacy nested
	/// `error.globalblock` shape some farms still emit.
	pub fn errors(&self) -> Vec<ApiErrorEntry> {
		let mut entries = Vec::new();

		for path in ["/errors", "/error/globalblock"] {
			if let Some(list) = self.body_ref().pointer(path).and_then(Value::as_array) {
				entries.extend(
					list.iter()
						.filter_map(|raw| serde_json::from_value(raw.clone()).ok()),
				);
			}
		}

		entries
	}

	/// Returns `true` when any error object carries `code`.
	pub fn has_error_code(&self, code: &str) -> bool {
		self.errors().iter().any(|entry| entry.code == code)
	}

	/// Returns `true` when the response reports an expired or invalid access token.
	pub fn has_invalid_authorization(&self) -> bool {
		self.has_error_code("mwoauth-invalid-authorization")
	}

	/// Returns `true` when the response reports that the end user revoked consent.
	pub fn has_revoked_consent(&self) -> bool {
		self.errors().iter().any(|entry| {
			entry.code == "mwoauth-invalid-authorization"
				&& entry.text.contains(Self::REVOKED_CONSENT_MARKER)
		})
	}

	/// Joins all error detail into one diagnostic string for server-side logs.
	///
	/// Falls back to the `MediaWiki-API-Error` header, then to the HTTP status. Never
	/// shown to end users.
	pub fn describe_errors(&self) -> String {
		let joined = self
			.errors()
			.iter()
			.map(|entry| format!("{}: {}", entry.code, entry.text))
			.collect::<Vec<_>>()
			.join(" - ");

		if !joined.is_empty() {
			return joined;
		}
		if let Some(header) = &self.api_error_header {
			return header.clone();
		}

		format!("HTTP {}", self.status)
	}
}
