//! Per-site OAuth2 client registrations and broker-wide configuration.

// self
use crate::{_prelude::*, auth::SiteId, auth::TokenSecret};

const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// OAuth2 client registration for one site (a wiki farm sharing a single consumer).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SiteDescriptor {
	/// Site identifier resolved by the surrounding webhook layer.
	pub id: SiteId,
	/// OAuth2 client identifier issued by the site.
	pub client_id: String,
	/// Confidential client secret issued by the site.
	pub client_secret: TokenSecret,
}

/// Static configuration consumed when constructing a broker.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BrokerConfig {
	/// Fixed redirect target registered with every site's OAuth2 consumer.
	pub redirect_uri: Url,
	/// User agent attached to every outbound request.
	#[serde(default = "default_user_agent")]
	pub user_agent: String,
	/// Per-request timeout in seconds; stalled remotes must never hold a request open.
	#[serde(default = "default_timeout_secs")]
	pub timeout_secs: u64,
	/// OAuth2 client registrations, one per supported site.
	pub sites: Vec<SiteDescriptor>,
}
impl BrokerConfig {
	/// Returns the per-request timeout as a standard duration.
	pub fn timeout(&self) -> std::time::Duration {
		std::time::Duration::from_secs(self.timeout_secs)
	}
}

fn default_user_agent() -> String {
	concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"), " (OAuth2)").into()
}

fn default_timeout_secs() -> u64 {
	DEFAULT_TIMEOUT_SECS
}

/// Shared read-only lookup table of [`SiteDescriptor`]s.
#[derive(Clone, Debug)]
pub struct SiteRegistry(Arc<HashMap<SiteId, SiteDescriptor>>);
impl SiteRegistry {
	/// Builds a registry from the provided descriptors; later duplicates win.
	pub fn new(sites: impl IntoIterator<Item = SiteDescriptor>) -> Self {
		Self(Arc::new(sites.into_iter().map(|site| (site.id.clone(), site)).collect()))
	}

	/// Returns the descriptor registered for `site`, if any.
	pub fn get(&self, site: &SiteId) -> Option<&SiteDescriptor> {
		self.0.get(site)
	}

	/// Returns `true` when the site has a registered OAuth2 client.
	pub fn contains(&self, site: &SiteId) -> bool {
		self.0.contains_key(site)
	}
}
