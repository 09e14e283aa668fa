//! Identity provider configuration and validation.
//!
//! Configuration is an explicit value handed to constructors; nothing in the crate reads
//! process-wide state after startup.

// crates.io
use serde::{Deserialize, Serialize};
use url::Url;
// self
use crate::{_prelude::*, security::{self, Secret}};

/// Group every new account joins.
pub const DEFAULT_USER_GROUP: &str = "Member";
/// Default per-call timeout for provider and key-set requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
/// Default key-set size guard (1 MiB).
pub const DEFAULT_MAX_JWKS_BYTES: u64 = 1_048_576;
/// Lifetime of the refresh-token cookie (30 days).
pub const DEFAULT_REFRESH_COOKIE_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);
/// Smallest accepted timeout.
pub const MIN_TIMEOUT: Duration = Duration::from_millis(100);

const ENV_REGION: &str = "COGNITO_REGION_NAME";
const ENV_USER_POOL_ID: &str = "COGNITO_USER_POOL_ID";
const ENV_CLIENT_ID: &str = "COGNITO_CLIENT_ID";
const ENV_CLIENT_SECRET: &str = "COGNITO_CLIENT_SECRET";
const ENV_ACCESS_KEY: &str = "AWS_ACCESS_KEY";
const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
const ENV_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
const ENV_ENDPOINT: &str = "COGNITO_ENDPOINT";
const ENV_JWKS_URL: &str = "COGNITO_JWKS_URL";
const ENV_DEFAULT_GROUP: &str = "COGNITO_DEFAULT_GROUP";

/// Connection and policy settings for the managed identity provider.
///
/// Secrets are never serialized; a serialized configuration is safe to log or persist.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
	/// AWS region hosting the user pool, e.g. `eu-central-1`.
	pub region: String,
	/// User pool identifier, `<region>_<id>`.
	pub user_pool_id: String,
	/// App client identifier.
	pub client_id: String,
	/// App client secret used for secret hashes.
	#[serde(default, skip_serializing)]
	pub client_secret: Secret,
	/// Static access key for administrative calls; blank selects the default credential chain.
	#[serde(default)]
	pub access_key_id: String,
	/// Secret paired with `access_key_id`.
	#[serde(default, skip_serializing)]
	pub secret_access_key: Secret,
	/// Session token accompanying temporary static credentials.
	#[serde(default, skip_serializing)]
	pub session_token: Option<Secret>,
	/// Provider API endpoint override; derived from the region when absent.
	#[serde(default)]
	pub endpoint: Option<Url>,
	/// Key-set URL override; derived from the issuer when absent.
	#[serde(default)]
	pub jwks_url: Option<Url>,
	/// Expected token issuer override; derived from region and pool when absent.
	#[serde(default)]
	pub issuer: Option<String>,
	/// Whether HTTPS is required for provider and key-set endpoints.
	#[serde(default = "default_true")]
	pub require_https: bool,
	/// Timeout applied to every provider and key-set request.
	#[serde(default = "default_request_timeout")]
	pub request_timeout: Duration,
	/// TCP connect timeout.
	#[serde(default = "default_connect_timeout")]
	pub connect_timeout: Duration,
	/// Maximum accepted key-set payload size in bytes.
	#[serde(default = "default_max_jwks_bytes")]
	pub max_jwks_bytes: u64,
	/// Optional time-bounded key-set cache; `None` re-fetches on every verification.
	#[serde(default)]
	pub jwks_cache_ttl: Option<Duration>,
	/// Group assigned to every new account.
	#[serde(default = "default_group")]
	pub default_group: String,
	/// Max-Age of the refresh-token cookie.
	#[serde(default = "default_refresh_cookie_max_age")]
	pub refresh_cookie_max_age: Duration,
}
impl Config {
	/// Construct a configuration with default policy settings.
	pub fn new(
		region: impl Into<String>,
		user_pool_id: impl Into<String>,
		client_id: impl Into<String>,
		client_secret: impl Into<Secret>,
		access_key_id: impl Into<String>,
		secret_access_key: impl Into<Secret>,
	) -> Self {
		Self {
			region: region.into(),
			user_pool_id: user_pool_id.into(),
			client_id: client_id.into(),
			client_secret: client_secret.into(),
			access_key_id: access_key_id.into(),
			secret_access_key: secret_access_key.into(),
			session_token: None,
			endpoint: None,
			jwks_url: None,
			issuer: None,
			require_https: true,
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
			connect_timeout: DEFAULT_CONNECT_TIMEOUT,
			max_jwks_bytes: DEFAULT_MAX_JWKS_BYTES,
			jwks_cache_ttl: None,
			default_group: DEFAULT_USER_GROUP.into(),
			refresh_cookie_max_age: DEFAULT_REFRESH_COOKIE_MAX_AGE,
		}
	}

	/// Load the configuration from process environment variables.
	pub fn from_env() -> Result<Self> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Load the configuration through an arbitrary key lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let require = |field: &'static str, key: &str| {
			lookup(key).filter(|value| !value.trim().is_empty()).ok_or_else(|| Error::Config {
				field,
				reason: format!("Environment variable {key} must be set."),
			})
		};
		let mut config = Self::new(
			require("region", ENV_REGION)?,
			require("user_pool_id", ENV_USER_POOL_ID)?,
			require("client_id", ENV_CLIENT_ID)?,
			require("client_secret", ENV_CLIENT_SECRET)?,
			lookup(ENV_ACCESS_KEY).unwrap_or_default(),
			lookup(ENV_SECRET_ACCESS_KEY).unwrap_or_default(),
		);

		config.session_token =
			lookup(ENV_SESSION_TOKEN).filter(|token| !token.trim().is_empty()).map(Secret::from);

		if let Some(endpoint) = lookup(ENV_ENDPOINT) {
			config.endpoint = Some(Url::parse(&endpoint)?);
		}
		if let Some(jwks_url) = lookup(ENV_JWKS_URL) {
			config.jwks_url = Some(Url::parse(&jwks_url)?);
		}
		if let Some(group) = lookup(ENV_DEFAULT_GROUP) {
			config.default_group = group;
		}

		config.validate()?;

		Ok(config)
	}

	/// Point provider API calls at a different endpoint.
	pub fn with_endpoint(mut self, endpoint: impl AsRef<str>) -> Result<Self> {
		self.endpoint = Some(Url::parse(endpoint.as_ref())?);

		Ok(self)
	}

	/// Fetch signing keys from a different URL.
	pub fn with_jwks_url(mut self, jwks_url: impl AsRef<str>) -> Result<Self> {
		self.jwks_url = Some(Url::parse(jwks_url.as_ref())?);

		Ok(self)
	}

	/// Set HTTPS requirement to the desired value.
	pub fn with_require_https(mut self, require_https: bool) -> Self {
		self.require_https = require_https;

		self
	}

	/// Attach a session token to the static credentials.
	pub fn with_session_token(mut self, token: impl Into<Secret>) -> Self {
		self.session_token = Some(token.into());

		self
	}

	/// Whether static AWS credentials are configured.
	///
	/// Without them the provider client resolves credentials through the default chain.
	pub fn has_static_credentials(&self) -> bool {
		!self.access_key_id.trim().is_empty()
	}

	/// Enable the time-bounded key-set cache.
	pub fn with_jwks_cache_ttl(mut self, ttl: Duration) -> Self {
		self.jwks_cache_ttl = Some(ttl);

		self
	}

	/// Provider API endpoint.
	pub fn endpoint(&self) -> Result<Url> {
		match &self.endpoint {
			Some(endpoint) => Ok(endpoint.clone()),
			None => Ok(Url::parse(&format!("https://cognito-idp.{}.amazonaws.com/", self.region))?),
		}
	}

	/// Issuer every access token must carry.
	pub fn issuer(&self) -> String {
		match &self.issuer {
			Some(issuer) => issuer.clone(),
			None => format!("https://cognito-idp.{}.amazonaws.com/{}", self.region, self.user_pool_id),
		}
	}

	/// URL of the provider's public key set.
	pub fn jwks_url(&self) -> Result<Url> {
		match &self.jwks_url {
			Some(url) => Ok(url.clone()),
			None => Ok(Url::parse(&format!("{}/.well-known/jwks.json", self.issuer()))?),
		}
	}

	/// Validate the configuration against the documented constraints.
	pub fn validate(&self) -> Result<()> {
		if self.region.is_empty()
			|| !self.region.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
		{
			return Err(Error::Config {
				field: "region",
				reason: "Must be a non-empty region name such as 'eu-central-1'.".into(),
			});
		}
		if !self.user_pool_id.contains('_') {
			return Err(Error::Config {
				field: "user_pool_id",
				reason: "Must have the form '<region>_<id>'.".into(),
			});
		}
		if self.client_id.trim().is_empty() {
			return Err(Error::Config { field: "client_id", reason: "Must not be empty.".into() });
		}
		if self.client_secret.is_blank() {
			return Err(Error::Config {
				field: "client_secret",
				reason: "Must not be empty.".into(),
			});
		}
		if self.access_key_id.trim().is_empty() != self.secret_access_key.is_blank() {
			return Err(Error::Config {
				field: "access_key_id",
				reason: "Access key id and secret access key must be set together.".into(),
			});
		}
		if self.session_token.is_some() && !self.has_static_credentials() {
			return Err(Error::Config {
				field: "session_token",
				reason: "Requires a static access key id and secret access key.".into(),
			});
		}
		if self.request_timeout < MIN_TIMEOUT {
			return Err(Error::Config {
				field: "request_timeout",
				reason: "Must be at least 100 ms.".into(),
			});
		}
		if self.connect_timeout < MIN_TIMEOUT {
			return Err(Error::Config {
				field: "connect_timeout",
				reason: "Must be at least 100 ms.".into(),
			});
		}
		if self.max_jwks_bytes == 0 {
			return Err(Error::Config {
				field: "max_jwks_bytes",
				reason: "Must be greater than zero.".into(),
			});
		}
		if let Some(ttl) = self.jwks_cache_ttl
			&& ttl < Duration::from_secs(1)
		{
			return Err(Error::Config {
				field: "jwks_cache_ttl",
				reason: "Must be at least 1 second when enabled.".into(),
			});
		}
		if self.default_group.trim().is_empty() {
			return Err(Error::Config {
				field: "default_group",
				reason: "Must not be empty.".into(),
			});
		}
		if self.refresh_cookie_max_age.is_zero() {
			return Err(Error::Config {
				field: "refresh_cookie_max_age",
				reason: "Must be greater than zero.".into(),
			});
		}

		if self.require_https {
			security::enforce_https(&self.endpoint()?)?;
			security::enforce_https(&self.jwks_url()?)?;
		}

		Ok(())
	}
}

fn default_true() -> bool {
	true
}

fn default_request_timeout() -> Duration {
	DEFAULT_REQUEST_TIMEOUT
}

fn default_connect_timeout() -> Duration {
	DEFAULT_CONNECT_TIMEOUT
}

fn default_max_jwks_bytes() -> u64 {
	DEFAULT_MAX_JWKS_BYTES
}

fn default_group() -> String {
	DEFAULT_USER_GROUP.into()
}

fn default_refresh_cookie_max_age() -> Duration {
	DEFAULT_REFRESH_COOKIE_MAX_AGE
}
