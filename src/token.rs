//! Access-token verification against the provider's rotating key set.
//!
//! Verification fetches the published key set, matches the token's `kid`, checks the RS256
//! signature and the issuer, requires an access token issued to the configured app client, then
//! reads expiry. [`TokenVerifier::inspect`] reports expiry while
//! [`TokenVerifier::verify`] rejects it.

pub mod cache;
pub mod jwks;

// crates.io
use jsonwebtoken::{
	Algorithm, DecodingKey, Validation, decode, decode_header, errors::ErrorKind, jwk::JwkSet,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;
// self
use crate::{
	_prelude::*,
	config::Config,
	error::AuthFailure,
	metrics,
	token::{
		cache::KeySetCache,
		jwks::{FetchPolicy, fetch_key_set},
	},
};

/// Claims read from a provider access token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
	/// Account identifier; equals the local user's external id.
	pub username: String,
	/// Expiry as seconds since the Unix epoch.
	pub exp: i64,
	/// Issuer URL.
	pub iss: String,
	/// App client the token was issued to.
	#[serde(default)]
	pub client_id: Option<String>,
	/// Token purpose, `access` for access tokens.
	#[serde(default)]
	pub token_use: Option<String>,
}

/// Signature-checked token together with its expiry state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InspectedToken {
	/// Verified claims.
	pub claims: Claims,
	/// Whether `exp` lies in the past.
	pub expired: bool,
}

/// Detailed verification failure, kept internal to session handling.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
	/// Header or payload could not be decoded, or `kid` is missing.
	#[error("Malformed token: {0}")]
	MalformedToken(String),
	/// No key with the token's `kid` exists in the key set.
	#[error("Unknown signing key {0}.")]
	UnknownSigningKey(String),
	/// Signature or algorithm check failed.
	#[error("Token signature is invalid.")]
	SignatureInvalid,
	/// Token is past its `exp`.
	#[error("Token has expired.")]
	Expired,
	/// `iss` differs from the configured issuer.
	#[error("Token issuer does not match.")]
	IssuerMismatch,
	/// `token_use` is missing or not `access`.
	#[error("Token is not an access token.")]
	WrongTokenUse,
	/// `client_id` is missing or names another app client.
	#[error("Token was issued to another client.")]
	ClientMismatch,
	/// Key set could not be fetched.
	#[error("Key set unavailable: {0}")]
	KeySetUnavailable(String),
}
impl TokenError {
	/// Label used for metrics.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::MalformedToken(_) => "malformed",
			Self::UnknownSigningKey(_) => "unknown_kid",
			Self::SignatureInvalid => "bad_signature",
			Self::Expired => "expired",
			Self::IssuerMismatch => "issuer_mismatch",
			Self::WrongTokenUse => "wrong_token_use",
			Self::ClientMismatch => "client_mismatch",
			Self::KeySetUnavailable(_) => "jwks_unavailable",
		}
	}
}
impl From<TokenError> for Error {
	fn from(value: TokenError) -> Self {
		match value {
			TokenError::KeySetUnavailable(reason) => Error::TransientProvider(reason),
			_ => Error::Authentication(AuthFailure::TokenInvalid),
		}
	}
}

/// Verifies provider-issued access tokens.
#[derive(Debug)]
pub struct TokenVerifier {
	http: Client,
	jwks_url: Url,
	issuer: String,
	client_id: String,
	policy: FetchPolicy,
	cache: Option<KeySetCache>,
}
impl TokenVerifier {
	/// Build a verifier from the configuration.
	pub fn new(config: &Config) -> Result<Self> {
		let http = Client::builder().connect_timeout(config.connect_timeout).build()?;

		Self::with_client(config, http)
	}

	/// Build a verifier around an existing `reqwest::Client`.
	pub fn with_client(config: &Config, http: Client) -> Result<Self> {
		config.validate()?;

		Ok(Self {
			http,
			jwks_url: config.jwks_url()?,
			issuer: config.issuer(),
			client_id: config.client_id.clone(),
			policy: FetchPolicy {
				require_https: config.require_https,
				timeout: config.request_timeout,
				max_bytes: config.max_jwks_bytes,
			},
			cache: config.jwks_cache_ttl.map(KeySetCache::new),
		})
	}

	/// Issuer tokens must carry.
	pub fn issuer(&self) -> &str {
		&self.issuer
	}

	/// Verify signature and issuer, reporting expiry instead of rejecting it.
	pub async fn inspect(&self, token: &str) -> std::result::Result<InspectedToken, TokenError> {
		let (keys, cached) = self.key_set(false).await?;
		let header =
			decode_header(token).map_err(|e| TokenError::MalformedToken(e.to_string()))?;
		let kid = header.kid.ok_or_else(|| TokenError::MalformedToken("missing kid".into()))?;
		let keys = if keys.find(&kid).is_some() || !cached {
			keys
		} else {
			// Rotated keys only show up after a re-fetch.
			self.key_set(true).await?.0
		};
		let jwk = keys.find(&kid).ok_or_else(|| TokenError::UnknownSigningKey(kid.clone()))?;
		let key = DecodingKey::from_jwk(jwk).map_err(|_| TokenError::UnknownSigningKey(kid.clone()))?;
		let mut validation = Validation::new(Algorithm::RS256);

		validation.validate_exp = false;
		validation.validate_aud = false;
		validation.set_issuer(&[&self.issuer]);

		let data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
			ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::SignatureInvalid,
			ErrorKind::InvalidIssuer => TokenError::IssuerMismatch,
			_ => TokenError::MalformedToken(e.to_string()),
		})?;

		if data.claims.token_use.as_deref() != Some("access") {
			return Err(TokenError::WrongTokenUse);
		}
		if data.claims.client_id.as_deref() != Some(self.client_id.as_str()) {
			return Err(TokenError::ClientMismatch);
		}

		let expired = is_expired(data.claims.exp);

		Ok(InspectedToken { claims: data.claims, expired })
	}

	/// Verify a token and reject it when expired.
	pub async fn verify(&self, token: &str) -> Result<Claims> {
		let outcome = self.inspect(token).await.and_then(|inspected| {
			if inspected.expired { Err(TokenError::Expired) } else { Ok(inspected.claims) }
		});

		match &outcome {
			Ok(_) => metrics::record_token_verification("valid"),
			Err(e) => {
				tracing::debug!(reason = %e, "token rejected");
				metrics::record_token_verification(e.kind());
			},
		}

		outcome.map_err(Error::from)
	}

	async fn key_set(&self, force: bool) -> std::result::Result<(Arc<JwkSet>, bool), TokenError> {
		if let Some(cache) = &self.cache
			&& !force
			&& let Some(keys) = cache.get(Instant::now()).await
		{
			return Ok((keys, true));
		}

		let keys = Arc::new(fetch_key_set(&self.http, &self.jwks_url, &self.policy).await?);

		if let Some(cache) = &self.cache {
			cache.store(keys.clone(), Instant::now()).await;
		}

		Ok((keys, false))
	}
}

/// Whether `exp` lies in the past relative to now.
pub fn is_expired(exp: i64) -> bool {
	is_expired_at(exp, Utc::now())
}

/// Whether `exp` lies strictly before `now`.
pub fn is_expired_at(exp: i64, now: DateTime<Utc>) -> bool {
	exp < now.timestamp()
}
