//! Key-set retrieval over HTTP.

// crates.io
use jsonwebtoken::jwk::JwkSet;
use reqwest::Client;
use url::Url;
// self
use crate::{_prelude::*, security, token::TokenError};

/// Limits applied to every key-set fetch.
#[derive(Clone, Debug)]
pub struct FetchPolicy {
	/// Refuse non-HTTPS key-set URLs.
	pub require_https: bool,
	/// Per-request timeout.
	pub timeout: Duration,
	/// Maximum accepted body size in bytes.
	pub max_bytes: u64,
}

/// Fetch and parse the key set published at `url`.
///
/// Every failure, including an oversized or unparsable body, is reported as
/// [`TokenError::KeySetUnavailable`].
pub async fn fetch_key_set(
	client: &Client,
	url: &Url,
	policy: &FetchPolicy,
) -> std::result::Result<JwkSet, TokenError> {
	if policy.require_https {
		security::enforce_https(url).map_err(|e| TokenError::KeySetUnavailable(e.to_string()))?;
	}

	let start = Instant::now();
	let response = client
		.get(url.clone())
		.timeout(policy.timeout)
		.send()
		.await
		.map_err(|e| TokenError::KeySetUnavailable(e.to_string()))?;
	let status = response.status();

	if !status.is_success() {
		return Err(TokenError::KeySetUnavailable(format!("{url} returned {status}")));
	}
	if let Some(length) = response.content_length()
		&& length > policy.max_bytes
	{
		return Err(oversized(length, policy.max_bytes));
	}

	let bytes = response.bytes().await.map_err(|e| TokenError::KeySetUnavailable(e.to_string()))?;

	if bytes.len() as u64 > policy.max_bytes {
		return Err(oversized(bytes.len() as u64, policy.max_bytes));
	}

	let jwks: JwkSet = serde_json::from_slice(&bytes)
		.map_err(|e| TokenError::KeySetUnavailable(format!("invalid key set: {e}")))?;

	tracing::debug!(
		url = %url,
		status = %status,
		keys = jwks.keys.len(),
		elapsed = ?start.elapsed(),
		"jwks fetch complete"
	);

	Ok(jwks)
}

fn oversized(size: u64, limit: u64) -> TokenError {
	TokenError::KeySetUnavailable(format!(
		"Response size {size} bytes exceeds the configured guard of {limit} bytes."
	))
}
