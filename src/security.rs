//! Security utilities covering HTTPS enforcement and secret redaction.
//!
//! # Threat Model
//! Upstream TLS validation is delegated to `reqwest`/`rustls`. These helpers keep credentials out
//! of logs and `Debug` output, and refuse plain-text endpoints for the identity provider and its
//! key set unless explicitly disabled for local testing.

// std
use std::fmt::{Debug, Formatter, Result as FmtResult};
// crates.io
use serde::{Deserialize, Serialize};
use url::Url;
// self
use crate::_prelude::*;

/// Credential string whose value never appears in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Secret {
	value: Arc<str>,
}
impl Secret {
	/// Wrap a credential value.
	pub fn new(value: impl Into<String>) -> Self {
		Self { value: Arc::from(value.into()) }
	}

	/// Borrow the raw credential for signing or transport.
	pub fn expose(&self) -> &str {
		&self.value
	}

	/// Whether the wrapped credential is empty or whitespace.
	pub fn is_blank(&self) -> bool {
		self.value.trim().is_empty()
	}
}
impl Debug for Secret {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.write_str("Secret(***)")
	}
}
impl From<String> for Secret {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}
impl From<&str> for Secret {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}
impl From<Secret> for String {
	fn from(value: Secret) -> Self {
		value.value.to_string()
	}
}

/// Ensure the provided URL uses HTTPS.
pub fn enforce_https(url: &Url) -> Result<()> {
	if url.scheme() == "https" {
		Ok(())
	} else {
		Err(Error::Config {
			field: "require_https",
			reason: format!("Upstream URL {url} must use HTTPS."),
		})
	}
}
