//! Secret hash required by the identity provider on client-originated identity calls.

// crates.io
use base64::prelude::*;
use hmac::{Hmac, Mac};
use sha2::Sha256;
// self
use crate::security::Secret;

type HmacSha256 = Hmac<Sha256>;

/// Computes `base64(HMAC-SHA256(client_secret, identity || client_id))`.
///
/// The identity differs per call type (email for sign-up and password auth, the token's
/// `username` claim for refresh), so every digest is computed fresh.
#[derive(Clone, Debug)]
pub struct SecretHasher {
	client_id: String,
	client_secret: Secret,
}
impl SecretHasher {
	/// Create a hasher for the given app client.
	pub fn new(client_id: impl Into<String>, client_secret: Secret) -> Self {
		Self { client_id: client_id.into(), client_secret }
	}

	/// App client the hashes are bound to.
	pub fn client_id(&self) -> &str {
		&self.client_id
	}

	/// Sign the identity string the provider will validate against.
	pub fn sign(&self, identity: &str) -> String {
		// HMAC accepts keys of any length.
		let mut mac = <HmacSha256 as Mac>::new_from_slice(self.client_secret.expose().as_bytes())
			.unwrap_or_else(|_| unreachable!());

		mac.update(identity.as_bytes());
		mac.update(self.client_id.as_bytes());

		BASE64_STANDARD.encode(mac.finalize().into_bytes())
	}
}
