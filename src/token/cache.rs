//! Optional time-bounded key-set cache.

// crates.io
use jsonwebtoken::jwk::JwkSet;
use tokio::sync::RwLock;
// self
use crate::_prelude::*;

/// Key set retained between verifications.
#[derive(Clone, Debug)]
pub struct CachedKeySet {
	/// Keys returned by the last successful fetch.
	pub keys: Arc<JwkSet>,
	/// Monotonic deadline after which the set is re-fetched.
	pub expires_at: Instant,
}
impl CachedKeySet {
	/// Whether the set has outlived its TTL.
	pub fn is_expired(&self, now: Instant) -> bool {
		now >= self.expires_at
	}
}

/// Single-slot cache holding the most recent key set for one issuer.
#[derive(Debug)]
pub struct KeySetCache {
	ttl: Duration,
	slot: RwLock<Option<CachedKeySet>>,
}
impl KeySetCache {
	/// Create an empty cache with the given TTL.
	pub fn new(ttl: Duration) -> Self {
		Self { ttl, slot: RwLock::new(None) }
	}

	/// Fresh keys, if any.
	pub async fn get(&self, now: Instant) -> Option<Arc<JwkSet>> {
		let slot = self.slot.read().await;

		slot.as_ref().filter(|cached| !cached.is_expired(now)).map(|cached| cached.keys.clone())
	}

	/// Replace the cached set.
	pub async fn store(&self, keys: Arc<JwkSet>, now: Instant) {
		*self.slot.write().await =
			Some(CachedKeySet { keys, expires_at: now + self.ttl });
	}
}
