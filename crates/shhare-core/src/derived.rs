//! Derived key cache.
//!
//! Tracks the key reconstructed from the current fragments. Derivation itself
//! happens elsewhere (a [`CryptoBackend`](crate::backend::CryptoBackend) call
//! run by the session); this type only decides when a request is needed and
//! which completion is allowed to land.

use std::fmt;

use serde::Serialize;

use crate::error::Result;
use crate::keys::KeyFragment;

/// Fewest fragments the sharing scheme can reconstruct a key from.
pub const MIN_FRAGMENTS_FOR_KEY: usize = 2;

/// The most recently derived key.
#[derive(Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "key", rename_all = "snake_case")]
pub enum DerivedKey {
    #[default]
    Unavailable,
    Available(String),
}

impl DerivedKey {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    /// The key string, if one is available.
    pub fn as_deref(&self) -> Option<&str> {
        match self {
            Self::Available(key) => Some(key),
            Self::Unavailable => None,
        }
    }

    /// Masked form for display: the first and last eight characters with
    /// bullets between. Keys too short to mask are fully hidden.
    pub fn obfuscated(&self) -> Option<String> {
        self.as_deref().map(obfuscate)
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "Unavailable"),
            Self::Available(_) => write!(f, "Available([REDACTED])"),
        }
    }
}

/// Mask all but the first and last eight characters of `key`.
pub fn obfuscate(key: &str) -> String {
    const VISIBLE: usize = 8;
    const BULLETS: usize = 16;

    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= VISIBLE * 2 {
        return "•".repeat(chars.len());
    }
    let head: String = chars[..VISIBLE].iter().collect();
    let tail: String = chars[chars.len() - VISIBLE..].iter().collect();
    format!("{}{}{}", head, "•".repeat(BULLETS), tail)
}

/// A derivation the caller must run and report back through
/// [`DerivedKeyCache::complete`].
#[derive(Clone, PartialEq, Eq)]
pub struct DeriveRequest {
    pub seq: u64,
    pub fragments: Vec<String>,
}

impl fmt::Debug for DeriveRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeriveRequest")
            .field("seq", &self.seq)
            .field("fragments", &self.fragments.len())
            .finish()
    }
}

/// Holds the current [`DerivedKey`] and the sequence number of the newest
/// outstanding derivation.
///
/// Completions are accepted only for the newest issued request, so a slow
/// earlier derivation can never overwrite a later one.
#[derive(Debug, Default)]
pub struct DerivedKeyCache {
    current: DerivedKey,
    next_seq: u64,
    outstanding: Option<u64>,
}

impl DerivedKeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &DerivedKey {
        &self.current
    }

    /// True while the newest issued request has not completed.
    pub fn is_pending(&self) -> bool {
        self.outstanding.is_some()
    }

    /// Start a recomputation for `fragments`.
    ///
    /// With fewer than [`MIN_FRAGMENTS_FOR_KEY`] fragments the key becomes
    /// unavailable at once and no request is issued. Otherwise the returned
    /// request supersedes every earlier one.
    pub fn recompute(&mut self, fragments: &[KeyFragment]) -> Option<DeriveRequest> {
        if fragments.len() < MIN_FRAGMENTS_FOR_KEY {
            tracing::debug!(
                fragments = fragments.len(),
                "Too few fragments to derive a key"
            );
            self.invalidate();
            return None;
        }

        self.next_seq += 1;
        let seq = self.next_seq;
        self.outstanding = Some(seq);
        tracing::debug!(seq, fragments = fragments.len(), "Issuing key derivation");

        Some(DeriveRequest {
            seq,
            fragments: fragments
                .iter()
                .map(|fragment| fragment.as_str().to_string())
                .collect(),
        })
    }

    /// Mark the key unavailable and retire every in-flight request.
    pub fn invalidate(&mut self) {
        self.current = DerivedKey::Unavailable;
        self.outstanding = None;
    }

    /// Apply the outcome of request `seq`.
    ///
    /// Returns `false` when the completion is stale and was discarded.
    /// Failures leave the key unavailable and are logged, not raised.
    pub fn complete(&mut self, seq: u64, outcome: Result<String>) -> bool {
        if self.outstanding != Some(seq) {
            tracing::debug!(seq, outstanding = ?self.outstanding, "Discarding stale derivation");
            return false;
        }
        self.outstanding = None;

        self.current = match outcome {
            Ok(key) => DerivedKey::Available(key),
            Err(err) => {
                tracing::warn!(seq, error = %err, "Key derivation failed");
                DerivedKey::Unavailable
            }
        };
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShhareError;
    use crate::keys::KeyStore;

    fn store_with(count: usize) -> KeyStore {
        let mut store = KeyStore::new();
        for i in 0..count {
            store.add(&format!("fragment-{:04}", i)).unwrap();
        }
        store
    }

    #[test]
    fn test_below_threshold_is_unavailable_without_request() {
        let mut cache = DerivedKeyCache::new();
        assert!(cache.recompute(store_with(0).fragments()).is_none());
        assert!(cache.recompute(store_with(1).fragments()).is_none());
        assert_eq!(cache.current(), &DerivedKey::Unavailable);
        assert!(!cache.is_pending());
    }

    #[test]
    fn test_request_carries_fragment_snapshot() {
        let mut cache = DerivedKeyCache::new();
        let store = store_with(2);
        let request = cache.recompute(store.fragments()).unwrap();
        assert_eq!(request.fragments, store.to_strings());
        assert!(cache.is_pending());
    }

    #[test]
    fn test_completion_applies() {
        let mut cache = DerivedKeyCache::new();
        let request = cache.recompute(store_with(2).fragments()).unwrap();
        assert!(cache.complete(request.seq, Ok("k1".to_string())));
        assert_eq!(cache.current().as_deref(), Some("k1"));
        assert!(!cache.is_pending());
    }

    #[test]
    fn test_slow_earlier_request_discarded() {
        let mut cache = DerivedKeyCache::new();
        let store = store_with(3);
        let r1 = cache.recompute(&store.fragments()[..2]).unwrap();
        let r2 = cache.recompute(store.fragments()).unwrap();
        assert!(r2.seq > r1.seq);

        assert!(cache.complete(r2.seq, Ok("second".to_string())));
        assert!(!cache.complete(r1.seq, Ok("first".to_string())));
        assert_eq!(cache.current().as_deref(), Some("second"));
    }

    #[test]
    fn test_failure_makes_key_unavailable() {
        let mut cache = DerivedKeyCache::new();
        let r1 = cache.recompute(store_with(2).fragments()).unwrap();
        cache.complete(r1.seq, Ok("key".to_string()));

        let r2 = cache.recompute(store_with(2).fragments()).unwrap();
        assert!(cache.complete(
            r2.seq,
            Err(ShhareError::Derivation("bad shares".to_string()))
        ));
        assert_eq!(cache.current(), &DerivedKey::Unavailable);
    }

    #[test]
    fn test_invalidate_retires_in_flight_requests() {
        let mut cache = DerivedKeyCache::new();
        let request = cache.recompute(store_with(2).fragments()).unwrap();
        cache.invalidate();
        assert!(!cache.complete(request.seq, Ok("late".to_string())));
        assert_eq!(cache.current(), &DerivedKey::Unavailable);
    }

    #[test]
    fn test_obfuscate() {
        let key = "0123456789abcdef0123456789abcdef";
        assert_eq!(
            obfuscate(key),
            format!("01234567{}89abcdef", "•".repeat(16))
        );
        assert_eq!(obfuscate("short"), "•••••");
    }

    #[test]
    fn test_debug_redacts_key() {
        let key = DerivedKey::Available("secret-key".to_string());
        assert_eq!(format!("{:?}", key), "Available([REDACTED])");
    }
}
