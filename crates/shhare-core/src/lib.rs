//! # Shhare Core
//!
//! State core for Shhare: a tool that keeps a note readable and encrypted at
//! the same time, under a key split into Shamir shares.
//!
//! This crate owns the key fragments, the key derived from them and the
//! plaintext/ciphertext buffer pair, independent of any interface.
//!
//! ## Architecture
//!
//! - **keys**: fragment validation, key input parsing and the key store
//! - **derived**: the derived key cache and its stale-result discard
//! - **sync**: the debounced plaintext/ciphertext sync engine
//! - **backend**: the crypto backend trait and the Shamir + AES-GCM backend
//! - **session**: the event loop tying the above together
//! - **fs**: atomic file writes for key files and notes

pub mod backend;
pub mod derived;
pub mod diagnostics;
pub mod error;
pub mod fs;
pub mod keys;
pub mod session;
pub mod sync;

pub use backend::{CryptoBackend, ShamirBackend};
pub use derived::{DerivedKey, DerivedKeyCache, MIN_FRAGMENTS_FOR_KEY};
pub use diagnostics::Diagnostic;
pub use error::{Result, ShhareError, ValidationError};
pub use keys::{KeyFragment, KeyStore};
pub use session::{ImportReport, Session, SessionConfig, SessionHandle, SessionSnapshot};
pub use sync::{Direction, Field, SyncEngine};

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
