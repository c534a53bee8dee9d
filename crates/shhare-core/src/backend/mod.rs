//! Cryptographic backend abstraction.
//!
//! The sync engine and key cache never touch key material directly; they hand
//! fragment snapshots to a [`CryptoBackend`] and apply whatever comes back.

mod shamir;

use async_trait::async_trait;

use crate::error::Result;

pub use shamir::ShamirBackend;

/// Key reconstruction, encryption and share generation.
///
/// Implementations must be safe to call concurrently; the session runs each
/// call in its own task and results may arrive in any order.
#[async_trait]
pub trait CryptoBackend: Send + Sync {
    /// Reconstruct the key from `fragments`.
    ///
    /// # Errors
    ///
    /// [`ShhareError::Derivation`](crate::ShhareError::Derivation) if the
    /// fragments are malformed or too few.
    async fn derive_key(&self, fragments: &[String]) -> Result<String>;

    /// Encrypt `plaintext` under the key reconstructed from `fragments`.
    ///
    /// # Errors
    ///
    /// [`ShhareError::Encryption`](crate::ShhareError::Encryption), including
    /// when no key can be reconstructed.
    async fn encrypt(&self, plaintext: &str, fragments: &[String]) -> Result<String>;

    /// Decrypt `ciphertext` under the key reconstructed from `fragments`.
    ///
    /// A wrong but well-formed fragment set may produce output rather than an
    /// error, depending on the scheme. Success says nothing about whether the
    /// right fragments were used.
    ///
    /// # Errors
    ///
    /// [`ShhareError::Decryption`](crate::ShhareError::Decryption), including
    /// when no key can be reconstructed.
    async fn decrypt(&self, ciphertext: &str, fragments: &[String]) -> Result<String>;

    /// Produce `count` fresh fragments, any `threshold` of which reconstruct
    /// a new random key.
    async fn generate_shares(
        &self,
        count: usize,
        threshold: usize,
        byte_length: usize,
    ) -> Result<Vec<String>>;
}
