//! Shamir secret sharing over GF(256) with AES-256-GCM.
//!
//! # Formats
//!
//! - Fragment: lower-case hex of one share, `x ‖ y…` (one index byte, then
//!   one byte per secret byte)
//! - Derived key: lower-case hex of SHA-256 over the recovered secret
//! - Ciphertext: standard padded base64 of `nonce (12 bytes) ‖ sealed`
//!
//! # Security
//!
//! Recovered secrets and raw key bytes are zeroized on drop. Combining fewer
//! shares than the original threshold yields a different, wrong secret
//! rather than an error.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::RngCore;
use sha2::{Digest, Sha256};
use sharks::{Share, Sharks};
use zeroize::Zeroizing;

use super::CryptoBackend;
use crate::error::{Result, ShhareError};

/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// The production backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShamirBackend;

impl ShamirBackend {
    pub fn new() -> Self {
        Self
    }

    fn derive(fragments: &[String]) -> Result<Zeroizing<String>> {
        if fragments.is_empty() {
            return Err(ShhareError::Derivation(
                "No encryption keys provided".to_string(),
            ));
        }
        if fragments.len() < 2 {
            return Err(ShhareError::Derivation(
                "At least 2 keys are required for Shamir's Secret Sharing".to_string(),
            ));
        }

        let mut shares = Vec::with_capacity(fragments.len());
        for fragment in fragments {
            let compact: String = fragment
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_lowercase();
            let bytes = Zeroizing::new(hex::decode(&compact).map_err(|e| {
                ShhareError::Derivation(format!("Failed to decode hex key: {}", e))
            })?);
            let share = Share::try_from(bytes.as_slice()).map_err(|e| {
                ShhareError::Derivation(format!("Failed to decode hex key: {}", e))
            })?;
            shares.push(share);
        }

        let threshold = u8::try_from(shares.len()).map_err(|_| {
            ShhareError::Derivation("Too many keys to combine".to_string())
        })?;
        let secret = Zeroizing::new(Sharks(threshold).recover(&shares).map_err(|e| {
            ShhareError::Derivation(format!(
                "Failed to reconstruct secret from shares: {}",
                e
            ))
        })?);

        let digest = Sha256::digest(secret.as_slice());
        Ok(Zeroizing::new(hex::encode(digest)))
    }

    /// Build the cipher, reporting key failures through `fail` so callers
    /// keep their own error kind.
    fn cipher(fragments: &[String], fail: fn(String) -> ShhareError) -> Result<Aes256Gcm> {
        let key_hex = Self::derive(fragments).map_err(|err| match err {
            ShhareError::Derivation(message) => fail(message),
            other => other,
        })?;
        let key_bytes = Zeroizing::new(
            hex::decode(key_hex.as_str())
                .map_err(|e| fail(format!("Failed to decode key: {}", e)))?,
        );
        Ok(Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes[..32])))
    }

    fn seal(plaintext: &str, fragments: &[String]) -> Result<String> {
        let cipher = Self::cipher(fragments, ShhareError::Encryption)?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        let sealed = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|e| ShhareError::Encryption(e.to_string()))?;

        let mut output = nonce_bytes.to_vec();
        output.extend_from_slice(&sealed);
        Ok(STANDARD.encode(output))
    }

    fn open(ciphertext: &str, fragments: &[String]) -> Result<String> {
        let cipher = Self::cipher(fragments, ShhareError::Decryption)?;

        let data = STANDARD
            .decode(ciphertext.trim())
            .map_err(|e| ShhareError::Decryption(format!("Invalid base64: {}", e)))?;
        if data.len() < NONCE_LEN {
            return Err(ShhareError::Decryption(
                "Invalid encrypted data: too short".to_string(),
            ));
        }

        let (nonce, sealed) = data.split_at(NONCE_LEN);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|e| ShhareError::Decryption(e.to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|e| ShhareError::Decryption(format!("Invalid UTF-8: {}", e)))
    }

    fn split(count: usize, threshold: usize, byte_length: usize) -> Result<Vec<String>> {
        if count < 2 {
            return Err(ShhareError::Generation(
                "Key count must be at least 2 for Shamir sharing".to_string(),
            ));
        }
        if threshold < 2 {
            return Err(ShhareError::Generation(
                "Threshold must be at least 2 for Shamir sharing".to_string(),
            ));
        }
        if threshold > count {
            return Err(ShhareError::Generation(
                "Threshold cannot be greater than key count".to_string(),
            ));
        }
        if count > u8::MAX as usize {
            return Err(ShhareError::Generation(format!(
                "Key count cannot exceed {}",
                u8::MAX
            )));
        }
        if byte_length == 0 || byte_length > u8::MAX as usize {
            return Err(ShhareError::Generation(format!(
                "Byte count must be between 1 and {}",
                u8::MAX
            )));
        }

        let mut secret = Zeroizing::new(vec![0u8; secret_len(byte_length)]);
        let mut rng = rand::thread_rng();
        rng.fill_bytes(&mut secret);

        // Bounded by the count check above
        let threshold = threshold as u8;
        let fragments = Sharks(threshold)
            .dealer_rng(&secret, &mut rng)
            .take(count)
            .map(|share| {
                let bytes = Zeroizing::new(Vec::<u8>::from(&share));
                hex::encode(bytes.as_slice())
            })
            .collect();

        Ok(fragments)
    }
}

/// Secret size for a requested share length.
///
/// Each share carries one extra index byte, so an odd secret length gives an
/// even share length. Even requests are rounded down to the next odd size.
pub fn secret_len(byte_length: usize) -> usize {
    if byte_length % 2 == 0 {
        byte_length - 1
    } else {
        byte_length
    }
}

#[async_trait]
impl CryptoBackend for ShamirBackend {
    async fn derive_key(&self, fragments: &[String]) -> Result<String> {
        Self::derive(fragments).map(|key| key.as_str().to_string())
    }

    async fn encrypt(&self, plaintext: &str, fragments: &[String]) -> Result<String> {
        Self::seal(plaintext, fragments)
    }

    async fn decrypt(&self, ciphertext: &str, fragments: &[String]) -> Result<String> {
        Self::open(ciphertext, fragments)
    }

    async fn generate_shares(
        &self,
        count: usize,
        threshold: usize,
        byte_length: usize,
    ) -> Result<Vec<String>> {
        Self::split(count, threshold, byte_length)
    }
}
