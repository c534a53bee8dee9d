//! Error types for Shhare core operations.
//!
//! Validation and index failures are returned to the immediate caller.
//! Backend failures (derivation, encryption, decryption) are returned by the
//! backend, but the background paths in [`crate::session`] swallow them into
//! an unavailable key or an unchanged buffer and report them as diagnostics.

use thiserror::Error;

/// Result type alias for Shhare operations.
pub type Result<T> = std::result::Result<T, ShhareError>;

/// Why a candidate key fragment was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Nothing left after trimming whitespace.
    #[error("Key cannot be empty")]
    Empty,

    /// Shorter than the minimum fragment length.
    #[error("Key must be at least 12 characters long")]
    TooShort,

    /// Already present in the key store.
    #[error("Key already exists")]
    Duplicate,
}

/// Core error type for Shhare operations.
#[derive(Debug, Error)]
pub enum ShhareError {
    /// A key fragment failed validation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A fragment index was out of bounds
    #[error("Index {index} is out of bounds for {len} key(s)")]
    Index { index: usize, len: usize },

    /// The backend could not derive a key from the fragments
    #[error("Key derivation failed: {0}")]
    Derivation(String),

    /// The backend could not encrypt the plaintext
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// The backend could not decrypt the ciphertext
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// The backend could not generate shares
    #[error("Key generation failed: {0}")]
    Generation(String),

    /// Invalid user input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The session event loop has stopped
    #[error("Session is closed")]
    SessionClosed,

    /// I/O error
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl ShhareError {
    /// Returns true if the error came from the cryptographic backend.
    ///
    /// These are routine while a note is being typed and are never surfaced
    /// synchronously from the auto-sync path.
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            Self::Derivation(_) | Self::Encryption(_) | Self::Decryption(_) | Self::Generation(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages() {
        assert_eq!(ValidationError::Empty.to_string(), "Key cannot be empty");
        assert_eq!(
            ValidationError::TooShort.to_string(),
            "Key must be at least 12 characters long"
        );
        assert_eq!(ValidationError::Duplicate.to_string(), "Key already exists");
    }

    #[test]
    fn test_validation_converts_into_core_error() {
        let err: ShhareError = ValidationError::Duplicate.into();
        assert!(matches!(
            err,
            ShhareError::Validation(ValidationError::Duplicate)
        ));
        assert_eq!(err.to_string(), "Validation error: Key already exists");
    }

    #[test]
    fn test_backend_failure_classification() {
        assert!(ShhareError::Decryption("bad tag".to_string()).is_backend_failure());
        assert!(ShhareError::Derivation("no shares".to_string()).is_backend_failure());
        assert!(!ShhareError::Index { index: 3, len: 1 }.is_backend_failure());
        assert!(!ShhareError::SessionClosed.is_backend_failure());
    }

    #[test]
    fn test_index_display() {
        let err = ShhareError::Index { index: 4, len: 2 };
        assert_eq!(err.to_string(), "Index 4 is out of bounds for 2 key(s)");
    }
}
