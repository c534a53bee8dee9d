//! CLI error types for structured error handling.
//!
//! Typed errors map to specific exit codes. Core errors reaching `main`
//! through `anyhow` are mapped the same way.

use std::fmt;

use shhare_core::ShhareError;

use crate::constants::exit_codes;

/// CLI-specific errors with associated exit codes.
#[derive(Debug)]
pub enum CliError {
    /// Resource not found (config, key file, note)
    NotFound { message: String, hint: String },

    /// Invalid user input
    InvalidInput(String),

    /// Key derivation or a cipher operation failed
    CryptoFailed(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::NotFound { message, hint } => write!(f, "{}\n{}", message, hint),
            CliError::InvalidInput(message) => write!(f, "{}", message),
            CliError::CryptoFailed(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for CliError {}

impl CliError {
    /// Create a NotFound error with message and hint.
    pub fn not_found(message: impl Into<String>, hint: impl Into<String>) -> Self {
        CliError::NotFound {
            message: message.into(),
            hint: hint.into(),
        }
    }

    /// Create an InvalidInput error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        CliError::InvalidInput(message.into())
    }

    /// Create a CryptoFailed error.
    pub fn crypto_failed(message: impl Into<String>) -> Self {
        CliError::CryptoFailed(message.into())
    }

    /// Get the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::NotFound { .. } => exit_codes::NOT_FOUND,
            CliError::InvalidInput(_) => exit_codes::INVALID_INPUT,
            CliError::CryptoFailed(_) => exit_codes::CRYPTO_FAILED,
        }
    }
}

/// Exit code for any error returned by a command handler.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        return cli_err.exit_code();
    }
    match err.downcast_ref::<ShhareError>() {
        Some(core_err) if core_err.is_backend_failure() => exit_codes::CRYPTO_FAILED,
        Some(ShhareError::Validation(_) | ShhareError::InvalidInput(_) | ShhareError::Index { .. }) => {
            exit_codes::INVALID_INPUT
        }
        _ => exit_codes::FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shhare_core::ValidationError;

    #[test]
    fn test_cli_error_codes() {
        let err = anyhow::Error::new(CliError::not_found("Key file not found", "Hint: x"));
        assert_eq!(exit_code_for(&err), exit_codes::NOT_FOUND);
        let err = anyhow::Error::new(CliError::crypto_failed("bad"));
        assert_eq!(exit_code_for(&err), exit_codes::CRYPTO_FAILED);
    }

    #[test]
    fn test_core_error_codes() {
        let err = anyhow::Error::new(ShhareError::Decryption("tag".into()));
        assert_eq!(exit_code_for(&err), exit_codes::CRYPTO_FAILED);
        let err = anyhow::Error::new(ShhareError::Validation(ValidationError::Empty));
        assert_eq!(exit_code_for(&err), exit_codes::INVALID_INPUT);
        let err = anyhow::anyhow!("anything else");
        assert_eq!(exit_code_for(&err), exit_codes::FAILURE);
    }

    #[test]
    fn test_not_found_display_includes_hint() {
        let err = CliError::not_found("Config not found", "Hint: run `shhare config init`");
        assert_eq!(
            err.to_string(),
            "Config not found\nHint: run `shhare config init`"
        );
    }
}
