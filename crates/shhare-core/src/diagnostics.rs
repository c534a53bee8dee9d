//! Background failure reports.
//!
//! Derivation and reconciliation failures never reach the caller that caused
//! them; the session publishes them here instead.

use serde::Serialize;

use crate::sync::Direction;

/// A swallowed background failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Deriving the key from the current fragments failed.
    DerivationFailed { message: String },

    /// Encrypting or decrypting a buffer failed; both buffers were left as-is.
    ReconcileFailed {
        direction: Direction,
        message: String,
    },
}

impl Diagnostic {
    pub fn message(&self) -> &str {
        match self {
            Self::DerivationFailed { message } | Self::ReconcileFailed { message, .. } => message,
        }
    }
}
