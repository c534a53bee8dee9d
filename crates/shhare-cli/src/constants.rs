//! Constants used throughout the CLI.

/// Exit codes for the CLI.
///
/// These follow common Unix conventions:
/// - 0: Success
/// - 1: General error (used by anyhow for unhandled errors)
/// - 2: Misuse of shell command (reserved by shells, and clap usage errors)
/// - 3+: Application-specific errors
pub mod exit_codes {
    /// General failure.
    pub const FAILURE: i32 = 1;

    /// Resource not found (config, key file, note).
    pub const NOT_FOUND: i32 = 3;

    /// Invalid user input, key files or arguments.
    pub const INVALID_INPUT: i32 = 4;

    /// Key derivation, encryption or decryption failed.
    pub const CRYPTO_FAILED: i32 = 5;
}

/// Share size used by `generate`, in bytes (64 hex characters).
pub const SHARE_BYTES: usize = 32;

/// Fewest keys a key file must hold to be useful.
pub const MIN_KEYS: usize = 2;
