//! Key fragment validation.
//!
//! Enforces the format rules every fragment must satisfy before it enters a
//! [`KeyStore`](super::KeyStore).

use super::KeyFragment;
use crate::error::ValidationError;

/// Minimum fragment length in characters, after trimming.
pub const MIN_FRAGMENT_LENGTH: usize = 12;

/// Validate a candidate fragment against the fragments already held.
///
/// # Rules
///
/// Checked in order:
///
/// 1. Not empty once surrounding whitespace is trimmed
/// 2. At least 12 characters long after trimming
/// 3. Not identical (after trimming) to an existing fragment
///
/// # Returns
///
/// The trimmed fragment on success, or the first rule it broke.
///
/// # Examples
///
/// ```
/// use shhare_core::keys::validate_fragment;
/// use shhare_core::ValidationError;
///
/// assert!(validate_fragment("  aaaaaaaaaaaa  ", &[]).is_ok());
/// assert_eq!(validate_fragment("short", &[]), Err(ValidationError::TooShort));
/// ```
pub fn validate_fragment(
    candidate: &str,
    existing: &[KeyFragment],
) -> Result<KeyFragment, ValidationError> {
    let trimmed = candidate.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }

    if trimmed.chars().count() < MIN_FRAGMENT_LENGTH {
        return Err(ValidationError::TooShort);
    }

    if existing.iter().any(|fragment| fragment.as_str() == trimmed) {
        return Err(ValidationError::Duplicate);
    }

    Ok(KeyFragment::new(trimmed))
}
