//! Normalisation of user-typed key input.

use crate::error::{Result, ShhareError};

/// Length of a hex-form key fragment, in characters.
pub const HEX_FRAGMENT_LENGTH: usize = 64;

/// Minimum number of words in a mnemonic key phrase.
pub const MIN_MNEMONIC_WORDS: usize = 8;

/// Turn typed or pasted key input into the hex fragment the store holds.
///
/// Input made only of hex digits and whitespace is treated as a hex key:
/// whitespace is removed and exactly 64 hex characters must remain.
/// Anything else is read as a mnemonic phrase, which must have at least
/// eight alphanumeric words. Mnemonic conversion is not available in this
/// build, so a well-formed phrase is still rejected.
///
/// # Errors
///
/// Returns [`ShhareError::InvalidInput`] describing the problem.
pub fn parse_fragment_input(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ShhareError::InvalidInput(
            "Key cannot be empty".to_string(),
        ));
    }

    let hex_like = trimmed
        .chars()
        .all(|c| c.is_ascii_hexdigit() || c.is_whitespace());
    if hex_like {
        let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.len() != HEX_FRAGMENT_LENGTH {
            return Err(ShhareError::InvalidInput(format!(
                "Hex keys must be exactly {} characters (256 bits). Current length: {}",
                HEX_FRAGMENT_LENGTH,
                compact.len()
            )));
        }
        return Ok(compact.to_ascii_lowercase());
    }

    let words: Vec<&str> = trimmed.split_whitespace().collect();
    if words.len() < MIN_MNEMONIC_WORDS {
        return Err(ShhareError::InvalidInput(format!(
            "Word keys must be at least {} words long. Current length: {}",
            MIN_MNEMONIC_WORDS,
            words.len()
        )));
    }
    if let Some(word) = words
        .iter()
        .find(|word| !word.chars().all(|c| c.is_ascii_alphanumeric()))
    {
        return Err(ShhareError::InvalidInput(format!(
            "Word keys may only contain letters and digits: {:?}",
            word
        )));
    }

    Err(ShhareError::InvalidInput(
        "Word-form keys are not supported; enter the key in hex".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(err: ShhareError) -> String {
        match err {
            ShhareError::InvalidInput(message) => message,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_hex_key_whitespace_removed() {
        let spaced = format!("{} {}\n", "ab".repeat(16), "CD".repeat(16));
        let parsed = parse_fragment_input(&spaced).unwrap();
        assert_eq!(parsed.len(), HEX_FRAGMENT_LENGTH);
        assert_eq!(parsed, format!("{}{}", "ab".repeat(16), "cd".repeat(16)));
    }

    #[test]
    fn test_hex_key_wrong_length() {
        let err = parse_fragment_input("abcdef").unwrap_err();
        assert_eq!(
            message(err),
            "Hex keys must be exactly 64 characters (256 bits). Current length: 6"
        );
    }

    #[test]
    fn test_short_phrase_rejected() {
        let err = parse_fragment_input("orange purple river").unwrap_err();
        assert!(message(err).contains("at least 8 words"));
    }

    #[test]
    fn test_phrase_with_symbols_rejected() {
        let err = parse_fragment_input("one two three four five six seven eight!").unwrap_err();
        assert!(message(err).contains("letters and digits"));
    }

    #[test]
    fn test_well_formed_phrase_unsupported() {
        let err = parse_fragment_input("one two three four five six seven eight").unwrap_err();
        assert!(message(err).contains("not supported"));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(message(parse_fragment_input("  ").unwrap_err()), "Key cannot be empty");
    }
}
