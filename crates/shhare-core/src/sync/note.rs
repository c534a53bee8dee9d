//! Note content classification.

use super::Field;

/// Returns true if `content` looks like ciphertext rather than prose.
///
/// Trimmed content counts as encrypted when it is entirely base64 alphabet
/// (`A-Z a-z 0-9 + / =`) or entirely hex digits and whitespace. Short plain
/// words therefore also qualify; loading them starts a decrypt that fails
/// quietly and leaves the text where it was.
pub fn looks_encrypted(content: &str) -> bool {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return false;
    }

    let base64_like = trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='));
    let hex_like = trimmed
        .chars()
        .all(|c| c.is_ascii_hexdigit() || c.is_whitespace());

    base64_like || hex_like
}

/// The buffer loaded note content belongs in.
pub fn classify_note(content: &str) -> Field {
    if looks_encrypted(content) {
        Field::Ciphertext
    } else {
        Field::Plaintext
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_is_encrypted() {
        assert!(looks_encrypted("q83vEjRWeJq8z+/xAAAAAA=="));
        assert!(looks_encrypted("  q83vEjRWeJq8\n"));
    }

    #[test]
    fn test_spaced_hex_is_encrypted() {
        assert!(looks_encrypted("de ad be ef\n01 02"));
    }

    #[test]
    fn test_prose_is_plaintext() {
        assert!(!looks_encrypted("hello, world"));
        assert!(!looks_encrypted("two words"));
        assert_eq!(classify_note("Dear diary,\ntoday"), Field::Plaintext);
    }

    #[test]
    fn test_empty_is_plaintext() {
        assert!(!looks_encrypted(""));
        assert!(!looks_encrypted("   \n"));
    }

    #[test]
    fn test_single_word_counts_as_encrypted() {
        assert_eq!(classify_note("hello"), Field::Ciphertext);
    }
}
