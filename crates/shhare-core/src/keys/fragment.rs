//! The key fragment type.

use std::fmt;

use serde::Serialize;

/// One validated share of a secret-shared key, in its fixed (hex) form.
///
/// Fragments are only constructed by the validator and by bulk replacement in
/// [`crate::keys::KeyStore`], so a `KeyFragment` in hand has already been
/// trimmed. `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct KeyFragment(String);

impl KeyFragment {
    pub(crate) fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The fragment text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the fragment, returning the underlying string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for KeyFragment {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for KeyFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("KeyFragment")
            .field(&format_args!("[REDACTED; {} chars]", self.0.chars().count()))
            .finish()
    }
}
