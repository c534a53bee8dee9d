//! Key fragments: validation, input parsing and the session key store.

mod fragment;
mod input;
mod store;
mod validator;

pub use fragment::KeyFragment;
pub use input::{parse_fragment_input, HEX_FRAGMENT_LENGTH, MIN_MNEMONIC_WORDS};
pub use store::KeyStore;
pub use validator::{validate_fragment, MIN_FRAGMENT_LENGTH};
