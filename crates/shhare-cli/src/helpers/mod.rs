//! Input and key file helper functions for the CLI.
//!
//! This module provides utilities for:
//! - Reading text arguments and confirming overwrites (`input`)
//! - Reading, writing and checking key files (`keyfile`)

mod input;
mod keyfile;

// Re-export public API
pub use input::{confirm_overwrite, read_text};
pub use keyfile::{check_key_lines, read_key_lines, write_key_file, KeyLineStatus};
