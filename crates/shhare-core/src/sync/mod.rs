//! Bidirectional plaintext/ciphertext synchronisation.
//!
//! # Architecture
//!
//! ```text
//!   edit_plaintext ──┐                 ┌──▶ encrypt ──┐
//!                    ▼                 │              ▼
//!              ┌────────────┐   ┌──────┴─────┐   ┌──────────┐
//!              │  Debounce  │──▶│ SyncEngine │◀──│ complete │
//!              │  (500ms)   │   └──────┬─────┘   └──────────┘
//!              └────────────┘          │              ▲
//!                    ▲                 └──▶ decrypt ──┘
//!   edit_ciphertext ─┘
//! ```
//!
//! [`SyncEngine`] is sans-IO: every input returns the [`SyncAction`]s the
//! driver must perform (arm a timer, run a backend call). The session in
//! [`crate::session`] is that driver.

mod engine;
mod note;

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::diagnostics::Diagnostic;

pub use engine::SyncEngine;
pub use note::{classify_note, looks_encrypted};

/// Default quiet period before an edit is reconciled.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// One of the two note buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Plaintext,
    Ciphertext,
}

impl Field {
    /// The buffer a reconciliation of this field writes to.
    pub fn other(self) -> Self {
        match self {
            Self::Plaintext => Self::Ciphertext,
            Self::Ciphertext => Self::Plaintext,
        }
    }

    /// The backend operation that reconciles this field into the other.
    pub fn direction(self) -> Direction {
        match self {
            Self::Plaintext => Direction::Encrypt,
            Self::Ciphertext => Direction::Decrypt,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plaintext => write!(f, "plaintext"),
            Self::Ciphertext => write!(f, "ciphertext"),
        }
    }
}

/// Which backend call a reconciliation makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Encrypt,
    Decrypt,
}

impl Direction {
    /// The field whose contents are the input of this call.
    pub fn source(self) -> Field {
        match self {
            Self::Encrypt => Field::Plaintext,
            Self::Decrypt => Field::Ciphertext,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encrypt => write!(f, "encrypt"),
            Self::Decrypt => write!(f, "decrypt"),
        }
    }
}

/// A backend call the driver must run and report back through
/// [`SyncEngine::reconcile_completed`].
#[derive(Clone, PartialEq, Eq)]
pub struct ReconcileRequest {
    pub seq: u64,
    pub direction: Direction,
    pub input: String,
}

impl fmt::Debug for ReconcileRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconcileRequest")
            .field("seq", &self.seq)
            .field("direction", &self.direction)
            .field("input_len", &self.input.len())
            .finish()
    }
}

/// Actions returned by [`SyncEngine`] for the driver to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// (Re)start the debounce timer; any earlier timer is void.
    ScheduleDebounce {
        /// Pass back to [`SyncEngine::debounce_elapsed`] when the timer fires
        generation: u64,
        delay: Duration,
    },

    /// Stop the running debounce timer, if any.
    CancelDebounce,

    /// Run an encrypt or decrypt call.
    Reconcile(ReconcileRequest),

    /// Publish a swallowed failure.
    Diagnose(Diagnostic),
}
