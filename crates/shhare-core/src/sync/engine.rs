//! The sync engine state machine.

use std::time::Duration;

use super::{Direction, Field, ReconcileRequest, SyncAction};
use crate::diagnostics::Diagnostic;
use crate::error::Result;

#[derive(Debug, Clone, Copy)]
struct InFlight {
    seq: u64,
    direction: Direction,
    /// Set when the buffers were reset under the call; its result is dropped.
    superseded: bool,
}

/// Keeps the plaintext and ciphertext buffers consistent.
///
/// Each buffer has a last-reconciled snapshot. A debounced edit is only
/// reconciled when the buffer differs from its snapshot, and a write-back
/// updates the target's snapshot, so a reconciliation never triggers the
/// reverse one.
#[derive(Debug)]
pub struct SyncEngine {
    plaintext: String,
    ciphertext: String,
    last_changed: Option<Field>,
    plaintext_snapshot: String,
    ciphertext_snapshot: String,
    debounce: Duration,
    generation: u64,
    debounce_armed: bool,
    next_seq: u64,
    in_flight: Option<InFlight>,
}

impl SyncEngine {
    pub fn new(debounce: Duration) -> Self {
        Self {
            plaintext: String::new(),
            ciphertext: String::new(),
            last_changed: None,
            plaintext_snapshot: String::new(),
            ciphertext_snapshot: String::new(),
            debounce,
            generation: 0,
            debounce_armed: false,
            next_seq: 0,
            in_flight: None,
        }
    }

    pub fn plaintext(&self) -> &str {
        &self.plaintext
    }

    pub fn ciphertext(&self) -> &str {
        &self.ciphertext
    }

    pub fn buffer(&self, field: Field) -> &str {
        match field {
            Field::Plaintext => &self.plaintext,
            Field::Ciphertext => &self.ciphertext,
        }
    }

    pub fn last_changed(&self) -> Option<Field> {
        self.last_changed
    }

    /// True while a reconciliation call is outstanding.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// True when no timer is armed and no call is outstanding.
    pub fn is_settled(&self) -> bool {
        !self.debounce_armed && self.in_flight.is_none()
    }

    /// Record a user edit of `field`.
    ///
    /// Emptying a buffer clears the other one at once, with no backend call.
    /// Any other value (re)starts the debounce timer.
    pub fn edit(&mut self, field: Field, value: String) -> Vec<SyncAction> {
        self.last_changed = Some(field);

        if value.is_empty() {
            tracing::debug!(%field, "Buffer emptied, clearing the other side");
            *self.buffer_mut(field) = value;
            *self.buffer_mut(field.other()) = String::new();
            *self.snapshot_mut(field) = String::new();
            *self.snapshot_mut(field.other()) = String::new();
            self.supersede_in_flight();
            return self.cancel_debounce();
        }

        *self.buffer_mut(field) = value;
        vec![self.schedule_debounce()]
    }

    /// Replace the note with loaded `content` placed in `field`.
    ///
    /// The other buffer is emptied and both snapshots reset, then the load is
    /// handled as an ordinary edit so it reconciles after the debounce.
    pub fn load(&mut self, field: Field, content: String) -> Vec<SyncAction> {
        *self.buffer_mut(field.other()) = String::new();
        *self.snapshot_mut(field.other()) = String::new();
        *self.snapshot_mut(field) = String::new();
        self.supersede_in_flight();
        self.edit(field, content)
    }

    /// Empty both buffers and forget the last edit.
    pub fn clear(&mut self) -> Vec<SyncAction> {
        self.plaintext.clear();
        self.ciphertext.clear();
        self.plaintext_snapshot.clear();
        self.ciphertext_snapshot.clear();
        self.last_changed = None;
        self.supersede_in_flight();
        self.cancel_debounce()
    }

    /// Handle the debounce timer firing.
    ///
    /// `fragment_count` is the size of the key store at the moment of firing.
    pub fn debounce_elapsed(&mut self, generation: u64, fragment_count: usize) -> Vec<SyncAction> {
        if generation != self.generation || !self.debounce_armed {
            tracing::debug!(generation, current = self.generation, "Ignoring stale debounce");
            return Vec::new();
        }
        self.debounce_armed = false;

        if fragment_count == 0 {
            tracing::debug!("No key fragments, skipping reconciliation");
            return Vec::new();
        }

        let Some(field) = self.last_changed else {
            return Vec::new();
        };

        if self.buffer(field) == self.snapshot(field) {
            tracing::debug!(%field, "Buffer matches last reconciled value");
            return Vec::new();
        }

        if self.in_flight.is_some() {
            tracing::debug!(%field, "Reconciliation already in flight");
            return Vec::new();
        }

        let input = self.buffer(field).to_string();
        *self.snapshot_mut(field) = input.clone();

        if input.trim().is_empty() {
            tracing::debug!(%field, "Whitespace-only buffer, clearing the other side");
            *self.buffer_mut(field.other()) = String::new();
            *self.snapshot_mut(field.other()) = String::new();
            return Vec::new();
        }

        self.next_seq += 1;
        let direction = field.direction();
        self.in_flight = Some(InFlight {
            seq: self.next_seq,
            direction,
            superseded: false,
        });
        tracing::debug!(seq = self.next_seq, %direction, "Starting reconciliation");

        vec![SyncAction::Reconcile(ReconcileRequest {
            seq: self.next_seq,
            direction,
            input,
        })]
    }

    /// Apply the outcome of reconciliation `seq`.
    ///
    /// The result lands only if the user's last edit is still on the call's
    /// source field. Afterwards the timer is re-armed if the user kept typing
    /// while the call ran.
    pub fn reconcile_completed(&mut self, seq: u64, outcome: Result<String>) -> Vec<SyncAction> {
        let in_flight = match self.in_flight {
            Some(in_flight) if in_flight.seq == seq => in_flight,
            _ => {
                tracing::debug!(seq, "Discarding unknown reconciliation result");
                return Vec::new();
            }
        };
        self.in_flight = None;

        let source = in_flight.direction.source();
        let target = source.other();
        let mut actions = Vec::new();

        if in_flight.superseded {
            tracing::debug!(seq, "Buffers were reset during reconciliation, dropping result");
        } else if self.last_changed != Some(source) {
            tracing::debug!(seq, %source, "Other buffer edited during reconciliation, dropping result");
        } else {
            match outcome {
                Ok(output) => {
                    *self.snapshot_mut(target) = output.clone();
                    *self.buffer_mut(target) = output;
                }
                Err(err) => {
                    tracing::warn!(
                        seq,
                        direction = %in_flight.direction,
                        error = %err,
                        "Reconciliation failed"
                    );
                    actions.push(SyncAction::Diagnose(Diagnostic::ReconcileFailed {
                        direction: in_flight.direction,
                        message: err.to_string(),
                    }));
                }
            }
        }

        actions.extend(self.rearm_if_dirty());
        actions
    }

    /// Re-arm the debounce timer if the last-edited buffer has not been
    /// reconciled yet. Called after a reconciliation completes and after the
    /// key fragments change.
    pub fn rearm_if_dirty(&mut self) -> Vec<SyncAction> {
        if self.in_flight.is_some() || self.debounce_armed {
            return Vec::new();
        }
        match self.last_changed {
            Some(field) if self.buffer(field) != self.snapshot(field) => {
                vec![self.schedule_debounce()]
            }
            _ => Vec::new(),
        }
    }

    fn schedule_debounce(&mut self) -> SyncAction {
        self.generation += 1;
        self.debounce_armed = true;
        SyncAction::ScheduleDebounce {
            generation: self.generation,
            delay: self.debounce,
        }
    }

    fn cancel_debounce(&mut self) -> Vec<SyncAction> {
        self.generation += 1;
        if std::mem::take(&mut self.debounce_armed) {
            vec![SyncAction::CancelDebounce]
        } else {
            Vec::new()
        }
    }

    fn supersede_in_flight(&mut self) {
        if let Some(in_flight) = self.in_flight.as_mut() {
            in_flight.superseded = true;
        }
    }

    fn snapshot(&self, field: Field) -> &str {
        match field {
            Field::Plaintext => &self.plaintext_snapshot,
            Field::Ciphertext => &self.ciphertext_snapshot,
        }
    }

    fn buffer_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Plaintext => &mut self.plaintext,
            Field::Ciphertext => &mut self.ciphertext,
        }
    }

    fn snapshot_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Plaintext => &mut self.plaintext_snapshot,
            Field::Ciphertext => &mut self.ciphertext_snapshot,
        }
    }
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new(super::DEFAULT_DEBOUNCE)
    }
}
