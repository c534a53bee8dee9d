//! The session event loop.
//!
//! A [`Session`] owns the [`KeyStore`], [`DerivedKeyCache`] and
//! [`SyncEngine`] and is the only place their state changes. Callers talk to
//! it through a cloneable [`SessionHandle`]; backend calls and the debounce
//! timer run as separate tasks that post completions back to the loop.
//!
//! ```text
//!  SessionHandle ──commands──┐
//!                            ▼
//!                     ┌─────────────┐──spawn──▶ backend call ─┐
//!                     │   Session   │                         │
//!                     │    loop     │──spawn──▶ debounce ─────┤
//!                     └──────┬──────┘                         │
//!                            ▲──────────────events────────────┘
//!                            │
//!              watch: SessionSnapshot / broadcast: Diagnostic
//! ```

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::backend::CryptoBackend;
use crate::derived::{DeriveRequest, DerivedKey, DerivedKeyCache};
use crate::diagnostics::Diagnostic;
use crate::error::{Result, ShhareError};
use crate::keys::{parse_fragment_input, KeyFragment, KeyStore};
use crate::sync::{
    classify_note, Direction, Field, ReconcileRequest, SyncAction, SyncEngine, DEFAULT_DEBOUNCE,
};

const COMMAND_BUFFER: usize = 64;
const DIAGNOSTIC_BUFFER: usize = 32;

/// Tunables for a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Quiet period after the last edit before a buffer is reconciled
    pub debounce: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// Point-in-time view of session state, published after every change.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSnapshot {
    pub fragments: Vec<KeyFragment>,
    /// Key store change counter
    pub revision: u64,
    pub derived_key: DerivedKey,
    pub plaintext: String,
    pub ciphertext: String,
    pub last_changed: Option<Field>,
    /// True while a reconciliation call is outstanding
    pub busy: bool,
}

impl SessionSnapshot {
    pub fn buffer(&self, field: Field) -> &str {
        match field {
            Field::Plaintext => &self.plaintext,
            Field::Ciphertext => &self.ciphertext,
        }
    }
}

/// Outcome of importing a batch of key lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub added: usize,
    pub skipped: usize,
}

enum Command {
    AddFragment {
        candidate: String,
        reply: oneshot::Sender<Result<KeyFragment>>,
    },
    RemoveFragment {
        index: usize,
        reply: oneshot::Sender<Result<KeyFragment>>,
    },
    ReplaceFragments {
        fragments: Vec<String>,
        reply: oneshot::Sender<Result<()>>,
    },
    ClearFragments {
        reply: oneshot::Sender<usize>,
    },
    GenerateFragments {
        count: usize,
        threshold: usize,
        byte_length: usize,
        reply: oneshot::Sender<Result<Vec<String>>>,
    },
    ImportFragments {
        lines: Vec<String>,
        reply: oneshot::Sender<ImportReport>,
    },
    RefreshKey {
        reply: oneshot::Sender<()>,
    },
    PreviewKey {
        reply: oneshot::Sender<Result<String>>,
    },
    Edit {
        field: Field,
        value: String,
        reply: oneshot::Sender<()>,
    },
    LoadNote {
        content: String,
        reply: oneshot::Sender<Field>,
    },
    ClearNote {
        reply: oneshot::Sender<()>,
    },
    Settled {
        reply: oneshot::Sender<()>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

enum Event {
    DebounceElapsed {
        generation: u64,
    },
    DeriveCompleted {
        seq: u64,
        outcome: Result<String>,
    },
    ReconcileCompleted {
        seq: u64,
        outcome: Result<String>,
    },
    SharesGenerated {
        outcome: Result<Vec<String>>,
        reply: oneshot::Sender<Result<Vec<String>>>,
    },
}

/// Cloneable handle to a running [`Session`].
///
/// The session stops when [`shutdown`](Self::shutdown) is called or every
/// handle has been dropped.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
    diagnostics: broadcast::Sender<Diagnostic>,
}

impl SessionHandle {
    /// Validate and append a key fragment.
    ///
    /// # Errors
    ///
    /// [`ShhareError::Validation`] if the fragment is empty, shorter than
    /// 12 characters or already held.
    pub async fn add_fragment(&self, candidate: impl Into<String>) -> Result<KeyFragment> {
        let candidate = candidate.into();
        self.request(|reply| Command::AddFragment { candidate, reply })
            .await?
    }

    /// Remove the fragment at `index`.
    ///
    /// # Errors
    ///
    /// [`ShhareError::Index`] if `index` is out of bounds.
    pub async fn remove_fragment(&self, index: usize) -> Result<KeyFragment> {
        self.request(|reply| Command::RemoveFragment { index, reply })
            .await?
    }

    /// Replace every fragment at once. Rejects sets with repeated fragments.
    pub async fn replace_fragments<I, S>(&self, fragments: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fragments = fragments.into_iter().map(Into::into).collect();
        self.request(|reply| Command::ReplaceFragments { fragments, reply })
            .await?
    }

    /// Remove every fragment, returning how many were held. The derived key
    /// becomes unavailable at once.
    pub async fn clear_fragments(&self) -> Result<usize> {
        self.request(|reply| Command::ClearFragments { reply }).await
    }

    /// Generate a fresh share set with the backend and make it the session's
    /// fragments. Returns the new fragments.
    ///
    /// # Errors
    ///
    /// [`ShhareError::Generation`] if the parameters are rejected.
    pub async fn generate_fragments(
        &self,
        count: usize,
        threshold: usize,
        byte_length: usize,
    ) -> Result<Vec<String>> {
        self.request(|reply| Command::GenerateFragments {
            count,
            threshold,
            byte_length,
            reply,
        })
        .await?
    }

    /// Add each non-blank line as a fragment, skipping lines that fail to
    /// parse or validate.
    pub async fn import_fragments<I, S>(&self, lines: I) -> Result<ImportReport>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines = lines.into_iter().map(Into::into).collect();
        self.request(|reply| Command::ImportFragments { lines, reply })
            .await
    }

    /// Recompute the derived key in the background.
    pub async fn refresh_key(&self) -> Result<()> {
        self.request(|reply| Command::RefreshKey { reply }).await
    }

    /// Derive the key from the current fragments and return it.
    ///
    /// Unlike the background recomputation, failures are returned.
    ///
    /// # Errors
    ///
    /// [`ShhareError::InvalidInput`] if no fragments are held, or the
    /// backend's [`ShhareError::Derivation`] error.
    ///
    /// # Security
    ///
    /// The returned string is the raw key.
    pub async fn preview_key(&self) -> Result<String> {
        self.request(|reply| Command::PreviewKey { reply }).await?
    }

    pub async fn edit_plaintext(&self, value: impl Into<String>) -> Result<()> {
        self.edit(Field::Plaintext, value.into()).await
    }

    pub async fn edit_ciphertext(&self, value: impl Into<String>) -> Result<()> {
        self.edit(Field::Ciphertext, value.into()).await
    }

    /// Load note content, placing it in whichever buffer it looks like it
    /// belongs to. Returns that buffer.
    pub async fn load_note(&self, content: impl Into<String>) -> Result<Field> {
        let content = content.into();
        self.request(|reply| Command::LoadNote { content, reply })
            .await
    }

    /// Empty both buffers.
    pub async fn clear_note(&self) -> Result<()> {
        self.request(|reply| Command::ClearNote { reply }).await
    }

    /// The latest published state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Watch published state.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Receive background failures published from now on.
    pub fn subscribe_diagnostics(&self) -> broadcast::Receiver<Diagnostic> {
        self.diagnostics.subscribe()
    }

    /// Wait until no debounce, derivation, reconciliation or generation work
    /// is outstanding.
    pub async fn settled(&self) -> Result<()> {
        self.request(|reply| Command::Settled { reply }).await
    }

    /// Stop the session loop.
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    async fn edit(&self, field: Field, value: String) -> Result<()> {
        self.request(|reply| Command::Edit {
            field,
            value,
            reply,
        })
        .await
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| ShhareError::SessionClosed)?;
        response.await.map_err(|_| ShhareError::SessionClosed)
    }
}

/// The session state owner. Construct with [`Session::spawn`].
pub struct Session {
    backend: Arc<dyn CryptoBackend>,
    store: KeyStore,
    cache: DerivedKeyCache,
    engine: SyncEngine,
    /// Running timer and the generation it will report
    debounce_task: Option<(u64, JoinHandle<()>)>,
    generating: usize,
    settled_waiters: Vec<oneshot::Sender<()>>,
    events: mpsc::UnboundedSender<Event>,
    snapshots: watch::Sender<SessionSnapshot>,
    diagnostics: broadcast::Sender<Diagnostic>,
}

impl Session {
    /// Start a session on the current tokio runtime.
    pub fn spawn(backend: Arc<dyn CryptoBackend>, config: SessionConfig) -> SessionHandle {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::default());
        let (diagnostic_tx, _) = broadcast::channel(DIAGNOSTIC_BUFFER);

        let session = Session {
            backend,
            store: KeyStore::new(),
            cache: DerivedKeyCache::new(),
            engine: SyncEngine::new(config.debounce),
            debounce_task: None,
            generating: 0,
            settled_waiters: Vec::new(),
            events: event_tx,
            snapshots: snapshot_tx,
            diagnostics: diagnostic_tx.clone(),
        };

        info!(debounce_ms = config.debounce.as_millis() as u64, "Session started");
        tokio::spawn(session.run(command_rx, event_rx));

        SessionHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
            diagnostics: diagnostic_tx,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut events: mpsc::UnboundedReceiver<Event>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => {
                        if self.handle_command(command).is_break() {
                            break;
                        }
                    }
                    None => {
                        debug!("All session handles dropped");
                        break;
                    }
                },
                Some(event) = events.recv() => self.handle_event(event),
            }
            self.notify_settled();
        }

        self.stop_debounce();
        info!("Session stopped");
    }

    fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::AddFragment { candidate, reply } => {
                let result = self.store.add(&candidate).cloned();
                if result.is_ok() {
                    self.fragments_changed();
                }
                self.publish();
                let _ = reply.send(result);
            }
            Command::RemoveFragment { index, reply } => {
                let result = self.store.remove(index);
                if result.is_ok() {
                    self.fragments_changed();
                }
                self.publish();
                let _ = reply.send(result);
            }
            Command::ReplaceFragments { fragments, reply } => {
                let result = self.store.replace_all(&fragments);
                if result.is_ok() {
                    self.fragments_changed();
                }
                self.publish();
                let _ = reply.send(result);
            }
            Command::ClearFragments { reply } => {
                let removed = self.store.clear();
                debug!(removed, "Cleared key fragments");
                self.fragments_changed();
                self.publish();
                let _ = reply.send(removed);
            }
            Command::GenerateFragments {
                count,
                threshold,
                byte_length,
                reply,
            } => {
                self.generating += 1;
                let backend = Arc::clone(&self.backend);
                let events = self.events.clone();
                tokio::spawn(async move {
                    let outcome = backend.generate_shares(count, threshold, byte_length).await;
                    let _ = events.send(Event::SharesGenerated { outcome, reply });
                });
            }
            Command::ImportFragments { lines, reply } => {
                let report = self.import(&lines);
                if report.added > 0 {
                    self.fragments_changed();
                }
                self.publish();
                let _ = reply.send(report);
            }
            Command::RefreshKey { reply } => {
                self.recompute_key();
                self.publish();
                let _ = reply.send(());
            }
            Command::PreviewKey { reply } => {
                if self.store.is_empty() {
                    let _ = reply.send(Err(ShhareError::InvalidInput(
                        "No keys available".to_string(),
                    )));
                    return ControlFlow::Continue(());
                }
                let backend = Arc::clone(&self.backend);
                let fragments = self.store.to_strings();
                tokio::spawn(async move {
                    let _ = reply.send(backend.derive_key(&fragments).await);
                });
            }
            Command::Edit {
                field,
                value,
                reply,
            } => {
                let actions = self.engine.edit(field, value);
                self.apply(actions);
                self.publish();
                let _ = reply.send(());
            }
            Command::LoadNote { content, reply } => {
                let field = classify_note(&content);
                debug!(%field, "Loading note");
                let actions = self.engine.load(field, content);
                self.apply(actions);
                self.publish();
                let _ = reply.send(field);
            }
            Command::ClearNote { reply } => {
                let actions = self.engine.clear();
                self.apply(actions);
                self.publish();
                let _ = reply.send(());
            }
            Command::Settled { reply } => self.settled_waiters.push(reply),
            Command::Shutdown { reply } => {
                let _ = reply.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::DebounceElapsed { generation } => {
                if matches!(self.debounce_task, Some((armed, _)) if armed == generation) {
                    self.debounce_task = None;
                }
                let actions = self.engine.debounce_elapsed(generation, self.store.len());
                self.apply(actions);
            }
            Event::DeriveCompleted { seq, outcome } => {
                let failure = outcome.as_ref().err().map(ToString::to_string);
                if self.cache.complete(seq, outcome) {
                    if let Some(message) = failure {
                        self.diagnose(Diagnostic::DerivationFailed { message });
                    }
                }
            }
            Event::ReconcileCompleted { seq, outcome } => {
                let actions = self.engine.reconcile_completed(seq, outcome);
                self.apply(actions);
            }
            Event::SharesGenerated { outcome, reply } => {
                self.generating = self.generating.saturating_sub(1);
                let result = outcome.and_then(|fragments| {
                    self.store.replace_all(&fragments)?;
                    Ok(fragments)
                });
                match &result {
                    Ok(fragments) => {
                        info!(count = fragments.len(), "Generated new key fragments");
                        self.fragments_changed();
                    }
                    Err(err) => debug!(error = %err, "Key generation failed"),
                }
                self.publish();
                let _ = reply.send(result);
                return;
            }
        }
        self.publish();
    }

    fn import(&mut self, lines: &[String]) -> ImportReport {
        let mut report = ImportReport::default();
        for (number, line) in lines.iter().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match parse_fragment_input(line).and_then(|hex| self.store.add(&hex).map(|_| ())) {
                Ok(()) => report.added += 1,
                Err(err) => {
                    debug!(line = number + 1, error = %err, "Skipping invalid key");
                    report.skipped += 1;
                }
            }
        }
        report
    }

    /// Key store membership changed: recompute the key and pick up any edit
    /// that was waiting for keys.
    fn fragments_changed(&mut self) {
        self.recompute_key();
        let actions = self.engine.rearm_if_dirty();
        self.apply(actions);
    }

    fn recompute_key(&mut self) {
        if let Some(request) = self.cache.recompute(self.store.fragments()) {
            self.spawn_derive(request);
        }
    }

    fn spawn_derive(&self, request: DeriveRequest) {
        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = backend.derive_key(&request.fragments).await;
            let _ = events.send(Event::DeriveCompleted {
                seq: request.seq,
                outcome,
            });
        });
    }

    fn spawn_reconcile(&self, request: ReconcileRequest) {
        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();
        let fragments = self.store.to_strings();
        tokio::spawn(async move {
            let outcome = match request.direction {
                Direction::Encrypt => backend.encrypt(&request.input, &fragments).await,
                Direction::Decrypt => backend.decrypt(&request.input, &fragments).await,
            };
            let _ = events.send(Event::ReconcileCompleted {
                seq: request.seq,
                outcome,
            });
        });
    }

    fn apply(&mut self, actions: Vec<SyncAction>) {
        for action in actions {
            match action {
                SyncAction::ScheduleDebounce { generation, delay } => {
                    self.stop_debounce();
                    let events = self.events.clone();
                    let task = tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = events.send(Event::DebounceElapsed { generation });
                    });
                    self.debounce_task = Some((generation, task));
                }
                SyncAction::CancelDebounce => self.stop_debounce(),
                SyncAction::Reconcile(request) => self.spawn_reconcile(request),
                SyncAction::Diagnose(diagnostic) => self.diagnose(diagnostic),
            }
        }
    }

    fn stop_debounce(&mut self) {
        if let Some((_, task)) = self.debounce_task.take() {
            task.abort();
        }
    }

    fn diagnose(&self, diagnostic: Diagnostic) {
        // No subscribers is fine
        let _ = self.diagnostics.send(diagnostic);
    }

    fn is_settled(&self) -> bool {
        self.engine.is_settled() && !self.cache.is_pending() && self.generating == 0
    }

    fn notify_settled(&mut self) {
        if self.settled_waiters.is_empty() || !self.is_settled() {
            return;
        }
        for waiter in self.settled_waiters.drain(..) {
            let _ = waiter.send(());
        }
    }

    fn publish(&self) {
        let snapshot = SessionSnapshot {
            fragments: self.store.fragments().to_vec(),
            revision: self.store.revision(),
            derived_key: self.cache.current().clone(),
            plaintext: self.engine.plaintext().to_string(),
            ciphertext: self.engine.ciphertext().to_string(),
            last_changed: self.engine.last_changed(),
            busy: self.engine.is_busy(),
        };
        self.snapshots.send_replace(snapshot);
    }
}
