#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use shhare_core::{CryptoBackend, Result, Session, SessionConfig, SessionHandle, ShhareError};

pub const A: &str = "aaaaaaaaaaaa";
pub const B: &str = "bbbbbbbbbbbb";
pub const C: &str = "cccccccccccc";

/// Deterministic backend with scripted latency and call counters.
///
/// - derive: fragments joined with `+`
/// - encrypt: `enc:` followed by the reversed input
/// - decrypt: the inverse, failing on anything without the prefix
#[derive(Default)]
pub struct ScriptedBackend {
    pub derive_calls: AtomicUsize,
    pub encrypt_calls: AtomicUsize,
    pub decrypt_calls: AtomicUsize,
    derive_delays: Mutex<VecDeque<Duration>>,
    reconcile_delays: Mutex<VecDeque<Duration>>,
    encrypt_inputs: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue latencies for upcoming derive calls, in call order.
    pub fn delay_derives(&self, delays: &[u64]) {
        let mut queue = self.derive_delays.lock().unwrap();
        queue.extend(delays.iter().map(|ms| Duration::from_millis(*ms)));
    }

    /// Queue latencies for upcoming encrypt/decrypt calls, in call order.
    pub fn delay_reconciles(&self, delays: &[u64]) {
        let mut queue = self.reconcile_delays.lock().unwrap();
        queue.extend(delays.iter().map(|ms| Duration::from_millis(*ms)));
    }

    pub fn derives(&self) -> usize {
        self.derive_calls.load(Ordering::SeqCst)
    }

    pub fn encrypts(&self) -> usize {
        self.encrypt_calls.load(Ordering::SeqCst)
    }

    pub fn decrypts(&self) -> usize {
        self.decrypt_calls.load(Ordering::SeqCst)
    }

    pub fn encrypt_inputs(&self) -> Vec<String> {
        self.encrypt_inputs.lock().unwrap().clone()
    }

    async fn wait(queue: &Mutex<VecDeque<Duration>>) {
        let delay = queue.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

pub fn seal(plaintext: &str) -> String {
    format!("enc:{}", plaintext.chars().rev().collect::<String>())
}

#[async_trait]
impl CryptoBackend for ScriptedBackend {
    async fn derive_key(&self, fragments: &[String]) -> Result<String> {
        self.derive_calls.fetch_add(1, Ordering::SeqCst);
        Self::wait(&self.derive_delays).await;
        if fragments.len() < 2 {
            return Err(ShhareError::Derivation("need two".to_string()));
        }
        Ok(fragments.join("+"))
    }

    async fn encrypt(&self, plaintext: &str, _fragments: &[String]) -> Result<String> {
        self.encrypt_calls.fetch_add(1, Ordering::SeqCst);
        self.encrypt_inputs.lock().unwrap().push(plaintext.to_string());
        Self::wait(&self.reconcile_delays).await;
        Ok(seal(plaintext))
    }

    async fn decrypt(&self, ciphertext: &str, _fragments: &[String]) -> Result<String> {
        self.decrypt_calls.fetch_add(1, Ordering::SeqCst);
        Self::wait(&self.reconcile_delays).await;
        ciphertext
            .strip_prefix("enc:")
            .map(|body| body.chars().rev().collect())
            .ok_or_else(|| ShhareError::Decryption("missing prefix".to_string()))
    }

    async fn generate_shares(
        &self,
        count: usize,
        threshold: usize,
        _byte_length: usize,
    ) -> Result<Vec<String>> {
        if threshold > count {
            return Err(ShhareError::Generation(
                "Threshold cannot be greater than key count".to_string(),
            ));
        }
        Ok((0..count).map(|i| format!("{:064x}", i + 1)).collect())
    }
}

pub fn spawn(backend: Arc<ScriptedBackend>) -> SessionHandle {
    Session::spawn(backend, SessionConfig::default())
}

pub async fn spawn_with_keys(backend: Arc<ScriptedBackend>, keys: &[&str]) -> SessionHandle {
    let session = spawn(backend);
    for key in keys {
        session.add_fragment(*key).await.unwrap();
    }
    session.settled().await.unwrap();
    session
}
