use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{InferenceClient, TransportError};
use crate::pipeline::request::{NotePayload, TriagePayload};

/// Mock inference client for testing.
/// Returns a configurable response, optionally after a delay, and records
/// every payload it receives.
pub struct MockInferenceClient {
    response: Mutex<Result<Value, TransportError>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    triage_payloads: Mutex<Vec<TriagePayload>>,
    note_payloads: Mutex<Vec<NotePayload>>,
}

impl MockInferenceClient {
    pub fn new(response: Value) -> Self {
        Self::with_result(Ok(response))
    }

    pub fn failing(error: TransportError) -> Self {
        Self::with_result(Err(error))
    }

    fn with_result(result: Result<Value, TransportError>) -> Self {
        Self {
            response: Mutex::new(result),
            delay: None,
            calls: AtomicUsize::new(0),
            triage_payloads: Mutex::new(Vec::new()),
            note_payloads: Mutex::new(Vec::new()),
        }
    }

    /// Hold every call for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Change what subsequent calls return.
    pub fn set_response(&self, result: Result<Value, TransportError>) {
        if let Ok(mut guard) = self.response.lock() {
            *guard = result;
        }
    }

    /// Number of calls across all methods, health probes included.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn triage_payloads(&self) -> Vec<TriagePayload> {
        self.triage_payloads
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    pub fn note_payloads(&self) -> Vec<NotePayload> {
        self.note_payloads
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    async fn respond(&self) -> Result<Value, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.response
            .lock()
            .map_err(|_| TransportError::ServiceUnavailable("mock lock poisoned".into()))?
            .clone()
    }
}

#[async_trait]
impl InferenceClient for MockInferenceClient {
    async fn triage(&self, payload: &TriagePayload) -> Result<Value, TransportError> {
        if let Ok(mut payloads) = self.triage_payloads.lock() {
            payloads.push(payload.clone());
        }
        self.respond().await
    }

    async fn generate_note(&self, payload: &NotePayload) -> Result<Value, TransportError> {
        if let Ok(mut payloads) = self.note_payloads.lock() {
            payloads.push(payload.clone());
        }
        self.respond().await
    }

    async fn health(&self) -> Result<(), TransportError> {
        self.respond().await.map(|_| ())
    }
}
