pub mod cancel;
pub mod http;
pub mod mock;

pub use cancel::*;
pub use http::*;
pub use mock::*;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::pipeline::request::{NotePayload, TriagePayload};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Inference service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Inference service error ({status}): {detail}")]
    ServiceError { status: u16, detail: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request cancelled")]
    Cancelled,
}

/// The external inference service. One outbound call per method invocation;
/// failures are returned as-is, never retried.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Submit a triage payload and return the decoded response body.
    async fn triage(&self, payload: &TriagePayload) -> Result<Value, TransportError>;

    /// Submit a note payload and return the decoded response body.
    async fn generate_note(&self, payload: &NotePayload) -> Result<Value, TransportError>;

    /// `Ok` when the service answers its health probe with any 2xx.
    async fn health(&self) -> Result<(), TransportError>;
}
