//! Triage and note panels: the submission flow behind each dashboard card.
//!
//! A panel owns its inference client (built when the panel is mounted and
//! dropped with it), allows one request in flight at a time, and keeps the
//! last good result on screen when a later submission fails.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{error, info, warn};

use crate::config::ServiceConfig;
use crate::models::{SoapNote, TriageResult};
use crate::pipeline::imaging::{ImageNormalizer, JpegNormalizer};
use crate::pipeline::request::{
    assemble_note, NoteEndpoint, NoteRequest, RequestAssembler, TriageEndpoint, TriageForm,
};
use crate::pipeline::response::{unflatten_note, unflatten_triage};
use crate::pipeline::transport::{
    cancellable, CancelToken, HttpInferenceClient, InferenceClient, TransportError,
};
use crate::pipeline::SubmissionError;

// ═══════════════════════════════════════════════════════════
// Shared panel state
// ═══════════════════════════════════════════════════════════

/// What a panel currently displays.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelState<T> {
    pub result: Option<T>,
    /// Inline, dismissable error from the last submission.
    pub error: Option<String>,
}

impl<T> Default for PanelState<T> {
    fn default() -> Self {
        Self {
            result: None,
            error: None,
        }
    }
}

/// RAII in-flight marker. Dropping it reopens the panel for submissions.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Display state plus the single-flight gate, shared by both panels.
struct PanelCore<T> {
    name: &'static str,
    state: Mutex<PanelState<T>>,
    in_flight: AtomicBool,
}

impl<T: Clone> PanelCore<T> {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(PanelState::default()),
            in_flight: AtomicBool::new(false),
        }
    }

    fn try_begin(&self) -> Option<InFlightGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(InFlightGuard {
            flag: &self.in_flight,
        })
    }

    /// Run one submission. A busy panel rejects it without touching the
    /// display; otherwise the outcome replaces the result or sets the error.
    async fn run<F>(&self, submission: F) -> Result<T, SubmissionError>
    where
        F: Future<Output = Result<T, SubmissionError>>,
    {
        let Some(_guard) = self.try_begin() else {
            info!(panel = self.name, "Submission rejected, request already in flight");
            return Err(SubmissionError::Busy);
        };

        let outcome = submission.await;
        self.record(&outcome);
        outcome
    }

    /// Display state, recovered if a previous holder panicked.
    fn lock_state(&self) -> MutexGuard<'_, PanelState<T>> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!(panel = self.name, "Panel state lock poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    fn record(&self, outcome: &Result<T, SubmissionError>) {
        let mut state = self.lock_state();
        match outcome {
            Ok(value) => {
                state.result = Some(value.clone());
                state.error = None;
            }
            Err(e) => {
                error!(panel = self.name, error = %e, "Submission failed");
                state.error = Some(e.to_string());
            }
        }
    }

    fn snapshot(&self) -> PanelState<T> {
        self.lock_state().clone()
    }

    fn dismiss_error(&self) {
        self.lock_state().error = None;
    }

    fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

// ═══════════════════════════════════════════════════════════
// TriagePanel
// ═══════════════════════════════════════════════════════════

pub struct TriagePanel {
    client: Arc<dyn InferenceClient>,
    assembler: RequestAssembler,
    endpoint: TriageEndpoint,
    core: PanelCore<TriageResult>,
}

impl TriagePanel {
    pub fn new(
        client: Arc<dyn InferenceClient>,
        normalizer: Arc<dyn ImageNormalizer>,
        endpoint: TriageEndpoint,
    ) -> Self {
        Self {
            client,
            assembler: RequestAssembler::new(normalizer),
            endpoint,
            core: PanelCore::new("triage"),
        }
    }

    /// Production panel: HTTP client from `config`, default JPEG settings,
    /// multipart endpoint.
    pub fn mount(config: &ServiceConfig) -> Result<Self, TransportError> {
        let client = HttpInferenceClient::new(config)?;
        info!(base_url = %config.base_url, "Triage panel mounted");
        Ok(Self::new(
            Arc::new(client),
            Arc::new(JpegNormalizer::default()),
            TriageEndpoint::default(),
        ))
    }

    /// Validate, normalize, send, and unflatten one triage submission.
    ///
    /// Validation and image failures return before any network call.
    pub async fn submit(
        &self,
        form: TriageForm,
        cancel: Option<CancelToken>,
    ) -> Result<TriageResult, SubmissionError> {
        self.core
            .run(async {
                let payload = self.assembler.assemble_triage(form, self.endpoint).await?;
                let body = cancellable(self.client.triage(&payload), cancel).await?;
                let result = unflatten_triage(&body)?;
                info!(
                    esi_level = result.esi_level,
                    red_flags = result.red_flags.len(),
                    "Triage result received"
                );
                Ok::<_, SubmissionError>(result)
            })
            .await
    }

    pub fn endpoint(&self) -> TriageEndpoint {
        self.endpoint
    }

    pub fn state(&self) -> PanelState<TriageResult> {
        self.core.snapshot()
    }

    pub fn result(&self) -> Option<TriageResult> {
        self.core.snapshot().result
    }

    pub fn error(&self) -> Option<String> {
        self.core.snapshot().error
    }

    pub fn dismiss_error(&self) {
        self.core.dismiss_error();
    }

    pub fn is_busy(&self) -> bool {
        self.core.is_busy()
    }
}

// ═══════════════════════════════════════════════════════════
// NotePanel
// ═══════════════════════════════════════════════════════════

pub struct NotePanel {
    client: Arc<dyn InferenceClient>,
    endpoint: NoteEndpoint,
    core: PanelCore<SoapNote>,
}

impl NotePanel {
    pub fn new(client: Arc<dyn InferenceClient>, endpoint: NoteEndpoint) -> Self {
        Self {
            client,
            endpoint,
            core: PanelCore::new("note"),
        }
    }

    pub fn mount(config: &ServiceConfig) -> Result<Self, TransportError> {
        let client = HttpInferenceClient::new(config)?;
        info!(base_url = %config.base_url, "Note panel mounted");
        Ok(Self::new(Arc::new(client), NoteEndpoint::default()))
    }

    pub async fn submit(
        &self,
        request: NoteRequest,
        cancel: Option<CancelToken>,
    ) -> Result<SoapNote, SubmissionError> {
        self.core
            .run(async {
                let payload = assemble_note(request, self.endpoint)?;
                let body = cancellable(self.client.generate_note(&payload), cancel).await?;
                let note = unflatten_note(&body)?;
                let issues = note.completeness_issues();
                if !issues.is_empty() {
                    info!(issues = issues.len(), "Generated note has incomplete sections");
                }
                Ok::<_, SubmissionError>(note)
            })
            .await
    }

    pub fn endpoint(&self) -> NoteEndpoint {
        self.endpoint
    }

    pub fn state(&self) -> PanelState<SoapNote> {
        self.core.snapshot()
    }

    pub fn result(&self) -> Option<SoapNote> {
        self.core.snapshot().result
    }

    pub fn error(&self) -> Option<String> {
        self.core.snapshot().error
    }

    pub fn dismiss_error(&self) {
        self.core.dismiss_error();
    }

    pub fn is_busy(&self) -> bool {
        self.core.is_busy()
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
