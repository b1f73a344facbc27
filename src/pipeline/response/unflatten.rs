use serde_json::Value;
use tracing::{debug, warn};

use super::adapter::{self, JsonObject};
use super::TriageShape;
use crate::models::{fallback_next_steps, SoapNote, TriageResult};
use crate::pipeline::transport::TransportError;

/// Used when the service omits the ESI level.
pub const DEFAULT_ESI_LEVEL: u8 = 3;
const MIN_ESI_LEVEL: u8 = 1;
const MAX_ESI_LEVEL: u8 = 5;

const FOLLOW_UP_KEYS: &[&str] = &["follow_up_questions", "suggested_follow_up"];
const EXPLANATION_KEYS: &[&str] = &["patient_explanation", "patient_text"];

/// Inspect a triage body and report its layout.
pub fn detect_triage_shape(body: &JsonObject) -> TriageShape {
    if adapter::object(body, "clinical_json").is_some() {
        TriageShape::Nested
    } else {
        TriageShape::Flat
    }
}

/// Map a triage response of either layout onto [`TriageResult`].
///
/// Every field gets a value: missing text is `""`, missing lists are empty,
/// missing or empty next steps become the fallback pair, a missing ESI level
/// is 3 and out-of-range levels are clamped into 1–5.
pub fn unflatten_triage(body: &Value) -> Result<TriageResult, TransportError> {
    let root = as_object(body)?;
    let shape = detect_triage_shape(root);
    debug!(?shape, "Unflattening triage response");

    // Clinical fields live under `clinical_json` in the nested layout and
    // at the top level in the flat one. The explanation is always top level.
    let clinical = match shape {
        TriageShape::Nested => adapter::object(root, "clinical_json").unwrap_or(root),
        TriageShape::Flat => root,
    };

    let esi_level = esi_level(adapter::number(clinical, &["esi_level"]));
    let confidence = match shape {
        TriageShape::Nested => adapter::number(clinical, &["confidence_score"]),
        TriageShape::Flat => adapter::number(clinical, &["confidence", "confidence_score"]),
    }
    .unwrap_or(0.0);
    let red_flags = match shape {
        TriageShape::Nested => adapter::string_list(clinical, &["red_flag_conditions"]),
        TriageShape::Flat => adapter::string_list(clinical, &["red_flags", "red_flag_conditions"]),
    };

    let mut recommended_next_steps = adapter::string_list(clinical, &["recommended_next_steps"]);
    if recommended_next_steps.is_empty() {
        recommended_next_steps = fallback_next_steps();
    }

    Ok(TriageResult {
        esi_level,
        confidence,
        reasoning: adapter::string(clinical, &["reasoning"]),
        red_flags,
        follow_up_questions: adapter::string_list(clinical, FOLLOW_UP_KEYS),
        patient_explanation: adapter::string(root, EXPLANATION_KEYS),
        recommended_next_steps,
    })
}

/// Map a note response onto [`SoapNote`], unwrapping the `json` envelope
/// when present.
pub fn unflatten_note(body: &Value) -> Result<SoapNote, TransportError> {
    let root = as_object(body)?;
    let note = match adapter::object(root, "json") {
        Some(inner) if !root.contains_key("soap_note") => {
            debug!("Unwrapping note envelope");
            inner
        }
        _ => root,
    };

    let empty = JsonObject::new();
    let soap = adapter::object(note, "soap_note").unwrap_or_else(|| {
        warn!("Note response has no soap_note object");
        &empty
    });

    let mut handoff = adapter::string(note, &["handoff", "patient_handout"]);
    if handoff.is_empty() && !std::ptr::eq(note, root) {
        handoff = adapter::string(root, &["patient_handout"]);
    }

    Ok(SoapNote {
        subjective: adapter::string(soap, &["subjective"]),
        objective: adapter::string(soap, &["objective"]),
        assessment: adapter::string(soap, &["assessment"]),
        plan: adapter::string(soap, &["plan"]),
        icd10: adapter::string_list(note, &["icd10"]),
        cpt: adapter::string_list(note, &["cpt"]),
        handoff,
    })
}

fn as_object(body: &Value) -> Result<&JsonObject, TransportError> {
    body.as_object().ok_or_else(|| {
        TransportError::MalformedResponse("Response body is not a JSON object".into())
    })
}

fn esi_level(raw: Option<f64>) -> u8 {
    let Some(raw) = raw.filter(|v| v.is_finite()) else {
        return DEFAULT_ESI_LEVEL;
    };
    let rounded = raw.round();
    if rounded < f64::from(MIN_ESI_LEVEL) || rounded > f64::from(MAX_ESI_LEVEL) {
        warn!(esi_level = raw, "ESI level out of range, clamped");
    }
    rounded.clamp(f64::from(MIN_ESI_LEVEL), f64::from(MAX_ESI_LEVEL)) as u8
}
