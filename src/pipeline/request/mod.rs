pub mod assembler;

pub use assembler::*;

use serde::Serialize;
use thiserror::Error;

use crate::models::VitalsForm;
use crate::pipeline::imaging::{EncounterImage, RawUpload};

/// Default `encounter_type` sent with note requests.
pub const DEFAULT_ENCOUNTER_TYPE: &str = "Emergency";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Chief complaint is required")]
    EmptyChiefComplaint,

    #[error("Encounter text is required")]
    EmptyEncounterText,
}

/// What the triage panel collects before submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriageForm {
    pub chief_complaint: String,
    pub vitals: VitalsForm,
    pub image: Option<RawUpload>,
}

impl TriageForm {
    pub fn new(chief_complaint: &str) -> Self {
        Self {
            chief_complaint: chief_complaint.to_string(),
            ..Self::default()
        }
    }

    pub fn with_vitals(mut self, vitals: VitalsForm) -> Self {
        self.vitals = vitals;
        self
    }

    pub fn with_image(mut self, image: RawUpload) -> Self {
        self.image = Some(image);
        self
    }
}

/// Triage routes exposed by the inference service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriageEndpoint {
    /// `POST /triage/multimodal`, multipart form, nested response.
    #[default]
    Multimodal,
    /// `POST /api/triage`, JSON body, flat response.
    Api,
}

impl TriageEndpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Multimodal => "/triage/multimodal",
            Self::Api => "/api/triage",
        }
    }
}

/// Note-generation routes exposed by the inference service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoteEndpoint {
    /// `POST /document/soap?notes=...`
    #[default]
    DocumentSoap,
    /// `POST /api/generate-note` with a JSON body.
    GenerateNote,
}

impl NoteEndpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Self::DocumentSoap => "/document/soap",
            Self::GenerateNote => "/api/generate-note",
        }
    }
}

/// Vitals block of the JSON triage body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonVitals {
    pub hr: u32,
    pub bp_sys: u32,
    pub bp_dia: u32,
    pub spo2: u32,
    pub temp: f64,
    pub rr: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonTriageBody {
    pub chief_complaint: String,
    pub vitals: JsonVitals,
    /// Normalized image as a `data:image/jpeg;base64,...` URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
}

/// A triage request ready for the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum TriagePayload {
    Multipart {
        /// Text parts in transmission order.
        fields: Vec<(&'static str, String)>,
        image: Option<EncounterImage>,
    },
    Json(JsonTriageBody),
}

impl TriagePayload {
    pub fn endpoint(&self) -> TriageEndpoint {
        match self {
            Self::Multipart { .. } => TriageEndpoint::Multimodal,
            Self::Json(_) => TriageEndpoint::Api,
        }
    }

    /// Value of a multipart text field, if this is a multipart payload.
    pub fn field(&self, name: &str) -> Option<&str> {
        match self {
            Self::Multipart { fields, .. } => fields
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.as_str()),
            Self::Json(_) => None,
        }
    }
}

/// Free-text encounter to be turned into a SOAP note.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteRequest {
    pub encounter_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_context: Option<String>,
    pub encounter_type: String,
}

impl NoteRequest {
    pub fn new(encounter_text: &str) -> Self {
        Self {
            encounter_text: encounter_text.to_string(),
            patient_context: None,
            encounter_type: DEFAULT_ENCOUNTER_TYPE.to_string(),
        }
    }

    pub fn with_patient_context(mut self, context: &str) -> Self {
        self.patient_context = Some(context.to_string());
        self
    }

    pub fn with_encounter_type(mut self, encounter_type: &str) -> Self {
        self.encounter_type = encounter_type.to_string();
        self
    }
}

/// A note request ready for the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum NotePayload {
    /// Encounter text carried in the `notes` query parameter.
    Query { notes: String },
    Json(NoteRequest),
}

impl NotePayload {
    pub fn endpoint(&self) -> NoteEndpoint {
        match self {
            Self::Query { .. } => NoteEndpoint::DocumentSoap,
            Self::Json(_) => NoteEndpoint::GenerateNote,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_paths() {
        assert_eq!(TriageEndpoint::Multimodal.path(), "/triage/multimodal");
        assert_eq!(TriageEndpoint::Api.path(), "/api/triage");
        assert_eq!(NoteEndpoint::DocumentSoap.path(), "/document/soap");
        assert_eq!(NoteEndpoint::GenerateNote.path(), "/api/generate-note");
    }

    #[test]
    fn json_body_omits_missing_image() {
        let body = JsonTriageBody {
            chief_complaint: "Headache".into(),
            vitals: JsonVitals {
                hr: 80,
                bp_sys: 120,
                bp_dia: 80,
                spo2: 98,
                temp: 98.6,
                rr: 16,
            },
            image_base64: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("image_base64").is_none());
        assert_eq!(json["vitals"]["bp_sys"], 120);
        assert_eq!(json["vitals"]["temp"], 98.6);
    }

    #[test]
    fn note_request_defaults_to_emergency() {
        let request = NoteRequest::new("Pt reports fall from ladder.");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["encounter_type"], "Emergency");
        assert!(json.get("patient_context").is_none());

        let with_context = request.with_patient_context("72yo, on warfarin");
        let json = serde_json::to_value(&with_context).unwrap();
        assert_eq!(json["patient_context"], "72yo, on warfarin");
    }

    #[test]
    fn validation_messages() {
        assert_eq!(
            ValidationError::EmptyChiefComplaint.to_string(),
            "Chief complaint is required"
        );
    }
}
