use std::sync::Arc;

use tracing::debug;

use super::{
    JsonTriageBody, JsonVitals, NoteEndpoint, NotePayload, NoteRequest, TriageEndpoint,
    TriageForm, TriagePayload, ValidationError,
};
use crate::models::VitalSigns;
use crate::pipeline::imaging::{EncounterImage, ImageError, ImageNormalizer, RawUpload};
use crate::pipeline::SubmissionError;

/// Turns panel input into transmission-ready payloads.
///
/// Validation happens first so an invalid form never costs an image decode.
/// Every image goes through the normalizer; the raw upload is never sent.
pub struct RequestAssembler {
    normalizer: Arc<dyn ImageNormalizer>,
}

impl RequestAssembler {
    pub fn new(normalizer: Arc<dyn ImageNormalizer>) -> Self {
        Self { normalizer }
    }

    pub async fn assemble_triage(
        &self,
        form: TriageForm,
        endpoint: TriageEndpoint,
    ) -> Result<TriagePayload, SubmissionError> {
        if form.chief_complaint.trim().is_empty() {
            return Err(ValidationError::EmptyChiefComplaint.into());
        }

        let vitals = VitalSigns::from(form.vitals);
        let image = match form.image {
            Some(upload) => Some(self.normalize(upload).await?),
            None => None,
        };

        debug!(
            endpoint = endpoint.path(),
            complaint_len = form.chief_complaint.len(),
            has_image = image.is_some(),
            "Triage payload assembled"
        );

        Ok(match endpoint {
            TriageEndpoint::Multimodal => TriagePayload::Multipart {
                fields: multipart_fields(&form.chief_complaint, &vitals),
                image,
            },
            TriageEndpoint::Api => TriagePayload::Json(JsonTriageBody {
                chief_complaint: form.chief_complaint,
                vitals: json_vitals(&vitals),
                image_base64: image.as_ref().map(EncounterImage::to_data_url),
            }),
        })
    }

    /// Normalize on a blocking worker; decoding a phone photo takes long
    /// enough to stall the runtime.
    async fn normalize(&self, upload: RawUpload) -> Result<EncounterImage, ImageError> {
        let normalizer = Arc::clone(&self.normalizer);
        tokio::task::spawn_blocking(move || normalizer.normalize(&upload))
            .await
            .map_err(|e| ImageError::Worker(e.to_string()))?
    }
}

/// Build a note payload. No I/O, so this is a plain function.
pub fn assemble_note(
    request: NoteRequest,
    endpoint: NoteEndpoint,
) -> Result<NotePayload, ValidationError> {
    if request.encounter_text.trim().is_empty() {
        return Err(ValidationError::EmptyEncounterText);
    }
    Ok(match endpoint {
        NoteEndpoint::DocumentSoap => NotePayload::Query {
            notes: request.encounter_text,
        },
        NoteEndpoint::GenerateNote => NotePayload::Json(request),
    })
}

fn multipart_fields(complaint: &str, vitals: &VitalSigns) -> Vec<(&'static str, String)> {
    vec![
        ("text", complaint.to_string()),
        ("hr", vitals.heart_rate.to_string()),
        ("bp_sys", vitals.blood_pressure.systolic.to_string()),
        ("bp_dia", vitals.blood_pressure.diastolic.to_string()),
        ("spo2", vitals.spo2.to_string()),
        ("temp", vitals.temperature.to_string()),
        ("rr", vitals.respiratory_rate.to_string()),
    ]
}

fn json_vitals(vitals: &VitalSigns) -> JsonVitals {
    JsonVitals {
        hr: vitals.heart_rate,
        bp_sys: vitals.blood_pressure.systolic,
        bp_dia: vitals.blood_pressure.diastolic,
        spo2: vitals.spo2,
        temp: vitals.temperature,
        rr: vitals.respiratory_rate,
    }
}
