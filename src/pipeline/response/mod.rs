pub mod adapter;
pub mod unflatten;

pub use unflatten::*;

/// Which triage response layout the service returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriageShape {
    /// `{ clinical_json: {...}, patient_explanation | patient_text }`
    Nested,
    /// Flat fields at the top level, as returned by `/api/triage`.
    Flat,
}
