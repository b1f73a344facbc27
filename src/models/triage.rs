use serde::{Deserialize, Serialize};

/// Shown when the service does not suggest next steps.
pub const FALLBACK_NEXT_STEPS: [&str; 2] = ["Review vitals", "Physician assessment"];

/// ESI levels at or below this are labelled emergent.
const EMERGENT_MAX_LEVEL: u8 = 2;

/// Display-ready triage analysis. Replaced wholesale on every submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageResult {
    /// Emergency Severity Index, 1 (most emergent) to 5.
    pub esi_level: u8,
    /// Conventionally 0.0–1.0; not clamped.
    pub confidence: f64,
    pub reasoning: String,
    pub red_flags: Vec<String>,
    pub follow_up_questions: Vec<String>,
    pub patient_explanation: String,
    pub recommended_next_steps: Vec<String>,
}

impl TriageResult {
    pub fn is_emergent(&self) -> bool {
        self.esi_level <= EMERGENT_MAX_LEVEL
    }

    /// Badge text, e.g. `"Level 2: Emergent"`.
    pub fn urgency_label(&self) -> String {
        let tier = if self.is_emergent() { "Emergent" } else { "Urgent" };
        format!("Level {}: {tier}", self.esi_level)
    }

    /// Confidence as a whole percentage for display.
    pub fn confidence_percent(&self) -> u32 {
        (self.confidence * 100.0).round().max(0.0) as u32
    }
}

pub fn fallback_next_steps() -> Vec<String> {
    FALLBACK_NEXT_STEPS.iter().map(|s| s.to_string()).collect()
}
