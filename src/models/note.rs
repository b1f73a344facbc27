use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Sections shorter than this (after trimming) are reported as incomplete.
const MIN_SECTION_CHARS: usize = 10;

/// Generated clinical note in SOAP format plus billing codes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoapNote {
    pub subjective: String,
    pub objective: String,
    pub assessment: String,
    pub plan: String,
    pub icd10: Vec<String>,
    pub cpt: Vec<String>,
    /// Shift-handoff summary.
    pub handoff: String,
}

impl SoapNote {
    /// The four sections in document order, with their display names.
    pub fn sections(&self) -> [(&'static str, &str); 4] {
        [
            ("Subjective", &self.subjective),
            ("Objective", &self.objective),
            ("Assessment", &self.assessment),
            ("Plan", &self.plan),
        ]
    }

    /// Sections that are missing or too short to be useful.
    pub fn completeness_issues(&self) -> Vec<String> {
        self.sections()
            .iter()
            .filter(|(_, text)| text.trim().chars().count() < MIN_SECTION_CHARS)
            .map(|(name, _)| format!("Missing or incomplete {name} section."))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.completeness_issues().is_empty()
    }

    /// Plain-text export for pasting into a chart.
    pub fn to_plain_text(&self, generated_at: NaiveDateTime) -> String {
        let mut text = format!(
            "CLINICAL NOTE - {}\n",
            generated_at.format("%Y-%m-%dT%H:%M:%S")
        );
        text.push_str(&"=".repeat(40));
        text.push('\n');
        for (name, content) in self.sections() {
            text.push_str(&format!("{}:\n{content}\n\n", name.to_uppercase()));
        }
        text.push_str(&format!("ICD-10 CODES:\n{}\n\n", self.icd10.join(", ")));
        text.push_str(&format!("CPT CODES:\n{}\n\n", self.cpt.join(", ")));
        text.push_str("HANDOFF SUMMARY:\n");
        text.push_str(&self.handoff);
        text
    }
}
