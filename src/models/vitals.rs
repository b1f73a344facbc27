use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_HEART_RATE: u32 = 80;
pub const DEFAULT_SYSTOLIC: u32 = 120;
pub const DEFAULT_DIASTOLIC: u32 = 80;
pub const DEFAULT_SPO2: u32 = 98;
pub const DEFAULT_TEMPERATURE: f64 = 98.6;
pub const DEFAULT_RESPIRATORY_RATE: u32 = 16;

/// Systolic / diastolic pair in mmHg.
///
/// The `"sys/dia"` text form and the integer pair convert symmetrically:
/// `"120/80"` parses to `(120, 80)` and displays back as `"120/80"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloodPressure {
    pub systolic: u32,
    pub diastolic: u32,
}

impl BloodPressure {
    pub fn new(systolic: u32, diastolic: u32) -> Self {
        Self {
            systolic,
            diastolic,
        }
    }

    /// Split a `"sys/dia"` string.
    ///
    /// Never fails: a missing separator, a non-numeric part or an extra
    /// separator yields `(0, 0)`.
    pub fn split(text: &str) -> Self {
        let mut parts = text.split('/');
        let (Some(sys), Some(dia), None) = (parts.next(), parts.next(), parts.next()) else {
            return Self::new(0, 0);
        };
        match (sys.trim().parse::<u32>(), dia.trim().parse::<u32>()) {
            (Ok(systolic), Ok(diastolic)) => Self::new(systolic, diastolic),
            _ => Self::new(0, 0),
        }
    }

    /// Join back into the `"sys/dia"` form.
    pub fn join(&self) -> String {
        self.to_string()
    }
}

impl Default for BloodPressure {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTOLIC, DEFAULT_DIASTOLIC)
    }
}

impl fmt::Display for BloodPressure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.systolic, self.diastolic)
    }
}

/// Vital signs as transmitted. Every field is populated.
///
/// No physiological range checks: the inference service owns clinical
/// validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalSigns {
    pub heart_rate: u32,
    pub blood_pressure: BloodPressure,
    pub spo2: u32,
    pub temperature: f64,
    pub respiratory_rate: u32,
}

impl Default for VitalSigns {
    fn default() -> Self {
        VitalsForm::default().into()
    }
}

/// Vital signs as entered in the form. Any field may be left blank.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VitalsForm {
    pub heart_rate: Option<u32>,
    pub systolic: Option<u32>,
    pub diastolic: Option<u32>,
    pub spo2: Option<u32>,
    pub temperature: Option<f64>,
    pub respiratory_rate: Option<u32>,
}

impl VitalsForm {
    /// Fill both pressure fields from a `"sys/dia"` entry.
    ///
    /// A malformed entry sets both to 0, matching [`BloodPressure::split`].
    pub fn with_blood_pressure(mut self, text: &str) -> Self {
        let bp = BloodPressure::split(text);
        self.systolic = Some(bp.systolic);
        self.diastolic = Some(bp.diastolic);
        self
    }

    pub fn with_heart_rate(mut self, bpm: u32) -> Self {
        self.heart_rate = Some(bpm);
        self
    }

    pub fn with_spo2(mut self, percent: u32) -> Self {
        self.spo2 = Some(percent);
        self
    }

    pub fn with_temperature(mut self, degrees: f64) -> Self {
        self.temperature = Some(degrees);
        self
    }

    pub fn with_respiratory_rate(mut self, per_minute: u32) -> Self {
        self.respiratory_rate = Some(per_minute);
        self
    }
}

impl From<VitalsForm> for VitalSigns {
    fn from(form: VitalsForm) -> Self {
        Self {
            heart_rate: form.heart_rate.unwrap_or(DEFAULT_HEART_RATE),
            blood_pressure: BloodPressure::new(
                form.systolic.unwrap_or(DEFAULT_SYSTOLIC),
                form.diastolic.unwrap_or(DEFAULT_DIASTOLIC),
            ),
            spo2: form.spo2.unwrap_or(DEFAULT_SPO2),
            temperature: form.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            respiratory_rate: form.respiratory_rate.unwrap_or(DEFAULT_RESPIRATORY_RATE),
        }
    }
}
