use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{AppointmentStatus, Role, VitalKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalReading {
    pub id: Uuid,
    pub kind: VitalKind,
    pub value: f64,
    pub unit: String,
    pub recorded_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub id: Uuid,
    pub name: String,
    pub dosage: String,
    pub schedule: String,
    /// Percentage of scheduled doses taken, 0–100.
    pub adherence: u8,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub date: NaiveDateTime,
    pub appointment_type: String,
    pub status: AppointmentStatus,
    pub doctor_name: String,
}

/// A patient with everything the dashboard shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub patient: Person,
    /// Oldest first.
    pub vitals: Vec<VitalReading>,
    pub medications: Vec<Medication>,
    /// Soonest first.
    pub appointments: Vec<Appointment>,
}

/// Chart series for the three vitals widgets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VitalWidgets {
    pub glucose: Vec<VitalReading>,
    pub heart_rate: Vec<VitalReading>,
    pub cholesterol: Vec<VitalReading>,
}

impl VitalWidgets {
    /// Split readings by kind, keeping their order.
    pub fn from_readings(readings: &[VitalReading]) -> Self {
        let series = |kind: VitalKind| -> Vec<VitalReading> {
            readings.iter().filter(|r| r.kind == kind).cloned().collect()
        };
        Self {
            glucose: series(VitalKind::Glucose),
            heart_rate: series(VitalKind::HeartRate),
            cholesterol: series(VitalKind::Cholesterol),
        }
    }

    /// Most recent reading of a kind (series are oldest first).
    pub fn latest(&self, kind: VitalKind) -> Option<&VitalReading> {
        match kind {
            VitalKind::Glucose => self.glucose.last(),
            VitalKind::HeartRate => self.heart_rate.last(),
            VitalKind::Cholesterol => self.cholesterol.last(),
        }
    }
}
