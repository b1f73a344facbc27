use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(Role {
    Patient => "PATIENT",
    Doctor => "DOCTOR",
});

str_enum!(VitalKind {
    Glucose => "GLUCOSE",
    HeartRate => "HEART_RATE",
    Cholesterol => "CHOLESTEROL",
});

str_enum!(AppointmentStatus {
    Upcoming => "UPCOMING",
    Completed => "COMPLETED",
    Cancelled => "CANCELLED",
});

impl VitalKind {
    /// Unit recorded alongside readings of this kind by the seed data.
    pub fn default_unit(self) -> &'static str {
        match self {
            VitalKind::Glucose => "ml",
            VitalKind::HeartRate => "bpm",
            VitalKind::Cholesterol => "mg",
        }
    }
}
