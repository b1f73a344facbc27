//! Dashboard read side: patients with their vitals, medications and
//! appointments, plus the demo seed.

use std::str::FromStr;

use chrono::{Duration, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::DatabaseError;
use crate::models::{
    Appointment, AppointmentStatus, Medication, PatientRecord, Person, Role, VitalKind,
    VitalReading, VitalWidgets,
};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Patient record plus the chart series derived from it.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PatientDashboard {
    pub record: PatientRecord,
    pub widgets: VitalWidgets,
}

fn format_ts(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_ts(idx: usize, raw: &str) -> Result<NaiveDateTime, rusqlite::Error> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_uuid(idx: usize, raw: &str) -> Result<Uuid, rusqlite::Error> {
    Uuid::parse_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_enum<T>(idx: usize, raw: &str) -> Result<T, rusqlite::Error>
where
    T: FromStr<Err = DatabaseError>,
{
    T::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

// ── Writes ────────────────────────────────────────────────

pub fn insert_person(
    conn: &Connection,
    person: &Person,
    created_at: &NaiveDateTime,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO users (id, email, name, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            person.id.to_string(),
            person.email,
            person.name,
            person.role.as_str(),
            format_ts(created_at),
        ],
    )?;
    Ok(())
}

pub fn insert_vital_reading(
    conn: &Connection,
    user_id: &Uuid,
    reading: &VitalReading,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO vitals (id, user_id, vital_type, value, unit, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            reading.id.to_string(),
            user_id.to_string(),
            reading.kind.as_str(),
            reading.value,
            reading.unit,
            format_ts(&reading.recorded_at),
        ],
    )?;
    Ok(())
}

pub fn insert_medication(
    conn: &Connection,
    user_id: &Uuid,
    med: &Medication,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO medications (id, user_id, name, dosage, schedule, adherence, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            med.id.to_string(),
            user_id.to_string(),
            med.name,
            med.dosage,
            med.schedule,
            med.adherence,
            med.active,
        ],
    )?;
    Ok(())
}

/// Insert an appointment between an existing patient and doctor.
pub fn insert_appointment(
    conn: &Connection,
    patient_id: &Uuid,
    doctor_id: &Uuid,
    appt: &Appointment,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (id, patient_id, doctor_id, date, appointment_type, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            appt.id.to_string(),
            patient_id.to_string(),
            doctor_id.to_string(),
            format_ts(&appt.date),
            appt.appointment_type,
            appt.status.as_str(),
        ],
    )?;
    Ok(())
}

// ── Reads ─────────────────────────────────────────────────

/// Find a patient by email, or the first registered patient when no email
/// is given.
pub fn find_patient(conn: &Connection, email: Option<&str>) -> Result<PatientRecord, DatabaseError> {
    let person = match email {
        Some(email) => conn
            .query_row(
                "SELECT id, email, name, role FROM users WHERE email = ?1",
                params![email],
                row_to_person,
            )
            .optional()?,
        None => conn
            .query_row(
                "SELECT id, email, name, role FROM users
                 WHERE role = ?1
                 ORDER BY created_at ASC, rowid ASC
                 LIMIT 1",
                params![Role::Patient.as_str()],
                row_to_person,
            )
            .optional()?,
    };

    let patient = person.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "patient".into(),
        id: email.unwrap_or("<first patient>").to_string(),
    })?;

    Ok(PatientRecord {
        vitals: get_vitals(conn, &patient.id)?,
        medications: get_medications(conn, &patient.id)?,
        appointments: get_appointments(conn, &patient.id)?,
        patient,
    })
}

/// Patient record with its vitals grouped for the chart widgets.
pub fn load_dashboard(
    conn: &Connection,
    email: Option<&str>,
) -> Result<PatientDashboard, DatabaseError> {
    let record = find_patient(conn, email)?;
    let widgets = VitalWidgets::from_readings(&record.vitals);
    tracing::debug!(
        vitals = record.vitals.len(),
        medications = record.medications.len(),
        appointments = record.appointments.len(),
        "Dashboard loaded"
    );
    Ok(PatientDashboard { record, widgets })
}

/// All vitals for a user, oldest first.
pub fn get_vitals(conn: &Connection, user_id: &Uuid) -> Result<Vec<VitalReading>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, vital_type, value, unit, recorded_at
         FROM vitals
         WHERE user_id = ?1
         ORDER BY recorded_at ASC",
    )?;
    let rows = stmt.query_map(params![user_id.to_string()], row_to_vital)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

pub fn get_medications(conn: &Connection, user_id: &Uuid) -> Result<Vec<Medication>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, dosage, schedule, adherence, active
         FROM medications
         WHERE user_id = ?1
         ORDER BY rowid ASC",
    )?;
    let rows = stmt.query_map(params![user_id.to_string()], row_to_medication)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// Appointments for a patient with the doctor's name, soonest first.
pub fn get_appointments(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.date, a.appointment_type, a.status, d.name
         FROM appointments a
         JOIN users d ON d.id = a.doctor_id
         WHERE a.patient_id = ?1
         ORDER BY a.date ASC",
    )?;
    let rows = stmt.query_map(params![patient_id.to_string()], row_to_appointment)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

fn row_to_person(row: &rusqlite::Row) -> Result<Person, rusqlite::Error> {
    let id: String = row.get(0)?;
    let role: String = row.get(3)?;
    Ok(Person {
        id: parse_uuid(0, &id)?,
        email: row.get(1)?,
        name: row.get(2)?,
        role: parse_enum(3, &role)?,
    })
}

fn row_to_vital(row: &rusqlite::Row) -> Result<VitalReading, rusqlite::Error> {
    let id: String = row.get(0)?;
    let kind: String = row.get(1)?;
    let recorded: String = row.get(4)?;
    Ok(VitalReading {
        id: parse_uuid(0, &id)?,
        kind: parse_enum(1, &kind)?,
        value: row.get(2)?,
        unit: row.get(3)?,
        recorded_at: parse_ts(4, &recorded)?,
    })
}

fn row_to_medication(row: &rusqlite::Row) -> Result<Medication, rusqlite::Error> {
    let id: String = row.get(0)?;
    Ok(Medication {
        id: parse_uuid(0, &id)?,
        name: row.get(1)?,
        dosage: row.get(2)?,
        schedule: row.get(3)?,
        adherence: row.get(4)?,
        active: row.get(5)?,
    })
}

fn row_to_appointment(row: &rusqlite::Row) -> Result<Appointment, rusqlite::Error> {
    let id: String = row.get(0)?;
    let date: String = row.get(1)?;
    let status: String = row.get(3)?;
    Ok(Appointment {
        id: parse_uuid(0, &id)?,
        date: parse_ts(1, &date)?,
        appointment_type: row.get(2)?,
        status: parse_enum(3, &status)?,
        doctor_name: row.get(4)?,
    })
}

// ── Demo seed ─────────────────────────────────────────────

/// Replace all dashboard data with the demo patient "Abraham", his week of
/// vitals, five medications and two upcoming appointments.
///
/// Timestamps are relative to `now` so charts always end at the present.
/// Runs in one transaction; on error the store is left as it was.
pub fn seed_demo_data(conn: &Connection, now: NaiveDateTime) -> Result<Uuid, DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "DELETE FROM vitals;
         DELETE FROM medications;
         DELETE FROM appointments;
         DELETE FROM users;",
    )?;

    let patient = Person {
        id: Uuid::new_v4(),
        email: "abraham@example.com".into(),
        name: "Abraham".into(),
        role: Role::Patient,
    };
    insert_person(&tx, &patient, &now)?;

    let meds = [
        ("Hydration Therapy", "Revitalize", "Daily", 90),
        ("Heart Wellness", "1 Tab", "Daily", 100),
        ("Neuro Vitality", "2 Caps", "AM", 85),
        ("Vital Energy Pack", "1 Pack", "PM", 60),
        ("Paracetamol", "500mg", "As needed", 35),
    ];
    for (name, dosage, schedule, adherence) in meds {
        let med = Medication {
            id: Uuid::new_v4(),
            name: name.into(),
            dosage: dosage.into(),
            schedule: schedule.into(),
            adherence,
            active: true,
        };
        insert_medication(&tx, &patient.id, &med)?;
    }

    // Daily glucose and cholesterol for the past week, hourly heart rate.
    let glucose = [115.0, 118.0, 122.0, 119.0, 120.0, 118.0, 127.0];
    let cholesterol = [145.0, 148.0, 152.0, 150.0, 150.0, 155.0, 164.0];
    let heart_rate = [72.0, 75.0, 82.0, 78.0, 70.0, 71.0, 74.0, 76.0, 92.0, 120.0];

    let mut series = Vec::new();
    for (i, value) in glucose.iter().enumerate() {
        let at = now - Duration::days((glucose.len() - 1 - i) as i64);
        series.push((VitalKind::Glucose, *value, at));
    }
    for (i, value) in cholesterol.iter().enumerate() {
        let at = now - Duration::days((cholesterol.len() - 1 - i) as i64);
        series.push((VitalKind::Cholesterol, *value, at));
    }
    for (i, value) in heart_rate.iter().enumerate() {
        let at = now - Duration::hours((heart_rate.len() - 1 - i) as i64);
        series.push((VitalKind::HeartRate, *value, at));
    }
    for (kind, value, recorded_at) in series {
        let reading = VitalReading {
            id: Uuid::new_v4(),
            kind,
            value,
            unit: kind.default_unit().into(),
            recorded_at,
        };
        insert_vital_reading(&tx, &patient.id, &reading)?;
    }

    let doctors = [
        ("selena@hospital.com", "Dr. Selena Gomez", "Cardiologist", 0),
        ("steevan@hospital.com", "Dr. Steevan Nicholas", "Neurology Specialist", 1),
    ];
    for (email, name, appointment_type, days_ahead) in doctors {
        let doctor = Person {
            id: Uuid::new_v4(),
            email: email.into(),
            name: name.into(),
            role: Role::Doctor,
        };
        insert_person(&tx, &doctor, &now)?;

        let appt = Appointment {
            id: Uuid::new_v4(),
            date: now + Duration::days(days_ahead),
            appointment_type: appointment_type.into(),
            status: AppointmentStatus::Upcoming,
            doctor_name: doctor.name.clone(),
        };
        insert_appointment(&tx, &patient.id, &doctor.id, &appt)?;
    }

    tx.commit()?;
    tracing::info!("Dashboard seeded with demo patient");
    Ok(patient.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use chrono::NaiveDate;

    fn test_db() -> Connection {
        open_memory_database().unwrap()
    }

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, 10)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn seeded_first_patient_is_abraham() {
        let conn = test_db();
        let id = seed_demo_data(&conn, noon()).unwrap();

        let record = find_patient(&conn, None).unwrap();
        assert_eq!(record.patient.id, id);
        assert_eq!(record.patient.name, "Abraham");
        assert_eq!(record.patient.role, Role::Patient);
        assert_eq!(record.vitals.len(), 24);
        assert_eq!(record.medications.len(), 5);
        assert_eq!(record.appointments.len(), 2);
    }

    #[test]
    fn vitals_are_oldest_first() {
        let conn = test_db();
        seed_demo_data(&conn, noon()).unwrap();

        let record = find_patient(&conn, Some("abraham@example.com")).unwrap();
        assert!(record
            .vitals
            .windows(2)
            .all(|w| w[0].recorded_at <= w[1].recorded_at));
    }

    #[test]
    fn dashboard_groups_three_series() {
        let conn = test_db();
        seed_demo_data(&conn, noon()).unwrap();

        let dashboard = load_dashboard(&conn, None).unwrap();
        assert_eq!(dashboard.widgets.glucose.len(), 7);
        assert_eq!(dashboard.widgets.cholesterol.len(), 7);
        assert_eq!(dashboard.widgets.heart_rate.len(), 10);

        let latest_hr = dashboard.widgets.latest(VitalKind::HeartRate).unwrap();
        assert_eq!(latest_hr.value, 120.0);
        assert_eq!(latest_hr.recorded_at, noon());
    }

    #[test]
    fn appointments_carry_doctor_names_in_date_order() {
        let conn = test_db();
        seed_demo_data(&conn, noon()).unwrap();

        let record = find_patient(&conn, None).unwrap();
        assert_eq!(record.appointments[0].doctor_name, "Dr. Selena Gomez");
        assert_eq!(record.appointments[0].appointment_type, "Cardiologist");
        assert_eq!(record.appointments[1].doctor_name, "Dr. Steevan Nicholas");
        assert_eq!(record.appointments[1].status, AppointmentStatus::Upcoming);
    }

    #[test]
    fn medications_keep_insertion_order_and_adherence() {
        let conn = test_db();
        seed_demo_data(&conn, noon()).unwrap();

        let record = find_patient(&conn, None).unwrap();
        let paracetamol = &record.medications[4];
        assert_eq!(paracetamol.name, "Paracetamol");
        assert_eq!(paracetamol.adherence, 35);
        assert!(paracetamol.active);
    }

    #[test]
    fn unknown_email_is_not_found() {
        let conn = test_db();
        seed_demo_data(&conn, noon()).unwrap();

        let err = find_patient(&conn, Some("nobody@example.com")).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn empty_store_has_no_first_patient() {
        let conn = test_db();
        assert!(matches!(
            find_patient(&conn, None),
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[test]
    fn reseeding_replaces_previous_data() {
        let conn = test_db();
        seed_demo_data(&conn, noon()).unwrap();
        seed_demo_data(&conn, noon()).unwrap();

        let patients: i64 = conn
            .query_row("SELECT COUNT(*) FROM users WHERE role = 'PATIENT'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(patients, 1);
    }

    #[test]
    fn failed_seed_leaves_previous_data_intact() {
        let conn = test_db();
        let zed = Person {
            id: Uuid::new_v4(),
            email: "zed@example.com".into(),
            name: "Zed".into(),
            role: Role::Patient,
        };
        insert_person(&conn, &zed, &noon()).unwrap();
        conn.execute_batch(
            "CREATE TRIGGER reject_appointments BEFORE INSERT ON appointments
             BEGIN SELECT RAISE(ABORT, 'appointments are read-only'); END;",
        )
        .unwrap();

        assert!(seed_demo_data(&conn, noon()).is_err());

        let record = find_patient(&conn, None).unwrap();
        assert_eq!(record.patient.name, "Zed");
        assert!(record.vitals.is_empty());
        let users: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))
            .unwrap();
        assert_eq!(users, 1);
    }

    #[test]
    fn corrupt_enum_value_surfaces_as_error() {
        let conn = test_db();
        let id = seed_demo_data(&conn, noon()).unwrap();
        conn.execute(
            "UPDATE vitals SET vital_type = 'BLOOD_SUGAR' WHERE user_id = ?1",
            params![id.to_string()],
        )
        .unwrap();

        assert!(matches!(
            find_patient(&conn, None),
            Err(DatabaseError::Sqlite(_))
        ));
    }
}
