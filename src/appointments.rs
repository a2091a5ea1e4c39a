use crate::error::CliError;
use crate::maintenance::{parse_decimal, record_index, validate_description, MaintenanceDraft};
use crate::model::{AppointmentRecord, AppointmentStatus, LinkedDeadline, Vehicle};
use chrono::NaiveDate;
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct AppointmentInput {
    pub date: NaiveDate,
    pub time: String,
    pub description: String,
    pub status: AppointmentStatus,
    pub location: String,
    pub linked_deadline: LinkedDeadline,
    /// Empty means "no estimate".
    pub estimated_cost: String,
    pub notes: String,
}

impl AppointmentInput {
    /// Form state prefilled from an existing record.
    pub fn from_record(record: &AppointmentRecord) -> Self {
        AppointmentInput {
            date: record.date,
            time: record.time.clone(),
            description: record.description.clone(),
            status: record.status,
            location: record.location.clone(),
            linked_deadline: record.linked_deadline,
            estimated_cost: record
                .estimated_cost
                .map(|c| c.to_string())
                .unwrap_or_default(),
            notes: record.notes.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SavedAppointment {
    pub index: usize,
    pub record: AppointmentRecord,
    /// Offered when the appointment was saved as completed.
    pub maintenance_draft: Option<MaintenanceDraft>,
}

fn parse_optional_cost(s: &str) -> Result<Option<Decimal>, CliError> {
    if s.trim().is_empty() {
        return Ok(None);
    }
    parse_decimal(s, "Estimated cost").map(Some)
}

pub fn validate_appointment(input: &AppointmentInput) -> Result<AppointmentRecord, CliError> {
    let description = validate_description(&input.description, "Appointment")?;
    let estimated_cost = parse_optional_cost(&input.estimated_cost)?;
    Ok(AppointmentRecord {
        date: input.date,
        time: input.time.trim().to_string(),
        description,
        status: input.status,
        location: input.location.trim().to_string(),
        linked_deadline: input.linked_deadline,
        estimated_cost,
        notes: input.notes.clone(),
    })
}

pub fn save_appointment(
    vehicle: &mut Vehicle,
    selected: Option<usize>,
    input: &AppointmentInput,
) -> Result<SavedAppointment, CliError> {
    if let Some(i) = selected {
        record_index(i + 1, vehicle.appointments.len(), "Appointment")?;
    }
    let record = validate_appointment(input)?;

    let index = match selected {
        Some(i) => {
            vehicle.appointments[i] = record.clone();
            i
        }
        None => {
            vehicle.appointments.push(record.clone());
            vehicle.appointments.len() - 1
        }
    };

    let maintenance_draft = if record.status == AppointmentStatus::Completed {
        Some(MaintenanceDraft::from_appointment(&record))
    } else {
        None
    };

    Ok(SavedAppointment {
        index,
        record,
        maintenance_draft,
    })
}

pub fn remove_appointment(vehicle: &mut Vehicle, idx: usize) -> Result<AppointmentRecord, CliError> {
    record_index(idx + 1, vehicle.appointments.len(), "Appointment")?;
    Ok(vehicle.appointments.remove(idx))
}
