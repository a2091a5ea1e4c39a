use crate::error::CliError;
use crate::model::{AppointmentRecord, MaintenanceRecord, Vehicle};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Raw form input. Numeric fields stay text until validated.
#[derive(Debug, Clone)]
pub struct MaintenanceInput {
    pub date: NaiveDate,
    pub description: String,
    pub mileage: String,
    pub cost: String,
}

/// Prefill for a maintenance record built from a completed appointment.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MaintenanceDraft {
    pub date: NaiveDate,
    pub description: String,
    pub cost: Option<Decimal>,
}

impl MaintenanceDraft {
    pub fn from_appointment(appointment: &AppointmentRecord) -> Self {
        MaintenanceDraft {
            date: appointment.date,
            description: appointment.description.clone(),
            cost: appointment.estimated_cost,
        }
    }

    pub fn into_input(self, mileage: &str) -> MaintenanceInput {
        MaintenanceInput {
            date: self.date,
            description: self.description,
            mileage: mileage.to_string(),
            cost: self.cost.map(|c| c.to_string()).unwrap_or_default(),
        }
    }
}

pub fn parse_mileage(s: &str) -> Result<u32, CliError> {
    s.trim()
        .parse::<u32>()
        .map_err(|_| CliError::validation(format!("Mileage is not a valid number: {}", s)))
}

/// Accepts `12.50`, `12,50` and plain integers.
pub fn parse_decimal(s: &str, label: &str) -> Result<Decimal, CliError> {
    let t = s.trim();
    let normalized = if !t.contains('.') && t.matches(',').count() == 1 {
        t.replace(',', ".")
    } else {
        t.to_string()
    };
    Decimal::from_str(&normalized)
        .map_err(|_| CliError::validation(format!("{} is not a valid number: {}", label, s)))
}

pub fn validate_description(s: &str, what: &str) -> Result<String, CliError> {
    let d = s.trim();
    if d.is_empty() {
        return Err(CliError::validation(format!("{} description is required", what)));
    }
    Ok(d.to_string())
}

pub fn validate_maintenance(input: &MaintenanceInput) -> Result<MaintenanceRecord, CliError> {
    let description = validate_description(&input.description, "Maintenance")?;
    let mileage = parse_mileage(&input.mileage)?;
    let cost = parse_decimal(&input.cost, "Cost")?;
    Ok(MaintenanceRecord {
        date: input.date,
        description,
        mileage,
        cost,
    })
}

/// Maps a 1-based list position to an index into `len` records.
pub fn record_index(position: usize, len: usize, what: &str) -> Result<usize, CliError> {
    if position == 0 || position > len {
        return Err(CliError::not_found(format!("{} record not found: #{}", what, position)));
    }
    Ok(position - 1)
}

/// Fails when the record at `idx` is no longer the one the user confirmed.
pub fn ensure_unchanged<T: PartialEq>(
    records: &[T],
    idx: usize,
    confirmed: &T,
    what: &str,
) -> Result<(), CliError> {
    match records.get(idx) {
        Some(current) if current == confirmed => Ok(()),
        _ => Err(CliError::not_found(format!(
            "{} record #{} changed since it was confirmed",
            what,
            idx + 1
        ))),
    }
}

/// Adds a record, or replaces the selected one in place. Validation happens
/// before any mutation.
pub fn save_maintenance(
    vehicle: &mut Vehicle,
    selected: Option<usize>,
    input: &MaintenanceInput,
) -> Result<usize, CliError> {
    if let Some(i) = selected {
        record_index(i + 1, vehicle.maintenance.len(), "Maintenance")?;
    }
    let record = validate_maintenance(input)?;

    match selected {
        Some(i) => {
            vehicle.maintenance[i] = record;
            Ok(i)
        }
        None => {
            vehicle.maintenance.push(record);
            Ok(vehicle.maintenance.len() - 1)
        }
    }
}

pub fn remove_maintenance(vehicle: &mut Vehicle, idx: usize) -> Result<MaintenanceRecord, CliError> {
    record_index(idx + 1, vehicle.maintenance.len(), "Maintenance")?;
    Ok(vehicle.maintenance.remove(idx))
}

pub fn total_cost(vehicle: &Vehicle) -> Result<Decimal, CliError> {
    vehicle
        .maintenance
        .iter()
        .try_fold(Decimal::ZERO, |acc, m| acc.checked_add(m.cost))
        .ok_or_else(|| CliError::validation("Total maintenance cost is too large to add up"))
}
