use crate::date::add_months;
use crate::error::CliError;
use crate::model::{Db, DeadlineKind, Vehicle};
use chrono::NaiveDate;

/// Months added to "today" for each deadline a new vehicle is created without.
const DEFAULT_INSURANCE_MONTHS: u32 = 12;
const DEFAULT_INSPECTION_MONTHS: u32 = 24;
const DEFAULT_TAX_MONTHS: u32 = 6;

#[derive(Debug, Clone, Default)]
pub struct VehicleInput {
    pub name: Option<String>,
    pub license_plate: Option<String>,
    pub notes: Option<String>,
    pub insurance_expiry: Option<NaiveDate>,
    pub inspection_expiry: Option<NaiveDate>,
    pub tax_expiry: Option<NaiveDate>,
}

impl VehicleInput {
    fn expiry(&self, kind: DeadlineKind) -> Option<NaiveDate> {
        match kind {
            DeadlineKind::Insurance => self.insurance_expiry,
            DeadlineKind::Inspection => self.inspection_expiry,
            DeadlineKind::Tax => self.tax_expiry,
        }
    }
}

fn required_text(value: Option<&str>, what: &str) -> Result<String, CliError> {
    let v = value.map(str::trim).unwrap_or_default();
    if v.is_empty() {
        return Err(CliError::validation(format!("{} is required", what)));
    }
    Ok(v.to_string())
}

fn ensure_plate_free(db: &Db, plate: &str, except: Option<usize>) -> Result<(), CliError> {
    let taken = db
        .vehicles
        .iter()
        .enumerate()
        .any(|(i, v)| Some(i) != except && v.license_plate.eq_ignore_ascii_case(plate));
    if taken {
        return Err(CliError::validation(format!(
            "License plate already registered: {}",
            plate
        )));
    }
    Ok(())
}

pub fn default_expiry(kind: DeadlineKind, today: NaiveDate) -> NaiveDate {
    match kind {
        DeadlineKind::Insurance => add_months(today, DEFAULT_INSURANCE_MONTHS),
        DeadlineKind::Inspection => add_months(today, DEFAULT_INSPECTION_MONTHS),
        DeadlineKind::Tax => add_months(today, DEFAULT_TAX_MONTHS),
    }
}

pub fn create_vehicle(db: &mut Db, input: &VehicleInput, today: NaiveDate) -> Result<usize, CliError> {
    let name = required_text(input.name.as_deref(), "Vehicle name")?;
    let plate = required_text(input.license_plate.as_deref(), "License plate")?;
    ensure_plate_free(db, &plate, None)?;

    let expiries = DeadlineKind::ALL.map(|k| input.expiry(k).unwrap_or_else(|| default_expiry(k, today)));
    let mut vehicle = Vehicle::new(name, plate, expiries, today);
    vehicle.notes = input.notes.clone().unwrap_or_default();

    db.vehicles.push(vehicle);
    Ok(db.vehicles.len() - 1)
}

/// Applies the given fields in place. Absent fields keep their current value.
pub fn edit_vehicle(
    db: &mut Db,
    idx: usize,
    input: &VehicleInput,
    today: NaiveDate,
) -> Result<(), CliError> {
    let name = match input.name.as_deref() {
        Some(n) => Some(required_text(Some(n), "Vehicle name")?),
        None => None,
    };
    let plate = match input.license_plate.as_deref() {
        Some(p) => Some(required_text(Some(p), "License plate")?),
        None => None,
    };
    if let Some(p) = plate.as_deref() {
        ensure_plate_free(db, p, Some(idx))?;
    }

    let vehicle = db
        .vehicles
        .get_mut(idx)
        .ok_or_else(|| CliError::not_found("Vehicle not found"))?;

    if let Some(n) = name {
        vehicle.name = n;
    }
    if let Some(p) = plate {
        vehicle.license_plate = p;
    }
    if let Some(notes) = input.notes.as_ref() {
        vehicle.notes = notes.clone();
    }
    for kind in DeadlineKind::ALL {
        if let Some(date) = input.expiry(kind) {
            vehicle.set_expiry(kind, date, today);
        }
    }
    Ok(())
}

pub fn remove_vehicle(db: &mut Db, idx: usize) -> Result<Vehicle, CliError> {
    if idx >= db.vehicles.len() {
        return Err(CliError::not_found("Vehicle not found"));
    }
    Ok(db.vehicles.remove(idx))
}

pub fn stable_vehicle_sort(a: &Vehicle, b: &Vehicle) -> std::cmp::Ordering {
    let an = a.name.to_lowercase();
    let bn = b.name.to_lowercase();
    an.cmp(&bn)
        .then_with(|| a.license_plate.to_lowercase().cmp(&b.license_plate.to_lowercase()))
}

/// Case-insensitive substring match over name, plate and notes.
pub fn matches_query(vehicle: &Vehicle, query: &str) -> bool {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return true;
    }
    [&vehicle.name, &vehicle.license_plate, &vehicle.notes]
        .iter()
        .any(|field| field.to_lowercase().contains(&q))
}

pub fn list_vehicles<'a>(db: &'a Db, query: Option<&str>) -> Vec<&'a Vehicle> {
    let q = query.unwrap_or("");
    let mut out: Vec<&Vehicle> = db.vehicles.iter().filter(|v| matches_query(v, q)).collect();
    out.sort_by(|a, b| stable_vehicle_sort(a, b));
    out
}

/// Exact, case-insensitive plate lookup. No name fallback.
pub fn plate_index(db: &Db, plate: &str) -> Result<usize, CliError> {
    db.vehicles
        .iter()
        .position(|v| v.license_plate.eq_ignore_ascii_case(plate.trim()))
        .ok_or_else(|| CliError::not_found(format!("Vehicle not found: {}", plate)))
}

/// Resolves a selector: exact plate first, then unique name prefix.
pub fn select_vehicle_index(db: &Db, selector: &str) -> Result<usize, CliError> {
    let s = selector.trim();
    if s.is_empty() {
        return Err(CliError::usage("Vehicle selector is required"));
    }

    if let Ok(i) = plate_index(db, s) {
        return Ok(i);
    }

    let prefix = s.to_lowercase();
    let mut matches: Vec<usize> = db
        .vehicles
        .iter()
        .enumerate()
        .filter(|(_, v)| v.name.to_lowercase().starts_with(&prefix))
        .map(|(i, _)| i)
        .collect();

    matches.sort_by(|a, b| stable_vehicle_sort(&db.vehicles[*a], &db.vehicles[*b]));

    match matches.len() {
        0 => Err(CliError::not_found(format!("Vehicle not found: {}", selector))),
        1 => Ok(matches[0]),
        _ => {
            let candidates = matches
                .iter()
                .map(|i| {
                    let v = &db.vehicles[*i];
                    format!("{} ({})", v.name, v.license_plate)
                })
                .collect::<Vec<String>>()
                .join(", ");
            Err(CliError::ambiguous(format!(
                "Ambiguous selector '{}'. Candidates: {}",
                selector, candidates
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::build_dashboard;
    use crate::date::parse_date;
    use crate::status::DeadlineStatus;

    fn d(s: &str) -> NaiveDate {
        parse_date(s, "date").unwrap()
    }

    fn input(name: &str, plate: &str) -> VehicleInput {
        VehicleInput {
            name: Some(name.to_string()),
            license_plate: Some(plate.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn create_requires_name_and_plate() {
        let mut db = Db::default();
        let today = d("2026-10-19");
        assert_eq!(create_vehicle(&mut db, &input("  ", "AB123CD"), today).unwrap_err().exit_code, 6);
        assert_eq!(create_vehicle(&mut db, &input("Panda", ""), today).unwrap_err().exit_code, 6);
        assert!(db.vehicles.is_empty());
    }

    #[test]
    fn create_defaults_missing_expiries() {
        let mut db = Db::default();
        let today = d("2026-10-19");
        let mut inp = input(" Panda ", "AB123CD");
        inp.tax_expiry = Some(d("2026-11-01"));
        let idx = create_vehicle(&mut db, &inp, today).unwrap();
        let v = &db.vehicles[idx];

        assert_eq!(v.name, "Panda");
        assert_eq!(v.expiry(DeadlineKind::Insurance), d("2027-10-19"));
        assert_eq!(v.expiry(DeadlineKind::Inspection), d("2028-10-19"));
        assert_eq!(v.expiry(DeadlineKind::Tax), d("2026-11-01"));
        assert_eq!(v.status().tax.status, DeadlineStatus::Warning);

        let idx = create_vehicle(&mut db, &input("Fiesta", "ZZ999ZZ"), today).unwrap();
        assert_eq!(db.vehicles[idx].expiry(DeadlineKind::Tax), d("2027-04-19"));
    }

    #[test]
    fn duplicate_plate_is_rejected() {
        let mut db = Db::default();
        let today = d("2026-10-19");
        create_vehicle(&mut db, &input("Panda", "AB123CD"), today).unwrap();
        let err = create_vehicle(&mut db, &input("Other", "ab123cd"), today).unwrap_err();
        assert_eq!(err.exit_code, 6);
        assert_eq!(db.vehicles.len(), 1);
    }

    #[test]
    fn edit_preserves_absent_fields() {
        let mut db = Db::default();
        let today = d("2026-10-19");
        let mut inp = input("Panda", "AB123CD");
        inp.notes = Some("blue".to_string());
        let idx = create_vehicle(&mut db, &inp, today).unwrap();
        let before = db.vehicles[idx].expiry(DeadlineKind::Inspection);

        let change = VehicleInput {
            insurance_expiry: Some(d("2026-10-10")),
            ..Default::default()
        };
        edit_vehicle(&mut db, idx, &change, today).unwrap();

        let v = &db.vehicles[idx];
        assert_eq!(v.name, "Panda");
        assert_eq!(v.notes, "blue");
        assert_eq!(v.expiry(DeadlineKind::Inspection), before);
        assert_eq!(v.status().insurance.status, DeadlineStatus::Expired);

        let blank = VehicleInput {
            name: Some(" ".to_string()),
            ..Default::default()
        };
        assert!(edit_vehicle(&mut db, idx, &blank, today).is_err());
        assert_eq!(db.vehicles[idx].name, "Panda");
    }

    #[test]
    fn search_is_case_insensitive_over_three_fields() {
        let mut db = Db::default();
        let today = d("2026-10-19");
        let mut inp = input("Panda", "AB123CD");
        inp.notes = Some("Winter tyres".to_string());
        create_vehicle(&mut db, &inp, today).unwrap();
        create_vehicle(&mut db, &input("Fiesta", "ZZ999ZZ"), today).unwrap();

        assert_eq!(list_vehicles(&db, None).len(), 2);
        assert_eq!(list_vehicles(&db, Some("")).len(), 2);
        assert_eq!(list_vehicles(&db, Some("pan"))[0].name, "Panda");
        assert_eq!(list_vehicles(&db, Some("zz9"))[0].name, "Fiesta");
        assert_eq!(list_vehicles(&db, Some("TYRES"))[0].name, "Panda");
        assert!(list_vehicles(&db, Some("truck")).is_empty());
    }

    #[test]
    fn selector_by_plate_or_unique_prefix() {
        let mut db = Db::default();
        let today = d("2026-10-19");
        create_vehicle(&mut db, &input("Panda", "AB123CD"), today).unwrap();
        create_vehicle(&mut db, &input("Punto", "EF456GH"), today).unwrap();

        assert_eq!(select_vehicle_index(&db, "ef456gh").unwrap(), 1);
        assert_eq!(select_vehicle_index(&db, "pa").unwrap(), 0);
        assert_eq!(select_vehicle_index(&db, "p").unwrap_err().exit_code, 4);
        assert_eq!(select_vehicle_index(&db, "truck").unwrap_err().exit_code, 3);
    }

    #[test]
    fn removed_vehicle_leaves_dashboard() {
        let mut db = Db::default();
        let today = d("2026-10-19");
        let mut inp = input("Panda", "AB123CD");
        inp.insurance_expiry = Some(d("2026-10-25"));
        create_vehicle(&mut db, &inp, today).unwrap();
        create_vehicle(&mut db, &input("Fiesta", "ZZ999ZZ"), today).unwrap();

        assert!(build_dashboard(&db, today)
            .upcoming_deadlines
            .iter()
            .any(|r| r.vehicle_name == "Panda"));

        let removed = remove_vehicle(&mut db, 0).unwrap();
        assert_eq!(removed.name, "Panda");
        let dash = build_dashboard(&db, today);
        assert_eq!(dash.total_vehicles, 1);
        assert!(dash.upcoming_deadlines.iter().all(|r| r.vehicle_name != "Panda"));
    }

    #[test]
    fn plate_lookup_never_falls_back_to_names() {
        let t = parse_date("2026-10-19", "today").unwrap();
        let mut db = Db::default();
        create_vehicle(&mut db, &input("ZX Van", "AB123CD"), t).unwrap();

        assert_eq!(plate_index(&db, "ab123cd").unwrap(), 0);
        assert_eq!(select_vehicle_index(&db, "zx").unwrap(), 0);
        assert_eq!(plate_index(&db, "zx").unwrap_err().exit_code, 3);
    }
}
