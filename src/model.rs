use crate::status::{evaluate_deadline, DeadlineReport};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// The whole persisted document: a JSON array of vehicles.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Db {
    pub vehicles: Vec<Vehicle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineKind {
    Insurance,
    Inspection,
    Tax,
}

impl DeadlineKind {
    pub const ALL: [DeadlineKind; 3] = [
        DeadlineKind::Insurance,
        DeadlineKind::Inspection,
        DeadlineKind::Tax,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DeadlineKind::Insurance => "Insurance",
            DeadlineKind::Inspection => "Inspection",
            DeadlineKind::Tax => "Tax",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[default]
    Planned,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Planned => "planned",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkedDeadline {
    #[default]
    None,
    Insurance,
    Inspection,
    Tax,
}

impl LinkedDeadline {
    pub fn kind(self) -> Option<DeadlineKind> {
        match self {
            LinkedDeadline::None => None,
            LinkedDeadline::Insurance => Some(DeadlineKind::Insurance),
            LinkedDeadline::Inspection => Some(DeadlineKind::Inspection),
            LinkedDeadline::Tax => Some(DeadlineKind::Tax),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self.kind() {
            Some(k) => k.label(),
            None => "-",
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MaintenanceRecord {
    pub date: NaiveDate,
    pub description: String,
    pub mileage: u32,
    pub cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AppointmentRecord {
    pub date: NaiveDate,
    #[serde(default)]
    pub time: String,
    pub description: String,
    #[serde(default)]
    pub status: AppointmentStatus,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub linked_deadline: LinkedDeadline,
    #[serde(default)]
    pub estimated_cost: Option<Decimal>,
    #[serde(default)]
    pub notes: String,
}

/// Cached status of the three deadlines. Written out for readers of the data
/// file, never trusted on load.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct DeadlineBoard {
    pub insurance: DeadlineReport,
    pub inspection: DeadlineReport,
    pub tax: DeadlineReport,
}

impl DeadlineBoard {
    pub fn get(&self, kind: DeadlineKind) -> &DeadlineReport {
        match kind {
            DeadlineKind::Insurance => &self.insurance,
            DeadlineKind::Inspection => &self.inspection,
            DeadlineKind::Tax => &self.tax,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Vehicle {
    pub name: String,
    pub license_plate: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub image_path: Option<String>,
    insurance_expiry: NaiveDate,
    inspection_expiry: NaiveDate,
    tax_expiry: NaiveDate,
    #[serde(default)]
    pub document_folders: Vec<String>,
    #[serde(default)]
    pub maintenance: Vec<MaintenanceRecord>,
    #[serde(default)]
    pub appointments: Vec<AppointmentRecord>,
    #[serde(default, skip_deserializing)]
    status: DeadlineBoard,
}

impl Vehicle {
    pub fn new(
        name: String,
        license_plate: String,
        expiries: [NaiveDate; 3],
        today: NaiveDate,
    ) -> Self {
        let [insurance_expiry, inspection_expiry, tax_expiry] = expiries;
        let mut vehicle = Vehicle {
            name,
            license_plate,
            notes: String::new(),
            image_path: None,
            insurance_expiry,
            inspection_expiry,
            tax_expiry,
            document_folders: Vec::new(),
            maintenance: Vec::new(),
            appointments: Vec::new(),
            status: DeadlineBoard::default(),
        };
        vehicle.refresh_status(today);
        vehicle
    }

    pub fn expiry(&self, kind: DeadlineKind) -> NaiveDate {
        match kind {
            DeadlineKind::Insurance => self.insurance_expiry,
            DeadlineKind::Inspection => self.inspection_expiry,
            DeadlineKind::Tax => self.tax_expiry,
        }
    }

    /// Changes one expiry date and recomputes the status cache.
    pub fn set_expiry(&mut self, kind: DeadlineKind, date: NaiveDate, today: NaiveDate) {
        match kind {
            DeadlineKind::Insurance => self.insurance_expiry = date,
            DeadlineKind::Inspection => self.inspection_expiry = date,
            DeadlineKind::Tax => self.tax_expiry = date,
        }
        self.refresh_status(today);
    }

    pub fn refresh_status(&mut self, today: NaiveDate) {
        self.status = DeadlineBoard {
            insurance: evaluate_deadline(self.insurance_expiry, today),
            inspection: evaluate_deadline(self.inspection_expiry, today),
            tax: evaluate_deadline(self.tax_expiry, today),
        };
    }

    pub fn status(&self) -> &DeadlineBoard {
        &self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::parse_date;
    use crate::status::DeadlineStatus;

    fn d(s: &str) -> NaiveDate {
        parse_date(s, "date").unwrap()
    }

    #[test]
    fn set_expiry_recomputes_only_through_the_setter() {
        let today = d("2026-10-19");
        let mut v = Vehicle::new(
            "Panda".to_string(),
            "AB123CD".to_string(),
            [d("2027-10-19"), d("2028-10-19"), d("2027-04-19")],
            today,
        );
        assert_eq!(v.status().insurance.status, DeadlineStatus::Ok);

        v.set_expiry(DeadlineKind::Insurance, d("2026-10-18"), today);
        assert_eq!(v.expiry(DeadlineKind::Insurance), d("2026-10-18"));
        assert_eq!(v.status().insurance.status, DeadlineStatus::Expired);
        assert_eq!(v.status().get(DeadlineKind::Insurance).days_text, "overdue by 1 day");
        assert_eq!(v.status().tax.status, DeadlineStatus::Ok);
    }

    #[test]
    fn status_block_is_ignored_on_load() {
        let json = r#"[{
            "name": "Panda",
            "license_plate": "AB123CD",
            "insurance_expiry": "2026-10-20",
            "inspection_expiry": "2026-10-20",
            "tax_expiry": "2026-10-20",
            "status": {"insurance": {"status": "expired", "days_remaining": -99, "days_text": "stale", "tooltip": ""}}
        }]"#;
        let db: Db = serde_json::from_str(json).unwrap();
        let v = &db.vehicles[0];
        assert_eq!(v.status().insurance.days_text, "");
        assert!(v.maintenance.is_empty());
        assert!(v.document_folders.is_empty());
    }

    #[test]
    fn enums_serialize_as_snake_case() {
        assert_eq!(serde_json::to_string(&AppointmentStatus::Cancelled).unwrap(), "\"cancelled\"");
        assert_eq!(serde_json::to_string(&LinkedDeadline::Tax).unwrap(), "\"tax\"");
        assert_eq!(LinkedDeadline::None.kind(), None);
        assert_eq!(LinkedDeadline::Inspection.kind(), Some(DeadlineKind::Inspection));
    }
}
