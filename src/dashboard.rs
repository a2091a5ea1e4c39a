use crate::date::{add_days, days_until, parse_time_of_day};
use crate::model::{AppointmentStatus, Db, DeadlineKind};
use crate::status::{days_remaining_text, DeadlineStatus};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

pub const DASHBOARD_LIMIT: usize = 5;
/// Deadlines that expired longer ago than this drop off the dashboard.
pub const DEADLINE_GRACE_DAYS: i64 = 15;
pub const APPOINTMENT_HORIZON_DAYS: i64 = 7;

#[derive(Debug, Clone, serde::Serialize)]
pub struct Dashboard {
    pub date: NaiveDate,
    pub total_vehicles: usize,
    pub upcoming_deadlines: Vec<DeadlineRow>,
    pub upcoming_appointments: Vec<AppointmentRow>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DeadlineRow {
    pub vehicle_name: String,
    pub license_plate: String,
    pub kind: DeadlineKind,
    pub expiry_date: NaiveDate,
    pub days_remaining: i64,
    pub days_text: String,
    pub urgency: DeadlineStatus,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AppointmentRow {
    pub vehicle_name: String,
    pub description: String,
    pub location: String,
    pub status: AppointmentStatus,
    /// Appointment date, plus the time of day when the free-text time parses.
    pub starts_at: NaiveDateTime,
    pub has_time: bool,
}

fn upcoming_deadlines(db: &Db, today: NaiveDate) -> Vec<DeadlineRow> {
    let cutoff = add_days(today, -DEADLINE_GRACE_DAYS);

    let mut rows: Vec<DeadlineRow> = db
        .vehicles
        .iter()
        .flat_map(|v| {
            DeadlineKind::ALL.into_iter().map(move |kind| {
                let expiry = v.expiry(kind);
                let days = days_until(today, expiry);
                DeadlineRow {
                    vehicle_name: v.name.clone(),
                    license_plate: v.license_plate.clone(),
                    kind,
                    expiry_date: expiry,
                    days_remaining: days,
                    days_text: days_remaining_text(days),
                    urgency: DeadlineStatus::from_days_remaining(days),
                }
            })
        })
        .filter(|r| r.expiry_date >= cutoff)
        .collect();

    // Stable: ties keep vehicle order, then insurance/inspection/tax.
    rows.sort_by_key(|r| r.expiry_date);
    rows.truncate(DASHBOARD_LIMIT);
    rows
}

fn upcoming_appointments(db: &Db, today: NaiveDate) -> Vec<AppointmentRow> {
    let horizon = add_days(today, APPOINTMENT_HORIZON_DAYS);

    let mut rows: Vec<AppointmentRow> = db
        .vehicles
        .iter()
        .flat_map(|v| v.appointments.iter().map(move |a| (v, a)))
        .filter(|(_, a)| a.date >= today && a.date <= horizon)
        .map(|(v, a)| {
            let time = parse_time_of_day(&a.time);
            AppointmentRow {
                vehicle_name: v.name.clone(),
                description: a.description.clone(),
                location: a.location.clone(),
                status: a.status,
                starts_at: a.date.and_time(time.unwrap_or(NaiveTime::MIN)),
                has_time: time.is_some(),
            }
        })
        .collect();

    rows.sort_by_key(|r| r.starts_at);
    rows.truncate(DASHBOARD_LIMIT);
    rows
}

/// Full recompute; cheap enough to call after every mutation.
pub fn build_dashboard(db: &Db, today: NaiveDate) -> Dashboard {
    Dashboard {
        date: today,
        total_vehicles: db.vehicles.len(),
        upcoming_deadlines: upcoming_deadlines(db, today),
        upcoming_appointments: upcoming_appointments(db, today),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::parse_date;
    use crate::model::{AppointmentRecord, LinkedDeadline, Vehicle};

    fn d(s: &str) -> NaiveDate {
        parse_date(s, "date").unwrap()
    }

    fn today() -> NaiveDate {
        d("2026-10-19")
    }

    fn vehicle(name: &str, offsets: [i64; 3]) -> Vehicle {
        let t = today();
        Vehicle::new(
            name.to_string(),
            format!("{}-PLATE", name),
            offsets.map(|o| add_days(t, o)),
            t,
        )
    }

    fn appointment(date: NaiveDate, time: &str, description: &str) -> AppointmentRecord {
        AppointmentRecord {
            date,
            time: time.to_string(),
            description: description.to_string(),
            status: AppointmentStatus::Planned,
            location: String::new(),
            linked_deadline: LinkedDeadline::None,
            estimated_cost: None,
            notes: String::new(),
        }
    }

    #[test]
    fn deadlines_are_filtered_sorted_and_capped() {
        let db = Db {
            vehicles: vec![
                vehicle("A", [-16, -15, 40]),
                vehicle("B", [3, -2, 400]),
                vehicle("C", [10, 0, 90]),
            ],
        };
        let dash = build_dashboard(&db, today());
        let rows = &dash.upcoming_deadlines;

        assert_eq!(rows.len(), DASHBOARD_LIMIT);
        assert!(rows.windows(2).all(|w| w[0].expiry_date <= w[1].expiry_date));
        let cutoff = add_days(today(), -DEADLINE_GRACE_DAYS);
        assert!(rows.iter().all(|r| r.expiry_date >= cutoff));

        assert_eq!(rows[0].vehicle_name, "A");
        assert_eq!(rows[0].kind, DeadlineKind::Inspection);
        assert_eq!(rows[0].days_text, "overdue by 15 days");
        assert_eq!(rows[0].urgency, DeadlineStatus::Expired);
        assert_eq!(rows[1].days_remaining, -2);
        assert_eq!(rows[2].days_text, "due today");
        assert_eq!(rows[4].urgency, DeadlineStatus::Warning);
        assert_eq!(dash.total_vehicles, 3);
    }

    #[test]
    fn appointments_window_is_today_to_one_week() {
        let t = today();
        let mut v = vehicle("A", [100, 100, 100]);
        v.appointments.push(appointment(add_days(t, -1), "", "yesterday"));
        v.appointments.push(appointment(add_days(t, 8), "", "too far"));
        v.appointments.push(appointment(add_days(t, 7), "", "edge"));
        v.appointments.push(appointment(t, "", "today"));
        let db = Db { vehicles: vec![v] };

        let rows = build_dashboard(&db, t).upcoming_appointments;
        let names: Vec<&str> = rows.iter().map(|r| r.description.as_str()).collect();
        assert_eq!(names, vec!["today", "edge"]);
    }

    #[test]
    fn appointments_combine_parsed_time_and_cap() {
        let t = today();
        let mut a = vehicle("A", [100, 100, 100]);
        let mut b = vehicle("B", [100, 100, 100]);
        a.appointments.push(appointment(add_days(t, 1), "15:00", "afternoon"));
        b.appointments.push(appointment(add_days(t, 1), "08:30", "morning"));
        a.appointments.push(appointment(add_days(t, 1), "after lunch", "vague"));
        for i in 2..6 {
            b.appointments.push(appointment(add_days(t, i), "", "later"));
        }
        let db = Db { vehicles: vec![a, b] };

        let rows = build_dashboard(&db, t).upcoming_appointments;
        assert_eq!(rows.len(), DASHBOARD_LIMIT);
        assert_eq!(rows[0].description, "vague");
        assert!(!rows[0].has_time);
        assert_eq!(rows[1].description, "morning");
        assert_eq!(rows[1].starts_at, add_days(t, 1).and_hms_opt(8, 30, 0).unwrap());
        assert!(rows[1].has_time);
        assert_eq!(rows[2].description, "afternoon");
        assert!(rows.windows(2).all(|w| w[0].starts_at <= w[1].starts_at));
    }

    #[test]
    fn empty_collection_gives_empty_projections() {
        let dash = build_dashboard(&Db::default(), today());
        assert_eq!(dash.total_vehicles, 0);
        assert!(dash.upcoming_deadlines.is_empty());
        assert!(dash.upcoming_appointments.is_empty());
    }
}
