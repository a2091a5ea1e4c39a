mod appointments;
mod config;
mod dashboard;
mod date;
mod db;
mod documents;
mod error;
mod export;
mod images;
mod maintenance;
mod model;
mod output;
mod prompt;
mod status;
mod vehicles;

use crate::appointments::{remove_appointment, save_appointment, AppointmentInput};
use crate::config::{resolve_color_enabled, resolve_paths, resolve_today, Paths};
use crate::dashboard::build_dashboard;
use crate::date::{fmt_display, parse_date, parse_optional_date};
use crate::db::{read_db, read_db_or_empty, update_db};
use crate::documents::{clear_folders, link_folder, list_documents, unlink_folder};
use crate::error::CliError;
use crate::export::{default_export_name, export_csv, export_pdf, summary_rows, ExportKind};
use crate::images::{discard_image, resolve_image, store_image};
use crate::maintenance::{
    ensure_unchanged, record_index, remove_maintenance, save_maintenance, total_cost, MaintenanceInput,
};
use crate::model::{AppointmentStatus, DeadlineKind, LinkedDeadline, Vehicle};
use crate::output::{render_simple_table, Styler};
use crate::prompt::confirm;
use crate::vehicles::{
    create_vehicle, edit_vehicle, list_vehicles, plate_index, remove_vehicle, select_vehicle_index,
    VehicleInput,
};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Format {
    Table,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "garage", version, about = "Track vehicle insurance, inspection and tax deadlines")]
struct Cli {
    /// Overrides the data file path for this invocation.
    #[arg(long, global = true)]
    data: Option<String>,

    /// Overrides the directory vehicle images are copied into.
    #[arg(long, global = true)]
    images_dir: Option<String>,

    /// Overrides logical "today" (YYYY-MM-DD) for deterministic output/testing.
    #[arg(long, global = true)]
    today: Option<String>,

    #[arg(long, global = true, value_enum, default_value = "table")]
    format: Format,

    /// Disables ANSI color output.
    #[arg(long, global = true)]
    no_color: bool,

    /// Answers yes to every confirmation prompt.
    #[arg(long, short = 'y', global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Registers a new vehicle.
    Add(AddArgs),
    /// Changes fields of an existing vehicle.
    Edit(EditArgs),
    /// Deletes a vehicle and all of its records.
    Remove(SelectorArgs),
    List(ListArgs),
    Show(SelectorArgs),
    /// Soon-due deadlines and near-term appointments across all vehicles.
    Dashboard,
    #[command(subcommand)]
    Maintenance(MaintenanceCommand),
    #[command(subcommand)]
    Appointment(AppointmentCommand),
    #[command(subcommand)]
    Folder(FolderCommand),
    /// Lists the files in a vehicle's linked document folders.
    Docs(SelectorArgs),
    /// Copies an image into the image store and attaches it to a vehicle.
    Photo(PhotoArgs),
    /// Writes the vehicle summary as PDF (or CSV).
    Export(ExportArgs),
}

#[derive(Args, Debug)]
struct SelectorArgs {
    /// Vehicle selector: license plate or unique name prefix (case-insensitive)
    vehicle: String,
}

#[derive(Args, Debug)]
struct AddArgs {
    name: String,

    plate: String,

    /// Insurance expiry (default: today + 1 year)
    #[arg(long)]
    insurance: Option<String>,

    /// Inspection expiry (default: today + 2 years)
    #[arg(long)]
    inspection: Option<String>,

    /// Road-tax expiry (default: today + 6 months)
    #[arg(long)]
    tax: Option<String>,

    #[arg(long)]
    notes: Option<String>,
}

#[derive(Args, Debug)]
struct EditArgs {
    /// Vehicle selector: license plate or unique name prefix (case-insensitive)
    vehicle: String,

    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    plate: Option<String>,

    #[arg(long)]
    insurance: Option<String>,

    #[arg(long)]
    inspection: Option<String>,

    #[arg(long)]
    tax: Option<String>,

    #[arg(long, conflicts_with = "clear_notes")]
    notes: Option<String>,

    #[arg(long)]
    clear_notes: bool,
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Case-insensitive filter over name, plate and notes
    #[arg(long)]
    search: Option<String>,
}

#[derive(Subcommand, Debug)]
enum MaintenanceCommand {
    Add(MaintenanceAddArgs),
    /// Edits the record at a 1-based position; omitted fields keep their value.
    Edit(MaintenanceEditArgs),
    Remove(RecordArgs),
    List(SelectorArgs),
}

#[derive(Args, Debug)]
struct RecordArgs {
    /// Vehicle selector: license plate or unique name prefix (case-insensitive)
    vehicle: String,

    /// 1-based position as shown by `list`
    position: usize,
}

#[derive(Args, Debug)]
struct MaintenanceAddArgs {
    /// Vehicle selector: license plate or unique name prefix (case-insensitive)
    vehicle: String,

    #[arg(long)]
    description: String,

    /// Odometer reading (integer)
    #[arg(long)]
    mileage: String,

    /// Cost (decimal, `.` or `,` separator)
    #[arg(long)]
    cost: String,

    /// Defaults to today
    #[arg(long)]
    date: Option<String>,
}

#[derive(Args, Debug)]
struct MaintenanceEditArgs {
    #[command(flatten)]
    record: RecordArgs,

    #[arg(long)]
    description: Option<String>,

    #[arg(long)]
    mileage: Option<String>,

    #[arg(long)]
    cost: Option<String>,

    #[arg(long)]
    date: Option<String>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum StatusArg {
    Planned,
    Confirmed,
    Completed,
    Cancelled,
}

impl StatusArg {
    fn to_model(self) -> AppointmentStatus {
        match self {
            StatusArg::Planned => AppointmentStatus::Planned,
            StatusArg::Confirmed => AppointmentStatus::Confirmed,
            StatusArg::Completed => AppointmentStatus::Completed,
            StatusArg::Cancelled => AppointmentStatus::Cancelled,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum LinkedArg {
    None,
    Insurance,
    Inspection,
    Tax,
}

impl LinkedArg {
    fn to_model(self) -> LinkedDeadline {
        match self {
            LinkedArg::None => LinkedDeadline::None,
            LinkedArg::Insurance => LinkedDeadline::Insurance,
            LinkedArg::Inspection => LinkedDeadline::Inspection,
            LinkedArg::Tax => LinkedDeadline::Tax,
        }
    }
}

#[derive(Args, Debug)]
struct AppointmentFields {
    #[arg(long)]
    date: Option<String>,

    /// Free text, e.g. 09:30
    #[arg(long)]
    time: Option<String>,

    #[arg(long, value_enum)]
    status: Option<StatusArg>,

    #[arg(long)]
    location: Option<String>,

    /// Deadline this appointment takes care of
    #[arg(long, value_enum)]
    linked: Option<LinkedArg>,

    /// Estimated cost (decimal); empty string clears it
    #[arg(long)]
    cost: Option<String>,

    #[arg(long)]
    notes: Option<String>,

    /// When the appointment is saved as completed, also records maintenance
    /// from it at this odometer reading.
    #[arg(long, value_name = "MILEAGE")]
    log_maintenance: Option<String>,
}

#[derive(Args, Debug)]
struct AppointmentAddArgs {
    /// Vehicle selector: license plate or unique name prefix (case-insensitive)
    vehicle: String,

    #[arg(long)]
    description: String,

    #[command(flatten)]
    fields: AppointmentFields,
}

#[derive(Args, Debug)]
struct AppointmentEditArgs {
    #[command(flatten)]
    record: RecordArgs,

    #[arg(long)]
    description: Option<String>,

    #[command(flatten)]
    fields: AppointmentFields,
}

#[derive(Subcommand, Debug)]
enum AppointmentCommand {
    Add(AppointmentAddArgs),
    /// Edits the appointment at a 1-based position; omitted fields keep their value.
    Edit(AppointmentEditArgs),
    Remove(RecordArgs),
    List(SelectorArgs),
}

#[derive(Args, Debug)]
struct FolderArgs {
    /// Vehicle selector: license plate or unique name prefix (case-insensitive)
    vehicle: String,

    path: String,
}

#[derive(Subcommand, Debug)]
enum FolderCommand {
    /// Links a document folder to a vehicle.
    Add(FolderArgs),
    /// Unlinks one folder.
    Remove(FolderArgs),
    /// Unlinks every folder of a vehicle.
    Clear(SelectorArgs),
}

#[derive(Args, Debug)]
struct PhotoArgs {
    /// Vehicle selector: license plate or unique name prefix (case-insensitive)
    vehicle: String,

    file: PathBuf,
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Output file (default: vehicle_summary_YYYYMMDD.pdf in the current directory)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Write CSV instead of PDF
    #[arg(long)]
    csv: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    let cli = match Cli::try_parse() {
        Ok(c) => c,
        Err(e) => {
            let code = if e.use_stderr() { 2 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    let exit = match run(cli) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{}", e);
            e.exit_code
        }
    };

    std::process::exit(exit);
}

fn print_line(s: &str) {
    println!("{}", s);
}

fn print_json<T: serde::Serialize>(obj: &T) -> Result<(), CliError> {
    let s = serde_json::to_string_pretty(obj)
        .map_err(|e| CliError::io(format!("Cannot render JSON: {}", e)))?;
    println!("{}", s);
    Ok(())
}

fn print_cancelled(format: Format) -> Result<(), CliError> {
    if format == Format::Json {
        print_json(&serde_json::json!({ "cancelled": true }))
    } else {
        print_line("Cancelled.");
        Ok(())
    }
}

struct Ctx {
    paths: Paths,
    today: NaiveDate,
    format: Format,
    assume_yes: bool,
    styler: Styler,
}

fn run(cli: Cli) -> Result<(), CliError> {
    let ctx = Ctx {
        paths: resolve_paths(cli.data.as_deref(), cli.images_dir.as_deref())?,
        today: resolve_today(cli.today.as_deref())?,
        format: cli.format,
        assume_yes: cli.yes,
        styler: Styler::new(resolve_color_enabled(cli.no_color)),
    };

    match cli.command {
        Command::Add(args) => cmd_add(&ctx, args),
        Command::Edit(args) => cmd_edit(&ctx, args),
        Command::Remove(args) => cmd_remove(&ctx, args),
        Command::List(args) => cmd_list(&ctx, args),
        Command::Show(args) => cmd_show(&ctx, args),
        Command::Dashboard => cmd_dashboard(&ctx),
        Command::Maintenance(c) => cmd_maintenance(&ctx, c),
        Command::Appointment(c) => cmd_appointment(&ctx, c),
        Command::Folder(c) => cmd_folder(&ctx, c),
        Command::Docs(args) => cmd_docs(&ctx, args),
        Command::Photo(args) => cmd_photo(&ctx, args),
        Command::Export(args) => cmd_export(&ctx, args),
    }
}

fn deadline_cells(styler: &Styler, v: &Vehicle) -> Vec<String> {
    DeadlineKind::ALL
        .iter()
        .map(|k| {
            let r = v.status().get(*k);
            styler.deadline(r.status, &r.days_text)
        })
        .collect()
}

fn cmd_add(ctx: &Ctx, args: AddArgs) -> Result<(), CliError> {
    let input = VehicleInput {
        name: Some(args.name),
        license_plate: Some(args.plate),
        notes: args.notes,
        insurance_expiry: parse_optional_date(args.insurance.as_deref(), "insurance")?,
        inspection_expiry: parse_optional_date(args.inspection.as_deref(), "inspection")?,
        tax_expiry: parse_optional_date(args.tax.as_deref(), "tax")?,
    };

    let created = update_db(&ctx.paths.data_file, ctx.today, |db| {
        let idx = create_vehicle(db, &input, ctx.today)?;
        Ok(db.vehicles[idx].clone())
    })?;
    log::info!("created vehicle {} ({})", created.name, created.license_plate);

    if ctx.format == Format::Json {
        #[derive(serde::Serialize)]
        struct Out {
            vehicle: Vehicle,
        }
        print_json(&Out { vehicle: created })?;
    } else {
        print_line(&format!(
            "Created: {} ({})",
            created.name, created.license_plate
        ));
        let mut row = vec![created.name.clone(), created.license_plate.clone()];
        row.extend(deadline_cells(&ctx.styler, &created));
        print_line(&render_simple_table(
            &["name", "plate", "insurance", "inspection", "tax"],
            &[row],
        ));
    }
    Ok(())
}

fn cmd_edit(ctx: &Ctx, args: EditArgs) -> Result<(), CliError> {
    let notes = if args.clear_notes {
        Some(String::new())
    } else {
        args.notes
    };
    let input = VehicleInput {
        name: args.name,
        license_plate: args.plate,
        notes,
        insurance_expiry: parse_optional_date(args.insurance.as_deref(), "insurance")?,
        inspection_expiry: parse_optional_date(args.inspection.as_deref(), "inspection")?,
        tax_expiry: parse_optional_date(args.tax.as_deref(), "tax")?,
    };

    let updated = update_db(&ctx.paths.data_file, ctx.today, |db| {
        let idx = select_vehicle_index(db, &args.vehicle)?;
        edit_vehicle(db, idx, &input, ctx.today)?;
        Ok(db.vehicles[idx].clone())
    })?;
    log::info!("updated vehicle {} ({})", updated.name, updated.license_plate);

    if ctx.format == Format::Json {
        #[derive(serde::Serialize)]
        struct Out {
            vehicle: Vehicle,
        }
        print_json(&Out { vehicle: updated })?;
    } else {
        print_line(&format!(
            "Saved: {} ({})",
            updated.name, updated.license_plate
        ));
    }
    Ok(())
}

fn cmd_remove(ctx: &Ctx, args: SelectorArgs) -> Result<(), CliError> {
    let db = read_db(&ctx.paths.data_file, ctx.today)?;
    let idx = select_vehicle_index(&db, &args.vehicle)?;
    let target = &db.vehicles[idx];

    let question = format!(
        "Delete '{}' ({}) with {} maintenance and {} appointment record(s)?",
        target.name,
        target.license_plate,
        target.maintenance.len(),
        target.appointments.len()
    );
    if !confirm(&question, ctx.assume_yes)? {
        return print_cancelled(ctx.format);
    }

    let plate = target.license_plate.clone();
    let removed = update_db(&ctx.paths.data_file, ctx.today, |db| {
        let idx = plate_index(db, &plate)?;
        remove_vehicle(db, idx)
    })?;
    log::info!("removed vehicle {} ({})", removed.name, removed.license_plate);

    if ctx.format == Format::Json {
        #[derive(serde::Serialize)]
        struct Out {
            removed: Vehicle,
        }
        print_json(&Out { removed })?;
    } else {
        print_line(&format!(
            "Removed: {} ({})",
            removed.name, removed.license_plate
        ));
    }
    Ok(())
}

fn cmd_list(ctx: &Ctx, args: ListArgs) -> Result<(), CliError> {
    let db = read_db_or_empty(&ctx.paths.data_file, ctx.today);
    let vehicles = list_vehicles(&db, args.search.as_deref());

    if ctx.format == Format::Json {
        #[derive(serde::Serialize)]
        struct Out<'a> {
            vehicles: Vec<&'a Vehicle>,
        }
        return print_json(&Out { vehicles });
    }

    if vehicles.is_empty() {
        print_line(&ctx.styler.gray("(no vehicles)"));
        return Ok(());
    }

    let rows: Vec<Vec<String>> = vehicles
        .iter()
        .map(|v| {
            let mut row = vec![v.name.clone(), v.license_plate.clone()];
            row.extend(deadline_cells(&ctx.styler, v));
            row
        })
        .collect();
    print_line(&render_simple_table(
        &["name", "plate", "insurance", "inspection", "tax"],
        &rows,
    ));
    Ok(())
}

fn cmd_show(ctx: &Ctx, args: SelectorArgs) -> Result<(), CliError> {
    let db = read_db_or_empty(&ctx.paths.data_file, ctx.today);
    let idx = select_vehicle_index(&db, &args.vehicle)?;
    let v = &db.vehicles[idx];
    let image = resolve_image(&ctx.paths.images_dir, v);

    if ctx.format == Format::Json {
        #[derive(serde::Serialize)]
        struct Out<'a> {
            vehicle: &'a Vehicle,
            image: Option<PathBuf>,
        }
        return print_json(&Out { vehicle: v, image });
    }

    print_line(&ctx.styler.bold(&format!("{} ({})", v.name, v.license_plate)));
    for kind in DeadlineKind::ALL {
        let r = v.status().get(kind);
        print_line(&format!(
            "{}: {}  {}",
            kind.label().to_lowercase(),
            fmt_display(v.expiry(kind)),
            ctx.styler.deadline(r.status, &r.days_text)
        ));
    }
    if !v.notes.is_empty() {
        print_line(&format!("notes: {}", v.notes));
    }
    if let Some(p) = image {
        print_line(&format!("image: {}", p.display()));
    }
    if !v.document_folders.is_empty() {
        print_line("folders:");
        for f in v.document_folders.iter() {
            print_line(&format!("- {}", f));
        }
    }
    if !v.maintenance.is_empty() {
        print_line(&format!(
            "maintenance: {} record(s), total {}",
            v.maintenance.len(),
            total_cost(v)?
        ));
    }
    if !v.appointments.is_empty() {
        print_line(&format!("appointments: {}", v.appointments.len()));
    }
    Ok(())
}

fn cmd_dashboard(ctx: &Ctx) -> Result<(), CliError> {
    let db = read_db_or_empty(&ctx.paths.data_file, ctx.today);
    let dash = build_dashboard(&db, ctx.today);

    if ctx.format == Format::Json {
        return print_json(&dash);
    }

    print_line(&format!(
        "Dashboard ({}) - {} vehicle(s)",
        fmt_display(dash.date),
        dash.total_vehicles
    ));
    print_line("");
    print_line("Upcoming deadlines");
    if dash.upcoming_deadlines.is_empty() {
        print_line(&ctx.styler.gray("(no upcoming deadlines)"));
    } else {
        let rows: Vec<Vec<String>> = dash
            .upcoming_deadlines
            .iter()
            .map(|r| {
                vec![
                    r.vehicle_name.clone(),
                    r.kind.label().to_string(),
                    fmt_display(r.expiry_date),
                    ctx.styler.deadline(r.urgency, &r.days_text),
                ]
            })
            .collect();
        print_line(&render_simple_table(
            &["vehicle", "deadline", "expires", "status"],
            &rows,
        ));
    }

    print_line("");
    print_line("Upcoming appointments");
    if dash.upcoming_appointments.is_empty() {
        print_line(&ctx.styler.gray("(no appointments in the next 7 days)"));
    } else {
        let rows: Vec<Vec<String>> = dash
            .upcoming_appointments
            .iter()
            .map(|r| {
                let when = if r.has_time {
                    r.starts_at.format("%d/%m/%Y %H:%M").to_string()
                } else {
                    fmt_display(r.starts_at.date())
                };
                vec![
                    when,
                    r.vehicle_name.clone(),
                    r.description.clone(),
                    r.status.as_str().to_string(),
                ]
            })
            .collect();
        print_line(&render_simple_table(
            &["when", "vehicle", "description", "status"],
            &rows,
        ));
    }
    Ok(())
}

fn maintenance_table(v: &Vehicle) -> String {
    let rows: Vec<Vec<String>> = v
        .maintenance
        .iter()
        .enumerate()
        .map(|(i, m)| {
            vec![
                (i + 1).to_string(),
                fmt_display(m.date),
                m.description.clone(),
                m.mileage.to_string(),
                m.cost.to_string(),
            ]
        })
        .collect();
    render_simple_table(&["#", "date", "description", "mileage", "cost"], &rows)
}

fn cmd_maintenance(ctx: &Ctx, command: MaintenanceCommand) -> Result<(), CliError> {
    match command {
        MaintenanceCommand::Add(args) => {
            let input = MaintenanceInput {
                date: parse_optional_date(args.date.as_deref(), "date")?.unwrap_or(ctx.today),
                description: args.description,
                mileage: args.mileage,
                cost: args.cost,
            };
            let (vehicle, idx) = update_db(&ctx.paths.data_file, ctx.today, |db| {
                let vi = select_vehicle_index(db, &args.vehicle)?;
                let idx = save_maintenance(&mut db.vehicles[vi], None, &input)?;
                Ok((db.vehicles[vi].clone(), idx))
            })?;
            print_saved_maintenance(ctx, &vehicle, idx, "Added")
        }

        MaintenanceCommand::Edit(args) => {
            let date = parse_optional_date(args.date.as_deref(), "date")?;
            let (vehicle, idx) = update_db(&ctx.paths.data_file, ctx.today, |db| {
                let vi = select_vehicle_index(db, &args.record.vehicle)?;
                let v = &mut db.vehicles[vi];
                let idx = record_index(args.record.position, v.maintenance.len(), "Maintenance")?;
                let current = &v.maintenance[idx];
                let input = MaintenanceInput {
                    date: date.unwrap_or(current.date),
                    description: args
                        .description
                        .clone()
                        .unwrap_or_else(|| current.description.clone()),
                    mileage: args
                        .mileage
                        .clone()
                        .unwrap_or_else(|| current.mileage.to_string()),
                    cost: args.cost.clone().unwrap_or_else(|| current.cost.to_string()),
                };
                save_maintenance(v, Some(idx), &input)?;
                Ok((v.clone(), idx))
            })?;
            print_saved_maintenance(ctx, &vehicle, idx, "Saved")
        }

        MaintenanceCommand::Remove(args) => {
            let db = read_db(&ctx.paths.data_file, ctx.today)?;
            let vi = select_vehicle_index(&db, &args.vehicle)?;
            let v = &db.vehicles[vi];
            let idx = record_index(args.position, v.maintenance.len(), "Maintenance")?;
            let rec = &v.maintenance[idx];
            let question = format!(
                "Delete maintenance '{}' of {}?",
                rec.description,
                fmt_display(rec.date)
            );
            if !confirm(&question, ctx.assume_yes)? {
                return print_cancelled(ctx.format);
            }

            let plate = v.license_plate.clone();
            let confirmed = rec.clone();
            let removed = update_db(&ctx.paths.data_file, ctx.today, |db| {
                let vi = plate_index(db, &plate)?;
                let v = &mut db.vehicles[vi];
                ensure_unchanged(&v.maintenance, idx, &confirmed, "Maintenance")?;
                remove_maintenance(v, idx)
            })?;
            log::info!("removed maintenance '{}' from {}", removed.description, plate);

            if ctx.format == Format::Json {
                return print_json(&serde_json::json!({ "removed": removed }));
            }
            print_line(&format!("Removed maintenance: {}", removed.description));
            Ok(())
        }

        MaintenanceCommand::List(args) => {
            let db = read_db_or_empty(&ctx.paths.data_file, ctx.today);
            let vi = select_vehicle_index(&db, &args.vehicle)?;
            let v = &db.vehicles[vi];

            if ctx.format == Format::Json {
                return print_json(&serde_json::json!({
                    "vehicle": v.name,
                    "maintenance": v.maintenance,
                    "total_cost": total_cost(v)?,
                }));
            }
            print_line(&maintenance_table(v));
            print_line(&format!("total: {}", total_cost(v)?));
            Ok(())
        }
    }
}

fn print_saved_maintenance(ctx: &Ctx, v: &Vehicle, idx: usize, verb: &str) -> Result<(), CliError> {
    let rec = &v.maintenance[idx];
    log::info!("{} maintenance #{} on {}", verb.to_lowercase(), idx + 1, v.license_plate);
    if ctx.format == Format::Json {
        return print_json(&serde_json::json!({
            "vehicle": v.name,
            "position": idx + 1,
            "maintenance": rec,
        }));
    }
    print_line(&format!(
        "{} maintenance #{} for {}: {} ({} km, {})",
        verb,
        idx + 1,
        v.name,
        rec.description,
        rec.mileage,
        rec.cost
    ));
    Ok(())
}

fn appointment_input(
    base: AppointmentInput,
    description: Option<String>,
    fields: &AppointmentFields,
) -> Result<AppointmentInput, CliError> {
    Ok(AppointmentInput {
        date: match fields.date.as_deref() {
            Some(d) => parse_date(d, "date")?,
            None => base.date,
        },
        time: fields.time.clone().unwrap_or(base.time),
        description: description.unwrap_or(base.description),
        status: fields.status.map(StatusArg::to_model).unwrap_or(base.status),
        location: fields.location.clone().unwrap_or(base.location),
        linked_deadline: fields.linked.map(LinkedArg::to_model).unwrap_or(base.linked_deadline),
        estimated_cost: fields.cost.clone().unwrap_or(base.estimated_cost),
        notes: fields.notes.clone().unwrap_or(base.notes),
    })
}

fn empty_appointment_input(today: NaiveDate) -> AppointmentInput {
    AppointmentInput {
        date: today,
        time: String::new(),
        description: String::new(),
        status: AppointmentStatus::Planned,
        location: String::new(),
        linked_deadline: LinkedDeadline::None,
        estimated_cost: String::new(),
        notes: String::new(),
    }
}

#[derive(serde::Serialize)]
struct AppointmentOut {
    vehicle: String,
    license_plate: String,
    position: usize,
    appointment: crate::model::AppointmentRecord,
    maintenance_draft: Option<crate::maintenance::MaintenanceDraft>,
    logged_maintenance: Option<usize>,
}

/// Saves the appointment and, when asked and completed, the maintenance
/// record drafted from it. Both happen in one write or not at all.
fn save_appointment_and_log(
    v: &mut Vehicle,
    selected: Option<usize>,
    input: &AppointmentInput,
    log_mileage: Option<&str>,
) -> Result<AppointmentOut, CliError> {
    if log_mileage.is_some() && input.status != AppointmentStatus::Completed {
        return Err(CliError::usage(
            "--log-maintenance needs the appointment status to be completed",
        ));
    }

    let saved = save_appointment(v, selected, input)?;

    let logged_maintenance = match (log_mileage, saved.maintenance_draft.clone()) {
        (Some(mileage), Some(draft)) => {
            if draft.cost.is_none() {
                return Err(CliError::validation(
                    "Appointment has no estimated cost; record the maintenance with `garage maintenance add`",
                ));
            }
            let idx = save_maintenance(v, None, &draft.into_input(mileage))?;
            Some(idx + 1)
        }
        _ => None,
    };

    Ok(AppointmentOut {
        vehicle: v.name.clone(),
        license_plate: v.license_plate.clone(),
        position: saved.index + 1,
        appointment: saved.record,
        maintenance_draft: saved.maintenance_draft,
        logged_maintenance,
    })
}

fn print_saved_appointment(ctx: &Ctx, out: &AppointmentOut, verb: &str) -> Result<(), CliError> {
    log::info!("{} appointment #{} on {}", verb.to_lowercase(), out.position, out.vehicle);
    if ctx.format == Format::Json {
        return print_json(out);
    }

    let a = &out.appointment;
    print_line(&format!(
        "{} appointment #{} for {}: {} on {} {} ({})",
        verb,
        out.position,
        out.vehicle,
        a.description,
        fmt_display(a.date),
        a.time,
        a.status.as_str()
    ));
    if let Some(n) = out.logged_maintenance {
        print_line(&format!("Recorded maintenance #{} from this appointment.", n));
    } else if let Some(draft) = out.maintenance_draft.as_ref() {
        let cost = draft
            .cost
            .map(|c| format!(" --cost {}", c))
            .unwrap_or_default();
        print_line(&format!(
            "Completed. To record it as maintenance: garage maintenance add \"{}\" --date {} --description \"{}\" --mileage <KM>{}",
            out.license_plate,
            draft.date.format("%Y-%m-%d"),
            draft.description,
            if cost.is_empty() { " --cost <AMOUNT>".to_string() } else { cost }
        ));
    }
    Ok(())
}

fn cmd_appointment(ctx: &Ctx, command: AppointmentCommand) -> Result<(), CliError> {
    match command {
        AppointmentCommand::Add(args) => {
            let input = appointment_input(
                empty_appointment_input(ctx.today),
                Some(args.description),
                &args.fields,
            )?;
            let out = update_db(&ctx.paths.data_file, ctx.today, |db| {
                let vi = select_vehicle_index(db, &args.vehicle)?;
                save_appointment_and_log(
                    &mut db.vehicles[vi],
                    None,
                    &input,
                    args.fields.log_maintenance.as_deref(),
                )
            })?;
            print_saved_appointment(ctx, &out, "Added")
        }

        AppointmentCommand::Edit(args) => {
            let out = update_db(&ctx.paths.data_file, ctx.today, |db| {
                let vi = select_vehicle_index(db, &args.record.vehicle)?;
                let v = &mut db.vehicles[vi];
                let idx = record_index(args.record.position, v.appointments.len(), "Appointment")?;
                let base = AppointmentInput::from_record(&v.appointments[idx]);
                let input = appointment_input(base, args.description.clone(), &args.fields)?;
                save_appointment_and_log(v, Some(idx), &input, args.fields.log_maintenance.as_deref())
            })?;
            print_saved_appointment(ctx, &out, "Saved")
        }

        AppointmentCommand::Remove(args) => {
            let db = read_db(&ctx.paths.data_file, ctx.today)?;
            let vi = select_vehicle_index(&db, &args.vehicle)?;
            let v = &db.vehicles[vi];
            let idx = record_index(args.position, v.appointments.len(), "Appointment")?;
            let a = &v.appointments[idx];
            let question = format!(
                "Delete appointment '{}' of {}?",
                a.description,
                fmt_display(a.date)
            );
            if !confirm(&question, ctx.assume_yes)? {
                return print_cancelled(ctx.format);
            }

            let plate = v.license_plate.clone();
            let confirmed = a.clone();
            let removed = update_db(&ctx.paths.data_file, ctx.today, |db| {
                let vi = plate_index(db, &plate)?;
                let v = &mut db.vehicles[vi];
                ensure_unchanged(&v.appointments, idx, &confirmed, "Appointment")?;
                remove_appointment(v, idx)
            })?;
            log::info!("removed appointment '{}' from {}", removed.description, plate);

            if ctx.format == Format::Json {
                return print_json(&serde_json::json!({ "removed": removed }));
            }
            print_line(&format!("Removed appointment: {}", removed.description));
            Ok(())
        }

        AppointmentCommand::List(args) => {
            let db = read_db_or_empty(&ctx.paths.data_file, ctx.today);
            let vi = select_vehicle_index(&db, &args.vehicle)?;
            let v = &db.vehicles[vi];

            if ctx.format == Format::Json {
                return print_json(&serde_json::json!({
                    "vehicle": v.name,
                    "appointments": v.appointments,
                }));
            }

            let rows: Vec<Vec<String>> = v
                .appointments
                .iter()
                .enumerate()
                .map(|(i, a)| {
                    vec![
                        (i + 1).to_string(),
                        fmt_display(a.date),
                        a.time.clone(),
                        a.description.clone(),
                        a.status.as_str().to_string(),
                        a.linked_deadline.as_str().to_string(),
                        a.location.clone(),
                        a.estimated_cost.map(|c| c.to_string()).unwrap_or_default(),
                    ]
                })
                .collect();
            print_line(&render_simple_table(
                &["#", "date", "time", "description", "status", "deadline", "location", "cost"],
                &rows,
            ));
            Ok(())
        }
    }
}

fn cmd_folder(ctx: &Ctx, command: FolderCommand) -> Result<(), CliError> {
    match command {
        FolderCommand::Add(args) => {
            let (folder, added) = update_db(&ctx.paths.data_file, ctx.today, |db| {
                let vi = select_vehicle_index(db, &args.vehicle)?;
                link_folder(&mut db.vehicles[vi], &args.path)
            })?;
            if ctx.format == Format::Json {
                return print_json(&serde_json::json!({ "folder": folder, "added": added }));
            }
            if added {
                print_line(&format!("Linked folder: {}", folder));
            } else {
                print_line(&format!("Folder already linked: {}", folder));
            }
            Ok(())
        }

        FolderCommand::Remove(args) => {
            let folder = update_db(&ctx.paths.data_file, ctx.today, |db| {
                let vi = select_vehicle_index(db, &args.vehicle)?;
                unlink_folder(&mut db.vehicles[vi], &args.path)
            })?;
            if ctx.format == Format::Json {
                return print_json(&serde_json::json!({ "removed": folder }));
            }
            print_line(&format!("Unlinked folder: {}", folder));
            Ok(())
        }

        FolderCommand::Clear(args) => {
            let db = read_db(&ctx.paths.data_file, ctx.today)?;
            let vi = select_vehicle_index(&db, &args.vehicle)?;
            let v = &db.vehicles[vi];
            let question = format!("Unlink all {} folder(s) of '{}'?", v.document_folders.len(), v.name);
            if !confirm(&question, ctx.assume_yes)? {
                return print_cancelled(ctx.format);
            }

            let plate = v.license_plate.clone();
            let cleared = update_db(&ctx.paths.data_file, ctx.today, |db| {
                let vi = plate_index(db, &plate)?;
                Ok(clear_folders(&mut db.vehicles[vi]))
            })?;
            if ctx.format == Format::Json {
                return print_json(&serde_json::json!({ "cleared": cleared }));
            }
            print_line(&format!("Unlinked {} folder(s).", cleared));
            Ok(())
        }
    }
}

fn cmd_docs(ctx: &Ctx, args: SelectorArgs) -> Result<(), CliError> {
    let db = read_db_or_empty(&ctx.paths.data_file, ctx.today);
    let vi = select_vehicle_index(&db, &args.vehicle)?;
    let listing = list_documents(&db.vehicles[vi].document_folders);

    if ctx.format == Format::Json {
        return print_json(&listing);
    }

    if listing.documents.is_empty() {
        print_line(&ctx.styler.gray("(no documents)"));
    } else {
        let rows: Vec<Vec<String>> = listing
            .documents
            .iter()
            .map(|d| vec![d.name.clone(), d.size.to_string(), d.path.display().to_string()])
            .collect();
        print_line(&render_simple_table(&["name", "bytes", "path"], &rows));
    }
    for w in listing.warnings.iter() {
        eprintln!("Cannot read folder '{}': {}", w.folder, w.message);
    }
    Ok(())
}

fn cmd_photo(ctx: &Ctx, args: PhotoArgs) -> Result<(), CliError> {
    // A fresh copy that no vehicle ends up referencing is removed again.
    let mut unattached: Option<String> = None;
    let saved = update_db(&ctx.paths.data_file, ctx.today, |db| {
        let vi = select_vehicle_index(db, &args.vehicle)?;
        let v = &mut db.vehicles[vi];
        let stored = store_image(&ctx.paths.images_dir, &v.license_plate, &args.file)?;
        if v.image_path.as_deref() != Some(stored.as_str()) {
            unattached = Some(stored.clone());
        }
        v.image_path = Some(stored.clone());
        Ok((v.name.clone(), stored))
    });
    let (name, stored) = match saved {
        Ok(r) => r,
        Err(e) => {
            if let Some(copy) = unattached {
                discard_image(&ctx.paths.images_dir, &copy);
            }
            return Err(e);
        }
    };

    if ctx.format == Format::Json {
        return print_json(&serde_json::json!({
            "vehicle": name,
            "image": stored,
            "path": ctx.paths.images_dir.join(&stored),
        }));
    }
    print_line(&format!("Image for {}: {}", name, stored));
    Ok(())
}

fn cmd_export(ctx: &Ctx, args: ExportArgs) -> Result<(), CliError> {
    let db = read_db_or_empty(&ctx.paths.data_file, ctx.today);
    if db.vehicles.is_empty() {
        return Err(CliError::validation("No vehicles to export"));
    }

    let kind = match args.out.as_ref().and_then(|p| p.extension()) {
        _ if args.csv => ExportKind::Csv,
        Some(ext) if ext.eq_ignore_ascii_case("csv") => ExportKind::Csv,
        _ => ExportKind::Pdf,
    };
    let out = args
        .out
        .unwrap_or_else(|| PathBuf::from(default_export_name(ctx.today, kind)));

    let rows = summary_rows(&db);
    let pages = match kind {
        ExportKind::Pdf => Some(export_pdf(&out, &rows, ctx.today)?),
        ExportKind::Csv => {
            export_csv(&out, &rows)?;
            None
        }
    };

    if ctx.format == Format::Json {
        return print_json(&serde_json::json!({
            "path": out,
            "vehicles": rows.len(),
            "pages": pages,
        }));
    }
    print_line(&format!("Exported {} vehicle(s) to {}", rows.len(), out.display()));
    Ok(())
}
