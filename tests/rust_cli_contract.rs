use assert_cmd::Command;
use predicates::prelude::*;

fn bin() -> Command {
    Command::cargo_bin("garage").expect("binary built")
}

fn seeded() -> (tempfile::TempDir, std::path::PathBuf) {
    let td = tempfile::tempdir().unwrap();
    let db = td.path().join("data.json");
    for (name, plate) in [("Panda", "AB123CD"), ("Punto", "XY987ZW")] {
        bin()
            .env("GARAGE_DATA_FILE", &db)
            .env("GARAGE_TODAY", "2026-10-19")
            .args(["add", name, plate])
            .assert()
            .success();
    }
    (td, db)
}

#[test]
fn ambiguous_selector_exit_code_4() {
    let (_td, db) = seeded();

    bin()
        .env("GARAGE_DATA_FILE", &db)
        .args(["show", "p"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Panda (AB123CD)"))
        .stderr(predicate::str::contains("Punto (XY987ZW)"));
}

#[test]
fn unknown_vehicle_exit_code_3() {
    let (_td, db) = seeded();

    bin()
        .env("GARAGE_DATA_FILE", &db)
        .args(["show", "Tipo"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Vehicle not found: Tipo"));
}

#[test]
fn duplicate_plate_exit_code_6() {
    let (_td, db) = seeded();

    bin()
        .env("GARAGE_DATA_FILE", &db)
        .args(["add", "Another", "ab123cd"])
        .assert()
        .code(6)
        .stderr(predicate::str::contains("already registered"));

    bin()
        .env("GARAGE_DATA_FILE", &db)
        .args(["edit", "Punto", "--plate", "AB123CD"])
        .assert()
        .code(6);
}

#[test]
fn blank_name_exit_code_6() {
    let td = tempfile::tempdir().unwrap();
    let db = td.path().join("data.json");

    bin()
        .env("GARAGE_DATA_FILE", &db)
        .args(["add", "  ", "AB123CD"])
        .assert()
        .code(6);
    assert!(!db.exists());
}

#[test]
fn bad_date_is_usage_error() {
    let td = tempfile::tempdir().unwrap();
    let db = td.path().join("data.json");

    bin()
        .env("GARAGE_DATA_FILE", &db)
        .args(["add", "Panda", "AB123CD", "--insurance", "01/11/2026"])
        .assert()
        .code(2);

    bin()
        .env("GARAGE_DATA_FILE", &db)
        .args(["--today", "2026-13-01", "list"])
        .assert()
        .code(2);
}

#[test]
fn unknown_flag_is_usage_error() {
    bin().args(["list", "--bogus"]).assert().code(2);
}

#[test]
fn export_of_empty_collection_is_refused() {
    let td = tempfile::tempdir().unwrap();
    let db = td.path().join("data.json");
    let out = td.path().join("summary.pdf");

    bin()
        .env("GARAGE_DATA_FILE", &db)
        .args(["export", "--out"])
        .arg(&out)
        .assert()
        .code(6)
        .stderr(predicate::str::contains("No vehicles to export"));
    assert!(!out.exists());
}

#[test]
fn declined_remove_keeps_vehicle() {
    let (_td, db) = seeded();

    bin()
        .env("GARAGE_DATA_FILE", &db)
        .args(["--format", "json", "remove", "Panda"])
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"cancelled\": true"));

    bin()
        .env("GARAGE_DATA_FILE", &db)
        .args(["--yes", "remove", "Panda"])
        .assert()
        .success();

    bin()
        .env("GARAGE_DATA_FILE", &db)
        .args(["--format", "json", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Punto"))
        .stdout(predicate::str::contains("Panda").not());
}

#[test]
fn oversized_cost_total_is_validation_error() {
    let (_td, db) = seeded();

    for description in ["Engine", "Gearbox"] {
        bin()
            .env("GARAGE_DATA_FILE", &db)
            .args([
                "maintenance",
                "add",
                "Panda",
                "--description",
                description,
                "--mileage",
                "1000",
                "--cost",
                "50000000000000000000000000000",
            ])
            .assert()
            .success();
    }

    bin()
        .env("GARAGE_DATA_FILE", &db)
        .args(["maintenance", "list", "Panda"])
        .assert()
        .code(6)
        .stderr(predicate::str::contains("too large"));

    bin()
        .env("GARAGE_DATA_FILE", &db)
        .args(["show", "Panda"])
        .assert()
        .code(6);
}
