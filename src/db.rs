use crate::error::CliError;
use crate::model::Db;
use chrono::NaiveDate;
use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

fn io_error(action: &str, path: &Path, e: impl std::fmt::Display) -> CliError {
    CliError::io(format!("Cannot {} {}: {}", action, path.display(), e))
}

/// Loads the document and refreshes every vehicle's status against `today`.
/// A missing file is an empty collection.
pub fn read_db(db_path: &Path, today: NaiveDate) -> Result<Db, CliError> {
    let mut db = match fs::read_to_string(db_path) {
        Ok(txt) => serde_json::from_str::<Db>(&txt)
            .map_err(|e| io_error("parse", db_path, e))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Db::default(),
        Err(e) => return Err(io_error("read", db_path, e)),
    };

    for vehicle in db.vehicles.iter_mut() {
        vehicle.refresh_status(today);
    }

    log::debug!(
        "loaded {} vehicle(s) from {}",
        db.vehicles.len(),
        db_path.display()
    );
    Ok(db)
}

/// Read-only commands keep working on an unreadable document.
pub fn read_db_or_empty(db_path: &Path, today: NaiveDate) -> Db {
    match read_db(db_path, today) {
        Ok(db) => db,
        Err(e) => {
            log::warn!("{}; continuing with an empty vehicle list", e);
            Db::default()
        }
    }
}

fn ensure_parent_dir(db_path: &Path) -> Result<(), CliError> {
    let dir = match db_path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => return Ok(()),
    };
    fs::create_dir_all(dir).map_err(|e| io_error("create", dir, e))?;

    #[cfg(unix)]
    {
        let _ = fs::set_permissions(dir, fs::Permissions::from_mode(0o700));
    }

    Ok(())
}

struct WriteLock {
    path: PathBuf,
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn with_write_lock<R>(
    db_path: &Path,
    f: impl FnOnce() -> Result<R, CliError>,
) -> Result<R, CliError> {
    let lock_path = PathBuf::from(format!("{}.lock", db_path.display()));

    match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&lock_path)
    {
        Ok(_file) => {
            let _guard = WriteLock { path: lock_path };
            f()
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(CliError::io(format!(
            "Data file is locked by another process ({})",
            lock_path.display()
        ))),
        Err(e) => Err(io_error("lock", &lock_path, e)),
    }
}

/// Fills `tmp_path` and renames it over `db_path`. On any failure the
/// tmp file is removed and `db_path` is left as it was.
fn replace_via_tmp(
    db_path: &Path,
    tmp_path: &Path,
    fill: impl FnOnce(&mut fs::File) -> std::io::Result<()>,
) -> Result<(), CliError> {
    let result = (|| {
        let mut f = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(tmp_path)
            .map_err(|e| io_error("write", tmp_path, e))?;

        #[cfg(unix)]
        {
            let _ = f.set_permissions(fs::Permissions::from_mode(0o600));
        }

        fill(&mut f)
            .and_then(|_| f.flush())
            .map_err(|e| io_error("write", tmp_path, e))?;
        drop(f);

        fs::rename(tmp_path, db_path).map_err(|e| io_error("replace", db_path, e))
    })();

    if result.is_err() {
        let _ = fs::remove_file(tmp_path);
    }
    result
}

pub fn write_db(db_path: &Path, db: &Db) -> Result<(), CliError> {
    ensure_parent_dir(db_path)?;

    let dir = db_path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let tmp_path = dir.join(format!(".garage.json.tmp.{}", std::process::id()));
    let data = serde_json::to_string_pretty(db).map_err(|e| io_error("serialize", db_path, e))? + "\n";

    replace_via_tmp(db_path, &tmp_path, |f| f.write_all(data.as_bytes()))?;

    log::debug!(
        "saved {} vehicle(s) to {}",
        db.vehicles.len(),
        db_path.display()
    );
    Ok(())
}

/// Load, mutate, save under the lock. Nothing is written when `mutator` fails.
pub fn update_db<R>(
    db_path: &Path,
    today: NaiveDate,
    mutator: impl FnOnce(&mut Db) -> Result<R, CliError>,
) -> Result<R, CliError> {
    ensure_parent_dir(db_path)?;
    with_write_lock(db_path, || {
        let mut db = read_db(db_path, today)?;
        let out = mutator(&mut db)?;
        write_db(db_path, &db)?;
        Ok(out)
    })
}
