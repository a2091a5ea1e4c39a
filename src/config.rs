use crate::date::{parse_date, system_today};
use crate::error::CliError;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "garage";
const DATA_FILE: &str = "data.json";
const IMAGES_DIR: &str = "images";

#[derive(Debug, Clone)]
pub struct Paths {
    pub data_file: PathBuf,
    pub images_dir: PathBuf,
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn non_empty_flag(value: Option<&str>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn default_app_dir() -> Result<PathBuf, CliError> {
    if let Some(home) = non_empty_env("GARAGE_HOME") {
        return Ok(PathBuf::from(home));
    }

    let base = non_empty_env("XDG_DATA_HOME");
    let home = non_empty_env("HOME").or_else(|| non_empty_env("USERPROFILE"));

    let base = match (base, home) {
        (Some(b), _) => PathBuf::from(b),
        (None, Some(h)) => Path::new(&h).join(".local").join("share"),
        (None, None) => return Err(CliError::io("Cannot locate a data directory")),
    };

    Ok(base.join(APP_DIR))
}

pub fn resolve_data_file(cli_data: Option<&str>) -> Result<PathBuf, CliError> {
    if let Some(p) = non_empty_flag(cli_data).or_else(|| non_empty_env("GARAGE_DATA_FILE")) {
        return Ok(PathBuf::from(p));
    }
    Ok(default_app_dir()?.join(DATA_FILE))
}

pub fn resolve_paths(cli_data: Option<&str>, cli_images: Option<&str>) -> Result<Paths, CliError> {
    let data_file = resolve_data_file(cli_data)?;

    let images_dir = match non_empty_flag(cli_images).or_else(|| non_empty_env("GARAGE_IMAGES_DIR")) {
        Some(p) => PathBuf::from(p),
        None => data_file
            .parent()
            .map(|dir| dir.join(IMAGES_DIR))
            .unwrap_or_else(|| PathBuf::from(IMAGES_DIR)),
    };

    log::debug!(
        "data file {}, images dir {}",
        data_file.display(),
        images_dir.display()
    );

    Ok(Paths {
        data_file,
        images_dir,
    })
}

pub fn resolve_today(cli_today: Option<&str>) -> Result<NaiveDate, CliError> {
    if let Some(t) = non_empty_flag(cli_today) {
        return parse_date(&t, "today");
    }
    if let Some(t) = non_empty_env("GARAGE_TODAY") {
        return parse_date(&t, "today");
    }
    Ok(system_today())
}

pub fn resolve_color_enabled(no_color_flag: bool) -> bool {
    if no_color_flag {
        return false;
    }
    std::env::var_os("NO_COLOR").is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_flags_win() {
        let paths = resolve_paths(Some("/tmp/g/data.json"), Some("/tmp/pics")).unwrap();
        assert_eq!(paths.data_file, PathBuf::from("/tmp/g/data.json"));
        assert_eq!(paths.images_dir, PathBuf::from("/tmp/pics"));
    }

    #[test]
    fn images_default_next_to_data_file() {
        if std::env::var_os("GARAGE_IMAGES_DIR").is_some() {
            return;
        }
        let paths = resolve_paths(Some("/tmp/g/data.json"), None).unwrap();
        assert_eq!(paths.images_dir, PathBuf::from("/tmp/g/images"));
    }

    #[test]
    fn today_flag_is_validated() {
        assert_eq!(
            resolve_today(Some("2026-10-19")).unwrap(),
            parse_date("2026-10-19", "today").unwrap()
        );
        let err = resolve_today(Some("19/10/2026")).unwrap_err();
        assert_eq!(err.exit_code, 2);
    }
}
