use crate::error::CliError;
use crate::model::Vehicle;
use std::fs;
use std::path::{Path, PathBuf};

// Characters rejected in file names on at least one mainstream platform.
const INVALID_FILE_NAME_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

pub fn sanitize_plate(plate: &str) -> String {
    plate
        .trim()
        .chars()
        .map(|c| {
            if c.is_control() || INVALID_FILE_NAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect()
}

pub fn stored_image_name(plate: &str, source: &Path) -> Result<String, CliError> {
    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| CliError::usage(format!("Not a file path: {}", source.display())))?;
    Ok(format!("{}_{}", sanitize_plate(plate), file_name))
}

/// Copies `source` into the image store, overwriting any previous copy, and
/// returns the relative name to keep on the vehicle.
pub fn store_image(images_dir: &Path, plate: &str, source: &Path) -> Result<String, CliError> {
    if !source.is_file() {
        return Err(CliError::not_found(format!("Image not found: {}", source.display())));
    }
    let name = stored_image_name(plate, source)?;

    fs::create_dir_all(images_dir).map_err(|e| {
        CliError::io(format!("Cannot create {}: {}", images_dir.display(), e))
    })?;
    let dest = images_dir.join(&name);
    fs::copy(source, &dest).map_err(|e| {
        CliError::io(format!("Cannot copy image to {}: {}", dest.display(), e))
    })?;

    log::info!("stored image {} -> {}", source.display(), dest.display());
    Ok(name)
}

/// Deletes a stored copy; failures are only logged.
pub fn discard_image(images_dir: &Path, name: &str) {
    let path = images_dir.join(name);
    match fs::remove_file(&path) {
        Ok(()) => log::info!("discarded unattached image {}", path.display()),
        Err(e) => log::warn!("cannot remove unattached image {}: {}", path.display(), e),
    }
}

/// Absolute path of the vehicle's image, if it still exists.
pub fn resolve_image(images_dir: &Path, vehicle: &Vehicle) -> Option<PathBuf> {
    let name = vehicle.image_path.as_deref().filter(|n| !n.is_empty())?;
    let full = images_dir.join(name);
    full.is_file().then_some(full)
}
