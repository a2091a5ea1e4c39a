use crate::error::CliError;
use crate::model::Vehicle;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, serde::Serialize)]
pub struct DocumentEntry {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct FolderWarning {
    pub folder: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct DocumentListing {
    pub documents: Vec<DocumentEntry>,
    pub warnings: Vec<FolderWarning>,
}

fn normalize_folder(path: &str) -> Result<String, CliError> {
    let p = path.trim();
    if p.is_empty() {
        return Err(CliError::usage("Folder path is required"));
    }
    let p = Path::new(p);
    let absolute = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| CliError::io(format!("Cannot resolve {}: {}", p.display(), e)))?
            .join(p)
    };
    Ok(absolute.to_string_lossy().to_string())
}

/// Returns false when the folder was already linked.
pub fn link_folder(vehicle: &mut Vehicle, path: &str) -> Result<(String, bool), CliError> {
    let folder = normalize_folder(path)?;
    if !Path::new(&folder).is_dir() {
        return Err(CliError::not_found(format!("Folder not found: {}", folder)));
    }
    if vehicle.document_folders.contains(&folder) {
        return Ok((folder, false));
    }
    vehicle.document_folders.push(folder.clone());
    Ok((folder, true))
}

pub fn unlink_folder(vehicle: &mut Vehicle, path: &str) -> Result<String, CliError> {
    let raw = path.trim();
    let idx = vehicle
        .document_folders
        .iter()
        .position(|f| f == raw)
        .or_else(|| {
            let folder = normalize_folder(raw).ok()?;
            vehicle.document_folders.iter().position(|f| *f == folder)
        })
        .ok_or_else(|| CliError::not_found(format!("Folder is not linked: {}", path)))?;
    Ok(vehicle.document_folders.remove(idx))
}

pub fn clear_folders(vehicle: &mut Vehicle) -> usize {
    let n = vehicle.document_folders.len();
    vehicle.document_folders.clear();
    n
}

fn read_folder(folder: &str) -> std::io::Result<Vec<DocumentEntry>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        // Follows symlinks; dangling ones are skipped.
        let meta = match fs::metadata(entry.path()) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };
        if !meta.is_file() {
            continue;
        }
        out.push(DocumentEntry {
            name: entry.file_name().to_string_lossy().to_string(),
            path: entry.path(),
            size: meta.len(),
        });
    }
    Ok(out)
}

/// Non-recursive listing of every linked folder, sorted by file name.
/// Folders that vanished are skipped; unreadable ones become warnings.
pub fn list_documents(folders: &[String]) -> DocumentListing {
    let mut listing = DocumentListing::default();

    for folder in folders.iter() {
        if !Path::new(folder).is_dir() {
            log::debug!("skipping missing document folder {}", folder);
            continue;
        }
        match read_folder(folder) {
            Ok(mut docs) => listing.documents.append(&mut docs),
            Err(e) => {
                log::warn!("cannot read document folder {}: {}", folder, e);
                listing.warnings.push(FolderWarning {
                    folder: folder.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    listing
        .documents
        .sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path)));
    listing
}
