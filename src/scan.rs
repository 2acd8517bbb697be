use crate::error::SfBackupError;
use crate::utils::has_prefix;
use crate::Result;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// An entry of the save games directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveFile {
    pub path: PathBuf,
    pub file_name: OsString,
    pub modified: SystemTime,
    pub size: u64,
}

/// The newest save file matching one save name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub save_name: String,
    pub file: SaveFile,
}

/// List every entry of `dir`, newest first.
///
/// Metadata is read through symlinks, so a link is ordered by the time of the
/// file it points at. Entries with equal modification times keep their
/// directory listing order.
pub fn list_save_files(dir: &Path) -> Result<Vec<SaveFile>> {
    let entries = fs::read_dir(dir).map_err(|e| SfBackupError::filesystem("read", dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| SfBackupError::filesystem("read", dir, e))?;
        let path = entry.path();
        let metadata = fs::metadata(&path).map_err(|e| SfBackupError::filesystem("stat", &path, e))?;
        let modified = metadata
            .modified()
            .map_err(|e| SfBackupError::filesystem("stat", &path, e))?;

        files.push(SaveFile {
            file_name: entry.file_name(),
            path,
            modified,
            size: metadata.len(),
        });
    }

    // sort_by is stable
    files.sort_by(|a, b| b.modified.cmp(&a.modified));
    log::debug!("Found {} entries in {}", files.len(), dir.display());
    Ok(files)
}

/// Pick at most one candidate per save name from `files` (newest first).
///
/// Each file is offered to the names in configuration order and goes to every
/// still-unmatched name it starts with. When one name is a prefix of another
/// ("Save" and "Save2") the shorter one can claim a file meant for the longer
/// one. Candidates are returned in the order they were matched.
pub fn select_candidates(save_names: &[String], files: &[SaveFile]) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = Vec::new();

    for file in files {
        if candidates.len() == save_names.len() {
            break;
        }
        for name in save_names {
            let matched = candidates.iter().any(|c| &c.save_name == name);
            if !matched && has_prefix(&file.file_name, name) {
                candidates.push(Candidate {
                    save_name: name.clone(),
                    file: file.clone(),
                });
            }
        }
    }

    candidates
}
