use crate::config::Config;
use crate::error::SfBackupError;
use crate::scan::{list_save_files, select_candidates, Candidate};
use crate::utils::{format_modified, format_size};
use crate::Result;
use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

const TEMP_PREFIX: &str = ".sfbackup_temp_";

/// Filenames already present in one save name's backup directory
pub type BackupSet = HashSet<OsString>;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub dry_run: bool,
    pub verbose: bool,
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Copy,
    AlreadyBackedUp,
}

#[derive(Debug, Clone)]
pub struct PlannedBackup {
    pub candidate: Candidate,
    pub backup_dir: PathBuf,
    pub action: Action,
}

/// What a run would do, decided before anything is copied
#[derive(Debug, Clone, Default)]
pub struct BackupPlan {
    pub entries: Vec<PlannedBackup>,
    pub unmatched: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CopiedSave {
    pub save_name: String,
    pub backup_path: PathBuf,
    pub size: u64,
}

#[derive(Debug)]
pub struct RunReport {
    pub dry_run: bool,
    pub copied: Vec<CopiedSave>,
    pub up_to_date: Vec<String>,
    pub unmatched: Vec<String>,
    pub duration: Duration,
}

impl RunReport {
    pub fn summary(&self) -> String {
        let verb = if self.dry_run { "would copy" } else { "copied" };
        format!(
            "Backup summary: {} {verb}, {} already backed up, {} without saves",
            self.copied.len(),
            self.up_to_date.len(),
            self.unmatched.len()
        )
    }
}

/// Read the filenames in `dir`. A missing directory is an empty set.
pub fn read_backup_set(dir: &Path) -> Result<BackupSet> {
    if !dir.exists() {
        return Ok(BackupSet::new());
    }

    let mut set = BackupSet::new();
    for entry in fs::read_dir(dir).map_err(|e| SfBackupError::filesystem("read", dir, e))? {
        let entry = entry.map_err(|e| SfBackupError::filesystem("read", dir, e))?;
        let name = entry.file_name();
        if !is_temp_name(&name) {
            set.insert(name);
        }
    }
    Ok(set)
}

/// Create each save name's backup directory and record what it already holds
pub fn prepare_backup_sets(config: &Config) -> Result<HashMap<String, BackupSet>> {
    let mut sets = HashMap::new();
    for name in &config.save_game_names {
        let dir = config.backup_dir_for(name);
        fs::create_dir_all(&dir).map_err(|e| SfBackupError::filesystem("create", &dir, e))?;

        let removed = cleanup_temp_files(&dir)?;
        if removed > 0 {
            log::warn!(
                "Removed {removed} leftover temporary file(s) from {}",
                dir.display()
            );
        }

        sets.insert(name.clone(), read_backup_set(&dir)?);
    }
    Ok(sets)
}

/// Work out which candidates need copying without touching the filesystem
pub fn plan(config: &Config) -> Result<BackupPlan> {
    let mut sets = HashMap::new();
    for name in &config.save_game_names {
        sets.insert(name.clone(), read_backup_set(&config.backup_dir_for(name))?);
    }
    build_plan(config, &sets)
}

fn build_plan(config: &Config, sets: &HashMap<String, BackupSet>) -> Result<BackupPlan> {
    let files = list_save_files(&config.save_games_directory)?;
    let candidates = select_candidates(&config.save_game_names, &files);

    let unmatched = config
        .save_game_names
        .iter()
        .filter(|name| !candidates.iter().any(|c| &c.save_name == *name))
        .cloned()
        .collect();

    let entries = candidates
        .into_iter()
        .map(|candidate| {
            let already = sets
                .get(&candidate.save_name)
                .is_some_and(|set| set.contains(&candidate.file.file_name));
            PlannedBackup {
                backup_dir: config.backup_dir_for(&candidate.save_name),
                action: if already {
                    Action::AlreadyBackedUp
                } else {
                    Action::Copy
                },
                candidate,
            }
        })
        .collect();

    Ok(BackupPlan { entries, unmatched })
}

/// Back up the newest save of every configured name.
///
/// Status lines go to `out`. Any filesystem error ends the run; copies made
/// before it are kept.
pub fn run<W: Write>(config: &Config, options: &RunOptions, out: &mut W) -> Result<RunReport> {
    run_with_interrupt(config, options, out, &AtomicBool::new(false))
}

/// Like `run`, but stops with `SfBackupError::Interrupted` before the next
/// copy once `interrupted` is set.
pub fn run_with_interrupt<W: Write>(
    config: &Config,
    options: &RunOptions,
    out: &mut W,
    interrupted: &AtomicBool,
) -> Result<RunReport> {
    let start_time = Instant::now();

    let backup_plan = if options.dry_run {
        plan(config)?
    } else {
        let sets = prepare_backup_sets(config)?;
        build_plan(config, &sets)?
    };

    let mut report = RunReport {
        dry_run: options.dry_run,
        copied: Vec::new(),
        up_to_date: Vec::new(),
        unmatched: backup_plan.unmatched.clone(),
        duration: Duration::from_secs(0),
    };

    for entry in &backup_plan.entries {
        if interrupted.load(Ordering::SeqCst) {
            log::info!("Stopping after {} copies", report.copied.len());
            return Err(SfBackupError::Interrupted);
        }

        let candidate = &entry.candidate;
        if entry.action == Action::AlreadyBackedUp {
            log::debug!(
                "{} already backed up for {}",
                candidate.file.file_name.to_string_lossy(),
                candidate.save_name
            );
            report.up_to_date.push(candidate.save_name.clone());
            continue;
        }

        let file_name = candidate.file.file_name.to_string_lossy();
        let label = if options.dry_run { "Would copy" } else { "Copying" };
        if !options.quiet {
            writeln!(
                out,
                "{label}: [{file_name}] to [{}]",
                entry.backup_dir.display()
            )?;
            if options.verbose {
                writeln!(
                    out,
                    "  {}, modified {}",
                    format_size(candidate.file.size),
                    format_modified(candidate.file.modified)
                )?;
            }
        }

        let backup_path = if options.dry_run {
            entry.backup_dir.join(&candidate.file.file_name)
        } else {
            copy_save(&candidate.file.path, &entry.backup_dir)?
        };

        report.copied.push(CopiedSave {
            save_name: candidate.save_name.clone(),
            backup_path,
            size: candidate.file.size,
        });
    }

    for name in &report.unmatched {
        log::info!("No save file found for {name}");
    }

    report.duration = start_time.elapsed();
    Ok(report)
}

/// Copy `source` into `backup_dir` under its own filename.
///
/// Symlinks are followed so the backup holds the target's content. The data is
/// written to a temp file first and renamed into place, so the final name only
/// ever appears complete.
pub fn copy_save(source: &Path, backup_dir: &Path) -> Result<PathBuf> {
    let file_name = source.file_name().ok_or_else(|| {
        SfBackupError::filesystem("copy", source, std::io::ErrorKind::InvalidInput.into())
    })?;
    let final_path = backup_dir.join(file_name);
    let temp_path = create_temp_backup_path(&final_path);

    if let Err(e) = fs::copy(source, &temp_path) {
        let _ = fs::remove_file(&temp_path);
        return Err(SfBackupError::filesystem("copy", source, e));
    }

    if let Err(e) = fs::rename(&temp_path, &final_path) {
        let _ = fs::remove_file(&temp_path);
        return Err(SfBackupError::filesystem("rename", &temp_path, e));
    }

    log::debug!("Copied {} to {}", source.display(), final_path.display());
    Ok(final_path)
}

fn create_temp_backup_path(backup_path: &Path) -> PathBuf {
    let parent = backup_path.parent().unwrap_or(Path::new("."));
    let filename = backup_path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();

    parent.join(format!("{TEMP_PREFIX}{}_{filename}", std::process::id()))
}

fn is_temp_name(name: &std::ffi::OsStr) -> bool {
    name.as_encoded_bytes().starts_with(TEMP_PREFIX.as_bytes())
}

/// Remove temp files left in `dir` by an interrupted copy. Returns how many
/// were removed.
pub fn cleanup_temp_files(dir: &Path) -> Result<usize> {
    if !dir.is_dir() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !is_temp_name(&entry.file_name()) {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => log::warn!("Could not remove {}: {e}", entry.path().display()),
        }
    }

    Ok(removed)
}
