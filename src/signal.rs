use crate::backup::cleanup_temp_files;
use crate::error::SfBackupError;
use crate::Result;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Ctrl-C handling for a backup run.
///
/// The first interrupt sets a flag that `backup::run_with_interrupt` checks
/// before each copy, so the copy in progress finishes. A second interrupt
/// removes temp files from `dirs` and exits immediately.
#[derive(Clone, Default)]
pub struct InterruptCleanup {
    dirs: Vec<PathBuf>,
    interrupted: Arc<AtomicBool>,
}

impl InterruptCleanup {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self {
            dirs,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag shared with the backup loop
    pub fn flag(&self) -> &AtomicBool {
        &self.interrupted
    }

    /// Record an interrupt. Returns true if one was already pending, meaning
    /// the run should be aborted right away.
    pub fn request_stop(&self) -> bool {
        self.interrupted.swap(true, Ordering::SeqCst)
    }

    /// Remove temp files. Returns how many files were removed.
    pub fn cleanup(&self) -> usize {
        let mut removed = 0;
        for dir in &self.dirs {
            match cleanup_temp_files(dir) {
                Ok(n) => removed += n,
                Err(e) => log::warn!("Could not clean up {}: {e}", dir.display()),
            }
        }
        removed
    }

    /// Install the Ctrl-C handler
    pub fn install(&self) -> Result<()> {
        let handler = self.clone();
        ctrlc::set_handler(move || {
            if handler.request_stop() {
                eprintln!("\nAborting. Cleaning up...");
                let removed = handler.cleanup();
                if removed > 0 {
                    eprintln!("Removed {removed} incomplete backup file(s)");
                }
                std::process::exit(SfBackupError::Interrupted.exit_code());
            }
            eprintln!("\nInterrupted by user. Finishing current copy (Ctrl-C again to abort)...");
        })
        .map_err(|e| SfBackupError::Io(std::io::Error::other(e.to_string())))
    }
}
