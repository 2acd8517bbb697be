pub mod backup;
pub mod config;
pub mod error;
pub mod scan;
pub mod signal;
pub mod utils;

pub use backup::{
    copy_save, plan, run, run_with_interrupt, BackupPlan, CopiedSave, RunOptions, RunReport,
};
pub use config::{create_sample_config, dump_config, load_config, Config, DEFAULT_CONFIG_FILE};
pub use error::SfBackupError;
pub use scan::{list_save_files, select_candidates, Candidate, SaveFile};
pub use signal::InterruptCleanup;

/// Main library result type
pub type Result<T> = std::result::Result<T, SfBackupError>;
