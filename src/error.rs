use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SfBackupError {
    #[error("config: {} does not exist", path.display())]
    ConfigMissing { path: PathBuf },

    #[error("could not read config file {}: {message}", path.display())]
    ConfigParse { path: PathBuf, message: String },

    #[error("config missing {field}")]
    ConfigFieldMissing { field: &'static str },

    #[error("invalid {field}: {reason}")]
    ConfigFieldInvalid { field: &'static str, reason: String },

    #[error("failed to {action} {}: {source}", path.display())]
    Filesystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation interrupted by user")]
    Interrupted,
}

impl SfBackupError {
    /// Create an invalid-field error with a custom reason
    pub fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::ConfigFieldInvalid {
            field,
            reason: reason.into(),
        }
    }

    /// Wrap an I/O error with the action and path that produced it
    pub fn filesystem(
        action: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Filesystem {
            action,
            path: path.into(),
            source,
        }
    }

    /// True for errors raised while loading the configuration, before any backup work
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SfBackupError::ConfigMissing { .. }
                | SfBackupError::ConfigParse { .. }
                | SfBackupError::ConfigFieldMissing { .. }
                | SfBackupError::ConfigFieldInvalid { .. }
        )
    }

    /// Get the exit code for this error. A bad config ends the run early
    /// but is not a failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            SfBackupError::Interrupted => 130,
            e if e.is_config_error() => 0,
            _ => 1,
        }
    }

    /// Provide helpful suggestions for resolving the error
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            SfBackupError::ConfigMissing { path } => vec![
                format!("Create {} (see `sfbackup --sample-config`)", path.display()),
                "Pass the config file path as the first argument".to_string(),
            ],
            SfBackupError::ConfigParse { .. } => {
                vec!["Check the file is valid TOML".to_string()]
            }
            SfBackupError::ConfigFieldMissing { field } => {
                vec![format!("Add a `{field}` key to the config file")]
            }
            SfBackupError::ConfigFieldInvalid { field, .. } => match *field {
                "SaveGamesDirectory" => {
                    vec!["Point SaveGamesDirectory at an existing directory".to_string()]
                }
                "BackupDirectory" => vec![
                    "Point BackupDirectory at a directory, or at a path that does not exist yet"
                        .to_string(),
                ],
                _ => vec!["SaveGameNames must be a non-empty list of non-empty strings".to_string()],
            },
            SfBackupError::Filesystem { .. } | SfBackupError::Io(_) => vec![
                "Check permissions on the backup directory".to_string(),
                "Ensure there is free space on the backup drive".to_string(),
            ],
            SfBackupError::Interrupted => vec![],
        }
    }
}
