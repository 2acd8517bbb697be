use crate::error::SfBackupError;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Config file used when no path is given on the command line
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

const SAVE_GAMES_DIRECTORY: &str = "SaveGamesDirectory";
const BACKUP_DIRECTORY: &str = "BackupDirectory";
const SAVE_GAME_NAMES: &str = "SaveGameNames";

/// Validated configuration. Only `load_config` builds one from a file, so every
/// field has already passed its checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    #[serde(rename = "SaveGamesDirectory")]
    pub save_games_directory: PathBuf,
    #[serde(rename = "BackupDirectory")]
    pub backup_directory: PathBuf,
    #[serde(rename = "SaveGameNames")]
    pub save_game_names: Vec<String>,
}

impl Config {
    /// Backup subdirectory for one save name
    pub fn backup_dir_for(&self, save_name: &str) -> PathBuf {
        self.backup_directory.join(save_name)
    }
}

/// File shape before validation. Values stay untyped so that a wrong type is
/// reported as an invalid field instead of a parse failure.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(rename = "SaveGamesDirectory")]
    save_games_directory: Option<toml::Value>,
    #[serde(rename = "BackupDirectory")]
    backup_directory: Option<toml::Value>,
    #[serde(rename = "SaveGameNames")]
    save_game_names: Option<toml::Value>,
}

/// Load and validate the configuration file at `path`
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.is_file() {
        return Err(SfBackupError::ConfigMissing {
            path: path.to_path_buf(),
        });
    }

    let content = fs::read_to_string(path).map_err(|e| SfBackupError::ConfigParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let config = parse_config(path, &content)?;
    log::debug!("Loaded config from {}: {config:?}", path.display());
    Ok(config)
}

/// Parse and validate config text. `path` is only used in error messages.
pub fn parse_config(path: &Path, content: &str) -> Result<Config> {
    let raw: RawConfig = toml::from_str(content).map_err(|e| SfBackupError::ConfigParse {
        path: path.to_path_buf(),
        message: e.message().to_string(),
    })?;

    let save_games_directory = path_field(SAVE_GAMES_DIRECTORY, raw.save_games_directory)?;
    if !save_games_directory.is_dir() {
        return Err(SfBackupError::invalid_field(
            SAVE_GAMES_DIRECTORY,
            format!("{} is not a directory", save_games_directory.display()),
        ));
    }

    let backup_directory = path_field(BACKUP_DIRECTORY, raw.backup_directory)?;
    if backup_directory.exists() && !backup_directory.is_dir() {
        return Err(SfBackupError::invalid_field(
            BACKUP_DIRECTORY,
            format!("{} exists but is not a directory", backup_directory.display()),
        ));
    }

    let save_game_names = names_field(raw.save_game_names)?;

    Ok(Config {
        save_games_directory,
        backup_directory,
        save_game_names,
    })
}

fn path_field(field: &'static str, value: Option<toml::Value>) -> Result<PathBuf> {
    match value {
        None => Err(SfBackupError::ConfigFieldMissing { field }),
        Some(toml::Value::String(s)) if s.is_empty() => {
            Err(SfBackupError::invalid_field(field, "path is empty"))
        }
        Some(toml::Value::String(s)) => Ok(PathBuf::from(s)),
        Some(other) => Err(SfBackupError::invalid_field(
            field,
            format!("expected a string, found {}", other.type_str()),
        )),
    }
}

fn names_field(value: Option<toml::Value>) -> Result<Vec<String>> {
    let items = match value {
        None => {
            return Err(SfBackupError::ConfigFieldMissing {
                field: SAVE_GAME_NAMES,
            })
        }
        Some(toml::Value::Array(items)) => items,
        Some(other) => {
            return Err(SfBackupError::invalid_field(
                SAVE_GAME_NAMES,
                format!("expected a list of strings, found {}", other.type_str()),
            ))
        }
    };

    if items.is_empty() {
        return Err(SfBackupError::invalid_field(
            SAVE_GAME_NAMES,
            "no save game names provided",
        ));
    }

    let mut names = Vec::with_capacity(items.len());
    let mut seen = HashSet::new();
    for (index, item) in items.into_iter().enumerate() {
        let name = match item {
            toml::Value::String(s) => s,
            other => {
                return Err(SfBackupError::invalid_field(
                    SAVE_GAME_NAMES,
                    format!("entry {index} is a {}, expected a string", other.type_str()),
                ))
            }
        };
        if name.is_empty() {
            return Err(SfBackupError::invalid_field(
                SAVE_GAME_NAMES,
                format!("entry {index} is empty"),
            ));
        }
        // The name becomes a directory component under BackupDirectory
        if name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(SfBackupError::invalid_field(
                SAVE_GAME_NAMES,
                format!("entry {index} ({name}) is not a valid directory name"),
            ));
        }
        if seen.insert(name.clone()) {
            names.push(name);
        } else {
            log::warn!("Ignoring duplicate save game name: {name}");
        }
    }

    Ok(names)
}

/// Render a loaded configuration for `--dump-config`
pub fn dump_config(config: &Config, source: &Path) -> Result<String> {
    let body =
        toml::to_string(config).map_err(|e| SfBackupError::Io(std::io::Error::other(e)))?;

    let mut out = String::new();
    out.push_str("sfbackup Configuration\n");
    out.push_str("======================\n\n");
    out.push_str(&format!("Config file: {}\n\n", source.display()));
    out.push_str(&body);
    out.push('\n');
    out.push_str("Backup directories:\n");
    out.push_str("-------------------\n");
    for name in &config.save_game_names {
        let dir = config.backup_dir_for(name);
        let status = if dir.is_dir() { "exists" } else { "will be created" };
        out.push_str(&format!("{name} → {} ({status})\n", dir.display()));
    }
    Ok(out)
}

/// Create a sample configuration file
pub fn create_sample_config() -> String {
    r#"# Directory the game writes its save files into
SaveGamesDirectory = "/home/user/.local/share/MyGame/SaveGames"

# Root directory for backups; one subdirectory is created per save name
BackupDirectory = "/mnt/backup/MyGame"

# Save name prefixes. The newest file starting with each prefix is backed up.
SaveGameNames = ["Factory", "Coop_"]
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn toml_path(path: &Path) -> String {
        path.display().to_string().replace('\\', "\\\\")
    }

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("config.toml");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_load_valid_config() {
        let dir = tempdir().unwrap();
        let saves = dir.path().join("saves");
        fs::create_dir(&saves).unwrap();
        let backups = dir.path().join("backups");

        let path = write_config(
            dir.path(),
            &format!(
                "SaveGamesDirectory = \"{}\"\nBackupDirectory = \"{}\"\nSaveGameNames = [\"A\", \"B\"]\n",
                toml_path(&saves),
                toml_path(&backups)
            ),
        );

        let config = load_config(&path).unwrap();
        assert_eq!(config.save_games_directory, saves);
        assert_eq!(config.backup_directory, backups);
        assert_eq!(config.save_game_names, vec!["A", "B"]);
        assert_eq!(config.backup_dir_for("A"), backups.join("A"));
        // Loading never creates the backup root
        assert!(!backups.exists());
    }

    #[test]
    fn test_load_config_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope.toml");

        match load_config(&path).unwrap_err() {
            SfBackupError::ConfigMissing { path: p } => assert_eq!(p, path),
            e => panic!("Expected ConfigMissing, got {e:?}"),
        }
    }

    #[test]
    fn test_load_config_directory_is_missing() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            load_config(dir.path()),
            Err(SfBackupError::ConfigMissing { .. })
        ));
    }

    #[test]
    fn test_parse_error() {
        let result = parse_config(Path::new("c.toml"), "SaveGamesDirectory = \n[[");
        assert!(matches!(result, Err(SfBackupError::ConfigParse { .. })));
    }

    #[test]
    fn test_missing_fields_reported_in_order() {
        let dir = tempdir().unwrap();
        let saves = toml_path(dir.path());

        let result = parse_config(Path::new("c.toml"), "SaveGameNames = [\"A\"]");
        assert!(matches!(
            result,
            Err(SfBackupError::ConfigFieldMissing {
                field: "SaveGamesDirectory"
            })
        ));

        let result = parse_config(
            Path::new("c.toml"),
            &format!("SaveGamesDirectory = \"{saves}\"\nSaveGameNames = [\"A\"]"),
        );
        assert!(matches!(
            result,
            Err(SfBackupError::ConfigFieldMissing {
                field: "BackupDirectory"
            })
        ));

        let result = parse_config(
            Path::new("c.toml"),
            &format!("SaveGamesDirectory = \"{saves}\"\nBackupDirectory = \"{saves}\""),
        );
        assert!(matches!(
            result,
            Err(SfBackupError::ConfigFieldMissing {
                field: "SaveGameNames"
            })
        ));
    }

    #[test]
    fn test_save_games_directory_must_be_directory() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("not_a_dir");
        fs::write(&file, "x").unwrap();

        let result = parse_config(
            Path::new("c.toml"),
            &format!(
                "SaveGamesDirectory = \"{}\"\nBackupDirectory = \"{}\"\nSaveGameNames = [\"A\"]",
                toml_path(&file),
                toml_path(&dir.path().join("b"))
            ),
        );
        assert!(matches!(
            result,
            Err(SfBackupError::ConfigFieldInvalid {
                field: "SaveGamesDirectory",
                ..
            })
        ));
    }

    #[test]
    fn test_backup_directory_regular_file_rejected() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("backup_file");
        fs::write(&file, "x").unwrap();

        let result = parse_config(
            Path::new("c.toml"),
            &format!(
                "SaveGamesDirectory = \"{}\"\nBackupDirectory = \"{}\"\nSaveGameNames = [\"A\"]",
                toml_path(dir.path()),
                toml_path(&file)
            ),
        );
        assert!(matches!(
            result,
            Err(SfBackupError::ConfigFieldInvalid {
                field: "BackupDirectory",
                ..
            })
        ));
    }

    #[test]
    fn test_wrong_types_are_invalid_fields() {
        let dir = tempdir().unwrap();
        let saves = toml_path(dir.path());

        let result = parse_config(
            Path::new("c.toml"),
            "SaveGamesDirectory = 42\nBackupDirectory = \"b\"\nSaveGameNames = [\"A\"]",
        );
        assert!(matches!(
            result,
            Err(SfBackupError::ConfigFieldInvalid {
                field: "SaveGamesDirectory",
                ..
            })
        ));

        let result = parse_config(
            Path::new("c.toml"),
            &format!("SaveGamesDirectory = \"{saves}\"\nBackupDirectory = \"{saves}\"\nSaveGameNames = \"A\""),
        );
        assert!(matches!(
            result,
            Err(SfBackupError::ConfigFieldInvalid {
                field: "SaveGameNames",
                ..
            })
        ));

        let result = parse_config(
            Path::new("c.toml"),
            &format!("SaveGamesDirectory = \"{saves}\"\nBackupDirectory = \"{saves}\"\nSaveGameNames = [\"A\", 3]"),
        );
        assert!(matches!(
            result,
            Err(SfBackupError::ConfigFieldInvalid {
                field: "SaveGameNames",
                ..
            })
        ));
    }

    #[test]
    fn test_empty_and_bad_names_rejected() {
        let dir = tempdir().unwrap();
        let saves = toml_path(dir.path());
        let base = format!("SaveGamesDirectory = \"{saves}\"\nBackupDirectory = \"{saves}\"\n");

        for names in ["[]", "[\"A\", \"\"]", "[\"../escape\"]", "[\"..\"]"] {
            let result = parse_config(
                Path::new("c.toml"),
                &format!("{base}SaveGameNames = {names}"),
            );
            assert!(
                matches!(
                    result,
                    Err(SfBackupError::ConfigFieldInvalid {
                        field: "SaveGameNames",
                        ..
                    })
                ),
                "names {names} should be rejected"
            );
        }
    }

    #[test]
    fn test_duplicate_names_keep_first_occurrence() {
        let dir = tempdir().unwrap();
        let saves = toml_path(dir.path());
        let config = parse_config(
            Path::new("c.toml"),
            &format!(
                "SaveGamesDirectory = \"{saves}\"\nBackupDirectory = \"{saves}\"\nSaveGameNames = [\"B\", \"A\", \"B\"]"
            ),
        )
        .unwrap();
        assert_eq!(config.save_game_names, vec!["B", "A"]);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let dir = tempdir().unwrap();
        let saves = toml_path(dir.path());
        let config = parse_config(
            Path::new("c.toml"),
            &format!(
                "Extra = true\nSaveGamesDirectory = \"{saves}\"\nBackupDirectory = \"{saves}\"\nSaveGameNames = [\"A\"]"
            ),
        );
        assert!(config.is_ok());
    }

    #[test]
    fn test_dump_config() {
        let dir = tempdir().unwrap();
        let backups = dir.path().join("backups");
        fs::create_dir_all(backups.join("A")).unwrap();
        let config = Config {
            save_games_directory: dir.path().to_path_buf(),
            backup_directory: backups.clone(),
            save_game_names: vec!["A".to_string(), "B".to_string()],
        };

        let dump = dump_config(&config, Path::new("config.toml")).unwrap();
        assert!(dump.contains("Config file: config.toml"));
        assert!(dump.contains("SaveGamesDirectory = "));
        assert!(dump.contains("BackupDirectory = "));
        assert!(dump.contains("SaveGameNames = "));
        assert!(dump.contains("(exists)"));
        assert!(dump.contains("(will be created)"));
    }

    #[test]
    fn test_sample_config_parses() {
        let sample = create_sample_config();
        let raw: RawConfig = toml::from_str(&sample).unwrap();
        assert!(raw.save_games_directory.is_some());
        assert!(raw.backup_directory.is_some());
        assert_eq!(names_field(raw.save_game_names).unwrap().len(), 2);
    }
}
