//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.todo-today/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use clap::ValueEnum;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::StartScreen;

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TodoConfig {
    #[serde(default)]
    pub general: GeneralConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeneralConfig {
    pub data_file: Option<String>,
    pub log_file: Option<String>,
    pub debug: Option<bool>,
    pub home_screen: Option<String>,
}

// ============================================================================
// Defaults
// ============================================================================

const CONFIG_DIR_NAME: &str = ".todo-today";
pub const DEFAULT_DATA_FILE_NAME: &str = "tasks.json";
pub const DEFAULT_LOG_FILE_NAME: &str = "todo-today.log";

pub const ENV_DATA_FILE: &str = "TODO_TODAY_DATA_FILE";
pub const ENV_LOG_FILE: &str = "TODO_TODAY_LOG_FILE";
pub const ENV_HOME_SCREEN: &str = "TODO_TODAY_HOME";

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub data_file: PathBuf,
    pub log_file: PathBuf,
    pub debug: bool,
    pub home: StartScreen,
}

/// Values given on the command line. `None`/`false` means "not specified".
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub data_file: Option<PathBuf>,
    pub debug: bool,
    pub home: Option<StartScreen>,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

// ============================================================================
// Loading
// ============================================================================

/// `~/.todo-today`, or the working directory when there is no home.
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(CONFIG_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the path to `~/.todo-today/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join("config.toml"))
}

/// Load config from `~/.todo-today/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `TodoConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<TodoConfig, ConfigError> {
    let Some(path) = config_path() else {
        warn!("Could not determine home directory, using default config");
        return Ok(TodoConfig::default());
    };
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Result<TodoConfig, ConfigError> {
    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(path);
        return Ok(TodoConfig::default());
    }

    let contents = fs::read_to_string(path)?;
    let config: TodoConfig = toml::from_str(&contents)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

fn generate_default_config(path: &Path) {
    let default_content = r#"# Todo Today Configuration
# All settings are optional. Defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [general]
# data_file = "~/.todo-today/tasks.json"     # Or TODO_TODAY_DATA_FILE, or --data-file
# log_file = "~/.todo-today/todo-today.log"  # Or TODO_TODAY_LOG_FILE
# debug = false                              # Or --debug
# home_screen = "home"                       # "home", "lists" or "today"; or TODO_TODAY_HOME, or --home
"#;

    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Failed to create config directory: {}", e);
        return;
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &TodoConfig, cli: &CliOverrides) -> ResolvedConfig {
    resolve_with(config, cli, &config_dir(), |key| std::env::var(key).ok())
}

fn resolve_with(
    config: &TodoConfig,
    cli: &CliOverrides,
    base_dir: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> ResolvedConfig {
    // Data file: CLI → env → config → default
    let data_file = cli
        .data_file
        .clone()
        .or_else(|| env(ENV_DATA_FILE).map(|s| expand_home(&s)))
        .or_else(|| config.general.data_file.as_deref().map(expand_home))
        .unwrap_or_else(|| base_dir.join(DEFAULT_DATA_FILE_NAME));

    // Log file: env → config → next to the data file
    let log_file = env(ENV_LOG_FILE)
        .map(|s| expand_home(&s))
        .or_else(|| config.general.log_file.as_deref().map(expand_home))
        .unwrap_or_else(|| {
            data_file
                .parent()
                .map(|dir| dir.join(DEFAULT_LOG_FILE_NAME))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE_NAME))
        });

    // Home screen: CLI → env → config → default
    let home = cli
        .home
        .or_else(|| env(ENV_HOME_SCREEN).and_then(|s| parse_start_screen(&s)))
        .or_else(|| {
            config
                .general
                .home_screen
                .as_deref()
                .and_then(parse_start_screen)
        })
        .unwrap_or_default();

    ResolvedConfig {
        data_file,
        log_file,
        debug: cli.debug || config.general.debug.unwrap_or(false),
        home,
    }
}

fn parse_start_screen(value: &str) -> Option<StartScreen> {
    match StartScreen::from_str(value.trim(), true) {
        Ok(screen) => Some(screen),
        Err(_) => {
            warn!("Unknown home screen '{}', ignoring", value);
            None
        }
    }
}

/// Expands a leading `~/` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_resolve_uses_defaults_when_empty() {
        let resolved = resolve_with(
            &TodoConfig::default(),
            &CliOverrides::default(),
            Path::new("/base"),
            no_env,
        );
        assert_eq!(resolved.data_file, PathBuf::from("/base/tasks.json"));
        assert_eq!(resolved.log_file, PathBuf::from("/base/todo-today.log"));
        assert!(!resolved.debug);
        assert_eq!(resolved.home, StartScreen::Home);
    }

    #[test]
    fn test_log_file_follows_data_file() {
        let config = TodoConfig {
            general: GeneralConfig {
                data_file: Some("/data/mine.json".to_string()),
                ..Default::default()
            },
        };
        let resolved = resolve_with(&config, &CliOverrides::default(), Path::new("/base"), no_env);
        assert_eq!(resolved.data_file, PathBuf::from("/data/mine.json"));
        assert_eq!(resolved.log_file, PathBuf::from("/data/todo-today.log"));
    }

    #[test]
    fn test_env_overrides_config_and_cli_overrides_env() {
        let config = TodoConfig {
            general: GeneralConfig {
                data_file: Some("/config.json".to_string()),
                home_screen: Some("lists".to_string()),
                ..Default::default()
            },
        };
        let env = |key: &str| match key {
            ENV_DATA_FILE => Some("/env.json".to_string()),
            ENV_HOME_SCREEN => Some("today".to_string()),
            _ => None,
        };

        let resolved = resolve_with(&config, &CliOverrides::default(), Path::new("/b"), env);
        assert_eq!(resolved.data_file, PathBuf::from("/env.json"));
        assert_eq!(resolved.home, StartScreen::Today);

        let cli = CliOverrides {
            data_file: Some(PathBuf::from("/cli.json")),
            debug: true,
            home: Some(StartScreen::Home),
        };
        let resolved = resolve_with(&config, &cli, Path::new("/b"), env);
        assert_eq!(resolved.data_file, PathBuf::from("/cli.json"));
        assert_eq!(resolved.home, StartScreen::Home);
        assert!(resolved.debug);
    }

    #[test]
    fn test_unknown_home_screen_falls_back() {
        let config = TodoConfig {
            general: GeneralConfig {
                home_screen: Some("nowhere".to_string()),
                ..Default::default()
            },
        };
        let resolved = resolve_with(&config, &CliOverrides::default(), Path::new("/b"), no_env);
        assert_eq!(resolved.home, StartScreen::Home);
    }

    #[test]
    fn test_sparse_toml_parses() {
        let toml_str = r#"
[general]
debug = true
"#;
        let config: TodoConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.debug, Some(true));
        assert!(config.general.data_file.is_none());
        assert!(config.general.home_screen.is_none());
    }

    #[test]
    fn test_missing_file_generates_commented_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.toml");
        let config = load_config_from(&path).unwrap();
        assert!(config.general.data_file.is_none());

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("# home_screen"));
        // The generated file parses to the same empty config
        let reparsed: TodoConfig = toml::from_str(&written).unwrap();
        assert!(reparsed.general.debug.is_none());
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[general\ndebug = ").unwrap();
        assert!(matches!(load_config_from(&path), Err(ConfigError::Parse(_))));
    }
}
