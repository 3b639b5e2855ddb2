//! Configuration loader
//!
//! Loads application configuration from a file and applies environment
//! overrides on top.
//!
//! ## Loading Strategy
//! 1. `WASHSLOT_CONFIG` names the file, if set
//! 2. Otherwise probes standard paths for a config file
//! 3. Supports JSON and TOML formats (by extension)
//! 4. Applies environment overrides, then validates
//!
//! ## Environment Variables
//! - `WASHSLOT_CONFIG`: Config file path
//! - `WASHSLOT_ROOT_URL`: Booking front end URL used in event links
//! - `WASHSLOT_TIME_ZONE`: IANA zone of the portal times
//! - `WASHSLOT_REFRESH_CRON`: Six-field cron expression for scheduled refresh
//! - `WASHSLOT_REFRESH_ENABLED`: Whether scheduled refresh runs (true/false)
//! - `WASHSLOT_LOG_LEVEL`: Default log filter directive
//! - `WASHSLOT_LOG_JSON`: Emit JSON logs (true/false)
//!
//! Accounts are only read from the file; they carry e-mail addresses that do
//! not belong in the environment.
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./washslot.toml`, `./washslot.json`, `./config.toml`, `./config.json`
//! 2. The same names in the parent and grandparent directories
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};

use washslot_domain::{Config, Result, WashSlotError};

use crate::errors::InfraError;

const CONFIG_FILE_NAMES: [&str; 4] = ["washslot.toml", "washslot.json", "config.toml", "config.json"];

/// Load, override and validate configuration.
///
/// # Errors
/// Returns `WashSlotError::Config` if:
/// - No config file can be found
/// - File format is invalid
/// - An override has an invalid value
/// - The resulting configuration fails validation
pub fn load() -> Result<Config> {
    let path = std::env::var("WASHSLOT_CONFIG").ok().map(PathBuf::from);
    let mut config = read_config(path)?;
    apply_env_overrides(&mut config)?;
    config.validate()?;

    tracing::info!(
        accounts = config.accounts.len(),
        time_zone = %config.calendar.time_zone,
        refresh_enabled = config.refresh.enabled,
        "Configuration loaded"
    );
    Ok(config)
}

/// Load and validate configuration from a file, without environment
/// overrides.
///
/// If `path` is `None`, probes the standard locations.
///
/// # Errors
/// Returns `WashSlotError::Config` if the file is missing, invalid, or fails
/// validation.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config = read_config(path)?;
    config.validate()?;
    Ok(config)
}

fn read_config(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(WashSlotError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            WashSlotError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path).map_err(|e| {
        WashSlotError::Config(format!("Failed to read {}: {e}", config_path.display()))
    })?;

    parse_config(&contents, &config_path)
}

/// Parse configuration by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => Ok(toml::from_str(contents).map_err(InfraError::from)?),
        "json" => Ok(serde_json::from_str(contents).map_err(InfraError::from)?),
        _ => Err(WashSlotError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Apply `WASHSLOT_*` overrides to `config`.
///
/// # Errors
/// Returns `WashSlotError::Config` for a blank string override.
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Some(url) = env_string("WASHSLOT_ROOT_URL")? {
        config.calendar.root_url = url;
    }
    if let Some(zone) = env_string("WASHSLOT_TIME_ZONE")? {
        config.calendar.time_zone = zone;
    }
    if let Some(cron) = env_string("WASHSLOT_REFRESH_CRON")? {
        config.refresh.cron = cron;
    }
    config.refresh.enabled = env_bool("WASHSLOT_REFRESH_ENABLED", config.refresh.enabled);
    if let Some(level) = env_string("WASHSLOT_LOG_LEVEL")? {
        config.logging.level = level;
    }
    config.logging.json = env_bool("WASHSLOT_LOG_JSON", config.logging.json);
    Ok(())
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Read an optional string variable.
///
/// # Errors
/// Returns `WashSlotError::Config` if the variable is set but blank.
fn env_string(key: &str) -> Result<Option<String>> {
    match std::env::var(key) {
        Ok(value) if value.trim().is_empty() => {
            Err(WashSlotError::Config(format!("Environment variable {key} is empty")))
        }
        Ok(value) => Ok(Some(value.trim().to_string())),
        Err(_) => Ok(None),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
