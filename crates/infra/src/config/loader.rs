//! Configuration loader
//!
//! Loads [`EsiSettings`] from a file and environment variables.
//!
//! ## Loading Strategy
//! 1. A `.env` file in the working directory is read, if present
//! 2. `ESI_CONFIG_PATH` names a config file; otherwise standard paths are
//!    probed; otherwise defaults are used
//! 3. Every setting may then be overridden by its environment variable
//! 4. The result is validated
//!
//! ## Environment Variables
//! - `ESI_API_URL`: API base URL
//! - `ESI_API_DATASOURCE`: Default datasource
//! - `ESI_API_VERSION`: Default API version
//! - `ESI_SPEC_CACHE_DURATION`: Spec cache duration in seconds
//! - `ESI_REQUESTS_CONNECT_TIMEOUT`: Connect timeout in seconds
//! - `ESI_REQUESTS_READ_TIMEOUT`: Read timeout in seconds
//! - `ESI_SERVER_ERROR_BACKOFF_FACTOR`: Backoff factor in seconds
//! - `ESI_SERVER_ERROR_MAX_RETRIES`: Retries after the first attempt
//! - `ESI_LANGUAGES`: Comma separated language codes
//! - `ESI_TOKEN_VALID_DURATION`: Access token validity in seconds
//! - `ESI_SSO_CLIENT_ID` / `ESI_SSO_CLIENT_SECRET`: SSO application credentials
//! - `ESI_TOKEN_URL`: SSO token endpoint
//! - `ESI_CACHE_MAX_CAPACITY`: In-process cache capacity
//! - `ESI_USER_AGENT`: Application identifier sent as `User-Agent`
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./esi.toml`, `./esi.json` (current working directory)
//! 2. `./config/esi.toml`, `./config/esi.json`
//! 3. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use esi_domain::{EsiError, EsiSettings, Result};

use crate::errors::InfraError;

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_VAR: &str = "ESI_CONFIG_PATH";

/// Load settings with the full fallback strategy
///
/// # Errors
/// Returns `EsiError::Config` if the named file is missing or invalid, an
/// environment override cannot be parsed, or validation fails.
pub fn load() -> Result<EsiSettings> {
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            tracing::warn!(error = %err, "Ignoring unreadable .env file");
        }
    }

    let base = match std::env::var_os(CONFIG_PATH_VAR) {
        Some(path) => load_file_only(Path::new(&path))?,
        None => match probe_config_paths() {
            Some(path) => load_file_only(&path)?,
            None => {
                tracing::debug!("No config file found, using defaults");
                EsiSettings::default()
            }
        },
    };

    finish(base)
}

/// Load settings from defaults plus environment variables
///
/// # Environment Variables
/// See module documentation for the complete list.
///
/// # Errors
/// Returns `EsiError::Config` if a variable has an invalid value.
pub fn load_from_env() -> Result<EsiSettings> {
    let settings = finish(EsiSettings::default())?;
    tracing::info!("Configuration loaded from environment variables");
    Ok(settings)
}

/// Load settings from a file, then apply environment overrides
///
/// If `path` is `None`, probes the standard locations.
///
/// # Errors
/// Returns `EsiError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<EsiSettings> {
    let config_path = match path {
        Some(p) => p,
        None => probe_config_paths().ok_or_else(|| {
            EsiError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    finish(load_file_only(&config_path)?)
}

fn finish(mut settings: EsiSettings) -> Result<EsiSettings> {
    apply_env_overrides(&mut settings)?;
    settings.validate()?;
    Ok(settings)
}

fn load_file_only(path: &Path) -> Result<EsiSettings> {
    if !path.exists() {
        return Err(EsiError::Config(format!("Config file not found: {}", path.display())));
    }

    tracing::info!(path = %path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(path)
        .map_err(|e| EsiError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, path)
}

/// Parse settings; format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<EsiSettings> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents).map_err(|e| InfraError::from(e).into()),
        "json" => serde_json::from_str(contents)
            .map_err(|e| EsiError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(EsiError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Overwrite every field whose environment variable is set
///
/// # Errors
/// Returns `EsiError::Config` naming the variable that failed to parse.
pub fn apply_env_overrides(settings: &mut EsiSettings) -> Result<()> {
    if let Some(v) = env_string("ESI_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = env_string("ESI_API_DATASOURCE") {
        settings.datasource = v;
    }
    if let Some(v) = env_string("ESI_API_VERSION") {
        settings.api_version = v;
    }
    if let Some(v) = env_parse("ESI_SPEC_CACHE_DURATION")? {
        settings.spec_cache_duration_secs = v;
    }
    if let Some(v) = env_parse("ESI_REQUESTS_CONNECT_TIMEOUT")? {
        settings.connect_timeout_secs = v;
    }
    if let Some(v) = env_parse("ESI_REQUESTS_READ_TIMEOUT")? {
        settings.read_timeout_secs = v;
    }
    if let Some(v) = env_parse("ESI_SERVER_ERROR_BACKOFF_FACTOR")? {
        settings.server_error_backoff_factor = v;
    }
    if let Some(v) = env_parse("ESI_SERVER_ERROR_MAX_RETRIES")? {
        settings.server_error_max_retries = v;
    }
    if let Some(v) = env_string("ESI_LANGUAGES") {
        settings.languages = v
            .split(',')
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(v) = env_parse("ESI_TOKEN_VALID_DURATION")? {
        settings.token_valid_duration_secs = v;
    }
    if let Some(v) = env_string("ESI_SSO_CLIENT_ID") {
        settings.sso_client_id = Some(v);
    }
    if let Some(v) = env_string("ESI_SSO_CLIENT_SECRET") {
        settings.sso_client_secret = Some(v);
    }
    if let Some(v) = env_string("ESI_TOKEN_URL") {
        settings.sso_token_url = v;
    }
    if let Some(v) = env_parse("ESI_CACHE_MAX_CAPACITY")? {
        settings.cache_max_capacity = v;
    }
    if let Some(v) = env_string("ESI_USER_AGENT") {
        settings.app_info = v;
    }
    Ok(())
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidates_in(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidates_in(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidates_in(dir: &Path) -> [PathBuf; 4] {
    [
        dir.join("esi.toml"),
        dir.join("esi.json"),
        dir.join("config").join("esi.toml"),
        dir.join("config").join("esi.json"),
    ]
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an optional environment variable
///
/// # Errors
/// Returns `EsiError::Config` if the variable is set but does not parse.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_string(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| EsiError::Config(format!("Invalid value for {key}: {e}")))
        })
        .transpose()
}
