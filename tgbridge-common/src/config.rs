//! Configuration file loading and resolution
//!
//! Settings resolve in this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Steps 1 and 2 belong to each binary's `clap` arguments; this module
//! provides the TOML layer and the compiled defaults.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "TGBRIDGE_CONFIG";

/// Contents of `config.toml`
///
/// Every key is optional; a missing key falls through to [`CompiledDefaults`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TomlConfig {
    pub server: ServerSection,
    pub telegram: TelegramSection,
    pub qr: QrSection,
    pub auth: AuthSection,
}

/// `[server]` table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
}

/// `[telegram]` table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelegramSection {
    pub api_id: Option<i32>,
    pub api_hash: Option<String>,
    pub connection_retries: Option<u32>,
}

/// `[qr]` table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QrSection {
    pub directory: Option<PathBuf>,
    pub retention: Option<QrRetentionMode>,
    pub ttl_secs: Option<u64>,
    pub sweep_interval_secs: Option<u64>,
}

/// `[auth]` table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthSection {
    pub login_timeout_secs: Option<u64>,
}

/// What happens to a QR image once its authorization attempt ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QrRetentionMode {
    /// Remove the image as soon as the attempt succeeds or fails
    DeleteOnCompletion,
    /// Keep the image; a periodic sweep removes it after the TTL
    KeepForTtl,
}

/// Compiled fallback values used when neither CLI, env nor TOML set a key
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub bind_address: String,
    pub port: u16,
    pub connection_retries: u32,
    pub qr_directory: PathBuf,
    pub qr_retention: QrRetentionMode,
    pub qr_ttl_secs: u64,
    pub sweep_interval_secs: u64,
    pub login_timeout_secs: u64,
}

impl Default for CompiledDefaults {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3000,
            connection_retries: 5,
            qr_directory: PathBuf::from("qrcodes"),
            qr_retention: QrRetentionMode::DeleteOnCompletion,
            qr_ttl_secs: 600,
            sweep_interval_secs: 60,
            login_timeout_secs: 300,
        }
    }
}

/// Locate the config file
///
/// Order: explicit path, `TGBRIDGE_CONFIG`, `<user config dir>/tgbridge/config.toml`,
/// then `/etc/tgbridge/config.toml` on Linux. Only the two implicit locations
/// are checked for existence; an explicit path is returned as given.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let user_config = dirs::config_dir().map(|d| d.join("tgbridge").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/tgbridge/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Parse a config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_toml_config(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
}

/// Parse config file contents
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
}

/// Resolve and load the config file, degrading to defaults when none exists
///
/// A missing file is not fatal (warning + defaults). A file that exists but
/// cannot be read or parsed is an error.
pub fn load_or_default(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    match resolve_config_path(cli_arg) {
        None => {
            info!("No config file found, using defaults");
            Ok(TomlConfig::default())
        }
        Some(path) if !path.exists() => {
            warn!("Config file {} not found, using defaults", path.display());
            Ok(TomlConfig::default())
        }
        Some(path) => {
            info!("Loading config from {}", path.display());
            load_toml_config(&path)
        }
    }
}
