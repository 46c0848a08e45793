//! Resolved gateway configuration
//!
//! Merges command-line/environment overrides (collected by `clap` in
//! `main.rs`) over the TOML file over compiled defaults.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use tgbridge_common::config::{CompiledDefaults, QrRetentionMode, TomlConfig};

use crate::error::{Error, Result};

/// Platform application credentials
#[derive(Clone)]
pub struct ApiCredentials {
    pub api_id: i32,
    pub api_hash: String,
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_id", &self.api_id)
            .field("api_hash", &"<redacted>")
            .finish()
    }
}

/// Values given on the command line or through environment variables
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub api_id: Option<i32>,
    pub api_hash: Option<String>,
    pub connection_retries: Option<u32>,
    pub qr_directory: Option<PathBuf>,
    pub login_timeout_secs: Option<u64>,
}

/// Fully resolved settings
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub credentials: ApiCredentials,
    pub connection_retries: u32,
    pub qr_directory: PathBuf,
    pub qr_retention: QrRetentionMode,
    pub qr_ttl: Duration,
    pub sweep_interval: Duration,
    pub login_timeout: Duration,
}

impl Config {
    /// Resolve every setting; fails when credentials are missing or invalid
    pub fn resolve(overrides: Overrides, file: TomlConfig) -> Result<Self> {
        let defaults = CompiledDefaults::default();

        let bind_address = overrides
            .bind_address
            .or(file.server.bind_address)
            .unwrap_or(defaults.bind_address);
        let ip: IpAddr = bind_address
            .parse()
            .map_err(|_| Error::Config(format!("invalid bind address: {bind_address}")))?;
        let port = overrides.port.or(file.server.port).unwrap_or(defaults.port);

        let api_id = overrides.api_id.or(file.telegram.api_id).ok_or_else(|| {
            Error::Config("TELEGRAM_API_ID is required (--api-id or telegram.api_id)".into())
        })?;
        if api_id <= 0 {
            return Err(Error::Config(format!(
                "TELEGRAM_API_ID must be a positive integer, got {api_id}"
            )));
        }
        let api_hash = overrides
            .api_hash
            .or(file.telegram.api_hash)
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .ok_or_else(|| {
                Error::Config(
                    "TELEGRAM_API_HASH is required (--api-hash or telegram.api_hash)".into(),
                )
            })?;

        let sweep_secs = file
            .qr
            .sweep_interval_secs
            .unwrap_or(defaults.sweep_interval_secs);
        if sweep_secs == 0 {
            return Err(Error::Config("qr.sweep_interval_secs must be at least 1".into()));
        }

        Ok(Self {
            listen_addr: SocketAddr::new(ip, port),
            credentials: ApiCredentials { api_id, api_hash },
            connection_retries: overrides
                .connection_retries
                .or(file.telegram.connection_retries)
                .unwrap_or(defaults.connection_retries),
            qr_directory: overrides
                .qr_directory
                .or(file.qr.directory)
                .unwrap_or(defaults.qr_directory),
            qr_retention: file.qr.retention.unwrap_or(defaults.qr_retention),
            qr_ttl: Duration::from_secs(file.qr.ttl_secs.unwrap_or(defaults.qr_ttl_secs)),
            sweep_interval: Duration::from_secs(sweep_secs),
            login_timeout: Duration::from_secs(
                overrides
                    .login_timeout_secs
                    .or(file.auth.login_timeout_secs)
                    .unwrap_or(defaults.login_timeout_secs),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tgbridge_common::config::parse_toml_config;

    fn credentials() -> Overrides {
        Overrides {
            api_id: Some(12345),
            api_hash: Some("0123456789abcdef".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::resolve(credentials(), TomlConfig::default()).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.connection_retries, 5);
        assert_eq!(config.qr_directory, PathBuf::from("qrcodes"));
        assert_eq!(config.qr_retention, QrRetentionMode::DeleteOnCompletion);
        assert_eq!(config.qr_ttl, Duration::from_secs(600));
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
        assert_eq!(config.login_timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = parse_toml_config(
            "[server]\nport = 8080\n[qr]\nretention = \"keep_for_ttl\"\n[auth]\nlogin_timeout_secs = 30\n",
        )
        .unwrap();
        let config = Config::resolve(credentials(), file).unwrap();
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.qr_retention, QrRetentionMode::KeepForTtl);
        assert_eq!(config.login_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = parse_toml_config(
            "[server]\nport = 8080\n[telegram]\napi_id = 1\napi_hash = \"file-hash\"\n",
        )
        .unwrap();
        let overrides = Overrides {
            port: Some(9090),
            api_id: Some(2),
            ..Default::default()
        };
        let config = Config::resolve(overrides, file).unwrap();
        assert_eq!(config.listen_addr.port(), 9090);
        assert_eq!(config.credentials.api_id, 2);
        assert_eq!(config.credentials.api_hash, "file-hash");
    }

    #[test]
    fn test_missing_api_id_rejected() {
        let overrides = Overrides {
            api_hash: Some("abc".into()),
            ..Default::default()
        };
        let err = Config::resolve(overrides, TomlConfig::default()).unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_API_ID"));
    }

    #[test]
    fn test_blank_api_hash_rejected() {
        let overrides = Overrides {
            api_id: Some(1),
            api_hash: Some("   ".into()),
            ..Default::default()
        };
        let err = Config::resolve(overrides, TomlConfig::default()).unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_API_HASH"));
    }

    #[test]
    fn test_non_positive_api_id_rejected() {
        let overrides = Overrides {
            api_id: Some(0),
            ..credentials()
        };
        assert!(Config::resolve(overrides, TomlConfig::default()).is_err());
    }

    #[test]
    fn test_invalid_bind_address_rejected() {
        let overrides = Overrides {
            bind_address: Some("localhost:80".into()),
            ..credentials()
        };
        let err = Config::resolve(overrides, TomlConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_api_hash_not_in_debug_output() {
        let config = Config::resolve(credentials(), TomlConfig::default()).unwrap();
        assert!(!format!("{config:?}").contains("0123456789abcdef"));
    }
}
