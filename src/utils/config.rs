// src/utils/config.rs
use config::{Config as ConfigLib, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::utils::error::{ClinicError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub sensor: SensorConfig,
    pub storage: StorageConfig,
    pub desk: DeskConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub cors_permissive: bool,
}

/// Connection settings for the RD Services capture daemon.
#[derive(Debug, Clone, Deserialize)]
pub struct SensorConfig {
    pub endpoint: String,
    pub device_type: String,
    pub baud_rate: u32,
    pub quality: String,
    pub capture_timeout_ms: u64,
    pub simulation_delay_ms: u64,
    pub connect_timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Rocksdb,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub path: String,
    pub uploads_dir: String,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeskConfig {
    pub api_base_url: String,
    pub recent_limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub directory: Option<String>,
    pub file_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
            log_level: "info".into(),
            cors_permissive: true,
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080".into(),
            device_type: "MFS110".into(),
            baud_rate: 9600,
            quality: "high".into(),
            capture_timeout_ms: 10_000,
            simulation_delay_ms: 2_000,
            connect_timeout_ms: 3_000,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Rocksdb,
            path: "data/patients".into(),
            uploads_dir: "uploads".into(),
            max_upload_bytes: 52_428_800,
        }
    }
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:3000".into(),
            recent_limit: 6,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            file_prefix: "biodesk.log".into(),
        }
    }
}

impl Config {
    pub fn new() -> Result<Self> {
        Self::load_from("config")
    }

    /// Loads `<dir>/default` and the optional `<dir>/local`, then applies
    /// `APP_` environment overrides (e.g. `APP_SENSOR__ENDPOINT`).
    pub fn load_from(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let default_file = dir.join("default");
        let local_file = dir.join("local");

        let config = ConfigLib::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.log_level", "info")?
            .set_default("server.cors_permissive", true)?
            .set_default("sensor.endpoint", "http://localhost:8080")?
            .set_default("sensor.device_type", "MFS110")?
            .set_default("sensor.baud_rate", 9600)?
            .set_default("sensor.quality", "high")?
            .set_default("sensor.capture_timeout_ms", 10_000)?
            .set_default("sensor.simulation_delay_ms", 2_000)?
            .set_default("sensor.connect_timeout_ms", 3_000)?
            .set_default("storage.backend", "rocksdb")?
            .set_default("storage.path", "data/patients")?
            .set_default("storage.uploads_dir", "uploads")?
            .set_default("storage.max_upload_bytes", 52_428_800)? // 50MB
            .set_default("desk.api_base_url", "http://127.0.0.1:3000")?
            .set_default("desk.recent_limit", 6)?
            .set_default("logging.file_prefix", "biodesk.log")?
            .add_source(File::from(default_file).required(false))
            .add_source(File::from(local_file).required(false))
            .add_source(Environment::with_prefix("APP").prefix_separator("_").separator("__"))
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(ClinicError::Config("Invalid port number".into()));
        }

        if self.sensor.endpoint.trim().is_empty() {
            return Err(ClinicError::Config("sensor.endpoint must be set".into()));
        }
        if self.sensor.capture_timeout_ms == 0 {
            return Err(ClinicError::Config(
                "sensor.capture_timeout_ms must be greater than 0".into(),
            ));
        }

        if self.storage.backend == StorageBackend::Rocksdb && self.storage.path.is_empty() {
            return Err(ClinicError::Config("storage.path must be set".into()));
        }

        if self.desk.recent_limit == 0 {
            return Err(ClinicError::Config("desk.recent_limit must be greater than 0".into()));
        }

        Ok(())
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.sensor.capture_timeout_ms)
    }

    pub fn simulation_delay(&self) -> Duration {
        Duration::from_millis(self.sensor.simulation_delay_ms)
    }
}

impl From<ConfigError> for ClinicError {
    fn from(error: ConfigError) -> Self {
        ClinicError::Config(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_validate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.capture_timeout(), Duration::from_millis(10_000));
        assert_eq!(config.simulation_delay(), Duration::from_millis(2_000));
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let dir = tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("default.toml")).unwrap();
        writeln!(
            file,
            "[server]\nport = 4100\n\n[sensor]\nendpoint = \"http://10.0.0.5:8080\"\n\n[storage]\nbackend = \"memory\""
        )
        .unwrap();

        let config = Config::load_from(dir.path()).unwrap();
        assert_eq!(config.server.port, 4100);
        assert_eq!(config.sensor.endpoint, "http://10.0.0.5:8080");
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.sensor.baud_rate, 9600);
        assert_eq!(config.desk.recent_limit, 6);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(matches!(config.validate(), Err(ClinicError::Config(_))));

        let mut config = Config::default();
        config.sensor.capture_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.desk.recent_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_backend_fails_to_load() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.toml"),
            "[storage]\nbackend = \"mongodb\"\n",
        )
        .unwrap();

        assert!(matches!(
            Config::load_from(dir.path()),
            Err(ClinicError::Config(_))
        ));
    }
}
