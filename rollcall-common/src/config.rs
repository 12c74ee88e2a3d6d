//! Service configuration
//!
//! Two tiers:
//! 1. **TOML bootstrap**: database path, listen address, campus geofence,
//!    slot windows, face threshold, logging
//! 2. **Database settings**: the token-signing secret (see [`crate::api::auth`])
//!
//! # Config file resolution
//!
//! 1. `--config` command-line argument
//! 2. `ROLLCALL_CONFIG` environment variable
//! 3. `<config_dir>/rollcall/config.toml`
//! 4. Built-in defaults
//!
//! A missing file is not an error; the service starts on defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::attendance::EligibilityPolicy;
use crate::face::DEFAULT_MATCH_THRESHOLD;
use crate::geo::{Coordinate, GeoFence};
use crate::slot::SlotWindows;
use crate::{Error, Result};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "ROLLCALL_CONFIG";

const APP_DIR: &str = "rollcall";
const DEFAULT_DB_FILE: &str = "rollcall.db";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer token lifetime
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: u32,

    #[serde(default)]
    pub campus: CampusConfig,

    #[serde(default)]
    pub slots: SlotWindows,

    /// Largest descriptor distance accepted as the same face
    #[serde(default = "default_face_match_threshold")]
    pub face_match_threshold: f64,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Campus geofence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CampusConfig {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
}

impl Default for CampusConfig {
    fn default() -> Self {
        Self {
            latitude: 17.409954,
            longitude: 78.603195,
            radius_km: 2.0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins when set
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR).join(DEFAULT_DB_FILE))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE))
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_token_ttl_hours() -> u32 {
    24
}

fn default_face_match_threshold() -> f64 {
    DEFAULT_MATCH_THRESHOLD
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            host: default_host(),
            port: default_port(),
            token_ttl_hours: default_token_ttl_hours(),
            campus: CampusConfig::default(),
            slots: SlotWindows::default(),
            face_match_threshold: default_face_match_threshold(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Command-line overrides, applied after the file is read
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl ServiceConfig {
    /// Parse a TOML document; absent keys take defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: ServiceConfig =
            toml::from_str(text).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file {:?}: {}", path, e)))?;
        Self::from_toml_str(&text)
    }

    /// Resolve the config file, load it, then apply overrides
    ///
    /// A file that does not exist degrades to defaults with a warning. A file
    /// that exists but fails to parse or validate is an error.
    pub fn load(overrides: ConfigOverrides) -> Result<Self> {
        let mut config = match resolve_config_path(overrides.config_path.as_deref()) {
            Some(path) if path.exists() => {
                let config = Self::from_file(&path)?;
                info!("Loaded configuration from {:?}", path);
                config
            }
            Some(path) => {
                warn!("Config file {:?} not found, using built-in defaults", path);
                Self::default()
            }
            None => {
                warn!("No config directory available, using built-in defaults");
                Self::default()
            }
        };

        if let Some(path) = overrides.database_path {
            config.database_path = path;
        }
        if let Some(host) = overrides.host {
            config.host = host;
        }
        if let Some(port) = overrides.port {
            config.port = port;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.slots.validate()?;

        let campus = &self.campus;
        if !campus.latitude.is_finite() || !(-90.0..=90.0).contains(&campus.latitude) {
            return Err(Error::Config(format!("campus.latitude out of range: {}", campus.latitude)));
        }
        if !campus.longitude.is_finite() || !(-180.0..=180.0).contains(&campus.longitude) {
            return Err(Error::Config(format!("campus.longitude out of range: {}", campus.longitude)));
        }
        if !campus.radius_km.is_finite() || campus.radius_km < 0.0 {
            return Err(Error::Config(format!("campus.radius_km must be >= 0, got {}", campus.radius_km)));
        }
        if !self.face_match_threshold.is_finite() || self.face_match_threshold <= 0.0 {
            return Err(Error::Config(format!(
                "face_match_threshold must be positive, got {}",
                self.face_match_threshold
            )));
        }
        if self.token_ttl_hours == 0 {
            return Err(Error::Config("token_ttl_hours must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn campus_center(&self) -> Result<Coordinate> {
        Coordinate::new(self.campus.latitude, self.campus.longitude)
            .ok_or_else(|| Error::Config("campus centre must be finite".to_string()))
    }

    /// Eligibility policy described by this config
    pub fn eligibility_policy(&self) -> Result<EligibilityPolicy> {
        let geofence = GeoFence::new(self.campus_center()?, self.campus.radius_km);
        Ok(EligibilityPolicy::new(geofence, self.slots).with_threshold(self.face_match_threshold))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Config file path by priority; None only when no config dir exists
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}
