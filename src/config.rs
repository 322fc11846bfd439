/// Service configuration.
///
/// Settings come from a TOML file (`tidemon.toml` by default, or the path in
/// `TIDEMON_CONFIG`). Every field has a default, so a missing file is not an
/// error. A handful of deployment settings can be overridden from the
/// environment, which is first populated from `.env` if present.
///
/// | Variable              | Overrides      |
/// |-----------------------|----------------|
/// | `TIDEMON_LISTEN_ADDR` | `listen_addr`  |
/// | `TIDEMON_LOG_LEVEL`   | `log_level`    |
/// | `TIDEMON_LOG_FILE`    | `log_file`     |
/// | `TIDEMON_BASE_URL`    | `base_url`     |

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::ingest::coops::{DataRequest, COOPS_BASE_URL};
use crate::ingest::window::MAX_WINDOW_DAYS;
use crate::logging::LogLevel;
use crate::model::Product;
use crate::station::{is_valid_station_id, STATION};

pub const DEFAULT_CONFIG_PATH: &str = "./tidemon.toml";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    Io(String),
    /// The config file is not valid TOML for `ServiceConfig`.
    Parse(String),
    /// A value is out of range or inconsistent.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Config read error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Config parse error: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// `water_level` or `predictions`.
    pub product: Product,
    /// Vertical reference passed through to the provider (e.g. `MLLW`).
    pub datum: String,
    /// `metric` or `english`.
    pub units: String,
    /// Calendar year to ingest; also the store epoch.
    pub year: i32,
    /// Days added to the window cursor per request (1..=31).
    pub window_days: i64,
    pub base_url: String,
    /// Sent as `application=` so the provider can identify the caller.
    pub application: String,
    pub request_timeout_secs: u64,
    pub listen_addr: String,
    pub log_level: String,
    pub log_file: Option<String>,
    pub console_timestamps: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            product: Product::WaterLevel,
            datum: STATION.default_datum.to_string(),
            units: "metric".to_string(),
            year: 2020,
            window_days: MAX_WINDOW_DAYS,
            base_url: COOPS_BASE_URL.to_string(),
            application: "tidemon_service".to_string(),
            request_timeout_secs: 30,
            listen_addr: "0.0.0.0:3000".to_string(),
            log_level: "info".to_string(),
            log_file: None,
            console_timestamps: true,
        }
    }
}

impl ServiceConfig {
    /// Check ranges and cross-field consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_station_id(STATION.station_id) {
            return Err(ConfigError::Invalid(format!(
                "station id '{}' is not a 7-digit CO-OPS id",
                STATION.station_id
            )));
        }
        if !STATION.offers(self.product) {
            return Err(ConfigError::Invalid(format!(
                "{} does not publish {}",
                STATION.name, self.product
            )));
        }
        if !(1..=MAX_WINDOW_DAYS).contains(&self.window_days) {
            return Err(ConfigError::Invalid(format!(
                "window_days must be between 1 and {}, got {}",
                MAX_WINDOW_DAYS, self.window_days
            )));
        }
        if !(1900..=2100).contains(&self.year) {
            return Err(ConfigError::Invalid(format!("year {} out of range", self.year)));
        }
        if self.units != "metric" && self.units != "english" {
            return Err(ConfigError::Invalid(format!(
                "units must be 'metric' or 'english', got '{}'",
                self.units
            )));
        }
        if self.datum.trim().is_empty() {
            return Err(ConfigError::Invalid("datum must not be empty".to_string()));
        }
        if let Err(e) = reqwest::Url::parse(&self.base_url) {
            return Err(ConfigError::Invalid(format!(
                "base_url '{}' is not a URL: {}",
                self.base_url, e
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        self.log_level
            .parse::<LogLevel>()
            .map_err(ConfigError::Invalid)?;
        Ok(())
    }

    /// Parsed minimum log level. Falls back to `Info` for values `validate`
    /// would reject.
    pub fn log_level(&self) -> LogLevel {
        self.log_level.parse().unwrap_or(LogLevel::Info)
    }

    /// Fixed query parameters for every window request.
    pub fn data_request(&self) -> DataRequest {
        DataRequest {
            base_url: self.base_url.clone(),
            station: STATION.station_id.to_string(),
            product: self.product,
            datum: self.datum.clone(),
            units: self.units.clone(),
            application: self.application.clone(),
        }
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("TIDEMON_LISTEN_ADDR") {
            self.listen_addr = addr;
        }
        if let Some(level) = lookup("TIDEMON_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(file) = lookup("TIDEMON_LOG_FILE") {
            self.log_file = if file.is_empty() { None } else { Some(file) };
        }
        if let Some(url) = lookup("TIDEMON_BASE_URL") {
            self.base_url = url;
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Parse configuration text. Missing fields take their defaults.
pub fn parse_config(text: &str) -> Result<ServiceConfig, ConfigError> {
    toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
}

/// Load a config file; a missing file yields the defaults.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ServiceConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(ServiceConfig::default());
    }
    let text = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
    parse_config(&text)
}

/// Load `.env`, the config file and environment overrides, then validate.
pub fn load() -> Result<ServiceConfig, ConfigError> {
    dotenv::dotenv().ok();

    let path = std::env::var("TIDEMON_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = load_config(&path)?;
    config.apply_overrides(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServiceConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.year, 2020);
        assert_eq!(config.window_days, 31);
        assert_eq!(config.log_level(), LogLevel::Info);
    }

    #[test]
    fn test_parse_partial_file_keeps_defaults() {
        let config = parse_config(
            r#"
            product = "predictions"
            units = "english"
            listen_addr = "127.0.0.1:8080"
            "#,
        )
        .unwrap();

        assert_eq!(config.product, Product::Predictions);
        assert_eq!(config.units, "english");
        assert_eq!(config.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.datum, "MLLW");
        assert_eq!(config.year, 2020);
    }

    #[test]
    fn test_parse_rejects_unknown_fields_and_products() {
        assert!(matches!(parse_config("station = \"1234567\""), Err(ConfigError::Parse(_))));
        assert!(matches!(parse_config("product = \"currents\""), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let config = ServiceConfig { window_days: 32, ..ServiceConfig::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = ServiceConfig { units: "furlongs".to_string(), ..ServiceConfig::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = ServiceConfig { log_level: "chatty".to_string(), ..ServiceConfig::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = ServiceConfig { datum: "  ".to_string(), ..ServiceConfig::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = ServiceConfig { base_url: "api.example".to_string(), ..ServiceConfig::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_env_overrides_apply() {
        let env: HashMap<&str, &str> = [
            ("TIDEMON_LISTEN_ADDR", "127.0.0.1:9000"),
            ("TIDEMON_LOG_LEVEL", "debug"),
            ("TIDEMON_LOG_FILE", "/tmp/tidemon.log"),
        ]
        .into_iter()
        .collect();

        let mut config = ServiceConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.log_level(), LogLevel::Debug);
        assert_eq!(config.log_file.as_deref(), Some("/tmp/tidemon.log"));
        assert_eq!(config.base_url, COOPS_BASE_URL);
    }

    #[test]
    fn test_data_request_uses_fixed_station() {
        let request = ServiceConfig::default().data_request();
        assert_eq!(request.station, STATION.station_id);
        assert_eq!(request.product, Product::WaterLevel);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = load_config("./definitely-not-here.toml").unwrap();
        assert_eq!(config, ServiceConfig::default());
    }
}
