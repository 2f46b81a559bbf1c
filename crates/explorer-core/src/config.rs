use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Environment variable selecting the active profile.
pub const ENVIRONMENT_VAR: &str = "LOCALEXPLORER_ENV";

/// Profile used when the active environment has no entry of its own.
pub const DEFAULT_ENVIRONMENT: &str = "development";

const APP_DIR: &str = "localexplorer";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Deployment-specific endpoints and keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Base URL for the `/users` endpoints
    pub backend_url: String,

    /// Origin serving `/suggest/nearby_places`
    pub suggestion_url: String,

    /// Key passed to the map embed widget
    #[serde(default)]
    pub google_places_api_key: String,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8000".to_string(),
            suggestion_url: "http://localhost:8000".to_string(),
            google_places_api_key: String::new(),
        }
    }
}

/// Where the dashboard gets its position from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LocationProvider {
    /// Coordinates taken from this config file
    #[default]
    Fixed,
    /// Approximate coordinates from an IP lookup service
    Ip,
}

/// Permission the user has given for location access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PermissionSetting {
    #[default]
    Granted,
    Prompt,
    Denied,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default)]
    pub provider: LocationProvider,

    #[serde(default)]
    pub permission: PermissionSetting,

    /// Fixed-provider latitude
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,

    /// Fixed-provider longitude
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,

    /// IP lookup endpoint (ip-api.com compatible)
    #[serde(default = "default_lookup_url")]
    pub lookup_url: String,

    /// Upper bound for a single position request
    #[serde(default = "default_location_timeout")]
    pub timeout_secs: u64,
}

fn default_lookup_url() -> String {
    "http://ip-api.com/json".to_string()
}

fn default_location_timeout() -> u64 {
    10
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            provider: LocationProvider::Fixed,
            permission: PermissionSetting::Granted,
            latitude: None,
            longitude: None,
            lookup_url: default_lookup_url(),
            timeout_secs: default_location_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Interval between user location pushes, in minutes
    #[serde(default = "default_refresh_minutes")]
    pub refresh_minutes: u32,

    /// Clock redraw interval, in seconds
    #[serde(default = "default_clock_tick")]
    pub clock_tick_secs: u32,
}

fn default_refresh_minutes() -> u32 {
    20
}

fn default_clock_tick() -> u32 {
    1
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            refresh_minutes: default_refresh_minutes(),
            clock_tick_secs: default_clock_tick(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    #[serde(skip, default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Profiles keyed by environment name
    #[serde(default = "default_profiles")]
    pub profiles: BTreeMap<String, Profile>,

    #[serde(default)]
    pub location: LocationConfig,

    #[serde(default)]
    pub dashboard: DashboardConfig,
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn default_profiles() -> BTreeMap<String, Profile> {
    let mut profiles = BTreeMap::new();
    profiles.insert(DEFAULT_ENVIRONMENT.to_string(), Profile::default());
    profiles.insert("production".to_string(), Profile::default());
    profiles
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            profiles: default_profiles(),
            location: LocationConfig::default(),
            dashboard: DashboardConfig::default(),
        }
    }
}

/// Name of the active deployment environment.
///
/// Reads `LOCALEXPLORER_ENV`; when unset, debug builds are `development` and
/// release builds are `production`.
pub fn current_environment() -> String {
    std::env::var(ENVIRONMENT_VAR)
        .ok()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| {
            if cfg!(debug_assertions) {
                DEFAULT_ENVIRONMENT.to_string()
            } else {
                "production".to_string()
            }
        })
}

impl Config {
    /// Load configuration from the user config directory, creating a default
    /// file if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join(APP_DIR);
        Self::load_from_dir(&config_dir)
    }

    /// Load `config.toml` from `config_dir`, writing defaults when missing
    pub fn load_from_dir(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join("config.toml");

        if !config_path.exists() {
            let config = Self {
                config_dir: config_dir.to_path_buf(),
                ..Self::default()
            };
            config.save()?;
            tracing::info!("Wrote default configuration to {}", config_path.display());
            return Ok(config);
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| {
            ConfigError::NotFound(format!("{}: {}", config_path.display(), e))
        })?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", config_path.display(), e)))?;
        config.config_dir = config_dir.to_path_buf();

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns an error if validation fails with critical errors; warnings are logged.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        Self::load()?.into_validated()
    }

    fn into_validated(self) -> Result<(Self, ValidationResult)> {
        let validation = self.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((self, validation))
    }

    /// Profile for the current environment
    pub fn profile(&self) -> Profile {
        self.profile_for(&current_environment())
    }

    /// Profile for `environment`, falling back to `development` and then to
    /// built-in defaults
    pub fn profile_for(&self, environment: &str) -> Profile {
        if let Some(profile) = self.profiles.get(environment) {
            return profile.clone();
        }
        tracing::debug!(
            "No profile for environment '{}', using '{}'",
            environment,
            DEFAULT_ENVIRONMENT
        );
        self.profiles
            .get(DEFAULT_ENVIRONMENT)
            .cloned()
            .unwrap_or_default()
    }

    /// Path of the local key-value store file
    pub fn store_path(&self) -> PathBuf {
        self.config_dir.join("store.json")
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.profiles.is_empty() {
            result.add_warning("profiles", "No profiles configured, using built-in defaults");
        }

        for (name, profile) in &self.profiles {
            validate_url(
                &profile.backend_url,
                &format!("profiles.{}.backend_url", name),
                &mut result,
            );
            validate_url(
                &profile.suggestion_url,
                &format!("profiles.{}.suggestion_url", name),
                &mut result,
            );
            if profile.google_places_api_key.is_empty() {
                result.add_warning(
                    format!("profiles.{}.google_places_api_key", name),
                    "Map API key not set - the map embed will not load",
                );
            }
        }

        if self.location.provider == LocationProvider::Ip {
            validate_url(&self.location.lookup_url, "location.lookup_url", &mut result);
        }

        if let Some(lat) = self.location.latitude {
            if !(-90.0..=90.0).contains(&lat) {
                result.add_error("location.latitude", "Latitude must be within -90..90");
            }
        }
        if let Some(lon) = self.location.longitude {
            if !(-180.0..=180.0).contains(&lon) {
                result.add_error("location.longitude", "Longitude must be within -180..180");
            }
        }

        if self.location.timeout_secs == 0 {
            result.add_error("location.timeout_secs", "Location timeout must be greater than 0");
        }

        if self.dashboard.refresh_minutes == 0 {
            result.add_error(
                "dashboard.refresh_minutes",
                "Refresh interval must be greater than 0",
            );
        } else if self.dashboard.refresh_minutes > 1440 {
            result.add_warning(
                "dashboard.refresh_minutes",
                "Refresh interval is more than 24 hours",
            );
        }

        if self.dashboard.clock_tick_secs == 0 {
            result.add_error(
                "dashboard.clock_tick_secs",
                "Clock tick must be greater than 0",
            );
        }

        result
    }

    /// Save configuration to `config_dir/config.toml`
    pub fn save(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config_dir)
            .context("Failed to create config directory")?;

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(self.config_dir.join("config.toml"), contents)
            .context("Failed to write config file")?;

        Ok(())
    }
}

fn validate_url(url_str: &str, field_name: &str, result: &mut ValidationResult) {
    match Url::parse(url_str) {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                result.add_error(
                    field_name,
                    format!("URL must use http or https scheme, got: {}", url.scheme()),
                );
            }
            if url.host().is_none() {
                result.add_error(field_name, "URL must have a host");
            }
            if url.port() == Some(0) {
                result.add_error(field_name, "Port cannot be 0");
            }
        }
        Err(e) => {
            result.add_error(field_name, format!("Invalid URL: {}", e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
    }

    #[test]
    fn test_missing_api_key_is_warning() {
        let result = Config::default().validate();
        assert!(result
            .warnings
            .iter()
            .any(|w| w.field == "profiles.development.google_places_api_key"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        if let Some(profile) = config.profiles.get_mut("development") {
            profile.backend_url = "ftp://localhost:8000".to_string();
        }
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_zero_refresh_interval_is_error() {
        let mut config = Config::default();
        config.dashboard.refresh_minutes = 0;
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "dashboard.refresh_minutes"));
    }

    #[test]
    fn test_out_of_range_latitude() {
        let mut config = Config::default();
        config.location.latitude = Some(123.0);
        assert!(!config.validate().is_valid());
    }

    #[test]
    fn test_unknown_environment_falls_back_to_development() {
        let mut config = Config::default();
        config.profiles.insert(
            "development".to_string(),
            Profile {
                backend_url: "http://dev.local:9000".to_string(),
                ..Profile::default()
            },
        );
        let profile = config.profile_for("staging");
        assert_eq!(profile.backend_url, "http://dev.local:9000");
    }

    #[test]
    fn test_empty_profiles_fall_back_to_builtin() {
        let mut config = Config::default();
        config.profiles.clear();
        assert_eq!(config.profile_for("production"), Profile::default());
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from_dir(dir.path()).unwrap();
        assert!(dir.path().join("config.toml").exists());
        assert_eq!(config.dashboard.refresh_minutes, 20);
        assert_eq!(config.store_path(), dir.path().join("store.json"));
    }

    #[test]
    fn test_load_reads_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            r#"
[profiles.production]
backend_url = "https://api.example.com"
suggestion_url = "https://suggest.example.com"
google_places_api_key = "abc"

[location]
provider = "ip"
permission = "prompt"
"#,
        )
        .unwrap();

        let config = Config::load_from_dir(dir.path()).unwrap();
        assert_eq!(config.profile_for("production").google_places_api_key, "abc");
        assert_eq!(config.location.provider, LocationProvider::Ip);
        assert_eq!(config.location.permission, PermissionSetting::Prompt);
        assert_eq!(config.location.timeout_secs, 10);
        assert_eq!(config.dashboard.refresh_minutes, 20);
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "[dashboard\nrefresh_minutes = ").unwrap();

        let err = Config::load_from_dir(dir.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_failed_validation_is_invalid_config() {
        let mut config = Config::default();
        config.dashboard.clock_tick_secs = 0;

        let err = config.into_validated().unwrap_err();
        match err.downcast_ref::<ConfigError>() {
            Some(ConfigError::Invalid(summary)) => assert!(summary.contains("clock_tick_secs")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
