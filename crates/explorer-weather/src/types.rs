use std::time::Duration;

use explorer_core::PermissionSetting;
use serde::{Deserialize, Serialize};

/// Geographic position as reported by a geolocator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const ORIGIN: Coordinates = Coordinates {
        latitude: 0.0,
        longitude: 0.0,
    };

    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

/// Location permission as reported by the permission system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Granted,
    Prompt,
    Denied,
}

impl From<PermissionSetting> for PermissionState {
    fn from(setting: PermissionSetting) -> Self {
        match setting {
            PermissionSetting::Granted => Self::Granted,
            PermissionSetting::Prompt => Self::Prompt,
            PermissionSetting::Denied => Self::Denied,
        }
    }
}

/// Options for a single position request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    pub timeout: Duration,
    /// Maximum age of a cached position; zero forces a fresh one
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::ZERO,
        }
    }
}

/// Location service errors
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unavailable")]
    PositionUnavailable,
    #[error("Location request timed out")]
    Timeout,
    #[error("Location is not supported: {0}")]
    Unsupported(String),
}

impl LocationError {
    /// Human-readable message, logged when acquisition fails
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "User denied the request for Geolocation.",
            Self::PositionUnavailable => "Location information is unavailable.",
            Self::Timeout => "The request to get user location timed out.",
            Self::Unsupported(_) => "Unknown error occurred.",
        }
    }
}

impl From<LocationError> for explorer_core::AppError {
    fn from(err: LocationError) -> Self {
        explorer_core::AppError::Service(err.to_string())
    }
}
