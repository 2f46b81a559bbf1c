//! Position sources for the dashboard.
//!
//! A [`Geolocator`] reports the permission state and answers one-shot
//! position requests. [`acquire`] bounds a request by its timeout.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use explorer_core::{LocationConfig, LocationProvider};
use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;

use crate::types::{Coordinates, LocationError, PermissionState, PositionOptions};

#[async_trait]
pub trait Geolocator: Send + Sync {
    /// Current permission state, without prompting
    async fn permission_state(&self) -> Result<PermissionState, LocationError>;

    /// Ask for permission. Only a `Prompt` state can change here.
    async fn request_permission(&self) -> Result<PermissionState, LocationError> {
        self.permission_state().await
    }

    /// One-shot position request
    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<Coordinates, LocationError>;
}

/// Request a position, failing with [`LocationError::Timeout`] once
/// `options.timeout` elapses. The underlying request is not cancelled
/// remotely; its result is simply dropped.
pub async fn acquire(
    geolocator: &dyn Geolocator,
    options: &PositionOptions,
) -> Result<Coordinates, LocationError> {
    match tokio::time::timeout(options.timeout, geolocator.current_position(options)).await {
        Ok(result) => result,
        Err(_) => Err(LocationError::Timeout),
    }
}

/// Build the geolocator selected in the config
pub fn from_config(config: &LocationConfig) -> Result<Arc<dyn Geolocator>, LocationError> {
    let permission = PermissionState::from(config.permission);
    match config.provider {
        LocationProvider::Fixed => {
            let coordinates = match (config.latitude, config.longitude) {
                (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
                _ => None,
            };
            Ok(Arc::new(FixedGeolocator::new(coordinates, permission)))
        }
        LocationProvider::Ip => Ok(Arc::new(IpGeolocator::new(
            &config.lookup_url,
            Duration::from_secs(config.timeout_secs),
            permission,
        )?)),
    }
}

/// Permission state shared by the built-in geolocators.
#[derive(Debug)]
struct PermissionGate {
    state: Mutex<PermissionState>,
}

impl PermissionGate {
    fn new(state: PermissionState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    fn get(&self) -> PermissionState {
        *self.state.lock()
    }

    fn request(&self) -> PermissionState {
        let mut state = self.state.lock();
        if *state == PermissionState::Prompt {
            tracing::info!("Location permission granted");
            *state = PermissionState::Granted;
        }
        *state
    }

    fn check(&self) -> Result<(), LocationError> {
        match self.get() {
            PermissionState::Granted => Ok(()),
            PermissionState::Prompt | PermissionState::Denied => {
                Err(LocationError::PermissionDenied)
            }
        }
    }
}

/// Geolocator answering with a configured position.
#[derive(Debug)]
pub struct FixedGeolocator {
    coordinates: Option<Coordinates>,
    permission: PermissionGate,
}

impl FixedGeolocator {
    pub fn new(coordinates: Option<Coordinates>, permission: PermissionState) -> Self {
        Self {
            coordinates,
            permission: PermissionGate::new(permission),
        }
    }
}

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn permission_state(&self) -> Result<PermissionState, LocationError> {
        Ok(self.permission.get())
    }

    async fn request_permission(&self) -> Result<PermissionState, LocationError> {
        Ok(self.permission.request())
    }

    async fn current_position(
        &self,
        _options: &PositionOptions,
    ) -> Result<Coordinates, LocationError> {
        self.permission.check()?;
        self.coordinates.ok_or(LocationError::PositionUnavailable)
    }
}

#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    status: String,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    message: Option<String>,
}

/// Geolocator using an ip-api.com style lookup.
#[derive(Debug)]
pub struct IpGeolocator {
    client: Client,
    lookup_url: String,
    permission: PermissionGate,
}

impl IpGeolocator {
    pub fn new(
        lookup_url: &str,
        timeout: Duration,
        permission: PermissionState,
    ) -> Result<Self, LocationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LocationError::Unsupported(e.to_string()))?;

        Ok(Self {
            client,
            lookup_url: lookup_url.to_string(),
            permission: PermissionGate::new(permission),
        })
    }
}

#[async_trait]
impl Geolocator for IpGeolocator {
    async fn permission_state(&self) -> Result<PermissionState, LocationError> {
        Ok(self.permission.get())
    }

    async fn request_permission(&self) -> Result<PermissionState, LocationError> {
        Ok(self.permission.request())
    }

    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<Coordinates, LocationError> {
        self.permission.check()?;

        if options.enable_high_accuracy {
            tracing::debug!("High accuracy requested; IP lookup is city-level only");
        }

        let response = self
            .client
            .get(&self.lookup_url)
            .send()
            .await
            .map_err(|e| {
                tracing::debug!("IP lookup request failed: {}", e);
                if e.is_timeout() {
                    LocationError::Timeout
                } else {
                    LocationError::PositionUnavailable
                }
            })?;

        if !response.status().is_success() {
            tracing::debug!("IP lookup returned status {}", response.status());
            return Err(LocationError::PositionUnavailable);
        }

        let body: IpLookupResponse = response.json().await.map_err(|e| {
            tracing::debug!("IP lookup parse error: {}", e);
            LocationError::PositionUnavailable
        })?;

        match (body.status.as_str(), body.lat, body.lon) {
            ("success", Some(lat), Some(lon)) => Ok(Coordinates::new(lat, lon)),
            _ => {
                tracing::debug!(
                    "IP lookup unsuccessful: {}",
                    body.message.as_deref().unwrap_or("no message")
                );
                Err(LocationError::PositionUnavailable)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct NeverAnswers;

    #[async_trait]
    impl Geolocator for NeverAnswers {
        async fn permission_state(&self) -> Result<PermissionState, LocationError> {
            Ok(PermissionState::Granted)
        }

        async fn current_position(
            &self,
            _options: &PositionOptions,
        ) -> Result<Coordinates, LocationError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_times_out() {
        let result = acquire(&NeverAnswers, &PositionOptions::default()).await;
        assert!(matches!(result, Err(LocationError::Timeout)));
    }

    #[tokio::test]
    async fn test_fixed_granted_returns_position() {
        let geo = FixedGeolocator::new(Some(Coordinates::new(1.5, 2.5)), PermissionState::Granted);
        let coords = acquire(&geo, &PositionOptions::default()).await.unwrap();
        assert_eq!(coords, Coordinates::new(1.5, 2.5));
    }

    #[tokio::test]
    async fn test_fixed_without_position_is_unavailable() {
        let geo = FixedGeolocator::new(None, PermissionState::Granted);
        let result = acquire(&geo, &PositionOptions::default()).await;
        assert!(matches!(result, Err(LocationError::PositionUnavailable)));
    }

    #[tokio::test]
    async fn test_prompt_blocks_until_requested() {
        let geo = FixedGeolocator::new(Some(Coordinates::new(1.0, 1.0)), PermissionState::Prompt);
        let first = acquire(&geo, &PositionOptions::default()).await;
        assert!(matches!(first, Err(LocationError::PermissionDenied)));

        assert_eq!(geo.request_permission().await.unwrap(), PermissionState::Granted);
        assert!(acquire(&geo, &PositionOptions::default()).await.is_ok());
    }

    #[tokio::test]
    async fn test_denied_stays_denied() {
        let geo = FixedGeolocator::new(Some(Coordinates::new(1.0, 1.0)), PermissionState::Denied);
        assert_eq!(geo.request_permission().await.unwrap(), PermissionState::Denied);
        assert!(matches!(
            acquire(&geo, &PositionOptions::default()).await,
            Err(LocationError::PermissionDenied)
        ));
    }

    #[tokio::test]
    async fn test_ip_lookup_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "lat": 47.6062,
                "lon": -122.3321
            })))
            .mount(&server)
            .await;

        let geo = IpGeolocator::new(
            &format!("{}/json", server.uri()),
            Duration::from_secs(5),
            PermissionState::Granted,
        )
        .unwrap();
        let coords = geo.current_position(&PositionOptions::default()).await.unwrap();
        assert_eq!(coords, Coordinates::new(47.6062, -122.3321));
    }

    #[tokio::test]
    async fn test_ip_lookup_failure_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "fail",
                "message": "private range"
            })))
            .mount(&server)
            .await;

        let geo = IpGeolocator::new(
            &format!("{}/json", server.uri()),
            Duration::from_secs(5),
            PermissionState::Granted,
        )
        .unwrap();
        let result = geo.current_position(&PositionOptions::default()).await;
        assert!(matches!(result, Err(LocationError::PositionUnavailable)));
    }

    #[test]
    fn test_from_config_builds_fixed_provider() {
        let config = LocationConfig {
            latitude: Some(10.0),
            ..LocationConfig::default()
        };
        assert!(from_config(&config).is_ok());
    }
}
