//! Wire types for the LocalExplorer backend.

use chrono::{DateTime, SecondsFormat, Utc};
use explorer_weather::Coordinates;
use serde::{Deserialize, Deserializer, Serialize};

/// Backend user record, keyed by `user_identifier`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(alias = "_id")]
    pub id: String,
    pub user_identifier: String,
    #[serde(deserialize_with = "flexible_f64")]
    pub latitude: f64,
    #[serde(deserialize_with = "flexible_f64")]
    pub longitude: f64,
    /// Free-text weather sentence, see `explorer_weather::parse_weather`
    #[serde(default)]
    pub weather: String,
}

impl User {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// Body of `POST /users`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateUserRequest {
    pub user_identifier: String,
    pub latitude: f64,
    pub longitude: f64,
    pub weather: String,
}

impl CreateUserRequest {
    pub fn new(user_identifier: impl Into<String>, at: Coordinates) -> Self {
        Self {
            user_identifier: user_identifier.into(),
            latitude: at.latitude,
            longitude: at.longitude,
            weather: String::new(),
        }
    }
}

/// Body of `PUT /users/:id`. The backend applies it as a partial update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateUserRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub weather: String,
}

impl UpdateUserRequest {
    pub fn location(at: Coordinates) -> Self {
        Self {
            latitude: at.latitude,
            longitude: at.longitude,
            weather: String::new(),
        }
    }
}

/// A recommended place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub icon: String,
    #[serde(deserialize_with = "flexible_f64")]
    pub latitude: f64,
    #[serde(deserialize_with = "flexible_f64")]
    pub longitude: f64,
}

impl Place {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// A suggested activity and the places matching it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityGroup {
    pub suggestion: String,
    #[serde(default)]
    pub places: Vec<Place>,
}

/// Body of `POST /suggest/nearby_places`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyPlacesRequest {
    pub lat: String,
    pub lon: String,
    pub history: Vec<serde_json::Value>,
    pub current_time: String,
    pub weather: String,
    pub user_identifier: String,
}

impl NearbyPlacesRequest {
    pub fn new(
        at: Coordinates,
        weather: impl Into<String>,
        user_identifier: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            lat: at.latitude.to_string(),
            lon: at.longitude.to_string(),
            history: Vec::new(),
            current_time: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            weather: weather.into(),
            user_identifier: user_identifier.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NearbyPlacesResponse {
    #[serde(default)]
    pub recommendation: Option<String>,
    #[serde(default)]
    pub places: Option<Vec<ActivityGroup>>,
}

/// The backend stores coordinates as strings; accept either form.
fn flexible_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(f64),
        Text(String),
    }

    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => Ok(n),
        NumberOrText::Text(s) if s.trim().is_empty() => Ok(0.0),
        NumberOrText::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
