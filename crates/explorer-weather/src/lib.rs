//! Weather and location support for LocalExplorer
//!
//! Reads the backend's weather sentence into a structured summary and
//! provides the position sources the dashboard acquires location from.

pub mod location;
pub mod parse;
pub mod types;

pub use location::{acquire, FixedGeolocator, Geolocator, IpGeolocator};
pub use parse::{parse_weather, WeatherSummary};
pub use types::*;
