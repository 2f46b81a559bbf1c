//! Compatibility reader for the backend's weather sentence.
//!
//! The backend stores weather as prose, e.g.
//! `"weather is light rain, with temperature of 12.3 celsius."`. Everything
//! past this module works with [`WeatherSummary`] instead.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const UNKNOWN_DESCRIPTION: &str = "Unknown";

/// Structured weather snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSummary {
    /// Degrees Celsius; 0 when the sentence carried none
    pub temperature: f64,
    pub description: String,
}

impl Default for WeatherSummary {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            description: UNKNOWN_DESCRIPTION.to_string(),
        }
    }
}

impl WeatherSummary {
    /// Whether there is a temperature worth showing.
    ///
    /// A zero reading is indistinguishable from "missing" in the sentence
    /// format, so it is treated as not yet loaded.
    pub fn is_available(&self) -> bool {
        self.temperature != 0.0
    }

    /// Encode back into the backend's sentence form
    pub fn to_sentence(&self) -> String {
        format!(
            "weather is {}, with temperature of {} celsius.",
            self.description, self.temperature
        )
    }
}

#[allow(clippy::expect_used)]
fn description_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"weather is (.*?),").expect("valid description pattern"))
}

#[allow(clippy::expect_used)]
fn temperature_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"temperature of ([\d.]+)").expect("valid temperature pattern"))
}

/// Parse a weather sentence. Never fails; missing parts fall back to
/// `"Unknown"` and `0`.
pub fn parse_weather(text: &str) -> WeatherSummary {
    let description = description_pattern()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_DESCRIPTION)
        .to_string();

    let temperature = temperature_pattern()
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| leading_number(m.as_str()))
        .unwrap_or(0.0);

    WeatherSummary {
        temperature,
        description,
    }
}

/// Longest `digits[.digits]` prefix of `s` as a number.
///
/// Mirrors how browsers read `"12.5.1"` as `12.5` and reject a lone `"."`.
fn leading_number(s: &str) -> Option<f64> {
    let mut end = 0;
    let mut seen_dot = false;
    let mut seen_digit = false;

    for (i, c) in s.char_indices() {
        match c {
            '0'..='9' => {
                seen_digit = true;
                end = i + 1;
            }
            '.' if !seen_dot => {
                seen_dot = true;
                end = i + 1;
            }
            _ => break,
        }
    }

    if !seen_digit {
        return None;
    }

    s[..end]
        .trim_end_matches('.')
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_backend_sentence() {
        let summary =
            parse_weather("weather is scattered clouds, with temperature of 18.4 celsius.");
        assert_eq!(summary.description, "scattered clouds");
        assert_eq!(summary.temperature, 18.4);
        assert!(summary.is_available());
    }

    #[test]
    fn test_empty_string_degrades() {
        let summary = parse_weather("");
        assert_eq!(summary, WeatherSummary::default());
        assert!(!summary.is_available());
    }

    #[test]
    fn test_unrelated_text_degrades() {
        let summary = parse_weather("sunny and warm");
        assert_eq!(summary.description, "Unknown");
        assert_eq!(summary.temperature, 0.0);
    }

    #[test]
    fn test_description_without_comma_is_unknown() {
        let summary = parse_weather("weather is clear with temperature of 3");
        assert_eq!(summary.description, "Unknown");
        assert_eq!(summary.temperature, 3.0);
    }

    #[test]
    fn test_empty_description_is_unknown() {
        assert_eq!(parse_weather("weather is , hm").description, "Unknown");
    }

    #[test]
    fn test_description_stops_at_first_comma() {
        let summary = parse_weather("weather is rain, wind, with temperature of 9 celsius");
        assert_eq!(summary.description, "rain");
    }

    #[test]
    fn test_integer_and_prefix_temperatures() {
        assert_eq!(parse_weather("temperature of 21").temperature, 21.0);
        assert_eq!(parse_weather("temperature of 21.5.3").temperature, 21.5);
        assert_eq!(parse_weather("temperature of 7. degrees").temperature, 7.0);
        assert_eq!(parse_weather("temperature of .5").temperature, 0.5);
    }

    #[test]
    fn test_unparsable_temperature_is_zero() {
        assert_eq!(parse_weather("temperature of .").temperature, 0.0);
        assert_eq!(parse_weather("temperature of -4").temperature, 0.0);
    }

    #[test]
    fn test_sentence_encoding_reads_back() {
        let summary = WeatherSummary {
            temperature: 12.5,
            description: "overcast clouds".to_string(),
        };
        assert_eq!(parse_weather(&summary.to_sentence()), summary);
    }
}
