//! Plain-text rendering of a [`DashboardView`].

use std::fmt::Write;

use crate::controller::{DashboardView, ReadyView};
use crate::recommender::RecommenderView;

pub const TITLE: &str = "LocalExplorer";
pub const LOADING_TEXT: &str = "Setting up your LocalExplorer...";
pub const PERMISSION_TEXT: &str = "Please allow access to your location to use LocalExplorer.";
pub const WEATHER_LOADING_TEXT: &str = "Loading weather data...";
pub const NO_PLACES_TEXT: &str = "No places available for this activity.";

pub fn render(view: &DashboardView) -> String {
    match view {
        DashboardView::Loading => format!("{}\n", LOADING_TEXT),
        DashboardView::NeedsPermission => format!(
            "{}\n\n{}\nType `allow` to allow location access.\n",
            TITLE, PERMISSION_TEXT
        ),
        DashboardView::Ready(ready) => render_ready(ready),
    }
}

fn render_ready(view: &ReadyView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}\n", TITLE);

    let _ = writeln!(out, "== Weather ==");
    if let Some(weather) = &view.weather {
        if weather.is_available() {
            let _ = writeln!(out, "{}°C", weather.temperature);
            let _ = writeln!(out, "{}", weather.description);
        } else {
            let _ = writeln!(out, "{}", WEATHER_LOADING_TEXT);
        }
    }

    let _ = writeln!(out, "\n== Current Time ==\n{}", view.clock);

    let _ = writeln!(out, "\n== Map ==");
    if let Some(url) = &view.map_url {
        let _ = writeln!(out, "{}", url);
    }

    if let Some(recommendations) = &view.recommendations {
        render_recommendations(&mut out, recommendations);
    }

    out
}

fn render_recommendations(out: &mut String, view: &RecommenderView) {
    let _ = writeln!(out, "\n== Recommended Activities ==");
    match view {
        RecommenderView::Loading => {
            let _ = writeln!(out, "Loading...");
        }
        RecommenderView::Error(message) => {
            let _ = writeln!(out, "{}", message);
        }
        RecommenderView::Ready {
            recommendation,
            groups,
        } => {
            let _ = writeln!(out, "{}", recommendation);
            let _ = writeln!(out, "\n== Places to Visit ==");
            for (g, group) in groups.iter().enumerate() {
                let _ = writeln!(out, "[{}] {}", g, group.suggestion);
                if group.places.is_empty() {
                    let _ = writeln!(out, "    {}", NO_PLACES_TEXT);
                }
                for (p, place) in group.places.iter().enumerate() {
                    let _ = writeln!(out, "    ({} {}) {} - {}", g, p, place.name, place.address);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use explorer_services::{ActivityGroup, Place};
    use explorer_weather::WeatherSummary;

    fn ready(weather: Option<WeatherSummary>, recs: Option<RecommenderView>) -> DashboardView {
        DashboardView::Ready(ReadyView {
            clock: "14:00:00".to_string(),
            weather,
            map_url: Some("https://maps.example/embed".to_string()),
            recommendations: recs,
        })
    }

    #[test]
    fn test_loading_and_permission_screens() {
        assert!(render(&DashboardView::Loading).contains(LOADING_TEXT));
        assert!(render(&DashboardView::NeedsPermission).contains(PERMISSION_TEXT));
    }

    #[test]
    fn test_weather_placeholder_when_zero() {
        let out = render(&ready(Some(WeatherSummary::default()), None));
        assert!(out.contains(WEATHER_LOADING_TEXT));
        assert!(out.contains("14:00:00"));
    }

    #[test]
    fn test_weather_and_places() {
        let weather = WeatherSummary {
            temperature: 18.5,
            description: "clear sky".to_string(),
        };
        let recs = RecommenderView::Ready {
            recommendation: "Try the park".to_string(),
            groups: vec![
                ActivityGroup {
                    suggestion: "Parks".to_string(),
                    places: vec![Place {
                        id: "p1".to_string(),
                        name: "Green Lake Park".to_string(),
                        address: "Seattle".to_string(),
                        icon: String::new(),
                        latitude: 47.68,
                        longitude: -122.33,
                    }],
                },
                ActivityGroup {
                    suggestion: "Museums".to_string(),
                    places: vec![],
                },
            ],
        };

        let out = render(&ready(Some(weather), Some(recs)));
        assert!(out.contains("18.5°C"));
        assert!(out.contains("clear sky"));
        assert!(out.contains("Try the park"));
        assert!(out.contains("(0 0) Green Lake Park - Seattle"));
        assert!(out.contains(NO_PLACES_TEXT));
    }

    #[test]
    fn test_error_hides_results() {
        let out = render(&ready(
            None,
            Some(RecommenderView::Error("Failed to load".to_string())),
        ));
        assert!(out.contains("Failed to load"));
        assert!(!out.contains("Places to Visit"));
    }
}
