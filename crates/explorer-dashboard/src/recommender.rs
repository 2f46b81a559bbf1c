//! Recommended activities and nearby places.

use std::sync::{Arc, OnceLock};

use explorer_services::{ActivityGroup, NearbyPlacesRequest, Place, SuggestionApi};
use explorer_weather::Coordinates;
use parking_lot::Mutex;
use regex::Regex;

use crate::time::TimeSource;

pub const LOAD_ERROR_MESSAGE: &str =
    "Failed to load recommended activities. Please try again later.";
pub const NO_RECOMMENDATION: &str = "No recommendations available.";

/// Inputs that determine a recommendation fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationQuery {
    pub coordinates: Coordinates,
    pub user_identifier: String,
    pub weather: String,
}

/// Invoked with the place the user picked.
pub type PlaceCallback = Arc<dyn Fn(&Place) + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct RecommenderState {
    pub loading: bool,
    /// Raw text from the backend, may contain markup
    pub recommendation: String,
    pub groups: Vec<ActivityGroup>,
    pub error: Option<String>,
}

impl Default for RecommenderState {
    fn default() -> Self {
        Self {
            loading: true,
            recommendation: String::new(),
            groups: Vec::new(),
            error: None,
        }
    }
}

/// What the recommendation cards show.
#[derive(Debug, Clone, PartialEq)]
pub enum RecommenderView {
    Loading,
    Error(String),
    Ready {
        recommendation: String,
        groups: Vec<ActivityGroup>,
    },
}

pub struct ActivityRecommender {
    api: Arc<dyn SuggestionApi>,
    time: Arc<dyn TimeSource>,
    state: Mutex<RecommenderState>,
    last_query: Mutex<Option<RecommendationQuery>>,
    on_select: Mutex<Option<PlaceCallback>>,
}

impl ActivityRecommender {
    pub fn new(api: Arc<dyn SuggestionApi>, time: Arc<dyn TimeSource>) -> Self {
        Self {
            api,
            time,
            state: Mutex::new(RecommenderState::default()),
            last_query: Mutex::new(None),
            on_select: Mutex::new(None),
        }
    }

    pub fn on_place_selected(&self, callback: PlaceCallback) {
        *self.on_select.lock() = Some(callback);
    }

    /// Fetch for `query` unless it equals the last one. Returns whether a
    /// request was issued.
    pub async fn update(&self, query: RecommendationQuery) -> bool {
        {
            let mut last = self.last_query.lock();
            if last.as_ref() == Some(&query) {
                return false;
            }
            *last = Some(query.clone());
        }

        self.fetch(&query).await;
        true
    }

    async fn fetch(&self, query: &RecommendationQuery) {
        {
            let mut state = self.state.lock();
            state.loading = true;
            state.error = None;
        }

        let request = NearbyPlacesRequest::new(
            query.coordinates,
            query.weather.as_str(),
            query.user_identifier.as_str(),
            self.time.now(),
        );

        let result = self.api.nearby_places(&request).await;

        let mut state = self.state.lock();
        match result {
            Ok(response) => {
                state.recommendation = response
                    .recommendation
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| NO_RECOMMENDATION.to_string());
                state.groups = response.places.unwrap_or_default();
                tracing::info!(
                    "Loaded {} recommended activities",
                    state.groups.len()
                );
            }
            Err(e) => {
                tracing::error!(
                    status = ?e.status(),
                    "Error fetching recommended activities: {}",
                    e
                );
                state.error = Some(LOAD_ERROR_MESSAGE.to_string());
            }
        }
        state.loading = false;
    }

    pub fn state(&self) -> RecommenderState {
        self.state.lock().clone()
    }

    pub fn view(&self) -> RecommenderView {
        let groups = {
            let state = self.state.lock();
            if state.loading {
                return RecommenderView::Loading;
            }
            if let Some(error) = &state.error {
                return RecommenderView::Error(error.clone());
            }
            state.groups.clone()
        };

        RecommenderView::Ready {
            recommendation: self.recommendation_text(),
            groups,
        }
    }

    /// Recommendation as plain text
    pub fn recommendation_text(&self) -> String {
        strip_markup(&self.state.lock().recommendation)
    }

    /// Pick `groups[group].places[index]` and notify the callback
    pub fn select_place(&self, group: usize, index: usize) -> Option<Place> {
        let place = {
            let state = self.state.lock();
            state.groups.get(group)?.places.get(index)?.clone()
        };

        let callback = self.on_select.lock().clone();
        if let Some(callback) = callback {
            callback(&place);
        }
        Some(place)
    }
}

impl std::fmt::Debug for ActivityRecommender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityRecommender")
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

#[allow(clippy::expect_used)]
fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[A-Za-z/!][^>]*>").expect("valid tag pattern"))
}

#[allow(clippy::expect_used)]
fn line_break_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)<br\s*/?>|</p>|</li>").expect("valid line break pattern")
    })
}

/// Reduce backend markup to plain text. The recommendation is not trusted,
/// so tags are dropped rather than rendered.
pub fn strip_markup(text: &str) -> String {
    let with_breaks = line_break_pattern().replace_all(text, "\n");
    let without_tags = tag_pattern().replace_all(&with_breaks, "");
    without_tags
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}
