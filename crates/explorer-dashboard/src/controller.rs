//! Dashboard orchestration.
//!
//! Owns the user bootstrap (create-or-fetch), location acquisition and
//! permission handling, the periodic user refresh, and map centering. All
//! failures are logged and leave the previous state in place.

use std::sync::{Arc, Weak};
use std::time::Duration;

use explorer_core::Config;
use explorer_services::{
    find_or_create_user, CreateUserRequest, Place, SuggestionApi, UpdateUserRequest, User,
    UserApi,
};
use explorer_weather::{
    acquire, parse_weather, Coordinates, Geolocator, LocationError, PermissionState,
    PositionOptions, WeatherSummary,
};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::clock::ClockDisplay;
use crate::map;
use crate::recommender::{ActivityRecommender, RecommendationQuery, RecommenderView};
use crate::storage::{self, KeyValueStore, USER_IDENTIFIER_KEY};
use crate::task::RepeatingTask;
use crate::time::TimeSource;

/// Tunables for a dashboard instance.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSettings {
    pub position: PositionOptions,
    pub refresh_interval: Duration,
    pub clock_tick: Duration,
    pub map_api_key: String,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            position: PositionOptions::default(),
            refresh_interval: Duration::from_secs(20 * 60),
            clock_tick: Duration::from_secs(1),
            map_api_key: String::new(),
        }
    }
}

impl DashboardSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            position: PositionOptions {
                timeout: Duration::from_secs(config.location.timeout_secs),
                ..PositionOptions::default()
            },
            refresh_interval: Duration::from_secs(
                u64::from(config.dashboard.refresh_minutes) * 60,
            ),
            clock_tick: Duration::from_secs(u64::from(config.dashboard.clock_tick_secs)),
            map_api_key: config.profile().google_places_api_key,
        }
    }
}

/// Collaborators injected into the controller.
#[derive(Clone)]
pub struct DashboardDeps {
    pub users: Arc<dyn UserApi>,
    pub suggestions: Arc<dyn SuggestionApi>,
    pub geolocator: Arc<dyn Geolocator>,
    pub store: Arc<dyn KeyValueStore>,
    pub time: Arc<dyn TimeSource>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    pub loading: bool,
    pub user: Option<User>,
    pub location: Option<Coordinates>,
    pub location_permission: bool,
    /// Set by place selection; overrides `location` for the map only
    pub map_center: Option<Coordinates>,
}

/// Snapshot of everything the screen shows.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardView {
    Loading,
    /// Location access is needed before anything else is shown
    NeedsPermission,
    Ready(ReadyView),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadyView {
    pub clock: String,
    /// Present once a location is known
    pub weather: Option<WeatherSummary>,
    pub map_url: Option<String>,
    /// Present once both user and location are known
    pub recommendations: Option<RecommenderView>,
}

struct Shared {
    users: Arc<dyn UserApi>,
    geolocator: Arc<dyn Geolocator>,
    store: Arc<dyn KeyValueStore>,
    settings: DashboardSettings,
    recommender: ActivityRecommender,
    state: Mutex<DashboardState>,
}

impl Shared {
    async fn acquire_location(&self) -> Result<Coordinates, LocationError> {
        match acquire(self.geolocator.as_ref(), &self.settings.position).await {
            Ok(coordinates) => {
                self.state.lock().location = Some(coordinates);
                if let Err(e) = storage::save_last_location(self.store.as_ref(), coordinates) {
                    tracing::warn!("Failed to cache location: {}", e);
                }
                tracing::info!("Got location: {}", coordinates);
                Ok(coordinates)
            }
            Err(e) => {
                tracing::error!("Error fetching location: {}", e.user_message());
                self.state.lock().location_permission = false;
                Err(e)
            }
        }
    }

    async fn create_user(&self, identifier: String) {
        let at = storage::load_last_location(self.store.as_ref()).unwrap_or(Coordinates::ORIGIN);
        let request = CreateUserRequest::new(identifier, at);
        match self.users.create_user(&request).await {
            Ok(user) => {
                tracing::info!("Created user {}", user.id);
                self.state.lock().user = Some(user);
            }
            Err(e) => tracing::error!(
                status = ?e.status(),
                hint = e.user_message(),
                "Error creating user: {}",
                e
            ),
        }
    }

    async fn resolve_user(&self) {
        let stored = self
            .store
            .get(USER_IDENTIFIER_KEY)
            .filter(|id| !id.is_empty());

        match stored {
            Some(identifier) => {
                let at = storage::load_last_location(self.store.as_ref())
                    .unwrap_or(Coordinates::ORIGIN);
                let request = CreateUserRequest::new(identifier, at);
                match find_or_create_user(self.users.as_ref(), &request).await {
                    Ok(resolution) => {
                        tracing::info!(
                            created = resolution.created,
                            "Resolved user {}",
                            resolution.user.id
                        );
                        self.state.lock().user = Some(resolution.user);
                    }
                    Err(e) => tracing::error!(
                        status = ?e.status(),
                        hint = e.user_message(),
                        "Error fetching user: {}",
                        e
                    ),
                }
            }
            None => {
                let identifier = Uuid::new_v4().to_string();
                if let Err(e) = self.store.set(USER_IDENTIFIER_KEY, &identifier) {
                    tracing::warn!("Failed to persist user identifier: {}", e);
                }
                self.create_user(identifier).await;
            }
        }
    }

    /// Push the current location to the backend user record.
    async fn refresh_user(&self) {
        let (id, location) = {
            let state = self.state.lock();
            match (&state.user, state.location) {
                (Some(user), Some(location)) => (user.id.clone(), location),
                _ => return,
            }
        };

        let request = UpdateUserRequest::location(location);
        match self.users.update_user(&id, &request).await {
            Ok(user) => {
                tracing::info!("Updated user {} location", user.id);
                self.state.lock().user = Some(user);
            }
            Err(e) => tracing::error!(
                status = ?e.status(),
                hint = e.user_message(),
                "Error updating user: {}",
                e
            ),
        }
    }

    fn recommendation_query(&self) -> Option<RecommendationQuery> {
        let state = self.state.lock();
        match (&state.user, state.location) {
            (Some(user), Some(coordinates)) => Some(RecommendationQuery {
                coordinates,
                user_identifier: user.user_identifier.clone(),
                weather: user.weather.clone(),
            }),
            _ => None,
        }
    }

    async fn refresh_recommendations(&self) -> bool {
        match self.recommendation_query() {
            Some(query) => self.recommender.update(query).await,
            None => false,
        }
    }

    fn select_place(&self, place: &Place) {
        tracing::debug!(lat = place.latitude, lng = place.longitude, "Place selected");
        self.state.lock().map_center = Some(place.coordinates());
    }
}

pub struct DashboardController {
    shared: Arc<Shared>,
    clock: Mutex<ClockDisplay>,
    refresh_task: Mutex<Option<RepeatingTask>>,
}

impl DashboardController {
    pub fn new(deps: DashboardDeps, settings: DashboardSettings) -> Self {
        let clock = ClockDisplay::new(Arc::clone(&deps.time), settings.clock_tick);

        let shared = Arc::new_cyclic(|weak: &Weak<Shared>| {
            let recommender = ActivityRecommender::new(deps.suggestions, deps.time);
            let weak = weak.clone();
            recommender.on_place_selected(Arc::new(move |place: &Place| {
                if let Some(shared) = weak.upgrade() {
                    shared.select_place(place);
                }
            }));

            Shared {
                users: deps.users,
                geolocator: deps.geolocator,
                store: deps.store,
                settings,
                recommender,
                state: Mutex::new(DashboardState::default()),
            }
        });

        Self {
            shared,
            clock: Mutex::new(clock),
            refresh_task: Mutex::new(None),
        }
    }

    /// Bootstrap: locate, resolve the user, re-check permission, then start
    /// the clock, the periodic refresh and the first recommendation fetch.
    pub async fn initialize(&self) {
        self.shared.state.lock().loading = true;

        if let Err(e) = self.shared.acquire_location().await {
            tracing::debug!("Initial location attempt failed: {}", e);
        }
        self.resolve_user().await;
        self.check_location_permission().await;

        self.shared.state.lock().loading = false;
        self.clock.lock().mount();
        self.sync_refresh_task();
        self.refresh_recommendations().await;
        tracing::info!("Dashboard initialized");
    }

    /// One position request. Failures clear the permission flag.
    pub async fn acquire_location(&self) -> Result<Coordinates, LocationError> {
        let result = self.shared.acquire_location().await;
        self.sync_refresh_task();
        result
    }

    /// Find the stored user or create one
    pub async fn resolve_user(&self) {
        self.shared.resolve_user().await;
        self.sync_refresh_task();
    }

    pub async fn check_location_permission(&self) {
        match self.shared.geolocator.permission_state().await {
            Ok(PermissionState::Granted) => {
                self.shared.state.lock().location_permission = true;
                if let Err(e) = self.acquire_location().await {
                    tracing::debug!("Location re-check failed: {}", e);
                }
            }
            Ok(PermissionState::Prompt) => {
                self.shared.state.lock().location_permission = false;
            }
            Ok(PermissionState::Denied) => {
                tracing::error!("Location permission denied.");
                self.shared.state.lock().location_permission = false;
            }
            Err(e) => {
                tracing::error!("Error checking location permission: {}", e);
                self.shared.state.lock().location_permission = false;
            }
        }
    }

    /// Handler for the "allow location access" prompt
    pub async fn allow_location_access(&self) -> Result<Coordinates, LocationError> {
        if let Err(e) = self.shared.geolocator.request_permission().await {
            tracing::warn!("Permission request failed: {}", e);
        }

        let coordinates = self.acquire_location().await?;
        self.shared.state.lock().location_permission = true;
        self.refresh_recommendations().await;
        Ok(coordinates)
    }

    /// Push the current location to the backend now
    pub async fn refresh_user(&self) {
        self.shared.refresh_user().await;
    }

    /// Feed the current location, identifier and weather to the recommender.
    /// Returns whether a request was made.
    pub async fn refresh_recommendations(&self) -> bool {
        self.shared.refresh_recommendations().await
    }

    /// Recentre the map on `place`
    pub fn select_place(&self, place: &Place) {
        self.shared.select_place(place);
    }

    /// Select a recommended place by position in the current results
    pub fn select_recommended_place(&self, group: usize, index: usize) -> Option<Place> {
        self.shared.recommender.select_place(group, index)
    }

    pub fn recommender(&self) -> &ActivityRecommender {
        &self.shared.recommender
    }

    pub fn state(&self) -> DashboardState {
        self.shared.state.lock().clone()
    }

    pub fn is_refresh_active(&self) -> bool {
        self.refresh_task
            .lock()
            .as_ref()
            .is_some_and(RepeatingTask::is_running)
    }

    pub fn clock_display(&self) -> String {
        self.clock.lock().display()
    }

    /// Selected place if any, otherwise the current location
    pub fn map_center(&self) -> Option<Coordinates> {
        let state = self.shared.state.lock();
        state.map_center.or(state.location)
    }

    pub fn map_embed_url(&self) -> Option<String> {
        let center = self.map_center()?;
        match map::embed_url(&self.shared.settings.map_api_key, center) {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                tracing::warn!("Failed to build map URL: {}", e);
                None
            }
        }
    }

    pub fn view(&self) -> DashboardView {
        let state = self.state();

        if state.loading {
            return DashboardView::Loading;
        }
        if !state.location_permission {
            return DashboardView::NeedsPermission;
        }

        let weather = state.location.map(|_| {
            parse_weather(state.user.as_ref().map_or("", |u| u.weather.as_str()))
        });
        let recommendations = match (&state.user, state.location) {
            (Some(_), Some(_)) => Some(self.shared.recommender.view()),
            _ => None,
        };
        let map_url = if state.location.is_some() {
            self.map_embed_url()
        } else {
            None
        };

        DashboardView::Ready(ReadyView {
            clock: self.clock_display(),
            weather,
            map_url,
            recommendations,
        })
    }

    /// Stop the clock and the periodic refresh
    pub fn shutdown(&self) {
        self.clock.lock().unmount();
        if let Some(mut task) = self.refresh_task.lock().take() {
            task.stop();
        }
        tracing::info!("Dashboard stopped");
    }

    /// Start the periodic refresh once user and location are both known.
    fn sync_refresh_task(&self) {
        let mut slot = self.refresh_task.lock();
        if slot.as_ref().is_some_and(RepeatingTask::is_running) {
            return;
        }

        let ready = {
            let state = self.shared.state.lock();
            state.user.is_some() && state.location.is_some()
        };
        if !ready {
            return;
        }

        let shared = Arc::clone(&self.shared);
        *slot = Some(RepeatingTask::start(
            "user-refresh",
            self.shared.settings.refresh_interval,
            move || {
                let shared = Arc::clone(&shared);
                async move {
                    shared.refresh_user().await;
                    shared.refresh_recommendations().await;
                }
            },
        ));
    }
}

impl std::fmt::Debug for DashboardController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardController")
            .field("state", &self.state())
            .field("refresh_active", &self.is_refresh_active())
            .finish()
    }
}
