//! Headless LocalExplorer dashboard
//!
//! The controller drives user bootstrap, location and periodic refresh; the
//! clock and recommender are its child components. Views are plain data,
//! rendered to text by [`render`].

pub mod clock;
pub mod controller;
pub mod map;
pub mod recommender;
pub mod render;
pub mod storage;
pub mod task;
pub mod time;

pub use clock::ClockDisplay;
pub use controller::{
    DashboardController, DashboardDeps, DashboardSettings, DashboardState, DashboardView,
    ReadyView,
};
pub use recommender::{ActivityRecommender, RecommendationQuery, RecommenderState, RecommenderView};
pub use render::render;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use task::RepeatingTask;
pub use time::{RuntimeClock, SystemClock, TimeSource};
