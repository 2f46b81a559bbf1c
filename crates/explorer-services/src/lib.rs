pub mod client;
pub mod error;
pub mod types;

pub use client::{
    find_or_create_user, SuggestionApi, SuggestionClient, UserApi, UserClient, UserResolution,
};
pub use error::BackendError;
pub use types::*;
