//! HTTP clients for the LocalExplorer backend.
//!
//! User endpoints and the suggestion endpoint may live on different origins,
//! so each gets its own client. Both sit behind a trait so the dashboard can
//! run against in-memory fakes.

use std::time::Duration;

use async_trait::async_trait;
use explorer_core::{NetworkError, ReqwestErrorExt};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::error::BackendError;
use crate::types::{
    CreateUserRequest, NearbyPlacesRequest, NearbyPlacesResponse, UpdateUserRequest, User,
};

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[async_trait]
pub trait UserApi: Send + Sync {
    /// `GET /users/find`; `Ok(None)` on 404
    async fn find_user(&self, identifier: &str) -> Result<Option<User>, BackendError>;

    /// `POST /users`
    async fn create_user(&self, request: &CreateUserRequest) -> Result<User, BackendError>;

    /// `PUT /users/:id`
    async fn update_user(
        &self,
        id: &str,
        request: &UpdateUserRequest,
    ) -> Result<User, BackendError>;
}

#[async_trait]
pub trait SuggestionApi: Send + Sync {
    /// `POST /suggest/nearby_places`
    async fn nearby_places(
        &self,
        request: &NearbyPlacesRequest,
    ) -> Result<NearbyPlacesResponse, BackendError>;
}

fn build_client() -> Result<Client, BackendError> {
    Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| BackendError::InvalidRequest(e.to_string()))
}

fn normalize_base(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Decode a successful JSON body, mapping failures into `BackendError`.
async fn handle_response<T: DeserializeOwned>(
    response: Response,
    what: &str,
) -> Result<T, BackendError> {
    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        return Err(BackendError::NotFound(what.to_string()));
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(BackendError::Network(NetworkError::ServerError {
            status: status.as_u16(),
            message: body,
        }));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| BackendError::Network(e.into_network_error()))
}

/// Client for the `/users` endpoints.
#[derive(Debug, Clone)]
pub struct UserClient {
    client: Client,
    base_url: String,
}

impl UserClient {
    pub fn new(base_url: &str) -> Result<Self, BackendError> {
        Ok(Self {
            client: build_client()?,
            base_url: normalize_base(base_url),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl UserApi for UserClient {
    #[instrument(skip(self), level = "info")]
    async fn find_user(&self, identifier: &str) -> Result<Option<User>, BackendError> {
        let url = format!("{}/users/find", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("identifier", identifier)])
            .send()
            .await
            .map_err(|e| BackendError::Network(e.into_network_error()))?;

        match handle_response::<User>(response, "user").await {
            Ok(user) => Ok(Some(user)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, request), fields(identifier = %request.user_identifier), level = "info")]
    async fn create_user(&self, request: &CreateUserRequest) -> Result<User, BackendError> {
        let url = format!("{}/users", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.into_network_error()))?;

        handle_response(response, "user").await
    }

    #[instrument(skip(self, request), level = "info")]
    async fn update_user(
        &self,
        id: &str,
        request: &UpdateUserRequest,
    ) -> Result<User, BackendError> {
        let url = format!("{}/users/{}", self.base_url, id);

        let response = self
            .client
            .put(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.into_network_error()))?;

        handle_response(response, id).await
    }
}

/// Client for the recommendation endpoint.
#[derive(Debug, Clone)]
pub struct SuggestionClient {
    client: Client,
    base_url: String,
}

impl SuggestionClient {
    pub fn new(base_url: &str) -> Result<Self, BackendError> {
        Ok(Self {
            client: build_client()?,
            base_url: normalize_base(base_url),
        })
    }
}

#[async_trait]
impl SuggestionApi for SuggestionClient {
    #[instrument(skip(self, request), fields(identifier = %request.user_identifier), level = "info")]
    async fn nearby_places(
        &self,
        request: &NearbyPlacesRequest,
    ) -> Result<NearbyPlacesResponse, BackendError> {
        let url = format!("{}/suggest/nearby_places", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.into_network_error()))?;

        handle_response(response, "nearby places").await
    }
}

/// Outcome of [`find_or_create_user`].
#[derive(Debug, Clone, PartialEq)]
pub struct UserResolution {
    pub user: User,
    pub created: bool,
}

/// Look a user up by identifier and create it when the lookup misses.
///
/// Only a 404 leads to creation; any other lookup failure is returned as is.
pub async fn find_or_create_user(
    api: &dyn UserApi,
    request: &CreateUserRequest,
) -> Result<UserResolution, BackendError> {
    if let Some(user) = api.find_user(&request.user_identifier).await? {
        return Ok(UserResolution {
            user,
            created: false,
        });
    }

    tracing::info!(
        "No user for identifier {}, creating one",
        request.user_identifier
    );
    let user = api.create_user(request).await?;
    Ok(UserResolution {
        user,
        created: true,
    })
}
