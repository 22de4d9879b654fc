//! Authenticated API client
//!
//! [`ApiClient::send`] is the request pipeline every application call goes
//! through:
//!
//! 1. the [`RequestAugmenter`] attaches the current access token;
//! 2. the backend performs the call;
//! 3. a `401` from anything but the refresh endpoint is handed to the
//!    [`RefreshCoordinator`];
//! 4. if a token comes back, the original request is sent once more with it
//!    and that response is final.
//!
//! Statuses other than `401` are returned untouched.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{LovenoteError, Result};
use crate::http::augmenter::RequestAugmenter;
use crate::http::{ApiRequest, ApiResponse, HttpBackend};
use crate::session::coordinator::{RefreshCoordinator, RefreshOutcome};
use crate::session::store::SessionStore;

/// Sends requests with the session's credentials and recovers from expired
/// access tokens.
///
/// Cloning is cheap; clones share the session and the coordinator.
#[derive(Clone)]
pub struct ApiClient {
    backend: Arc<dyn HttpBackend>,
    augmenter: RequestAugmenter,
    coordinator: Arc<RefreshCoordinator>,
    store: SessionStore,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("backend", &self.backend)
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(
        backend: Arc<dyn HttpBackend>,
        store: SessionStore,
        coordinator: Arc<RefreshCoordinator>,
    ) -> Self {
        Self {
            augmenter: RequestAugmenter::new(store.clone()),
            backend,
            coordinator,
            store,
        }
    }

    /// Sends `request` through the authentication pipeline.
    ///
    /// # Returns
    ///
    /// The server's response, including non-success statuses. When a refresh
    /// fails, the original `401` is returned.
    ///
    /// # Errors
    ///
    /// Returns `LovenoteError::Transport` when the server could not be
    /// reached and `LovenoteError::InvalidRequest` when the token cannot be
    /// attached.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # async fn demo(client: lovenote::client::ApiClient) -> anyhow::Result<()> {
    /// use lovenote::http::ApiRequest;
    ///
    /// let response = client.send(ApiRequest::get("notes")).await?;
    /// println!("{}", response.status);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let epoch = self.store.epoch();
        let mut outgoing = request.clone();
        let sent_with = self.augmenter.augment(&mut outgoing)?;

        let response = self.backend.execute(outgoing).await?;
        if !response.is_auth_failure() || self.coordinator.is_refresh_endpoint(&request.path) {
            return Ok(response);
        }

        tracing::debug!(path = %request.path, "request unauthorized");
        match self
            .coordinator
            .handle_auth_failure(sent_with.as_deref(), epoch)
            .await
        {
            RefreshOutcome::Renewed(token) => {
                let mut replay = request;
                replay.set_bearer(&token)?;
                tracing::debug!(path = %replay.path, "replaying with renewed token");
                self.backend.execute(replay).await
            }
            outcome => {
                tracing::debug!(path = %request.path, ?outcome, "surfacing original failure");
                Ok(response)
            }
        }
    }

    /// `GET path`, decoding a JSON body.
    ///
    /// # Errors
    ///
    /// Non-success statuses become `LovenoteError::Status`. A `401` becomes
    /// `LovenoteError::SessionExpired` once the session is gone and
    /// `LovenoteError::Authentication` while a token is still held.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(ApiRequest::get(path)).await?;
        self.settle(response)?.json()
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = ApiRequest::post(path).json(body)?;
        let response = self.send(request).await?;
        self.settle(response)?.json()
    }

    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = ApiRequest::patch(path).json(body)?;
        let response = self.send(request).await?;
        self.settle(response)?.json()
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        let response = self.send(ApiRequest::delete(path)).await?;
        self.settle(response)?;
        Ok(())
    }

    fn settle(&self, response: ApiResponse) -> Result<ApiResponse> {
        response.error_for_status().map_err(|e| {
            let auth = e
                .downcast_ref::<LovenoteError>()
                .is_some_and(LovenoteError::is_auth_failure);
            if auth && self.store.access_token().is_none() {
                LovenoteError::SessionExpired("sign in required".into()).into()
            } else {
                e
            }
        })
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }
}
