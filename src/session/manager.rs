//! Session façade
//!
//! [`SessionManager`] wires one store, one coordinator, one bootstrapper and
//! one API client around a shared backend and navigator, and provides the
//! user-initiated transitions: login, registration and logout.
//!
//! Credential exchanges go straight to the backend rather than through the
//! [`ApiClient`] pipeline, so a `401` for bad credentials is reported to the
//! caller and never mistaken for an expired access token.

use std::sync::Arc;

use crate::client::ApiClient;
use crate::config::{Config, EndpointsConfig};
use crate::error::Result;
use crate::http::{ApiRequest, HttpBackend};
use crate::models::{AuthResponse, Credentials, Registration, UserIdentity};
use crate::session::bootstrap::{BootstrapOutcome, SessionBootstrapper};
use crate::session::coordinator::RefreshCoordinator;
use crate::session::navigator::{Navigator, Route};
use crate::session::store::SessionStore;

/// Owns the session lifecycle for one client.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use lovenote::config::Config;
/// use lovenote::models::Credentials;
/// use lovenote::session::navigator::ChannelNavigator;
/// use lovenote::session::SessionManager;
///
/// # async fn demo(backend: Arc<dyn lovenote::http::HttpBackend>) -> anyhow::Result<()> {
/// let (navigator, _routes) = ChannelNavigator::new();
/// let manager = SessionManager::from_config(&Config::default(), backend, Arc::new(navigator));
/// manager.bootstrap().await;
/// let user = manager.login(Credentials::new("ada", "secret")).await?;
/// println!("signed in as {}", user.username);
/// # Ok(())
/// # }
/// ```
pub struct SessionManager {
    backend: Arc<dyn HttpBackend>,
    store: SessionStore,
    navigator: Arc<dyn Navigator>,
    coordinator: Arc<RefreshCoordinator>,
    bootstrapper: SessionBootstrapper,
    client: ApiClient,
    endpoints: EndpointsConfig,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("session", &self.store.get().is_authenticated())
            .field("coordinator", &self.coordinator)
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Builds a manager with an empty, loading session.
    ///
    /// # Arguments
    ///
    /// * `backend` - Transport shared by every component.
    /// * `navigator` - Receives redirects.
    /// * `endpoints` - User endpoint paths.
    /// * `refresh_timeout` - Bound on a refresh call, if any.
    pub fn new(
        backend: Arc<dyn HttpBackend>,
        navigator: Arc<dyn Navigator>,
        endpoints: EndpointsConfig,
        refresh_timeout: Option<std::time::Duration>,
    ) -> Self {
        let store = SessionStore::new();
        let coordinator = Arc::new(
            RefreshCoordinator::new(
                Arc::clone(&backend),
                store.clone(),
                Arc::clone(&navigator),
                endpoints.refresh.clone(),
            )
            .with_refresh_timeout(refresh_timeout),
        );
        let bootstrapper = SessionBootstrapper::new(
            Arc::clone(&coordinator),
            Arc::clone(&backend),
            store.clone(),
            endpoints.me.clone(),
        );
        let client = ApiClient::new(Arc::clone(&backend), store.clone(), Arc::clone(&coordinator));

        Self {
            backend,
            store,
            navigator,
            coordinator,
            bootstrapper,
            client,
            endpoints,
        }
    }

    pub fn from_config(
        config: &Config,
        backend: Arc<dyn HttpBackend>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self::new(
            backend,
            navigator,
            config.api.endpoints.clone(),
            config.api.refresh_timeout(),
        )
    }

    /// Restores a session from the durable credential. See
    /// [`SessionBootstrapper::run`].
    pub async fn bootstrap(&self) -> BootstrapOutcome {
        self.bootstrapper.run().await
    }

    /// Signs in and navigates to [`Route::Hub`].
    ///
    /// # Errors
    ///
    /// Returns `LovenoteError::Authentication` with the server's message for
    /// unknown users or wrong passwords, and `LovenoteError::Status` or
    /// `LovenoteError::Transport` for other failures. The session is left
    /// unchanged on error.
    pub async fn login(&self, credentials: Credentials) -> Result<UserIdentity> {
        let request = ApiRequest::post(self.endpoints.login.clone()).json(&credentials)?;
        let user = self.authenticate(request).await?;
        tracing::info!(username = %user.username, "signed in");
        Ok(user)
    }

    /// Creates an account, signs in, and navigates to [`Route::Hub`].
    ///
    /// # Errors
    ///
    /// As [`login`](Self::login); a taken username is a `Status` error.
    pub async fn register(&self, registration: Registration) -> Result<UserIdentity> {
        let request = ApiRequest::post(self.endpoints.register.clone()).json(&registration)?;
        let user = self.authenticate(request).await?;
        tracing::info!(username = %user.username, "registered");
        Ok(user)
    }

    async fn authenticate(&self, request: ApiRequest) -> Result<UserIdentity> {
        let auth: AuthResponse = self
            .backend
            .execute(request)
            .await?
            .error_for_status()?
            .json()?;
        let user = UserIdentity::from(auth.user);

        // New epoch: refreshes and requests still running for whoever held
        // the session before cannot touch this one.
        self.store.establish(auth.access, user.clone());
        self.navigator.navigate(Route::Hub);
        Ok(user)
    }

    /// Ends the session and navigates to [`Route::Login`].
    ///
    /// The local session is cleared before the server is told, so a refresh
    /// still in flight cannot bring it back. A failed server call is logged
    /// and otherwise ignored.
    pub async fn logout(&self) {
        let token = self.store.access_token();
        self.store.teardown();

        let mut request = ApiRequest::post(self.endpoints.logout.clone());
        if let Some(token) = &token {
            if let Err(e) = request.set_bearer(token) {
                tracing::warn!(error = %e, "sending logout without credentials");
            }
        }
        match self
            .backend
            .execute(request)
            .await
            .and_then(|response| response.error_for_status())
        {
            Ok(_) => tracing::info!("signed out"),
            Err(e) => tracing::warn!(error = %e, "server logout failed; local session cleared"),
        }

        self.navigator.navigate(Route::Login);
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Client for application requests made on behalf of this session.
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    pub fn navigator(&self) -> &dyn Navigator {
        self.navigator.as_ref()
    }

    pub fn endpoints(&self) -> &EndpointsConfig {
        &self.endpoints
    }
}
