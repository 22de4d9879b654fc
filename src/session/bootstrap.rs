//! Startup silent sign-in
//!
//! On startup the client may still hold a durable credential from an earlier
//! run. [`SessionBootstrapper::run`] trades it for an access token through
//! the refresh coordinator, then asks the server who the token belongs to.
//! Any failure leaves the session anonymous without a redirect; the loading
//! flag is cleared either way.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::Result;
use crate::http::{ApiRequest, HttpBackend};
use crate::models::{UserIdentity, UserRecord};
use crate::session::coordinator::{RefreshCoordinator, RefreshOutcome};
use crate::session::store::SessionStore;

/// What the bootstrap found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Authenticated(UserIdentity),
    Anonymous,
}

/// One-shot session restorer.
pub struct SessionBootstrapper {
    coordinator: Arc<RefreshCoordinator>,
    backend: Arc<dyn HttpBackend>,
    store: SessionStore,
    me_path: String,
    started: AtomicBool,
}

impl std::fmt::Debug for SessionBootstrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBootstrapper")
            .field("me_path", &self.me_path)
            .field("started", &self.started.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl SessionBootstrapper {
    pub fn new(
        coordinator: Arc<RefreshCoordinator>,
        backend: Arc<dyn HttpBackend>,
        store: SessionStore,
        me_path: impl Into<String>,
    ) -> Self {
        Self {
            coordinator,
            backend,
            store,
            me_path: me_path.into(),
            started: AtomicBool::new(false),
        }
    }

    /// Restores the session if the server still recognises this client.
    ///
    /// Only the first call performs network I/O. Later calls wait for that
    /// first run to resolve and report the session as it then stands.
    pub async fn run(&self) -> BootstrapOutcome {
        if self.started.swap(true, Ordering::SeqCst) {
            let session = self.store.wait_ready().await;
            return match session.user {
                Some(user) if session.access_token.is_some() => {
                    BootstrapOutcome::Authenticated(user)
                }
                _ => BootstrapOutcome::Anonymous,
            };
        }

        let _loading = LoadingGuard(&self.store);
        let outcome = self.restore().await;
        match &outcome {
            BootstrapOutcome::Authenticated(user) => {
                tracing::info!(username = %user.username, "session restored")
            }
            BootstrapOutcome::Anonymous => tracing::info!("no session to restore"),
        }
        outcome
    }

    async fn restore(&self) -> BootstrapOutcome {
        let epoch = self.store.epoch();
        let token = match self.coordinator.refresh_for_bootstrap().await {
            RefreshOutcome::Renewed(token) => token,
            outcome => {
                tracing::debug!(?outcome, "silent refresh did not produce a token");
                return BootstrapOutcome::Anonymous;
            }
        };

        match self.fetch_identity(&token).await {
            Ok(user) => {
                if self.store.identify(user.clone(), epoch) {
                    BootstrapOutcome::Authenticated(user)
                } else {
                    BootstrapOutcome::Anonymous
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load user identity, clearing session");
                if self.store.epoch() == epoch {
                    self.store.teardown();
                }
                BootstrapOutcome::Anonymous
            }
        }
    }

    /// `GET users/me` with the freshly issued token attached explicitly.
    async fn fetch_identity(&self, token: &str) -> Result<UserIdentity> {
        let request = ApiRequest::get(self.me_path.clone()).with_bearer(token)?;
        let record: UserRecord = self
            .backend
            .execute(request)
            .await?
            .error_for_status()?
            .json()?;
        Ok(record.into())
    }
}

/// Clears the loading flag when the bootstrap finishes or is dropped.
struct LoadingGuard<'a>(&'a SessionStore);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.finish_loading();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::fake::{ok_json, status, FakeBackend};
    use crate::session::navigator::MockNavigator;
    use serde_json::json;
    use std::time::Duration;

    const REFRESH: &str = "users/refresh";
    const ME: &str = "users/me";

    fn bootstrapper(backend: Arc<FakeBackend>, store: &SessionStore) -> SessionBootstrapper {
        let mut navigator = MockNavigator::new();
        navigator.expect_navigate().never();
        let coordinator = Arc::new(RefreshCoordinator::new(
            backend.clone(),
            store.clone(),
            Arc::new(navigator),
            REFRESH,
        ));
        SessionBootstrapper::new(coordinator, backend, store.clone(), ME)
    }

    fn server(me_status: u16) -> FakeBackend {
        FakeBackend::new(move |req| match req.normalized_path() {
            REFRESH => ok_json(json!({"access": "restored"})),
            ME if me_status == 200 => ok_json(json!({
                "id": 4, "username": "ada", "email": "ada@example.com",
                "profile_picture": "", "bio": "", "created_at": "2024-01-01"
            })),
            ME => status(me_status, "nope"),
            _ => status(404, ""),
        })
    }

    #[tokio::test]
    async fn test_restores_session_with_identity() {
        let backend = Arc::new(server(200));
        let store = SessionStore::new();
        let outcome = bootstrapper(backend.clone(), &store).run().await;

        let BootstrapOutcome::Authenticated(user) = outcome else {
            panic!("expected an authenticated session");
        };
        assert_eq!(user.username, "ada");
        let session = store.get();
        assert!(!session.is_loading);
        assert_eq!(session.access_token.as_deref(), Some("restored"));
        assert_eq!(session.user, Some(user));
        assert_eq!(backend.bearers(ME), vec![Some("restored".to_string())]);
    }

    #[tokio::test]
    async fn test_rejected_refresh_leaves_anonymous_session() {
        let backend = Arc::new(FakeBackend::new(|_| status(401, "no refresh token")));
        let store = SessionStore::new();
        let outcome = bootstrapper(backend.clone(), &store).run().await;

        assert_eq!(outcome, BootstrapOutcome::Anonymous);
        assert!(!store.get().is_loading);
        assert_eq!(backend.count(ME), 0);
    }

    #[tokio::test]
    async fn test_identity_failure_clears_token() {
        let backend = Arc::new(server(500));
        let store = SessionStore::new();
        let outcome = bootstrapper(backend, &store).run().await;

        assert_eq!(outcome, BootstrapOutcome::Anonymous);
        let session = store.get();
        assert!(session.access_token.is_none());
        assert!(session.user.is_none());
        assert!(!session.is_loading);
    }

    #[tokio::test]
    async fn test_second_run_does_no_network_io() {
        let backend = Arc::new(server(200));
        let store = SessionStore::new();
        let b = bootstrapper(backend.clone(), &store);

        let first = b.run().await;
        let second = b.run().await;
        assert_eq!(first, second);
        assert_eq!(backend.count(REFRESH), 1);
        assert_eq!(backend.count(ME), 1);
    }

    #[tokio::test]
    async fn test_cancelled_bootstrap_still_clears_loading() {
        let backend = Arc::new(server(200).with_delay(REFRESH, Duration::from_millis(200)));
        let store = SessionStore::new();
        let b = bootstrapper(backend, &store);

        let result = tokio::time::timeout(Duration::from_millis(20), b.run()).await;
        assert!(result.is_err());
        assert!(!store.get().is_loading);
    }
}
