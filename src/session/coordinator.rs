//! Single-flight access token refresh
//!
//! [`RefreshCoordinator`] is consulted whenever a request comes back `401`.
//! It guarantees that at most one `POST users/refresh` is outstanding, that
//! every request failing while that call is in flight waits for its outcome
//! instead of starting another, and that a failed refresh ends the session
//! exactly once.
//!
//! # State machine
//!
//! ```text
//!            401 (not the refresh endpoint)
//!   IDLE ─────────────────────────────────────▶ REFRESHING
//!    ▲                                               │ 401 → enqueue waiter
//!    │   success: store token, wake waiters          │
//!    ├───────────────────────────────────────────────┤
//!    │   failure: tear down, redirect once,          │
//!    └──────────── wake waiters ─────────────────────┘
//! ```
//!
//! The state lives behind a `std::sync::Mutex` that is never held across an
//! `.await`. Waiters are woken and the state returns to `IDLE` inside the same
//! critical section, so a `401` observed at any moment either joins the
//! outstanding flight or sees the renewed token.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::oneshot;

use crate::error::{LovenoteError, Result};
use crate::http::{normalize_path, ApiRequest, HttpBackend};
use crate::models::TokenResponse;
use crate::session::navigator::{Navigator, Route};
use crate::session::store::SessionStore;

/// Result of a refresh as seen by one caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A valid token is available; replay with it.
    Renewed(String),
    /// The server refused to renew. The session has been ended if any
    /// authorization failure was waiting on the flight.
    Rejected,
    /// The flight ended without a usable result: the session was torn down
    /// while it ran, or the task leading it was cancelled.
    Abandoned,
}

/// Why a refresh was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    /// A request came back `401`.
    AuthFailure,
    /// Startup silent sign-in. Failure is not an error.
    Bootstrap,
}

/// Observable coordinator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Refreshing { waiters: usize },
}

enum RefreshState {
    Idle,
    Refreshing {
        waiters: Vec<oneshot::Sender<RefreshOutcome>>,
        /// Set when at least one authorization failure depends on the flight;
        /// only then does a rejection end the session.
        escalate: bool,
    },
}

enum Role {
    /// Leads the refresh for the session at this epoch.
    Leader(u64),
    Follower(oneshot::Receiver<RefreshOutcome>),
}

// ---------------------------------------------------------------------------
// RefreshCoordinator
// ---------------------------------------------------------------------------

/// Serializes access token refreshes for one session.
pub struct RefreshCoordinator {
    backend: Arc<dyn HttpBackend>,
    store: SessionStore,
    navigator: Arc<dyn Navigator>,
    refresh_path: String,
    refresh_timeout: Option<Duration>,
    state: Mutex<RefreshState>,
    refresh_count: AtomicU64,
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("refresh_path", &self.refresh_path)
            .field("refresh_timeout", &self.refresh_timeout)
            .field("state", &self.state())
            .field("refresh_count", &self.refresh_count())
            .finish_non_exhaustive()
    }
}

impl RefreshCoordinator {
    /// Creates a coordinator in the `Idle` state.
    ///
    /// # Arguments
    ///
    /// * `backend` - Transport used for the refresh call itself.
    /// * `store` - Session the renewed token is written to.
    /// * `navigator` - Receives the redirect when the session ends.
    /// * `refresh_path` - Refresh endpoint, relative to the API base URL.
    pub fn new(
        backend: Arc<dyn HttpBackend>,
        store: SessionStore,
        navigator: Arc<dyn Navigator>,
        refresh_path: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            store,
            navigator,
            refresh_path: refresh_path.into(),
            refresh_timeout: None,
            state: Mutex::new(RefreshState::Idle),
            refresh_count: AtomicU64::new(0),
        }
    }

    /// Bounds how long a refresh call may take. A timeout is a rejection.
    pub fn with_refresh_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    /// `true` if `path` names the refresh endpoint. Such requests must never
    /// trigger a refresh.
    pub fn is_refresh_endpoint(&self, path: &str) -> bool {
        normalize_path(path) == normalize_path(&self.refresh_path)
    }

    pub fn state(&self) -> CoordinatorState {
        match &*self.lock_state() {
            RefreshState::Idle => CoordinatorState::Idle,
            RefreshState::Refreshing { waiters, .. } => CoordinatorState::Refreshing {
                waiters: waiters.len(),
            },
        }
    }

    /// Number of refresh calls issued so far.
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count.load(Ordering::SeqCst)
    }

    /// Handles a `401` for a request that was sent with `sent_with` while the
    /// session was at `sent_epoch`.
    ///
    /// If the session was torn down or replaced since the request went out,
    /// nothing is refreshed and nothing is replayed. If a refresh is already
    /// running the caller waits for it. Otherwise, if the store already holds
    /// a different token than the one the request carried, that token is
    /// returned without a refresh call. Otherwise the caller leads a new
    /// refresh.
    ///
    /// The caller must not pass requests to the refresh endpoint.
    pub async fn handle_auth_failure(
        &self,
        sent_with: Option<&str>,
        sent_epoch: u64,
    ) -> RefreshOutcome {
        let role = {
            let mut state = self.lock_state();
            let epoch = self.store.epoch();
            if epoch != sent_epoch {
                tracing::debug!(sent_epoch, epoch, "session changed after the request was sent");
                return RefreshOutcome::Abandoned;
            }
            match &mut *state {
                RefreshState::Refreshing { waiters, escalate } => {
                    *escalate = true;
                    Role::Follower(enqueue(waiters))
                }
                RefreshState::Idle => {
                    if let Some(current) = self.store.access_token() {
                        if sent_with != Some(current.as_str()) {
                            tracing::debug!("request carried an outdated token, replaying");
                            return RefreshOutcome::Renewed(current);
                        }
                    }
                    *state = RefreshState::Refreshing {
                        waiters: Vec::new(),
                        escalate: true,
                    };
                    Role::Leader(epoch)
                }
            }
        };
        self.resolve(role, RefreshTrigger::AuthFailure).await
    }

    /// Runs the startup refresh through the same single-flight slot.
    ///
    /// A rejection leaves the session untouched and navigates nowhere, unless
    /// an authorization failure joined the flight in the meantime.
    pub async fn refresh_for_bootstrap(&self) -> RefreshOutcome {
        let role = {
            let mut state = self.lock_state();
            match &mut *state {
                RefreshState::Refreshing { waiters, .. } => Role::Follower(enqueue(waiters)),
                RefreshState::Idle => {
                    *state = RefreshState::Refreshing {
                        waiters: Vec::new(),
                        escalate: false,
                    };
                    Role::Leader(self.store.epoch())
                }
            }
        };
        self.resolve(role, RefreshTrigger::Bootstrap).await
    }

    async fn resolve(&self, role: Role, trigger: RefreshTrigger) -> RefreshOutcome {
        match role {
            Role::Follower(rx) => {
                tracing::debug!(?trigger, "waiting for outstanding refresh");
                // A dropped sender means the leader was cancelled.
                rx.await.unwrap_or(RefreshOutcome::Abandoned)
            }
            Role::Leader(epoch) => self.lead(trigger, epoch).await,
        }
    }

    async fn lead(&self, trigger: RefreshTrigger, epoch: u64) -> RefreshOutcome {
        let mut flight = Flight {
            coordinator: self,
            armed: true,
        };
        let attempt = self.refresh_count.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(?trigger, attempt, "refreshing access token");

        let result = self.call_refresh().await;
        flight.armed = false;

        let outcome = match result {
            Ok(token) => {
                if self.store.renew(token.clone(), epoch) {
                    tracing::info!("access token renewed");
                    RefreshOutcome::Renewed(token)
                } else {
                    tracing::info!("discarding renewed token: session ended during refresh");
                    RefreshOutcome::Abandoned
                }
            }
            Err(e) if self.store.epoch() != epoch => {
                tracing::debug!(error = %e, "refresh failed after session ended");
                RefreshOutcome::Abandoned
            }
            Err(e) => {
                tracing::warn!(?trigger, error = %e, "access token refresh failed");
                RefreshOutcome::Rejected
            }
        };

        let ended = {
            let mut state = self.lock_state();
            let (waiters, escalate) = match std::mem::replace(&mut *state, RefreshState::Idle) {
                RefreshState::Refreshing { waiters, escalate } => (waiters, escalate),
                RefreshState::Idle => (Vec::new(), false),
            };
            let ended = escalate && outcome == RefreshOutcome::Rejected;
            if ended {
                self.store.teardown();
            }
            for waiter in waiters {
                let _ = waiter.send(outcome.clone());
            }
            ended
        };

        if ended {
            tracing::info!("session ended, redirecting to login");
            self.navigator.navigate(Route::Login);
        }
        outcome
    }

    /// Issues the refresh call. The durable credential travels as a cookie;
    /// no bearer is attached.
    async fn call_refresh(&self) -> Result<String> {
        let call = self
            .backend
            .execute(ApiRequest::post(self.refresh_path.clone()));
        let response = match self.refresh_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                LovenoteError::Transport(format!("refresh timed out after {limit:?}"))
            })??,
            None => call.await?,
        };
        let token: TokenResponse = response.error_for_status()?.json()?;
        if token.access.is_empty() {
            return Err(LovenoteError::Authentication("refresh returned an empty token".into()).into());
        }
        Ok(token.access)
    }

    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        // The state is a plain enum; a panic elsewhere cannot leave it torn.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn enqueue(waiters: &mut Vec<oneshot::Sender<RefreshOutcome>>) -> oneshot::Receiver<RefreshOutcome> {
    let (tx, rx) = oneshot::channel();
    waiters.push(tx);
    rx
}

/// Returns the coordinator to `Idle` if the leading task is dropped before
/// the refresh resolves. Waiters see their sender dropped.
struct Flight<'a> {
    coordinator: &'a RefreshCoordinator,
    armed: bool,
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!("refresh cancelled before completion");
            *self.coordinator.lock_state() = RefreshState::Idle;
        }
    }
}
