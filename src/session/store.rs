//! Process-wide session register
//!
//! [`SessionStore`] holds the current access token and user identity for the
//! lifetime of the client. Every clone shares the same state: non-reactive
//! readers (the request augmenter) call [`SessionStore::get`] or
//! [`SessionStore::access_token`] and always see the latest value, reactive
//! readers hold a [`watch::Receiver`] from [`SessionStore::subscribe`].
//!
//! Writes go through the `watch` channel's internal lock, so the session
//! epoch check in [`SessionStore::renew`] and the epoch bump in
//! [`SessionStore::teardown`] can never interleave.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::models::UserIdentity;

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Snapshot of the client's authentication state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Current bearer credential, if signed in.
    pub access_token: Option<String>,
    /// Identity of the signed-in user.
    pub user: Option<UserIdentity>,
    /// `true` until the startup bootstrap has resolved. Never returns to
    /// `true` once cleared.
    pub is_loading: bool,
    /// When the current access token was obtained.
    pub authenticated_at: Option<DateTime<Utc>>,
}

impl Session {
    fn initial() -> Self {
        Self {
            access_token: None,
            user: None,
            is_loading: true,
            authenticated_at: None,
        }
    }

    /// `true` when both a token and a user are present.
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some() && self.user.is_some()
    }
}

/// Partial update for [`SessionStore::set`].
///
/// Fields left unset are not touched. `is_loading` is deliberately absent;
/// only the bootstrap clears it, through [`SessionStore::finish_loading`].
///
/// # Examples
///
/// ```
/// use lovenote::session::store::{SessionPatch, SessionStore};
///
/// let store = SessionStore::new();
/// store.set(SessionPatch::new().access_token(Some("tok".to_string())));
/// assert_eq!(store.access_token().as_deref(), Some("tok"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SessionPatch {
    access_token: Option<Option<String>>,
    user: Option<Option<UserIdentity>>,
}

impl SessionPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn access_token(mut self, token: Option<String>) -> Self {
        self.access_token = Some(token);
        self
    }

    pub fn user(mut self, user: Option<UserIdentity>) -> Self {
        self.user = Some(user);
        self
    }
}

// ---------------------------------------------------------------------------
// SessionStore
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct StoreInner {
    state: watch::Sender<Session>,
    /// Bumped on every teardown; a refresh started under an older epoch may
    /// not write its token.
    epoch: AtomicU64,
    /// Set once any access token has been installed.
    token_issued: AtomicBool,
}

/// Shared, cloneable handle to the session register.
///
/// # Examples
///
/// ```
/// use lovenote::session::store::SessionStore;
///
/// let store = SessionStore::new();
/// assert!(store.get().is_loading);
/// assert!(store.finish_loading());
/// assert!(!store.finish_loading());
/// assert!(!store.get().is_loading);
/// ```
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Creates an empty, loading session.
    pub fn new() -> Self {
        let (state, _) = watch::channel(Session::initial());
        Self {
            inner: Arc::new(StoreInner {
                state,
                epoch: AtomicU64::new(0),
                token_issued: AtomicBool::new(false),
            }),
        }
    }

    /// Returns a snapshot of the current session.
    pub fn get(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    /// Returns the current access token without cloning the whole session.
    pub fn access_token(&self) -> Option<String> {
        self.inner.state.borrow().access_token.clone()
    }

    pub fn current_user(&self) -> Option<UserIdentity> {
        self.inner.state.borrow().user.clone()
    }

    /// Current session epoch. Changes on [`teardown`](Self::teardown) and
    /// [`establish`](Self::establish), i.e. whenever the session's owner
    /// may change.
    pub fn epoch(&self) -> u64 {
        self.inner.epoch.load(Ordering::SeqCst)
    }

    /// Subscribes to session changes.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    /// Applies a partial update.
    ///
    /// A patch that would install a user before any access token has ever
    /// been issued has its user dropped.
    pub fn set(&self, patch: SessionPatch) {
        let issued = &self.inner.token_issued;
        self.inner.state.send_if_modified(|session| {
            let before = session.clone();
            if let Some(token) = patch.access_token {
                if token.is_some() {
                    issued.store(true, Ordering::SeqCst);
                    session.authenticated_at = Some(Utc::now());
                } else {
                    session.authenticated_at = None;
                }
                session.access_token = token;
            }
            if let Some(user) = patch.user {
                if user.is_some() && !issued.load(Ordering::SeqCst) {
                    tracing::warn!("ignoring user identity: no access token has been issued");
                } else {
                    session.user = user;
                }
            }
            *session != before
        });
    }

    /// Installs a token and user together, as after login or registration.
    ///
    /// Starts a new epoch, so refreshes and requests begun before the call
    /// cannot write into or replay with the new session. Returns the new
    /// epoch.
    pub fn establish(&self, token: String, user: UserIdentity) -> u64 {
        let inner = &self.inner;
        let mut epoch = 0;
        inner.token_issued.store(true, Ordering::SeqCst);
        inner.state.send_modify(|session| {
            epoch = inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
            session.access_token = Some(token);
            session.user = Some(user);
            session.authenticated_at = Some(Utc::now());
        });
        tracing::debug!(epoch, "session established");
        epoch
    }

    /// Writes a renewed token if the session has not been torn down since
    /// `epoch` was read. Returns whether the token was written.
    pub fn renew(&self, token: String, epoch: u64) -> bool {
        let inner = &self.inner;
        inner.state.send_if_modified(|session| {
            if inner.epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            inner.token_issued.store(true, Ordering::SeqCst);
            session.access_token = Some(token);
            session.authenticated_at = Some(Utc::now());
            true
        })
    }

    /// Installs `user` if the session is still at `epoch` and holds a token.
    /// Returns whether the user was written.
    pub fn identify(&self, user: UserIdentity, epoch: u64) -> bool {
        let inner = &self.inner;
        inner.state.send_if_modified(|session| {
            if inner.epoch.load(Ordering::SeqCst) != epoch || session.access_token.is_none() {
                return false;
            }
            session.user = Some(user);
            true
        })
    }

    /// Clears token and user and starts a new epoch. Returns the new epoch.
    pub fn teardown(&self) -> u64 {
        let inner = &self.inner;
        let mut epoch = 0;
        inner.state.send_modify(|session| {
            epoch = inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
            session.access_token = None;
            session.user = None;
            session.authenticated_at = None;
        });
        tracing::debug!(epoch, "session torn down");
        epoch
    }

    /// Marks the bootstrap as resolved. Returns `true` only for the call that
    /// performed the transition.
    pub fn finish_loading(&self) -> bool {
        self.inner.state.send_if_modified(|session| {
            if session.is_loading {
                session.is_loading = false;
                true
            } else {
                false
            }
        })
    }

    /// Waits until the bootstrap has resolved and returns the session at
    /// that point.
    pub async fn wait_ready(&self) -> Session {
        let mut rx = self.subscribe();
        let ready = rx.wait_for(|s| !s.is_loading).await.map(|s| (*s).clone());
        // The sender lives in `self`, so the channel cannot close here.
        ready.unwrap_or_else(|_| self.get())
    }
}
