//! Command handlers for the CLI
//!
//! Each handler opens a [`ClientContext`]: a [`SessionManager`] over a
//! `reqwest` backend whose cookie jar is restored from, and saved back to,
//! disk. A CLI process lives shorter than a browser tab, so the jar file is
//! what carries the durable credential from one invocation to the next.
//!
//! - [`session`] -- one-shot `login`, `register`, `whoami`, `logout`, `get`.
//! - [`shell`] -- interactive loop that keeps one session alive.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use reqwest::cookie::Jar;
use tokio::sync::mpsc;
use url::Url;

use crate::config::Config;
use crate::error::Result;
use crate::http::cookie_jar;
use crate::http::reqwest_backend::{self, ReqwestBackend};
use crate::session::navigator::{ChannelNavigator, Route};
use crate::session::SessionManager;

pub mod session;
pub mod shell;

/// Live session plus the cookie jar persistence around it.
pub struct ClientContext {
    pub manager: SessionManager,
    jar: Arc<Jar>,
    jar_origin: Url,
    jar_path: PathBuf,
    persist: bool,
    forgotten: bool,
    routes: mpsc::UnboundedReceiver<Route>,
}

impl std::fmt::Debug for ClientContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientContext")
            .field("manager", &self.manager)
            .field("jar_path", &self.jar_path)
            .field("persist", &self.persist)
            .finish_non_exhaustive()
    }
}

impl ClientContext {
    /// Builds the backend and session manager described by `config`,
    /// restoring any saved cookies.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid, the saved jar cannot be
    /// read, or the HTTP client cannot be built.
    pub fn open(config: &Config) -> Result<Self> {
        let base_url = config.api.base_url()?;
        let jar_origin = reqwest_backend::resolve(&base_url, &config.api.endpoints.refresh)?;
        let jar_path = config.session.jar_path();
        let persist = config.session.persist_cookies;

        let jar = if persist {
            cookie_jar::load_jar(&jar_path, &jar_origin)?
        } else {
            Arc::new(Jar::default())
        };

        let backend = ReqwestBackend::new(
            base_url,
            Some(config.api.request_timeout()),
            Arc::clone(&jar),
            &config.api.user_agent,
        )?;
        let (navigator, routes) = ChannelNavigator::new();
        let manager = SessionManager::from_config(config, Arc::new(backend), Arc::new(navigator));

        Ok(Self {
            manager,
            jar,
            jar_origin,
            jar_path,
            persist,
            forgotten: false,
            routes,
        })
    }

    /// Saves the durable credential for the next run.
    ///
    /// After [`forget`](Self::forget) nothing is saved until a new session is
    /// established; the jar may still hold the cookie of the ended session.
    pub fn save(&self) -> Result<()> {
        if !self.persist {
            return Ok(());
        }
        if self.forgotten && self.manager.store().access_token().is_none() {
            tracing::debug!("session ended, not saving cookies");
            return Ok(());
        }
        cookie_jar::persist_jar(&self.jar, &self.jar_origin, &self.jar_path)
    }

    /// Deletes the saved credential.
    pub fn forget(&mut self) -> Result<()> {
        self.forgotten = true;
        cookie_jar::clear_jar(&self.jar_path)
    }

    /// Routes the session layer navigated to since the last call.
    pub fn take_routes(&mut self) -> Vec<Route> {
        let mut routes = Vec::new();
        while let Ok(route) = self.routes.try_recv() {
            routes.push(route);
        }
        routes
    }

    /// Handles routes emitted by the last operation. An involuntary trip to
    /// the login screen means the saved credential is dead.
    ///
    /// Returns `true` if the session ended.
    pub fn settle_routes(&mut self) -> Result<bool> {
        let ended = self.take_routes().contains(&Route::Login);
        if ended {
            self.forget()?;
        }
        Ok(ended)
    }
}

/// Reads a password from the terminal without echoing it.
pub fn prompt_password(message: &str) -> Result<String> {
    let password = rpassword::prompt_password(message)?;
    if password.trim().is_empty() {
        bail!("password must not be empty");
    }
    Ok(password)
}
