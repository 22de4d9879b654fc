//! lovenote - client-side session management for the lovenote service
//!
//! This library owns the access token lifecycle of a lovenote client: it
//! attaches the current token to every request, silently refreshes it when
//! the server rejects it, makes sure concurrent failures share a single
//! refresh, and restores the session at startup.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `session`: token store, refresh coordinator, bootstrapper, route guards
//!   and the `SessionManager` façade
//! - `http`: request/response types, the `HttpBackend` seam, the request
//!   augmenter, and the `reqwest` backend with cookie jar persistence
//! - `client`: the `ApiClient` request pipeline
//! - `models`: user and token payloads
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli` / `commands`: Command-line interface definition and handlers
//!
//! # Example
//!
//! ```no_run
//! use lovenote::commands::ClientContext;
//! use lovenote::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let ctx = ClientContext::open(&config)?;
//!     ctx.manager.bootstrap().await;
//!     let notes: serde_json::Value = ctx.manager.client().get_json("notes").await?;
//!     println!("{notes}");
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod session;

// Re-export commonly used types
pub use client::ApiClient;
pub use config::Config;
pub use error::{LovenoteError, Result};
pub use models::{Credentials, Registration, UserIdentity};
pub use session::{Session, SessionManager, SessionStore};
