//! Client-side session management
//!
//! - [`store`] -- the process-wide session register.
//! - [`coordinator`] -- single-flight access token refresh.
//! - [`bootstrap`] -- one-shot silent sign-in at startup.
//! - [`guard`] -- route guards gated on the bootstrap.
//! - [`navigator`] -- the redirect boundary.
//! - [`manager`] -- façade tying the above together with login, registration
//!   and logout.

pub mod bootstrap;
pub mod coordinator;
pub mod guard;
pub mod manager;
pub mod navigator;
pub mod store;

pub use bootstrap::{BootstrapOutcome, SessionBootstrapper};
pub use coordinator::{CoordinatorState, RefreshCoordinator, RefreshOutcome, RefreshTrigger};
pub use guard::{redirect_if_authenticated, require_session, Access};
pub use manager::SessionManager;
pub use navigator::{ChannelNavigator, Navigator, Route};
pub use store::{Session, SessionPatch, SessionStore};
