//! Route guards
//!
//! Both guards wait for the bootstrap to resolve before deciding, so a
//! returning user is never bounced to the login screen while their session
//! is still being restored.

use crate::models::UserIdentity;
use crate::session::navigator::{Navigator, Route};
use crate::session::store::SessionStore;

/// Guard decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// The caller may proceed; carries the signed-in user when there is one.
    Granted(Option<UserIdentity>),
    /// The navigator was sent to this route.
    Redirected(Route),
}

/// Protects an authenticated screen.
///
/// Grants access with the current user, or redirects to [`Route::Login`]
/// when nobody is signed in.
pub async fn require_session(store: &SessionStore, navigator: &dyn Navigator) -> Access {
    let session = store.wait_ready().await;
    match session.user {
        Some(user) => Access::Granted(Some(user)),
        None => {
            navigator.navigate(Route::Login);
            Access::Redirected(Route::Login)
        }
    }
}

/// Protects the login and registration screens from signed-in users, who
/// are sent to [`Route::Hub`] instead.
pub async fn redirect_if_authenticated(store: &SessionStore, navigator: &dyn Navigator) -> Access {
    let session = store.wait_ready().await;
    if session.user.is_some() {
        navigator.navigate(Route::Hub);
        Access::Redirected(Route::Hub)
    } else {
        Access::Granted(None)
    }
}
