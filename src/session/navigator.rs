//! Redirect boundary
//!
//! The session layer never renders anything. When it decides the user must
//! see a different screen it calls [`Navigator::navigate`]; whoever owns the
//! UI loop decides what that means.

use std::fmt;

use tokio::sync::mpsc;

/// Destinations the session layer can send the user to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Unauthenticated entry point.
    Login,
    /// Authenticated landing area.
    Hub,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Hub => "/hub",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Receives redirect decisions.
#[cfg_attr(test, mockall::automock)]
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// [`Navigator`] that forwards every route onto an unbounded channel.
///
/// # Examples
///
/// ```
/// use lovenote::session::navigator::{ChannelNavigator, Navigator, Route};
///
/// let (navigator, mut routes) = ChannelNavigator::new();
/// navigator.navigate(Route::Login);
/// assert_eq!(routes.try_recv().unwrap(), Route::Login);
/// ```
#[derive(Debug, Clone)]
pub struct ChannelNavigator {
    tx: mpsc::UnboundedSender<Route>,
}

impl ChannelNavigator {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Route>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Navigator for ChannelNavigator {
    fn navigate(&self, route: Route) {
        tracing::info!(route = %route, "navigating");
        if self.tx.send(route).is_err() {
            tracing::debug!(route = %route, "no route listener attached");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_paths() {
        assert_eq!(Route::Login.to_string(), "/login");
        assert_eq!(Route::Hub.path(), "/hub");
    }

    #[test]
    fn test_channel_navigator_survives_dropped_receiver() {
        let (navigator, rx) = ChannelNavigator::new();
        drop(rx);
        navigator.navigate(Route::Hub);
    }

    #[test]
    fn test_channel_navigator_preserves_order() {
        let (navigator, mut rx) = ChannelNavigator::new();
        navigator.navigate(Route::Hub);
        navigator.navigate(Route::Login);
        assert_eq!(rx.try_recv().unwrap(), Route::Hub);
        assert_eq!(rx.try_recv().unwrap(), Route::Login);
        assert!(rx.try_recv().is_err());
    }
}
