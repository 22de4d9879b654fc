use std::sync::Arc;

use reqwest::cookie::Jar;
use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;
use url::Url;
use wiremock::MockServer;

use lovenote::config::EndpointsConfig;
use lovenote::http::reqwest_backend::ReqwestBackend;
use lovenote::session::{ChannelNavigator, Route, SessionManager};
use lovenote::UserIdentity;

/// API root on the mock server.
#[allow(dead_code)]
pub fn api_base(server: &MockServer) -> Url {
    Url::parse(&format!("{}/api/", server.uri())).expect("valid mock server url")
}

/// URL the durable cookie is scoped to.
#[allow(dead_code)]
pub fn refresh_url(server: &MockServer) -> Url {
    api_base(server).join("users/refresh").expect("valid refresh url")
}

/// A session manager talking to `server` over real HTTP.
#[allow(dead_code)]
pub fn manager_with_jar(
    server: &MockServer,
    jar: Arc<Jar>,
) -> (SessionManager, UnboundedReceiver<Route>) {
    let backend = ReqwestBackend::new(
        api_base(server),
        Some(std::time::Duration::from_secs(5)),
        jar,
        "lovenote-tests",
    )
    .expect("backend");
    let (navigator, routes) = ChannelNavigator::new();
    let manager = SessionManager::new(
        Arc::new(backend),
        Arc::new(navigator),
        EndpointsConfig::default(),
        Some(std::time::Duration::from_secs(5)),
    );
    (manager, routes)
}

#[allow(dead_code)]
pub fn manager(server: &MockServer) -> (SessionManager, UnboundedReceiver<Route>) {
    manager_with_jar(server, Arc::new(Jar::default()))
}

#[allow(dead_code)]
pub fn user(id: u64, username: &str) -> UserIdentity {
    UserIdentity {
        id,
        username: username.to_string(),
        email: None,
        profile_picture: String::new(),
        bio: None,
        created_at: None,
    }
}

/// JSON body of `GET users/me`.
#[allow(dead_code)]
pub fn user_json(id: u64, username: &str) -> serde_json::Value {
    json!({
        "id": id,
        "username": username,
        "email": format!("{username}@example.com"),
        "profile_picture": "",
        "bio": "",
        "created_at": "2024-02-14T00:00:00Z",
    })
}

/// Drains every route emitted so far.
#[allow(dead_code)]
pub fn drain(routes: &mut UnboundedReceiver<Route>) -> Vec<Route> {
    let mut seen = Vec::new();
    while let Ok(route) = routes.try_recv() {
        seen.push(route);
    }
    seen
}
