//! Binary-level tests for the `lovenote` CLI
//!
//! Each test runs the compiled binary against a `wiremock` server with an
//! isolated cookie jar file, so one invocation's saved credential is visible
//! to the next exactly as it would be for a user.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn lovenote(server_uri: &str, dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("lovenote").unwrap();
    cmd.env_remove("LOVENOTE_API_BASE_URL")
        .env_remove("LOVENOTE_PASSWORD")
        .env_remove("LOVENOTE_PERSIST_COOKIES")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .env("LOVENOTE_COOKIE_JAR", jar_path(dir))
        .arg("--config")
        .arg(dir.join("missing.yaml"))
        .arg("--base-url")
        .arg(format!("{server_uri}/api/"));
    cmd
}

fn jar_path(dir: &Path) -> PathBuf {
    dir.join("session.cookies")
}

/// Runs a blocking assertion off the async test runtime so the mock server
/// keeps serving.
async fn blocking<F>(f: F)
where
    F: FnOnce() + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.unwrap();
}

#[test]
fn test_help_lists_commands() {
    let mut cmd = Command::cargo_bin("lovenote").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("whoami"))
        .stdout(predicate::str::contains("login"));
}

#[test]
fn test_invalid_base_url_is_a_configuration_error() {
    let dir = TempDir::new().unwrap();
    let mut cmd = lovenote("ftp://example.com", dir.path());
    cmd.arg("whoami");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_whoami_without_saved_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users/refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Refresh token not found"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut cmd = lovenote(&server.uri(), dir.path());
    cmd.arg("whoami");
    blocking(move || {
        cmd.assert()
            .success()
            .stdout(predicate::str::contains("Not signed in"));
    })
    .await;
    assert!(!jar_path(dir.path()).exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_whoami_restores_saved_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users/refresh"))
        .and(header("cookie", "refresh_token=r1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "boot"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/me"))
        .and(header("authorization", "Bearer boot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 4,
            "username": "ada",
            "email": "ada@example.com",
            "profile_picture": "",
            "bio": "",
            "created_at": "2024-02-14T00:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    std::fs::write(jar_path(dir.path()), "refresh_token=r1").unwrap();
    let mut cmd = lovenote(&server.uri(), dir.path());
    cmd.arg("whoami").arg("--json");
    blocking(move || {
        cmd.assert()
            .success()
            .stdout(predicate::str::contains("\"username\": \"ada\""));
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_saves_cookie_and_logout_forgets_it() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "refresh_token=r1; Path=/api; HttpOnly")
                .set_body_json(json!({
                    "id": 4,
                    "username": "ada",
                    "email": "ada@example.com",
                    "profile_picture": "",
                    "bio": "",
                    "access": "t1"
                })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/users/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/users/logout"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut login = lovenote(&server.uri(), dir.path());
    login.arg("login").arg("ada").arg("--password").arg("pw");
    blocking(move || {
        login
            .assert()
            .success()
            .stdout(predicate::str::contains("Signed in as ada"));
    })
    .await;

    let saved = std::fs::read_to_string(jar_path(dir.path())).unwrap();
    assert!(saved.contains("refresh_token=r1"));

    let mut logout = lovenote(&server.uri(), dir.path());
    logout.arg("logout");
    blocking(move || {
        logout
            .assert()
            .success()
            .stdout(predicate::str::contains("Signed out"));
    })
    .await;
    assert!(!jar_path(dir.path()).exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_get_with_dead_session_reports_expiry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/notes"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Authentication required"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    std::fs::write(jar_path(dir.path()), "refresh_token=stale").unwrap();
    let mut cmd = lovenote(&server.uri(), dir.path());
    cmd.arg("get").arg("notes");
    blocking(move || {
        cmd.assert()
            .failure()
            .stderr(predicate::str::contains("Session expired"));
    })
    .await;
    assert!(!jar_path(dir.path()).exists());
}
