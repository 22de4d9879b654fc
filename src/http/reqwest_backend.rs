//! `reqwest`-backed [`HttpBackend`]
//!
//! The client is built with a shared [`Jar`] so the server's HTTP-only
//! `refresh_token` cookie is stored and replayed automatically. The jar is
//! exposed so the CLI can persist it between runs.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use url::Url;

use crate::error::{LovenoteError, Result};
use crate::http::{ApiRequest, ApiResponse, HttpBackend};

/// HTTP backend speaking to the lovenote API over `reqwest`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use reqwest::cookie::Jar;
/// use url::Url;
/// use lovenote::http::reqwest_backend::ReqwestBackend;
///
/// let backend = ReqwestBackend::new(
///     Url::parse("http://localhost:8080/api").unwrap(),
///     Some(Duration::from_secs(30)),
///     Arc::new(Jar::default()),
///     "lovenote/0.1.0",
/// )
/// .unwrap();
/// assert_eq!(
///     backend.url_for("/users/me").unwrap().as_str(),
///     "http://localhost:8080/api/users/me"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    client: reqwest::Client,
    /// Always ends with `/` so relative joins append instead of replacing the
    /// last segment.
    base_url: Url,
    jar: Arc<Jar>,
}

impl ReqwestBackend {
    /// Builds a backend rooted at `base_url`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API root, e.g. `http://localhost:8080/api/`.
    /// * `timeout` - Per-request timeout; `None` leaves requests unbounded.
    /// * `jar` - Cookie store shared with the caller.
    /// * `user_agent` - Value of the `User-Agent` header.
    ///
    /// # Errors
    ///
    /// Returns [`LovenoteError::Http`] if the underlying client cannot be
    /// constructed.
    pub fn new(
        base_url: Url,
        timeout: Option<Duration>,
        jar: Arc<Jar>,
        user_agent: &str,
    ) -> Result<Self> {
        let base_url = as_directory(base_url);
        let mut builder = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .user_agent(user_agent.to_string());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(LovenoteError::Http)?;

        Ok(Self {
            client,
            base_url,
            jar,
        })
    }

    /// The cookie jar holding the durable credential.
    pub fn jar(&self) -> Arc<Jar> {
        Arc::clone(&self.jar)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves an endpoint path against the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`LovenoteError::Url`] if the path cannot be joined.
    pub fn url_for(&self, path: &str) -> Result<Url> {
        resolve(&self.base_url, path)
    }
}

/// Resolves an endpoint `path` against `base_url` the same way a backend
/// rooted at `base_url` would.
///
/// # Errors
///
/// Returns [`LovenoteError::Url`] if the path cannot be joined.
pub fn resolve(base_url: &Url, path: &str) -> Result<Url> {
    as_directory(base_url.clone())
        .join(crate::http::normalize_path(path))
        .map_err(|e| LovenoteError::Url(e).into())
}

fn as_directory(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[async_trait::async_trait]
impl HttpBackend for ReqwestBackend {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = self.url_for(&request.path)?;
        tracing::debug!(method = %request.method, url = %url, "sending request");

        let mut builder = self
            .client
            .request(request.method, url.clone())
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::warn!(url = %url, error = %e, "request failed before a response");
            LovenoteError::Transport(e.to_string())
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| LovenoteError::Transport(format!("failed to read response body: {e}")))?;

        tracing::debug!(url = %url, status = status.as_u16(), "received response");
        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base: &str) -> ReqwestBackend {
        ReqwestBackend::new(
            Url::parse(base).unwrap(),
            None,
            Arc::new(Jar::default()),
            "lovenote-test",
        )
        .unwrap()
    }

    #[test]
    fn test_base_url_gains_trailing_slash() {
        let b = backend("http://localhost:8080/api");
        assert_eq!(b.base_url().as_str(), "http://localhost:8080/api/");
    }

    #[test]
    fn test_url_for_ignores_leading_slash() {
        let b = backend("http://localhost:8080/api/");
        assert_eq!(
            b.url_for("/users/refresh").unwrap().as_str(),
            "http://localhost:8080/api/users/refresh"
        );
        assert_eq!(
            b.url_for("users").unwrap().as_str(),
            "http://localhost:8080/api/users"
        );
    }

    #[test]
    fn test_resolve_matches_backend() {
        let base = Url::parse("https://notes.example.com/api").unwrap();
        assert_eq!(
            resolve(&base, "users/refresh").unwrap(),
            backend("https://notes.example.com/api").url_for("users/refresh").unwrap()
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        // Port 9 (discard) on localhost is not expected to accept HTTP.
        let b = ReqwestBackend::new(
            Url::parse("http://127.0.0.1:9/api/").unwrap(),
            Some(Duration::from_secs(2)),
            Arc::new(Jar::default()),
            "lovenote-test",
        )
        .unwrap();
        let err = b.execute(ApiRequest::get("users/me")).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LovenoteError>(),
            Some(LovenoteError::Transport(_))
        ));
    }
}
