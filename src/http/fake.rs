//! Scripted in-process backend for session unit tests
//!
//! [`FakeBackend`] answers every request with a caller-supplied handler and
//! records what it was sent, so tests can assert on call counts and on the
//! credential each call carried without a network.
//!
//! Per-path delays hold a response back, which is how tests keep a refresh
//! call outstanding while other requests fail against it.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::StatusCode;

use crate::error::{LovenoteError, Result};
use crate::http::{normalize_path, ApiRequest, ApiResponse, HttpBackend};

type Handler = Box<dyn Fn(&ApiRequest) -> Result<ApiResponse> + Send + Sync>;

/// In-process [`HttpBackend`] driven by a handler closure.
pub struct FakeBackend {
    handler: Handler,
    delays: HashMap<String, Duration>,
    log: Mutex<Vec<ApiRequest>>,
}

impl std::fmt::Debug for FakeBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeBackend")
            .field("delays", &self.delays)
            .finish_non_exhaustive()
    }
}

impl FakeBackend {
    /// Creates a backend that answers with `handler`.
    pub fn new(handler: impl Fn(&ApiRequest) -> Result<ApiResponse> + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            delays: HashMap::new(),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Delays every response for `path` by `delay`.
    pub fn with_delay(mut self, path: &str, delay: Duration) -> Self {
        self.delays.insert(normalize_path(path).to_string(), delay);
        self
    }

    /// All requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.log.lock().unwrap().clone()
    }

    /// Number of requests received for `path`.
    pub fn count(&self, path: &str) -> usize {
        let path = normalize_path(path);
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.normalized_path() == path)
            .count()
    }

    /// Bearer tokens carried by the requests for `path`, in arrival order.
    pub fn bearers(&self, path: &str) -> Vec<Option<String>> {
        let path = normalize_path(path);
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.normalized_path() == path)
            .map(|r| r.bearer_token().map(str::to_string))
            .collect()
    }
}

#[async_trait::async_trait]
impl HttpBackend for FakeBackend {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.log.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delays.get(request.normalized_path()) {
            tokio::time::sleep(*delay).await;
        }
        (self.handler)(&request)
    }
}

/// `200 OK` with a JSON body.
pub fn ok_json(value: serde_json::Value) -> Result<ApiResponse> {
    Ok(ApiResponse::new(StatusCode::OK, value.to_string()))
}

/// Response with the given status and a plain-text body.
pub fn status(code: u16, body: &str) -> Result<ApiResponse> {
    let status = StatusCode::from_u16(code).unwrap();
    Ok(ApiResponse::new(status, body.to_string()))
}

/// A transport-level failure (no response at all).
pub fn unreachable() -> Result<ApiResponse> {
    Err(LovenoteError::Transport("connection refused".into()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_backend_records_requests() {
        let backend = FakeBackend::new(|_| status(204, ""));
        backend
            .execute(ApiRequest::get("/users/me").with_bearer("t").unwrap())
            .await
            .unwrap();
        assert_eq!(backend.count("users/me"), 1);
        assert_eq!(backend.bearers("users/me"), vec![Some("t".to_string())]);
    }
}
