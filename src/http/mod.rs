//! HTTP boundary to the lovenote server
//!
//! This module defines the request/response value types that flow through the
//! session pipeline and the [`HttpBackend`] trait that performs the actual
//! round-trip. Concrete implementations live in submodules:
//!
//! - [`reqwest_backend::ReqwestBackend`] -- `reqwest` client with a cookie jar
//!   holding the durable refresh credential.
//! - [`fake::FakeBackend`] -- scripted in-process backend used in tests
//!   (cfg(test) only).
//!
//! # Design
//!
//! A backend only moves bytes: it returns every HTTP status as an
//! [`ApiResponse`] and reserves `Err` for requests that never produced a
//! response. Status interpretation belongs to the session layer.

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{LovenoteError, Result};

pub mod augmenter;
pub mod cookie_jar;
pub mod reqwest_backend;

#[cfg(test)]
pub mod fake;

/// Strips leading slashes so `"/users/me"` and `"users/me"` name the same
/// endpoint relative to the API base URL.
///
/// # Examples
///
/// ```
/// use lovenote::http::normalize_path;
///
/// assert_eq!(normalize_path("/users/refresh"), "users/refresh");
/// assert_eq!(normalize_path("users/refresh"), "users/refresh");
/// ```
pub fn normalize_path(path: &str) -> &str {
    path.trim_start_matches('/')
}

// ---------------------------------------------------------------------------
// ApiRequest
// ---------------------------------------------------------------------------

/// An outgoing API call, relative to the configured base URL.
///
/// Requests are cheap to clone (the body is [`Bytes`]) so the pipeline can
/// keep the original around for a single replay.
///
/// # Examples
///
/// ```
/// use lovenote::http::ApiRequest;
///
/// let request = ApiRequest::post("users/login")
///     .json(&serde_json::json!({"username": "ada", "password": "pw"}))
///     .unwrap();
/// assert_eq!(request.path, "users/login");
/// assert!(request.bearer_token().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the API base URL.
    pub path: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// Optional request body.
    pub body: Option<Bytes>,
}

impl ApiRequest {
    /// Creates a request with no headers and no body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Serializes `body` as JSON and sets `Content-Type: application/json`.
    ///
    /// # Errors
    ///
    /// Returns [`LovenoteError::Serialization`] if `body` cannot be
    /// serialized.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(body).map_err(LovenoteError::Serialization)?;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(Bytes::from(bytes));
        Ok(self)
    }

    /// The request path without leading slashes.
    pub fn normalized_path(&self) -> &str {
        normalize_path(&self.path)
    }

    /// Returns the bearer token currently attached, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }

    /// Attaches `Authorization: Bearer <token>`, replacing any existing value.
    ///
    /// # Errors
    ///
    /// Returns [`LovenoteError::InvalidRequest`] if the token contains bytes
    /// that are not valid in an HTTP header.
    pub fn set_bearer(&mut self, token: &str) -> Result<()> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
            LovenoteError::InvalidRequest("access token is not a valid header value".into())
        })?;
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
        Ok(())
    }

    /// Builder-style variant of [`set_bearer`](Self::set_bearer).
    pub fn with_bearer(mut self, token: &str) -> Result<Self> {
        self.set_bearer(token)?;
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// ApiResponse
// ---------------------------------------------------------------------------

/// A complete HTTP response with its body buffered.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// `true` for `401 Unauthorized`, the only status the refresh logic acts on.
    pub fn is_auth_failure(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }

    /// Body decoded as UTF-8, lossy, trimmed.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).trim().to_string()
    }

    /// Deserializes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`LovenoteError::Serialization`] if the body is not valid JSON
    /// for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| LovenoteError::Serialization(e).into())
    }

    /// Converts a non-success response into a typed error.
    ///
    /// `401` becomes [`LovenoteError::Authentication`]; any other failure
    /// becomes [`LovenoteError::Status`].
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        let message = self.text();
        if self.is_auth_failure() {
            return Err(LovenoteError::Authentication(if message.is_empty() {
                "unauthorized".to_string()
            } else {
                message
            })
            .into());
        }
        Err(LovenoteError::Status {
            status: self.status.as_u16(),
            message,
        }
        .into())
    }
}

// ---------------------------------------------------------------------------
// HttpBackend
// ---------------------------------------------------------------------------

/// Performs one HTTP round-trip.
///
/// Implementations must not interpret status codes: every response the server
/// produced, including `401`, is returned as `Ok`.
///
/// # Errors
///
/// Implementations return [`LovenoteError::Transport`] when no response was
/// received.
#[async_trait::async_trait]
pub trait HttpBackend: Send + Sync + std::fmt::Debug {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse>;
}
