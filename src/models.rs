//! Wire and domain types for the lovenote user endpoints
//!
//! The server speaks snake_case JSON and uses empty strings for absent
//! optional fields. [`UserRecord`] is the wire shape; [`UserIdentity`] is the
//! immutable value the session holds.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// UserIdentity
// ---------------------------------------------------------------------------

/// The authenticated user as seen by the client.
///
/// Replaced wholesale on login, refresh, and logout; never mutated in place.
///
/// # Examples
///
/// ```
/// use lovenote::models::{UserIdentity, UserRecord};
///
/// let record: UserRecord = serde_json::from_str(
///     r#"{"id":7,"username":"ada","email":"","profile_picture":"p.png"}"#,
/// ).unwrap();
/// let user = UserIdentity::from(record);
/// assert_eq!(user.username, "ada");
/// assert_eq!(user.email, None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Server-assigned user id.
    pub id: u64,
    /// Unique username.
    pub username: String,
    /// Email address, when the endpoint exposes it.
    pub email: Option<String>,
    /// Profile picture URL or object key. May be empty.
    pub profile_picture: String,
    /// Free-form biography.
    pub bio: Option<String>,
    /// Account creation timestamp as reported by the server.
    pub created_at: Option<String>,
}

/// User record as returned by `GET users/me`, login, and register.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserRecord {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<UserRecord> for UserIdentity {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            username: record.username,
            email: non_empty(record.email),
            profile_picture: record.profile_picture.unwrap_or_default(),
            bio: non_empty(record.bio),
            created_at: non_empty(record.created_at),
        }
    }
}

// ---------------------------------------------------------------------------
// Token and auth payloads
// ---------------------------------------------------------------------------

/// Body of a successful `POST users/refresh`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access: String,
}

/// Body of a successful login or registration: the user record plus a fresh
/// access token.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub user: UserRecord,
    pub access: String,
}

/// Login form payload.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Registration form payload.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}
