//! Bearer credential injection
//!
//! [`RequestAugmenter`] reads the access token from the session store at the
//! moment a request is sent. It holds the store handle, never a token, so a
//! renewal that lands between two requests is picked up by the second.

use crate::error::Result;
use crate::http::ApiRequest;
use crate::session::store::SessionStore;

/// Attaches the current access token to outgoing requests.
#[derive(Debug, Clone)]
pub struct RequestAugmenter {
    store: SessionStore,
}

impl RequestAugmenter {
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }

    /// Sets `Authorization: Bearer <token>` when the store holds a token.
    ///
    /// Any `Authorization` header already on the request is replaced. With
    /// no token the request is left as it is.
    ///
    /// # Returns
    ///
    /// The token that was attached, so the caller can later tell which
    /// credential the request went out with.
    ///
    /// # Errors
    ///
    /// Returns `LovenoteError::InvalidRequest` if the token is not a valid
    /// header value.
    pub fn augment(&self, request: &mut ApiRequest) -> Result<Option<String>> {
        let Some(token) = self.store.access_token() else {
            return Ok(None);
        };
        request.set_bearer(&token)?;
        Ok(Some(token))
    }
}
