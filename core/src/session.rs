//! Per-client session holding the bearer token.
//!
//! Each `ApiClient` owns exactly one `Session`; there is no process-wide
//! state. The lock only makes concurrent access memory-safe. It does not
//! order operations: when two `authenticate` calls race, the last one to
//! finish wins, and protected calls running in between may observe either
//! token.

use std::sync::{PoisonError, RwLock};

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
}

#[derive(Debug, Default)]
pub struct Session {
    token: RwLock<Option<String>>,
}

impl Session {
    pub fn new(initial: Option<String>) -> Self {
        Self {
            token: RwLock::new(initial.filter(|t| !t.is_empty())),
        }
    }

    pub fn state(&self) -> SessionState {
        if self.token().is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Unauthenticated
        }
    }

    /// Current token, if any.
    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Guard for protected operations.
    pub fn require_token(&self) -> Result<String, ApiError> {
        self.token().ok_or(ApiError::AuthRequired)
    }

    /// Replace the token. There is no transition back to unauthenticated.
    pub(crate) fn store(&self, token: String) {
        if token.is_empty() {
            return;
        }
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }
}
