//! Session source: where the bearer token and user id come from.
//!
//! The session store itself lives outside this crate. It is injected as a
//! [`SessionSource`] and read again on every connect, reconnect and history
//! fetch, so a rotated credential is picked up without a restart.

use std::fmt;
use std::sync::{PoisonError, RwLock};

use notifeed_core::FeedError;

/// Environment variable read by [`EnvSession`] for the bearer token.
pub const TOKEN_ENV: &str = "NOTIFEED_TOKEN";

/// Environment variable read by [`EnvSession`] for the user id.
pub const USER_ID_ENV: &str = "NOTIFEED_USER_ID";

/// A resolved, non-empty credential pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub user_id: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .finish()
    }
}

pub trait SessionSource: Send + Sync {
    fn token(&self) -> Option<String>;

    fn user_id(&self) -> Option<String>;

    /// Both values, or [`FeedError::Auth`] naming what is missing.
    fn credentials(&self) -> Result<Credentials, FeedError> {
        let token = self
            .token()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| FeedError::Auth("missing bearer token".into()))?;
        let user_id = self
            .user_id()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| FeedError::Auth("missing user id".into()))?;
        Ok(Credentials { token, user_id })
    }
}

/// In-memory session, updatable at runtime (sign-in, token refresh,
/// sign-out).
#[derive(Default)]
pub struct StaticSession {
    inner: RwLock<SessionSlots>,
}

#[derive(Default)]
struct SessionSlots {
    token: Option<String>,
    user_id: Option<String>,
}

impl StaticSession {
    pub fn new(token: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            inner: RwLock::new(SessionSlots {
                token: Some(token.into()),
                user_id: Some(user_id.into()),
            }),
        }
    }

    /// A session with nothing signed in.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn set_token(&self, token: Option<String>) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .token = token;
    }

    pub fn set_user_id(&self, user_id: Option<String>) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .user_id = user_id;
    }

    pub fn clear(&self) {
        let mut slots = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        slots.token = None;
        slots.user_id = None;
    }
}

impl SessionSource for StaticSession {
    fn token(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .token
            .clone()
    }

    fn user_id(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .user_id
            .clone()
    }
}

/// Reads [`TOKEN_ENV`] and [`USER_ID_ENV`] on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSession;

impl SessionSource for EnvSession {
    fn token(&self) -> Option<String> {
        std::env::var(TOKEN_ENV).ok()
    }

    fn user_id(&self) -> Option<String> {
        std::env::var(USER_ID_ENV).ok()
    }
}
