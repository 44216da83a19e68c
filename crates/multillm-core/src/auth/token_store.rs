use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use dashmap::DashMap;
use secrecy::SecretString;

use crate::error::LlmError;

/// Credential with optional expiry
#[derive(Debug, Clone)]
pub struct AuthToken {
    /// Token presented to the backend
    pub access_token: SecretString,
    /// Instant after which the token is no longer usable
    pub expires_at: Option<SystemTime>,
    /// Token used to obtain a fresh access token
    pub refresh_token: Option<SecretString>,
}

impl AuthToken {
    /// Token without expiry or refresh token
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            expires_at: None,
            refresh_token: None,
        }
    }

    #[must_use]
    pub const fn expires_at(mut self, at: SystemTime) -> Self {
        self.expires_at = Some(at);
        self
    }

    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(SecretString::from(refresh_token.into()));
        self
    }

    /// Expired once `now` has reached the expiry instant
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Keyed credential storage shared by auth backends
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Fetch a live token; an expired entry is removed and reported absent
    async fn get(&self, key: &str) -> Result<Option<AuthToken>, LlmError>;

    /// Store or replace the token under `key`
    async fn set(&self, key: &str, token: AuthToken) -> Result<(), LlmError>;
}

/// Wall-clock source, swappable in tests
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Clock backed by [`SystemTime::now`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Process-local token store
pub struct InMemoryTokenStore {
    tokens: DashMap<String, AuthToken>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tokens: DashMap::new(),
            clock,
        }
    }

    /// Store pre-seeded with `tokens`
    pub fn with_tokens(tokens: impl IntoIterator<Item = (String, AuthToken)>, clock: Arc<dyn Clock>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
            clock,
        }
    }

    /// Synchronously place a token, bypassing any backend
    pub fn inject(&self, key: impl Into<String>, token: AuthToken) {
        self.tokens.insert(key.into(), token);
    }

    fn live(&self, key: &str) -> Option<AuthToken> {
        let now = self.clock.now();

        if self
            .tokens
            .remove_if(key, |_, token| token.is_expired_at(now))
            .is_some()
        {
            tracing::debug!(key, "dropped expired token");
            return None;
        }

        self.tokens.get(key).map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn get(&self, key: &str) -> Result<Option<AuthToken>, LlmError> {
        Ok(self.live(key))
    }

    async fn set(&self, key: &str, token: AuthToken) -> Result<(), LlmError> {
        self.tokens.insert(key.to_owned(), token);
        Ok(())
    }
}
