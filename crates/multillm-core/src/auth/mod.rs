//! Credentials: token storage, header strategies and backend contracts

pub mod strategy;
pub mod token_store;

use async_trait::async_trait;

pub use strategy::{ApiKeyAuth, AuthStrategy, BearerAuth, CustomHeadersAuth, NoAuth};
pub use token_store::{AuthToken, Clock, InMemoryTokenStore, SystemClock, TokenStore};

use crate::error::LlmError;

/// Obtains credentials for a provider and parks them in a [`TokenStore`]
///
/// Implementations run whatever flow their backend needs (device code,
/// OAuth, reading a cached login) and leave a usable token under
/// [`AuthBackend::token_key`], or fail.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Stable backend identifier
    fn id(&self) -> &str;

    /// Key under which the backend stores its token
    fn token_key(&self) -> &str;

    async fn authenticate(&self, store: &dyn TokenStore) -> Result<(), LlmError>;
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use secrecy::ExposeSecret;

    use super::*;

    /// Backend that only logs in when nothing usable is cached
    struct CachedLogin {
        logins: AtomicU32,
    }

    #[async_trait]
    impl AuthBackend for CachedLogin {
        fn id(&self) -> &str {
            "cached"
        }

        fn token_key(&self) -> &str {
            "cached:token"
        }

        async fn authenticate(&self, store: &dyn TokenStore) -> Result<(), LlmError> {
            if store.get(self.token_key()).await?.is_some() {
                return Ok(());
            }
            self.logins.fetch_add(1, Ordering::SeqCst);
            store.set(self.token_key(), AuthToken::new("fresh")).await
        }
    }

    #[tokio::test]
    async fn backend_reuses_stored_token() {
        let store = InMemoryTokenStore::new();
        let backend = CachedLogin {
            logins: AtomicU32::new(0),
        };

        backend.authenticate(&store).await.unwrap();
        backend.authenticate(&store).await.unwrap();

        assert_eq!(backend.logins.load(Ordering::SeqCst), 1);
        let token = store.get("cached:token").await.unwrap().unwrap();
        assert_eq!(token.access_token.expose_secret(), "fresh");
    }
}
