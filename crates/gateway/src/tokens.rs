use std::time::{Duration, Instant};

use tokio::sync::RwLock;

/// Access tokens stay valid for ten minutes; past that the stored access
/// token is not worth attaching and the client goes straight to a refresh.
pub const TOKEN_VALIDITY: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

struct StoredPair {
    pair: TokenPair,
    expires_at: Instant,
}

/// Shared token state for a gateway client. All sessions of the host
/// process observe the same pair, so a refresh performed for one request
/// benefits the rest.
#[derive(Default)]
pub struct TokenStore {
    inner: RwLock<Option<StoredPair>>,
}

impl TokenStore {
    pub async fn set_pair(&self, pair: TokenPair) {
        self.set_pair_with_validity(pair, TOKEN_VALIDITY).await;
    }

    pub async fn set_pair_with_validity(&self, pair: TokenPair, validity: Duration) {
        let mut guard = self.inner.write().await;
        *guard = Some(StoredPair {
            pair,
            expires_at: Instant::now() + validity,
        });
    }

    /// The access token to attach, or `None` when there is no pair or the
    /// stored one has expired.
    pub async fn access_token(&self) -> Option<String> {
        let guard = self.inner.read().await;
        guard
            .as_ref()
            .filter(|stored| stored.expires_at > Instant::now())
            .map(|stored| stored.pair.access_token.clone())
    }

    /// The full pair regardless of expiry; refresh needs the refresh token
    /// even after the access token has lapsed.
    pub async fn pair(&self) -> Option<TokenPair> {
        let guard = self.inner.read().await;
        guard.as_ref().map(|stored| stored.pair.clone())
    }

    pub async fn clear(&self) {
        let mut guard = self.inner.write().await;
        *guard = None;
    }
}
