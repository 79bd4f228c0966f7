//! Clerk JWKS fetching and caching
//!
//! Keys are fetched lazily on first use and kept until a token names a `kid`
//! the cached set does not contain. Such a miss refreshes the set at most
//! once per [`DEFAULT_MIN_REFRESH_INTERVAL`]; later misses inside the window
//! are answered from the cache.

use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{Jwk, JwkSet};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use super::jwt::JwtError;

/// Minimum time between two fetches triggered by unknown key IDs
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
enum JwksSource {
    Remote { url: String, client: reqwest::Client },
    Static,
}

/// Cached JSON Web Key Set
#[derive(Debug, Clone)]
pub struct JwksCache {
    source: JwksSource,
    keys: Arc<RwLock<Option<JwkSet>>>,

    /// Start of the last fetch attempt; held across the fetch so concurrent
    /// misses wait for one request
    last_fetch: Arc<Mutex<Option<Instant>>>,
    min_refresh_interval: Duration,
}

impl JwksCache {
    /// Cache backed by a JWKS endpoint
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::Jwks`] if the HTTP client cannot be built.
    pub fn remote(url: impl Into<String>) -> Result<Self, JwtError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| JwtError::Jwks(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::with_source(
            JwksSource::Remote {
                url: url.into(),
                client,
            },
            None,
        ))
    }

    /// Fixed key set that is never refreshed
    pub fn from_set(keys: JwkSet) -> Self {
        Self::with_source(JwksSource::Static, Some(keys))
    }

    fn with_source(source: JwksSource, keys: Option<JwkSet>) -> Self {
        Self {
            source,
            keys: Arc::new(RwLock::new(keys)),
            last_fetch: Arc::new(Mutex::new(None)),
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
        }
    }

    /// Overrides the minimum interval between miss-triggered fetches
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// Finds the key with the given `kid`, refreshing on a miss unless the
    /// set was fetched within the minimum interval
    pub async fn key(&self, kid: &str) -> Result<Jwk, JwtError> {
        if let Some(key) = self.cached(kid).await {
            return Ok(key);
        }

        let mut last_fetch = self.last_fetch.lock().await;

        // Another request may have refreshed while this one waited
        if let Some(key) = self.cached(kid).await {
            return Ok(key);
        }

        let previous = *last_fetch;
        match previous {
            Some(at) if at.elapsed() < self.min_refresh_interval => {
                debug!(kid, "Signing key not cached, JWKS fetched recently");
            }
            _ => {
                debug!(kid, "Signing key not cached, refreshing JWKS");
                // Failed attempts count too
                *last_fetch = Some(Instant::now());
                self.fetch().await?;
            }
        }
        drop(last_fetch);

        self.cached(kid)
            .await
            .ok_or_else(|| JwtError::UnknownKey(kid.to_string()))
    }

    /// Re-fetches the key set from the endpoint, ignoring the interval
    pub async fn refresh(&self) -> Result<(), JwtError> {
        let mut last_fetch = self.last_fetch.lock().await;
        *last_fetch = Some(Instant::now());
        self.fetch().await
    }

    async fn cached(&self, kid: &str) -> Option<Jwk> {
        self.keys
            .read()
            .await
            .as_ref()
            .and_then(|set| set.find(kid))
            .cloned()
    }

    async fn fetch(&self) -> Result<(), JwtError> {
        let JwksSource::Remote { url, client } = &self.source else {
            return Ok(());
        };

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| JwtError::Jwks(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(JwtError::Jwks(format!("HTTP {}", response.status())));
        }

        let keys: JwkSet = response
            .json()
            .await
            .map_err(|e| JwtError::Jwks(format!("Invalid JSON: {}", e)))?;

        info!(url = %url, keys = keys.keys.len(), "Fetched Clerk JWKS");
        *self.keys.write().await = Some(keys);

        Ok(())
    }
}
