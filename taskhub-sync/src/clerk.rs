/// Clerk backend API client
///
/// Only the paginated user listing is needed:
///
/// ```text
/// GET {base}/users?limit=100&offset=N
/// Authorization: Bearer {CLERK_SECRET_KEY}
/// ```
///
/// Pages are requested until one comes back empty or short.

use std::time::Duration;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Largest page Clerk serves
pub const PAGE_SIZE: usize = 100;

/// A raw Clerk user object
pub type ClerkUser = Map<String, Value>;

/// Clerk API error
#[derive(Debug, Error)]
pub enum ClerkApiError {
    /// Non-2xx response
    #[error("Clerk API error: {status} - {body}")]
    Status { status: u16, body: String },

    /// Transport or decoding failure
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
}

/// Client for the Clerk backend API
#[derive(Clone)]
pub struct ClerkClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl ClerkClient {
    pub fn new(base_url: impl Into<String>, secret_key: impl Into<String>) -> Result<Self, ClerkApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        })
    }

    /// Fetches one page of users
    pub async fn list_users(&self, limit: usize, offset: usize) -> Result<Vec<ClerkUser>, ClerkApiError> {
        let response = self
            .http
            .get(format!("{}/users", self.base_url))
            .bearer_auth(&self.secret_key)
            .query(&[("limit", limit), ("offset", offset)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClerkApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<Vec<ClerkUser>>().await?)
    }

    /// Fetches every user, page by page
    pub async fn fetch_all_users(&self) -> Result<Vec<ClerkUser>, ClerkApiError> {
        let mut users = Vec::new();
        let mut offset = 0;

        loop {
            let page = self.list_users(PAGE_SIZE, offset).await?;
            let fetched = page.len();
            debug!(offset, fetched, "Fetched Clerk users page");

            users.extend(page);

            if fetched < PAGE_SIZE {
                break;
            }
            offset += PAGE_SIZE;
        }

        Ok(users)
    }
}
