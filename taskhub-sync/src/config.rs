/// Sync tool configuration
///
/// # Environment Variables
///
/// - `CLERK_SECRET_KEY`: Clerk backend API key (required)
/// - `CLERK_API_URL`: Clerk backend API base (default: https://api.clerk.com/v1)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 2)

use std::{env, fmt};

use anyhow::Context;
use taskhub_shared::db::pool::DatabaseConfig;

pub const DEFAULT_CLERK_API_URL: &str = "https://api.clerk.com/v1";

#[derive(Clone)]
pub struct SyncConfig {
    /// Clerk backend API key
    pub clerk_secret_key: String,

    /// Clerk backend API base URL, without trailing slash
    pub clerk_api_url: String,

    pub database: DatabaseConfig,
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("clerk_secret_key", &"<redacted>")
            .field("clerk_api_url", &self.clerk_api_url)
            .field("database", &self.database)
            .finish()
    }
}

impl SyncConfig {
    /// Loads configuration from the environment, reading `.env` first
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let clerk_secret_key = var("CLERK_SECRET_KEY").ok_or_else(|| {
            anyhow::anyhow!("CLERK_SECRET_KEY environment variable is not set")
        })?;

        let clerk_api_url = var("CLERK_API_URL")
            .unwrap_or_else(|| DEFAULT_CLERK_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let url = var("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "2".to_string())
            .parse::<u32>()
            .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?;

        Ok(Self {
            clerk_secret_key,
            clerk_api_url,
            database: DatabaseConfig {
                url,
                max_connections,
                min_connections: 1,
                ..Default::default()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<SyncConfig> {
        let vars: HashMap<&str, &str> = vars.iter().copied().collect();
        SyncConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn test_defaults() {
        let config = load(&[
            ("CLERK_SECRET_KEY", "sk_test_123"),
            ("DATABASE_URL", "postgresql://localhost/test"),
        ])
        .unwrap();

        assert_eq!(config.clerk_api_url, DEFAULT_CLERK_API_URL);
        assert_eq!(config.database.max_connections, 2);
    }

    #[test]
    fn test_secret_key_required() {
        let err = load(&[("DATABASE_URL", "postgresql://localhost/test")]).unwrap_err();
        assert!(err.to_string().contains("CLERK_SECRET_KEY"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = load(&[
            ("CLERK_SECRET_KEY", "sk_test_123"),
            ("CLERK_API_URL", "http://localhost:9999/v1/"),
            ("DATABASE_URL", "postgresql://localhost/test"),
        ])
        .unwrap();

        assert_eq!(config.clerk_api_url, "http://localhost:9999/v1");
        assert!(!format!("{:?}", config).contains("sk_test_123"));
    }
}
