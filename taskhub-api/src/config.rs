/// Configuration management for the API server
///
/// Loaded once from environment variables at startup and passed explicitly
/// through [`crate::app::AppState`].
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8000)
/// - `CORS_ORIGINS`: Comma-separated origins, `*` for any (default: *)
/// - `APP_ENV`: `production` enables HSTS (default: development)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `CLERK_WEBHOOK_SECRET`: `whsec_`-prefixed Svix secret (optional)
/// - `CLERK_WEBHOOK_TOLERANCE_SECS`: Max webhook timestamp skew (optional)
/// - `CLERK_ISSUER`: Clerk frontend API URL, the token `iss` (required)
/// - `CLERK_JWKS_URL`: JWKS endpoint (default: `{issuer}/.well-known/jwks.json`)
/// - `CLERK_AUTHORIZED_PARTIES`: Comma-separated allowed `azp` values (optional)
///
/// # Example
///
/// ```no_run
/// use taskhub_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::env;

use anyhow::Context;
use taskhub_shared::db::pool;
use taskhub_shared::webhooks::signature::WebhookSecret;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Clerk integration
    pub clerk: ClerkConfig,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins; `["*"]` allows any
    pub cors_origins: Vec<String>,

    /// Production mode (enables HSTS)
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Pool settings for [`pool::create_pool`]
    pub fn pool_config(&self) -> pool::DatabaseConfig {
        pool::DatabaseConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
            ..Default::default()
        }
    }
}

/// Clerk configuration
#[derive(Debug, Clone)]
pub struct ClerkConfig {
    /// Webhook signing secret
    ///
    /// `None` disables signature verification.
    pub webhook_secret: Option<WebhookSecret>,

    /// Maximum accepted distance between `svix-timestamp` and now
    pub webhook_tolerance_secs: Option<u64>,

    /// Expected `iss` of session tokens
    pub issuer: String,

    /// Where signing keys are fetched from
    pub jwks_url: String,

    /// Accepted `azp` values; empty accepts any
    pub authorized_parties: Vec<String>,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// A `.env` file in the working directory is read first, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does
    /// not parse, including a webhook secret that is not valid base64.
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

        let host = var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = var("API_PORT")
            .unwrap_or_else(|| "8000".to_string())
            .parse::<u16>()
            .context("API_PORT must be a port number")?;

        let cors_origins = var("CORS_ORIGINS")
            .map(|v| split_list(&v))
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(|| vec!["*".to_string()]);

        let production = var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let database_url = var("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u32>()
            .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?;

        let webhook_secret = var("CLERK_WEBHOOK_SECRET")
            .map(|s| WebhookSecret::parse(&s))
            .transpose()
            .context("CLERK_WEBHOOK_SECRET is invalid")?;

        let webhook_tolerance_secs = var("CLERK_WEBHOOK_TOLERANCE_SECS")
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("CLERK_WEBHOOK_TOLERANCE_SECS must be a number of seconds")?;

        let issuer = var("CLERK_ISSUER")
            .map(|v| v.trim_end_matches('/').to_string())
            .ok_or_else(|| anyhow::anyhow!("CLERK_ISSUER environment variable is required"))?;

        let jwks_url =
            var("CLERK_JWKS_URL").unwrap_or_else(|| format!("{}/.well-known/jwks.json", issuer));

        let authorized_parties = var("CLERK_AUTHORIZED_PARTIES")
            .map(|v| split_list(&v))
            .unwrap_or_default();

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            clerk: ClerkConfig {
                webhook_secret,
                webhook_tolerance_secs,
                issuer,
                jwks_url,
                authorized_parties,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
