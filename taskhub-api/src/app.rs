/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use taskhub_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config)?;
/// let app = taskhub_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskhub_shared::auth::{
    jwks::JwksCache,
    jwt::TokenVerifier,
    middleware::{authenticate, AuthError},
};
use taskhub_shared::store::postgres::PgUserStore;
use taskhub_shared::webhooks::{signature::WebhookVerifier, WebhookProcessor};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Clerk webhook verification and user lifecycle handling
    pub webhooks: Arc<WebhookProcessor>,

    /// Clerk session token verification
    pub tokens: Arc<TokenVerifier>,
}

impl AppState {
    /// Creates application state backed by PostgreSQL and Clerk's JWKS
    ///
    /// # Errors
    ///
    /// Returns an error if the JWKS HTTP client cannot be built.
    pub fn new(db: PgPool, config: Config) -> anyhow::Result<Self> {
        let store = Arc::new(PgUserStore::new(db.clone()));

        let verifier = WebhookVerifier::from_secret(config.clerk.webhook_secret.clone())
            .with_tolerance(config.clerk.webhook_tolerance_secs);

        let jwks = JwksCache::remote(config.clerk.jwks_url.as_str())?;
        let tokens = TokenVerifier::new(config.clerk.issuer.as_str(), jwks)
            .with_authorized_parties(config.clerk.authorized_parties.clone());

        Ok(Self::with_components(
            db,
            config,
            WebhookProcessor::new(verifier, store),
            tokens,
        ))
    }

    /// Assembles state from prebuilt components
    pub fn with_components(
        db: PgPool,
        config: Config,
        webhooks: WebhookProcessor,
        tokens: TokenVerifier,
    ) -> Self {
        Self {
            db,
            config: Arc::new(config),
            webhooks: Arc::new(webhooks),
            tokens: Arc::new(tokens),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /health              # Health check (public)
/// ├── POST /webhooks/clerk      # Svix-signed Clerk events (public)
/// ├── /users                    # Bearer-authenticated
/// │   ├── GET    /
/// │   ├── POST   /
/// │   ├── GET    /:id
/// │   └── DELETE /:id
/// └── /tasks                    # Bearer-authenticated
///     ├── GET    /
///     ├── POST   /
///     ├── GET    /category
///     ├── GET    /:id
///     ├── PATCH  /:id
///     └── DELETE /:id
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Security headers
/// 4. Authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/webhooks/clerk", post(routes::webhooks::clerk_webhook));

    let user_routes = Router::new()
        .route(
            "/",
            get(routes::users::list_users).post(routes::users::create_user),
        )
        .route(
            "/:id",
            get(routes::users::get_user).delete(routes::users::delete_user),
        );

    let task_routes = Router::new()
        .route(
            "/",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route("/category", get(routes::tasks::list_categories))
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        );

    let protected_routes = Router::new()
        .nest("/users", user_routes)
        .nest("/tasks", task_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            clerk_auth_layer,
        ));

    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Clerk bearer-token middleware
///
/// Verifies the session token and injects `AuthContext` into request
/// extensions.
async fn clerk_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let context = authenticate(&state.tokens, req.headers()).await?;
    tracing::debug!(clerk_id = %context.clerk_id, "Authenticated request");

    req.extensions_mut().insert(context);
    Ok(next.run(req).await)
}
