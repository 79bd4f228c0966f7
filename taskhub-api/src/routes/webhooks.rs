/// Clerk webhook receiver
///
/// # Endpoint
///
/// ```text
/// POST /webhooks/clerk
/// svix-id: msg_...
/// svix-timestamp: 1700000000
/// svix-signature: v1,<base64>
/// ```
///
/// # Response
///
/// ```json
/// { "status": "created" }
/// ```
///
/// `status` is one of `created`, `already_exists`, `updated`, `deactivated`
/// or `ignored`. Rejected deliveries get a 400 whose `error` is the webhook
/// error code; store failures get a 500 so Svix retries.

use crate::{app::AppState, error::ApiResult};
use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};

/// Webhook acknowledgement
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub status: String,
}

/// Handles one Clerk delivery
///
/// The body is taken as raw bytes: the signature covers the exact payload.
pub async fn clerk_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookResponse>> {
    let outcome = state.webhooks.process(&headers, &body).await.map_err(|e| {
        tracing::warn!(error = %e, code = e.code(), "Clerk webhook rejected");
        e
    })?;

    tracing::info!(status = outcome.status(), "Clerk webhook processed");

    Ok(Json(WebhookResponse {
        status: outcome.status().to_string(),
    }))
}
