//! Clerk webhook processing
//!
//! Turns a raw delivery (headers + body) into a change of local user state:
//!
//! ```text
//! headers, body ─► signature ─► event ─► handlers::dispatch ─► UserSession
//!                  (Svix HMAC)  (envelope)  (create/update/deactivate)
//! ```
//!
//! # Modules
//!
//! - [`signature`]: Svix HMAC-SHA256 verification
//! - [`event`]: `{type, data}` envelope decoding into [`ClerkEvent`]
//! - [`payload`]: field extraction and validation
//! - [`handlers`]: per-event user mutations and the dispatcher
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use axum::http::HeaderMap;
//! use taskhub_shared::store::memory::MemoryUserStore;
//! use taskhub_shared::webhooks::{signature::WebhookVerifier, WebhookProcessor};
//!
//! # async fn example() -> Result<(), taskhub_shared::webhooks::WebhookError> {
//! let store = MemoryUserStore::new();
//! let processor = WebhookProcessor::new(WebhookVerifier::insecure(), Arc::new(store.clone()));
//!
//! let body = br#"{"type":"user.created","data":{"id":"user_1","email_addresses":[{"email_address":"a@b.com"}]}}"#;
//! let outcome = processor.process(&HeaderMap::new(), body).await?;
//!
//! assert_eq!(outcome.status(), "created");
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod event;
pub mod handlers;
pub mod payload;
pub mod signature;

use std::sync::Arc;

use axum::http::HeaderMap;
use tracing::{info, warn};

pub use error::WebhookError;
pub use event::ClerkEvent;
pub use handlers::EventOutcome;

use crate::store::UserStore;
use signature::{WebhookVerifier, SVIX_ID};

/// Verifies and applies inbound Clerk deliveries
#[derive(Clone)]
pub struct WebhookProcessor {
    verifier: WebhookVerifier,
    store: Arc<dyn UserStore>,
}

impl WebhookProcessor {
    pub fn new(verifier: WebhookVerifier, store: Arc<dyn UserStore>) -> Self {
        if !verifier.is_enforcing() {
            warn!("CLERK_WEBHOOK_SECRET not set; webhook signatures will NOT be verified");
        }

        Self { verifier, store }
    }

    pub fn verifier(&self) -> &WebhookVerifier {
        &self.verifier
    }

    /// Verifies, decodes and applies one delivery
    ///
    /// # Errors
    ///
    /// Any [`WebhookError`]. On [`WebhookError::Persistence`] the session has
    /// already been rolled back.
    pub async fn process(&self, headers: &HeaderMap, body: &[u8]) -> Result<EventOutcome, WebhookError> {
        self.verifier.verify(headers, body)?;

        let event = ClerkEvent::from_slice(body)?;
        let svix_id = headers
            .get(SVIX_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");
        info!(svix_id, event_type = event.event_type(), "Processing Clerk webhook");

        handlers::dispatch(self.store.as_ref(), event).await
    }
}
