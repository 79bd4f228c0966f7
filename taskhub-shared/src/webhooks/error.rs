//! Webhook error types

use crate::store::StoreError;

/// Error type for webhook verification and event handling
///
/// Everything except [`WebhookError::Persistence`] is the caller's fault and
/// maps to a 400 at the HTTP boundary.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// One of the `svix-*` headers is absent or empty
    #[error("Missing webhook signature headers")]
    MissingHeaders,

    /// No signature candidate matched
    #[error("Invalid webhook signature")]
    InvalidSignature,

    /// Timestamp outside the configured tolerance window
    #[error("Webhook timestamp outside tolerance")]
    StaleTimestamp,

    /// Body is not a `{type, data}` envelope
    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),

    #[error("Missing user id in event data")]
    MissingIdentifier,

    #[error("Missing email address in event data")]
    MissingEmail,

    /// No local user carries the Clerk ID
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Store failure; the session has already been rolled back
    #[error("Failed to {action} user: {source}")]
    Persistence {
        action: &'static str,
        #[source]
        source: StoreError,
    },

    /// Configured signing secret could not be decoded
    #[error("Invalid webhook secret: {0}")]
    InvalidSecret(String),
}

impl WebhookError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            WebhookError::MissingHeaders => "missing_headers",
            WebhookError::InvalidSignature => "invalid_signature",
            WebhookError::StaleTimestamp => "stale_timestamp",
            WebhookError::InvalidPayload(_) => "invalid_payload",
            WebhookError::MissingIdentifier => "missing_identifier",
            WebhookError::MissingEmail => "missing_email",
            WebhookError::UserNotFound(_) => "user_not_found",
            WebhookError::Persistence { .. } => "persistence_error",
            WebhookError::InvalidSecret(_) => "invalid_secret",
        }
    }

    /// Whether the request itself was at fault
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            WebhookError::Persistence { .. } | WebhookError::InvalidSecret(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_is_server_error() {
        let err = WebhookError::Persistence {
            action: "create",
            source: StoreError::Unavailable("down".to_string()),
        };

        assert!(!err.is_client_error());
        assert_eq!(err.code(), "persistence_error");
        assert_eq!(err.to_string(), "Failed to create user: Store unavailable: down");
    }

    #[test]
    fn test_validation_errors_are_client_errors() {
        assert!(WebhookError::MissingHeaders.is_client_error());
        assert!(WebhookError::MissingEmail.is_client_error());
        assert!(WebhookError::UserNotFound("user_1".to_string()).is_client_error());
    }
}
