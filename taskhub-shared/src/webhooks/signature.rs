//! Svix webhook signature verification
//!
//! Clerk delivers webhooks through Svix. Every delivery carries three
//! headers, and the signature is an HMAC-SHA256 over
//! `"{svix-id}.{svix-timestamp}.{body}"` keyed with the base64 part of the
//! `whsec_...` secret:
//!
//! ```text
//! svix-id:        msg_2a...
//! svix-timestamp: 1700000000
//! svix-signature: v1,K5oZfzN95Z9UVu1EsfQmfVNQhnkZ2pj9o9NDN/H/pI4= v1,...
//! ```
//!
//! The signature header may list several space-separated candidates (key
//! rotation). A delivery is accepted if any candidate matches.
//!
//! # Example
//!
//! ```
//! use axum::http::HeaderMap;
//! use taskhub_shared::webhooks::signature::{WebhookSecret, WebhookVerifier};
//!
//! # fn example() -> Result<(), taskhub_shared::webhooks::WebhookError> {
//! let secret = WebhookSecret::parse("whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw")?;
//! let body = br#"{"type":"user.created","data":{}}"#;
//! let signature = secret.sign("msg_1", "1700000000", body);
//!
//! let mut headers = HeaderMap::new();
//! headers.insert("svix-id", "msg_1".parse().unwrap());
//! headers.insert("svix-timestamp", "1700000000".parse().unwrap());
//! headers.insert("svix-signature", signature.parse().unwrap());
//!
//! let verifier = WebhookVerifier::new(secret);
//! verifier.verify(&headers, body)?;
//! # Ok(())
//! # }
//! ```

use std::fmt;

use axum::http::HeaderMap;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, warn};

use super::WebhookError;

pub const SVIX_ID: &str = "svix-id";
pub const SVIX_TIMESTAMP: &str = "svix-timestamp";
pub const SVIX_SIGNATURE: &str = "svix-signature";

const SECRET_PREFIX: &str = "whsec_";
const SIGNATURE_VERSION: &str = "v1";

type HmacSha256 = Hmac<Sha256>;

/// Decoded signing secret, keyed once at load time
#[derive(Clone)]
pub struct WebhookSecret {
    mac: HmacSha256,
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookSecret(..)")
    }
}

impl WebhookSecret {
    /// Parses a `whsec_`-prefixed (or bare) base64 secret
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::InvalidSecret`] if the remainder is not valid
    /// base64.
    pub fn parse(secret: &str) -> Result<Self, WebhookError> {
        let encoded = secret.trim();
        let encoded = encoded.strip_prefix(SECRET_PREFIX).unwrap_or(encoded);

        let key = STANDARD
            .decode(encoded)
            .map_err(|e| WebhookError::InvalidSecret(e.to_string()))?;

        Self::from_bytes(&key)
    }

    /// Keys the secret with raw bytes
    pub fn from_bytes(key: &[u8]) -> Result<Self, WebhookError> {
        let mac = HmacSha256::new_from_slice(key)
            .map_err(|e| WebhookError::InvalidSecret(e.to_string()))?;

        Ok(Self { mac })
    }

    /// Computes the `v1,<base64>` signature for a delivery
    pub fn sign(&self, id: &str, timestamp: &str, body: &[u8]) -> String {
        let mut mac = self.mac.clone();
        mac.update(id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);

        let digest = mac.finalize().into_bytes();
        format!("{},{}", SIGNATURE_VERSION, STANDARD.encode(digest))
    }
}

/// The three Svix headers of a delivery
#[derive(Debug, Clone, Copy)]
pub struct SvixHeaders<'a> {
    pub id: &'a str,
    pub timestamp: &'a str,
    pub signature: &'a str,
}

impl<'a> SvixHeaders<'a> {
    /// Extracts the headers, failing if any is absent or empty
    pub fn from_headers(headers: &'a HeaderMap) -> Result<Self, WebhookError> {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .ok_or(WebhookError::MissingHeaders)
        };

        Ok(Self {
            id: get(SVIX_ID)?,
            timestamp: get(SVIX_TIMESTAMP)?,
            signature: get(SVIX_SIGNATURE)?,
        })
    }
}

/// Verifies inbound deliveries against the configured secret
///
/// Without a secret the verifier accepts everything and logs a warning per
/// delivery. That mode exists for local development only.
#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    secret: Option<WebhookSecret>,
    tolerance_secs: Option<u64>,
}

impl WebhookVerifier {
    pub fn new(secret: WebhookSecret) -> Self {
        Self {
            secret: Some(secret),
            tolerance_secs: None,
        }
    }

    /// Verifier that skips signature checks
    pub fn insecure() -> Self {
        Self {
            secret: None,
            tolerance_secs: None,
        }
    }

    /// Builds a verifier from an optional secret
    pub fn from_secret(secret: Option<WebhookSecret>) -> Self {
        match secret {
            Some(secret) => Self::new(secret),
            None => Self::insecure(),
        }
    }

    /// Rejects timestamps further than `secs` from the current time
    pub fn with_tolerance(mut self, secs: Option<u64>) -> Self {
        self.tolerance_secs = secs;
        self
    }

    /// Whether signatures are actually checked
    pub fn is_enforcing(&self) -> bool {
        self.secret.is_some()
    }

    /// Verifies a delivery against the current time
    pub fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), WebhookError> {
        self.verify_at(headers, body, Utc::now().timestamp())
    }

    /// Verifies a delivery as if received at `now` (Unix seconds)
    ///
    /// # Errors
    ///
    /// - [`WebhookError::MissingHeaders`] if a `svix-*` header is absent
    /// - [`WebhookError::StaleTimestamp`] if a tolerance is set and the
    ///   timestamp is unparsable or outside it
    /// - [`WebhookError::InvalidSignature`] if no candidate matches
    pub fn verify_at(&self, headers: &HeaderMap, body: &[u8], now: i64) -> Result<(), WebhookError> {
        let Some(secret) = &self.secret else {
            warn!("Webhook signature verification skipped: no secret configured");
            return Ok(());
        };

        let svix = SvixHeaders::from_headers(headers)?;

        if let Some(tolerance) = self.tolerance_secs {
            let sent_at: i64 = svix
                .timestamp
                .parse()
                .map_err(|_| {
                    debug!(svix_id = svix.id, timestamp = svix.timestamp, "Unparsable webhook timestamp");
                    WebhookError::StaleTimestamp
                })?;

            if now.saturating_sub(sent_at).unsigned_abs() > tolerance {
                debug!(svix_id = svix.id, sent_at, now, "Webhook timestamp outside tolerance");
                return Err(WebhookError::StaleTimestamp);
            }
        }

        let expected = secret.sign(svix.id, svix.timestamp, body);

        // Evaluate every candidate so the match position does not leak
        let matched = svix
            .signature
            .split_whitespace()
            .fold(false, |found, candidate| {
                constant_time_compare(candidate, &expected) | found
            });

        if matched {
            debug!(svix_id = svix.id, "Webhook signature verified");
            Ok(())
        } else {
            debug!(svix_id = svix.id, "Webhook signature mismatch");
            Err(WebhookError::InvalidSignature)
        }
    }
}

/// Constant-time string comparison
///
/// Length is not secret; unequal lengths return early.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";
    const BODY: &[u8] = br#"{"type":"user.created","data":{"id":"user_1"}}"#;

    fn headers(id: &str, timestamp: &str, signature: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(SVIX_ID, id.parse().unwrap());
        headers.insert(SVIX_TIMESTAMP, timestamp.parse().unwrap());
        headers.insert(SVIX_SIGNATURE, signature.parse().unwrap());
        headers
    }

    fn verifier() -> (WebhookSecret, WebhookVerifier) {
        let secret = WebhookSecret::parse(SECRET).unwrap();
        (secret.clone(), WebhookVerifier::new(secret))
    }

    #[test]
    fn test_known_signature_vector() {
        // Reference vector from the Svix documentation
        let secret = WebhookSecret::parse(SECRET).unwrap();
        let body = br#"{"test": 2432232314}"#;

        assert_eq!(
            secret.sign("msg_p5jXN8AQM9LWM0D4loKWxJek", "1614265330", body),
            "v1,g0hM9SsE+OTPJTGt/tmIKtSyZlE3uFJELVlNIOLJ1OE="
        );
    }

    #[test]
    fn test_prefix_is_optional() {
        let prefixed = WebhookSecret::parse(SECRET).unwrap();
        let bare = WebhookSecret::parse(SECRET.trim_start_matches("whsec_")).unwrap();

        assert_eq!(prefixed.sign("a", "1", b"x"), bare.sign("a", "1", b"x"));
    }

    #[test]
    fn test_invalid_base64_secret() {
        let err = WebhookSecret::parse("whsec_not*base64!").unwrap_err();
        assert!(matches!(err, WebhookError::InvalidSecret(_)));
    }

    #[test]
    fn test_valid_signature_accepted() {
        let (secret, verifier) = verifier();
        let sig = secret.sign("msg_1", "1700000000", BODY);

        assert!(verifier.verify(&headers("msg_1", "1700000000", &sig), BODY).is_ok());
    }

    #[test]
    fn test_any_matching_candidate_is_accepted() {
        let (secret, verifier) = verifier();
        let sig = secret.sign("msg_1", "1700000000", BODY);
        let header = format!("v1,Zm9vYmFy {} v2,ignored", sig);

        assert!(verifier.verify(&headers("msg_1", "1700000000", &header), BODY).is_ok());
    }

    #[test]
    fn test_mutated_body_rejected() {
        let (secret, verifier) = verifier();
        let sig = secret.sign("msg_1", "1700000000", BODY);

        let mut body = BODY.to_vec();
        body[10] ^= 0x01;

        let err = verifier
            .verify(&headers("msg_1", "1700000000", &sig), &body)
            .unwrap_err();
        assert!(matches!(err, WebhookError::InvalidSignature));
    }

    #[test]
    fn test_mutated_id_or_timestamp_rejected() {
        let (secret, verifier) = verifier();
        let sig = secret.sign("msg_1", "1700000000", BODY);

        let err = verifier
            .verify(&headers("msg_2", "1700000000", &sig), BODY)
            .unwrap_err();
        assert!(matches!(err, WebhookError::InvalidSignature));

        let err = verifier
            .verify(&headers("msg_1", "1700000001", &sig), BODY)
            .unwrap_err();
        assert!(matches!(err, WebhookError::InvalidSignature));
    }

    #[test]
    fn test_missing_headers() {
        let (secret, verifier) = verifier();
        let sig = secret.sign("msg_1", "1700000000", BODY);

        for missing in [SVIX_ID, SVIX_TIMESTAMP, SVIX_SIGNATURE] {
            let mut h = headers("msg_1", "1700000000", &sig);
            h.remove(missing);

            let err = verifier.verify(&h, BODY).unwrap_err();
            assert!(matches!(err, WebhookError::MissingHeaders), "{} removed", missing);
        }

        let err = verifier
            .verify(&headers("msg_1", "", &sig), BODY)
            .unwrap_err();
        assert!(matches!(err, WebhookError::MissingHeaders));
    }

    #[test]
    fn test_tolerance() {
        let (secret, _) = verifier();
        let verifier = WebhookVerifier::new(secret.clone()).with_tolerance(Some(300));
        let sig = secret.sign("msg_1", "1700000000", BODY);
        let h = headers("msg_1", "1700000000", &sig);

        assert!(verifier.verify_at(&h, BODY, 1_700_000_100).is_ok());
        assert!(matches!(
            verifier.verify_at(&h, BODY, 1_700_000_301).unwrap_err(),
            WebhookError::StaleTimestamp
        ));

        let sig = secret.sign("msg_1", "soon", BODY);
        assert!(matches!(
            verifier
                .verify_at(&headers("msg_1", "soon", &sig), BODY, 1_700_000_000)
                .unwrap_err(),
            WebhookError::StaleTimestamp
        ));
    }

    #[test]
    fn test_old_timestamp_accepted_without_tolerance() {
        let (secret, verifier) = verifier();
        let sig = secret.sign("msg_1", "1", BODY);

        assert!(verifier.verify_at(&headers("msg_1", "1", &sig), BODY, 1_700_000_000).is_ok());
    }

    #[test]
    fn test_insecure_verifier_accepts_anything() {
        let verifier = WebhookVerifier::insecure();

        assert!(!verifier.is_enforcing());
        assert!(verifier.verify(&HeaderMap::new(), BODY).is_ok());
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("v1,abc", "v1,abc"));
        assert!(!constant_time_compare("v1,abc", "v1,abd"));
        assert!(!constant_time_compare("v1,abc", "v1,ab"));
        assert!(constant_time_compare("", ""));
    }
}
