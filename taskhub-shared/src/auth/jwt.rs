/// Clerk session token verification
///
/// Clerk issues short-lived RS256 session tokens signed with a key published
/// in the instance's JWKS. Verification:
///
/// 1. Read `kid` from the token header
/// 2. Look up the key in the [`JwksCache`] (throttled refresh on a miss)
/// 3. Check signature, `exp`, `nbf` and `iss`
/// 4. If authorized parties are configured, `azp` must be one of them
///
/// # Example
///
/// ```no_run
/// use taskhub_shared::auth::jwks::JwksCache;
/// use taskhub_shared::auth::jwt::TokenVerifier;
///
/// # async fn example(token: &str) -> Result<(), Box<dyn std::error::Error>> {
/// let issuer = "https://clerk.example.com";
/// let jwks = JwksCache::remote(format!("{}/.well-known/jwks.json", issuer))?;
///
/// let verifier = TokenVerifier::new(issuer, jwks)
///     .with_authorized_parties(vec!["https://app.example.com".to_string()]);
///
/// let claims = verifier.verify(token).await?;
/// println!("Authenticated {}", claims.sub);
/// # Ok(())
/// # }
/// ```

use jsonwebtoken::{decode, decode_header, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::jwks::JwksCache;

/// Error type for token verification
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Header carries no `kid`
    #[error("Token has no key id")]
    MissingKeyId,

    /// No JWKS key matches the `kid`
    #[error("Unknown signing key: {0}")]
    UnknownKey(String),

    /// JWKS could not be fetched or parsed
    #[error("Failed to load JWKS: {0}")]
    Jwks(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    #[error("Invalid issuer")]
    InvalidIssuer,

    /// `azp` is missing or not allowed
    #[error("Unauthorized party: {0}")]
    UnauthorizedParty(String),

    /// Malformed token, bad signature or any other validation failure
    #[error("Invalid token: {0}")]
    Invalid(String),
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
            _ => JwtError::Invalid(err.to_string()),
        }
    }
}

/// Claims of a Clerk session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClerkClaims {
    /// Clerk user ID
    pub sub: String,

    pub iss: String,

    pub exp: i64,

    #[serde(default)]
    pub iat: Option<i64>,

    #[serde(default)]
    pub nbf: Option<i64>,

    /// Authorized party (origin of the frontend that requested the token)
    #[serde(default)]
    pub azp: Option<String>,

    /// Session ID
    #[serde(default)]
    pub sid: Option<String>,
}

/// Verifies Clerk session tokens against the instance JWKS
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    issuer: String,
    authorized_parties: Vec<String>,
    algorithms: Vec<Algorithm>,
    jwks: JwksCache,
}

impl TokenVerifier {
    pub fn new(issuer: impl Into<String>, jwks: JwksCache) -> Self {
        Self {
            issuer: issuer.into(),
            authorized_parties: Vec::new(),
            algorithms: vec![Algorithm::RS256],
            jwks,
        }
    }

    /// Restricts accepted `azp` values; an empty list disables the check
    pub fn with_authorized_parties(mut self, parties: Vec<String>) -> Self {
        self.authorized_parties = parties;
        self
    }

    /// Overrides the accepted signing algorithms (RS256 by default)
    pub fn with_algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        self.algorithms = algorithms;
        self
    }

    /// Verifies a raw token and returns its claims
    ///
    /// # Errors
    ///
    /// Returns a [`JwtError`] describing the first failed check.
    pub async fn verify(&self, token: &str) -> Result<ClerkClaims, JwtError> {
        let header = decode_header(token)?;
        let kid = header.kid.ok_or(JwtError::MissingKeyId)?;

        let jwk = self.jwks.key(&kid).await?;
        let key = DecodingKey::from_jwk(&jwk)?;

        let mut validation = Validation::default();
        validation.algorithms = self.algorithms.clone();
        validation.validate_nbf = true;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        let claims = decode::<ClerkClaims>(token, &key, &validation)?.claims;

        if !self.authorized_parties.is_empty() {
            let azp = claims.azp.as_deref().unwrap_or_default();
            if !self.authorized_parties.iter().any(|p| p == azp) {
                debug!(azp, "Token azp not in authorized parties");
                return Err(JwtError::UnauthorizedParty(azp.to_string()));
            }
        }

        Ok(claims)
    }
}
