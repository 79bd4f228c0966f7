/// Authentication utilities
///
/// # Modules
///
/// - [`jwks`]: Clerk JWKS fetching and caching
/// - [`jwt`]: Clerk session token verification
/// - [`middleware`]: Axum bearer-token middleware
/// - [`password`]: Argon2id hashing for administratively created users
///
/// # Example
///
/// ```no_run
/// use taskhub_shared::auth::jwks::JwksCache;
/// use taskhub_shared::auth::jwt::TokenVerifier;
///
/// # async fn example(token: &str) -> Result<(), Box<dyn std::error::Error>> {
/// let jwks = JwksCache::remote("https://clerk.example.com/.well-known/jwks.json")?;
/// let verifier = TokenVerifier::new("https://clerk.example.com", jwks);
/// let claims = verifier.verify(token).await?;
/// # Ok(())
/// # }
/// ```

pub mod jwks;
pub mod jwt;
pub mod middleware;
pub mod password;
