//! Transactional user persistence
//!
//! The webhook handlers and the sync tool never talk to the database
//! directly. They open one [`UserSession`] per unit of work from a
//! [`UserStore`], and every session ends in exactly one `commit` or
//! `rollback`.
//!
//! # Implementations
//!
//! - [`postgres::PgUserStore`]: sqlx transaction per session
//! - [`memory::MemoryUserStore`]: in-process snapshot per session, used by
//!   tests and local demos
//!
//! # Example
//!
//! ```
//! use taskhub_shared::models::user::NewUser;
//! use taskhub_shared::store::{memory::MemoryUserStore, UserStore};
//!
//! # async fn example() -> Result<(), taskhub_shared::store::StoreError> {
//! let store = MemoryUserStore::new();
//!
//! let mut session = store.begin().await?;
//! session.insert(NewUser::from_clerk("user_1", "a@b.com")).await?;
//! session.commit().await?;
//!
//! assert!(store.find_by_clerk_id("user_1").await.is_some());
//! # Ok(())
//! # }
//! ```

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::models::user::{NewUser, User};

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// The row to update no longer exists
    #[error("User {0} no longer exists")]
    Missing(uuid::Uuid),

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    /// Non-database backend failure
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether this is a unique violation on the given constraint
    pub fn violates(&self, name: &str) -> bool {
        matches!(self, StoreError::UniqueViolation { constraint } if constraint == name)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return StoreError::UniqueViolation {
                    constraint: db_err.constraint().unwrap_or_default().to_string(),
                };
            }
        }

        StoreError::Database(err)
    }
}

/// Source of transactional sessions
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Opens a new session (one transaction)
    async fn begin(&self) -> Result<Box<dyn UserSession>, StoreError>;
}

/// One unit of work against the users table
///
/// Writes are only visible to other sessions after [`UserSession::commit`].
/// Dropping a session without committing discards its writes.
#[async_trait]
pub trait UserSession: Send {
    /// Fetches the user with the given Clerk ID, locking it for this session
    async fn find_by_clerk_id(&mut self, clerk_id: &str) -> Result<Option<User>, StoreError>;

    /// Inserts a new user
    async fn insert(&mut self, user: NewUser) -> Result<User, StoreError>;

    /// Persists the profile fields and `is_active` of an existing user
    async fn save(&mut self, user: &User) -> Result<User, StoreError>;

    /// Lists every active user
    async fn list_active(&mut self) -> Result<Vec<User>, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violates_matches_constraint_name() {
        let err = StoreError::UniqueViolation {
            constraint: "users_clerk_id_key".to_string(),
        };

        assert!(err.violates("users_clerk_id_key"));
        assert!(!err.violates("users_email_key"));
        assert!(!StoreError::Unavailable("down".to_string()).violates("users_clerk_id_key"));
    }

    #[test]
    fn test_non_database_sqlx_error_is_wrapped() {
        let err: StoreError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, StoreError::Database(sqlx::Error::RowNotFound)));
    }
}
