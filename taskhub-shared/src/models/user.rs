//! User model and database operations
//!
//! Users are mirrored from Clerk (keyed by `clerk_id`) or created
//! administratively. They are never physically removed by the webhook
//! pipeline: a Clerk deletion only clears `is_active`.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE users (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     clerk_id VARCHAR(255) UNIQUE,
//!     email VARCHAR(255) NOT NULL,
//!     full_name VARCHAR(255),
//!     image_url VARCHAR(2048),
//!     hashed_password VARCHAR(255),
//!     is_active BOOLEAN NOT NULL DEFAULT TRUE,
//!     is_superuser BOOLEAN NOT NULL DEFAULT FALSE,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     CONSTRAINT users_email_key UNIQUE (email)
//! );
//! ```
//!
//! Every query takes a generic `PgExecutor`, so the same functions run against
//! the pool or inside a transaction (`&mut *tx`).
//!
//! # Example
//!
//! ```no_run
//! use taskhub_shared::models::user::{NewUser, User};
//! use taskhub_shared::db::pool::{create_pool, DatabaseConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool(DatabaseConfig::default()).await?;
//!
//! let user = User::create(&pool, NewUser::from_clerk("user_123", "jane@example.com")).await?;
//! let found = User::find_by_clerk_id(&pool, "user_123").await?;
//! assert_eq!(found.map(|u| u.id), Some(user.id));
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Name of the unique constraint on `users.clerk_id`
pub const CLERK_ID_CONSTRAINT: &str = "users_clerk_id_key";

/// Name of the unique constraint on `users.email`
pub const EMAIL_CONSTRAINT: &str = "users_email_key";

/// A local user record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Service-assigned ID, independent of Clerk
    pub id: Uuid,

    /// Clerk user ID
    ///
    /// Unique and immutable once set. `None` only for administratively
    /// created users.
    pub clerk_id: Option<String>,

    /// Email address, unique across active and inactive users
    pub email: String,

    /// Display name derived from Clerk's first/last name; never `Some("")`
    pub full_name: Option<String>,

    /// Profile image URL
    pub image_url: Option<String>,

    /// Argon2id hash, administratively created users only
    #[serde(skip_serializing, default)]
    pub hashed_password: Option<String>,

    /// Cleared by a Clerk `user.deleted` event (soft delete)
    pub is_active: bool,

    /// Never set by webhook events
    pub is_superuser: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for inserting a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub clerk_id: Option<String>,
    pub email: String,
    pub full_name: Option<String>,
    pub image_url: Option<String>,
    pub hashed_password: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
}

impl NewUser {
    /// Starts an active, non-superuser record for a Clerk identity
    pub fn from_clerk(clerk_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            clerk_id: Some(clerk_id.into()),
            email: email.into(),
            full_name: None,
            image_url: None,
            hashed_password: None,
            is_active: true,
            is_superuser: false,
        }
    }

    pub fn with_full_name(mut self, full_name: Option<String>) -> Self {
        self.full_name = full_name;
        self
    }

    pub fn with_image_url(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url;
        self
    }
}

impl User {
    /// Inserts a new user
    ///
    /// # Errors
    ///
    /// Returns a database error if `clerk_id` or `email` is already taken
    /// (constraints [`CLERK_ID_CONSTRAINT`] / [`EMAIL_CONSTRAINT`]) or the
    /// connection fails.
    pub async fn create<'e, E>(executor: E, data: NewUser) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (clerk_id, email, full_name, image_url, hashed_password,
                               is_active, is_superuser)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, clerk_id, email, full_name, image_url, hashed_password,
                      is_active, is_superuser, created_at, updated_at
            "#,
        )
        .bind(data.clerk_id)
        .bind(data.email)
        .bind(data.full_name)
        .bind(data.image_url)
        .bind(data.hashed_password)
        .bind(data.is_active)
        .bind(data.is_superuser)
        .fetch_one(executor)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, clerk_id, email, full_name, image_url, hashed_password,
                   is_active, is_superuser, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    /// Finds a user by email address
    pub async fn find_by_email<'e, E>(executor: E, email: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, clerk_id, email, full_name, image_url, hashed_password,
                   is_active, is_superuser, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    /// Finds a user by Clerk ID
    pub async fn find_by_clerk_id<'e, E>(
        executor: E,
        clerk_id: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, clerk_id, email, full_name, image_url, hashed_password,
                   is_active, is_superuser, created_at, updated_at
            FROM users
            WHERE clerk_id = $1
            "#,
        )
        .bind(clerk_id)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    /// Finds a user by Clerk ID and locks the row until the transaction ends
    ///
    /// Only meaningful inside a transaction. Concurrent deliveries for the
    /// same user serialize on this lock.
    pub async fn find_by_clerk_id_for_update<'e, E>(
        executor: E,
        clerk_id: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, clerk_id, email, full_name, image_url, hashed_password,
                   is_active, is_superuser, created_at, updated_at
            FROM users
            WHERE clerk_id = $1
            FOR UPDATE
            "#,
        )
        .bind(clerk_id)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    /// Writes the mutable profile fields of `user` back to its row
    ///
    /// `clerk_id`, `is_superuser` and `hashed_password` are never touched.
    /// Returns `None` if the row no longer exists.
    pub async fn save<'e, E>(executor: E, user: &User) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let saved = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email = $2, full_name = $3, image_url = $4, is_active = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, clerk_id, email, full_name, image_url, hashed_password,
                      is_active, is_superuser, created_at, updated_at
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.image_url)
        .bind(user.is_active)
        .fetch_optional(executor)
        .await?;

        Ok(saved)
    }

    /// Lists all active users
    pub async fn list_active<'e, E>(executor: E) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, clerk_id, email, full_name, image_url, hashed_password,
                   is_active, is_superuser, created_at, updated_at
            FROM users
            WHERE is_active = TRUE
            ORDER BY created_at
            "#,
        )
        .fetch_all(executor)
        .await?;

        Ok(users)
    }

    /// Lists users with pagination, oldest first
    pub async fn list<'e, E>(executor: E, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, clerk_id, email, full_name, image_url, hashed_password,
                   is_active, is_superuser, created_at, updated_at
            FROM users
            ORDER BY created_at
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await?;

        Ok(users)
    }

    /// Permanently deletes a user
    ///
    /// Administrative path only. Tasks assigned to the user keep existing with
    /// `assignee_id` set to NULL.
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts all users
    pub async fn count<'e, E>(executor: E) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(executor)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_from_clerk_defaults() {
        let user = NewUser::from_clerk("user_1", "a@b.com");

        assert_eq!(user.clerk_id.as_deref(), Some("user_1"));
        assert_eq!(user.email, "a@b.com");
        assert!(user.full_name.is_none());
        assert!(user.hashed_password.is_none());
        assert!(user.is_active);
        assert!(!user.is_superuser);
    }

    #[test]
    fn test_hashed_password_is_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            clerk_id: None,
            email: "admin@example.com".to_string(),
            full_name: None,
            image_url: None,
            hashed_password: Some("$argon2id$secret".to_string()),
            is_active: true,
            is_superuser: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("hashed_password").is_none());
        assert_eq!(json["email"], "admin@example.com");
    }
}
