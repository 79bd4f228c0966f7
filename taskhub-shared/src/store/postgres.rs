//! PostgreSQL-backed user store
//!
//! Each session wraps one `sqlx` transaction. A session that is dropped
//! without `commit` is rolled back by sqlx when the transaction is dropped.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use super::{StoreError, UserSession, UserStore};
use crate::models::user::{NewUser, User};

/// User store over a connection pool
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn begin(&self) -> Result<Box<dyn UserSession>, StoreError> {
        let tx = self.pool.begin().await?;
        debug!("Opened user store transaction");
        Ok(Box::new(PgUserSession { tx }))
    }
}

/// Session holding an open transaction
pub struct PgUserSession {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UserSession for PgUserSession {
    async fn find_by_clerk_id(&mut self, clerk_id: &str) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_clerk_id_for_update(&mut *self.tx, clerk_id).await?)
    }

    async fn insert(&mut self, user: NewUser) -> Result<User, StoreError> {
        Ok(User::create(&mut *self.tx, user).await?)
    }

    async fn save(&mut self, user: &User) -> Result<User, StoreError> {
        User::save(&mut *self.tx, user)
            .await?
            .ok_or(StoreError::Missing(user.id))
    }

    async fn list_active(&mut self) -> Result<Vec<User>, StoreError> {
        Ok(User::list_active(&mut *self.tx).await?)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        debug!("Committed user store transaction");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        debug!("Rolled back user store transaction");
        Ok(())
    }
}
