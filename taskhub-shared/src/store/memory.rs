//! In-memory user store
//!
//! A session works on a private copy of the table taken at `begin` and
//! publishes it on `commit`, so uncommitted writes are never visible and a
//! rollback simply drops the copy. Unique constraints on `clerk_id` and
//! `email` are enforced with the same constraint names as the schema.
//!
//! Commit merges by id: only the rows a session inserted or saved are
//! written back, so concurrent sessions touching different users both
//! survive. A written row that now collides with another committed row on
//! `clerk_id` or `email` fails the whole commit with
//! [`StoreError::UniqueViolation`]. Two sessions saving the same user still
//! resolve as last commit wins.

use std::collections::HashSet;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{StoreError, UserSession, UserStore};
use crate::models::user::{NewUser, User, CLERK_ID_CONSTRAINT, EMAIL_CONSTRAINT};

#[derive(Debug, Default)]
struct Shared {
    users: Mutex<Vec<User>>,
    fail_writes: AtomicBool,
}

/// In-memory user store
#[derive(Debug, Clone, Default)]
pub struct MemoryUserStore {
    shared: Arc<Shared>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `users`
    pub fn with_users(users: Vec<User>) -> Self {
        Self {
            shared: Arc::new(Shared {
                users: Mutex::new(users),
                ..Default::default()
            }),
        }
    }

    /// Makes every subsequent insert/save fail with [`StoreError::Unavailable`]
    pub fn set_fail_writes(&self, fail: bool) {
        self.shared.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Returns a copy of all committed users
    pub async fn users(&self) -> Vec<User> {
        self.shared.users.lock().await.clone()
    }

    /// Looks up a committed user by Clerk ID
    pub async fn find_by_clerk_id(&self, clerk_id: &str) -> Option<User> {
        self.shared
            .users
            .lock()
            .await
            .iter()
            .find(|u| u.clerk_id.as_deref() == Some(clerk_id))
            .cloned()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn begin(&self) -> Result<Box<dyn UserSession>, StoreError> {
        let working = self.shared.users.lock().await.clone();
        Ok(Box::new(MemoryUserSession {
            shared: Arc::clone(&self.shared),
            working,
            written: HashSet::new(),
        }))
    }
}

/// Session over a private copy of the users table
pub struct MemoryUserSession {
    shared: Arc<Shared>,
    working: Vec<User>,

    /// Ids inserted or saved in this session
    written: HashSet<Uuid>,
}

fn unique_conflict(users: &[User], id: Option<Uuid>, clerk_id: Option<&str>, email: &str) -> Result<(), StoreError> {
    for other in users.iter().filter(|u| Some(u.id) != id) {
        if clerk_id.is_some() && other.clerk_id.as_deref() == clerk_id {
            return Err(StoreError::UniqueViolation {
                constraint: CLERK_ID_CONSTRAINT.to_string(),
            });
        }
        if other.email == email {
            return Err(StoreError::UniqueViolation {
                constraint: EMAIL_CONSTRAINT.to_string(),
            });
        }
    }
    Ok(())
}

impl MemoryUserSession {
    fn check_writable(&self) -> Result<(), StoreError> {
        if self.shared.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes are disabled".to_string()));
        }
        Ok(())
    }

    fn check_unique(&self, id: Option<Uuid>, clerk_id: Option<&str>, email: &str) -> Result<(), StoreError> {
        unique_conflict(&self.working, id, clerk_id, email)
    }
}

#[async_trait]
impl UserSession for MemoryUserSession {
    async fn find_by_clerk_id(&mut self, clerk_id: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .working
            .iter()
            .find(|u| u.clerk_id.as_deref() == Some(clerk_id))
            .cloned())
    }

    async fn insert(&mut self, user: NewUser) -> Result<User, StoreError> {
        self.check_writable()?;
        self.check_unique(None, user.clerk_id.as_deref(), &user.email)?;

        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            clerk_id: user.clerk_id,
            email: user.email,
            full_name: user.full_name,
            image_url: user.image_url,
            hashed_password: user.hashed_password,
            is_active: user.is_active,
            is_superuser: user.is_superuser,
            created_at: now,
            updated_at: now,
        };
        self.working.push(created.clone());
        self.written.insert(created.id);

        Ok(created)
    }

    async fn save(&mut self, user: &User) -> Result<User, StoreError> {
        self.check_writable()?;
        self.check_unique(Some(user.id), None, &user.email)?;

        let existing = self
            .working
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or(StoreError::Missing(user.id))?;

        existing.email = user.email.clone();
        existing.full_name = user.full_name.clone();
        existing.image_url = user.image_url.clone();
        existing.is_active = user.is_active;
        existing.updated_at = Utc::now();
        self.written.insert(user.id);

        Ok(existing.clone())
    }

    async fn list_active(&mut self) -> Result<Vec<User>, StoreError> {
        Ok(self.working.iter().filter(|u| u.is_active).cloned().collect())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryUserSession {
            shared,
            working,
            written,
        } = *self;
        let changed: Vec<User> = working.into_iter().filter(|u| written.contains(&u.id)).collect();

        let mut users = shared.users.lock().await;
        for user in &changed {
            unique_conflict(&users, Some(user.id), user.clerk_id.as_deref(), &user.email)?;
        }

        for user in changed {
            match users.iter_mut().find(|u| u.id == user.id) {
                Some(existing) => *existing = user,
                None => users.push(user),
            }
        }

        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_uncommitted_writes_are_invisible() {
        let store = MemoryUserStore::new();

        let mut session = store.begin().await.unwrap();
        session.insert(NewUser::from_clerk("user_1", "a@b.com")).await.unwrap();
        assert!(store.find_by_clerk_id("user_1").await.is_none());

        session.rollback().await.unwrap();
        assert!(store.users().await.is_empty());
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let store = MemoryUserStore::new();

        let mut session = store.begin().await.unwrap();
        let user = session.insert(NewUser::from_clerk("user_1", "a@b.com")).await.unwrap();
        session.commit().await.unwrap();

        let found = store.find_by_clerk_id("user_1").await.unwrap();
        assert_eq!(found, user);
    }

    #[tokio::test]
    async fn test_unique_constraints() {
        let store = MemoryUserStore::new();
        let mut session = store.begin().await.unwrap();
        session.insert(NewUser::from_clerk("user_1", "a@b.com")).await.unwrap();

        let dup_clerk = session
            .insert(NewUser::from_clerk("user_1", "other@b.com"))
            .await
            .unwrap_err();
        assert!(dup_clerk.violates(CLERK_ID_CONSTRAINT));

        let dup_email = session
            .insert(NewUser::from_clerk("user_2", "a@b.com"))
            .await
            .unwrap_err();
        assert!(dup_email.violates(EMAIL_CONSTRAINT));
    }

    #[tokio::test]
    async fn test_save_updates_profile_fields_only() {
        let store = MemoryUserStore::new();
        let mut session = store.begin().await.unwrap();
        let mut user = session.insert(NewUser::from_clerk("user_1", "a@b.com")).await.unwrap();

        user.email = "new@b.com".to_string();
        user.is_active = false;
        user.is_superuser = true;
        let saved = session.save(&user).await.unwrap();

        assert_eq!(saved.email, "new@b.com");
        assert!(!saved.is_active);
        assert!(!saved.is_superuser);
        assert!(session.list_active().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fail_writes() {
        let store = MemoryUserStore::new();
        store.set_fail_writes(true);

        let mut session = store.begin().await.unwrap();
        let err = session
            .insert(NewUser::from_clerk("user_1", "a@b.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_with_users_seeds_committed_state() {
        let source = MemoryUserStore::new();
        let mut session = source.begin().await.unwrap();
        session.insert(NewUser::from_clerk("user_1", "a@b.com")).await.unwrap();
        session.commit().await.unwrap();

        let store = MemoryUserStore::with_users(source.users().await);

        assert!(store.find_by_clerk_id("user_1").await.is_some());
        let mut session = store.begin().await.unwrap();
        assert_eq!(session.list_active().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_commits_keep_both_inserts() {
        let store = MemoryUserStore::new();
        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();

        first.insert(NewUser::from_clerk("user_1", "a@b.com")).await.unwrap();
        second.insert(NewUser::from_clerk("user_2", "b@b.com")).await.unwrap();
        first.commit().await.unwrap();
        second.commit().await.unwrap();

        assert!(store.find_by_clerk_id("user_1").await.is_some());
        assert!(store.find_by_clerk_id("user_2").await.is_some());
    }

    #[tokio::test]
    async fn test_conflicting_concurrent_commit_fails() {
        let store = MemoryUserStore::new();
        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();

        first.insert(NewUser::from_clerk("user_1", "a@b.com")).await.unwrap();
        second.insert(NewUser::from_clerk("user_1", "other@b.com")).await.unwrap();
        first.commit().await.unwrap();

        let err = second.commit().await.unwrap_err();
        assert!(err.violates(CLERK_ID_CONSTRAINT));

        let users = store.users().await;
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].email, "a@b.com");
    }
}
