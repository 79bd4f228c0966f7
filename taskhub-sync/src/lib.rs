//! # TaskHub Clerk Sync
//!
//! Pulls the full user list from Clerk's backend API and reconciles it with
//! the local users table. Complements the webhooks for missed deliveries and
//! first-time imports.
//!
//! ## Modules
//!
//! - `config`: Environment configuration
//! - `clerk`: Paginated Clerk API client
//! - `sync`: Reconciliation over a `UserSession`
//!
//! ## Example
//!
//! ```no_run
//! use taskhub_shared::store::memory::MemoryUserStore;
//! use taskhub_sync::clerk::ClerkClient;
//! use taskhub_sync::sync::{run_sync, SyncOptions};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = ClerkClient::new("https://api.clerk.com/v1", "sk_test_...")?;
//! let users = client.fetch_all_users().await?;
//!
//! let store = MemoryUserStore::new();
//! let stats = run_sync(&store, &users, SyncOptions::default()).await?;
//! println!("{stats}");
//! # Ok(())
//! # }
//! ```

pub mod clerk;
pub mod config;
pub mod sync;
