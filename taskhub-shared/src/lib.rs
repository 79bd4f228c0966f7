//! # TaskHub Shared Library
//!
//! Types and business logic shared by the TaskHub API server and the Clerk
//! sync tool.
//!
//! ## Module Organization
//!
//! - `models`: Database rows and their queries
//! - `db`: Connection pool and migrations
//! - `store`: Transactional user persistence (PostgreSQL and in-memory)
//! - `webhooks`: Clerk webhook verification and user lifecycle handling
//! - `auth`: Clerk session tokens and password hashing

pub mod auth;
pub mod db;
pub mod models;
pub mod store;
pub mod webhooks;

/// Current version of the TaskHub shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
