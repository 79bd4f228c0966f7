//! Database models for TaskHub
//!
//! # Models
//!
//! - `user`: Users mirrored from Clerk or created administratively
//! - `task`: Household tasks with an optional assignee

pub mod task;
pub mod user;
