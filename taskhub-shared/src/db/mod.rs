/// Database layer for TaskHub
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool with health check
/// - `migrations`: embedded schema migrations
///
/// Row types and their queries live in [`crate::models`]; transactional user
/// access goes through [`crate::store`].

pub mod migrations;
pub mod pool;
