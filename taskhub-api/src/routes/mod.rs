/// API route handlers
///
/// Organized by resource:
///
/// - `health`: Health check endpoint
/// - `webhooks`: Clerk webhook receiver
/// - `users`: User listing and administrative management
/// - `tasks`: Task CRUD

pub mod health;
pub mod tasks;
pub mod users;
pub mod webhooks;
