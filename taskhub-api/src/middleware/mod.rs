/// Middleware modules for the API server
///
/// Bearer-token authentication lives in `taskhub_shared::auth::middleware`
/// and is wired up in [`crate::app`].

pub mod security;
