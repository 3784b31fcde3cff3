/// Middleware modules for the API server
///
/// - `auth`: bearer session and admin token guards

pub mod auth;
