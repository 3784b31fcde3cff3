/// API route handlers
///
/// - `health`: liveness and store readiness
/// - `users`: registration
/// - `auth`: password, session and remember-token logins, remember-token management
/// - `templates`: template listing and registration
/// - `instances`: per-user template copies
/// - `admin`: store setup

pub mod admin;
pub mod auth;
pub mod health;
pub mod instances;
pub mod templates;
pub mod users;
