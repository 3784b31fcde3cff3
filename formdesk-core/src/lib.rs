//! # FormDesk Core
//!
//! Accounts, sessions and per-user template copies kept in a small tabular
//! store.
//!
//! ## Module Organization
//!
//! - `store`: row store abstraction with in-memory and PostgreSQL backends
//! - `db`: PostgreSQL pool and migrations for the row store
//! - `schema`: table layout and idempotent store setup
//! - `auth`: credential generation, password hashing, tokens
//! - `models`: typed views over table rows
//! - `services`: user directory, authentication, template provisioning
//! - `provider`: document providers the templates are cloned through
//! - `config`: service configuration
//! - `error`: service error taxonomy and the result envelope

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod provider;
pub mod schema;
pub mod services;
pub mod store;

pub use error::{ErrorCode, Outcome, ServiceError, ServiceResult};

/// Current version of the FormDesk core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
