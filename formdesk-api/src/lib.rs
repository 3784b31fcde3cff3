//! # FormDesk API
//!
//! HTTP surface over `formdesk-core`: registration, the three login flows,
//! remember-token management, template registration and provisioning.
//!
//! Every response body is the core's unified envelope:
//!
//! ```json
//! { "success": true, "accessId": "AB12C", "password": "x9k2m" }
//! { "success": false, "errorCode": "duplicate", "error": "Already exists: a@example.com" }
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
