/// PostgreSQL plumbing for the row store
///
/// - `pool`: connection pool with health check
/// - `migrations`: embedded sqlx migrations for the row store schema

pub mod migrations;
pub mod pool;
