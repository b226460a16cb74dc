/// Database layer
///
/// - `pool`: Postgres connection pool with health checks
/// - `migrations`: embedded schema migrations
///
/// Table-level operations live with their models in `crate::models`.

pub mod migrations;
pub mod pool;
