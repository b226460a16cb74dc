//! # Council Hours Shared Library
//!
//! Domain core used by the API server and the notification worker.
//!
//! ## Module Organization
//!
//! - `access_code`: unique access-code generation and assignment
//! - `store`: member store trait with Postgres and in-memory implementations
//! - `models`: database models and queries
//! - `catalog`: the fixed activity taxonomy
//! - `report`: dashboard and council report aggregation
//! - `roster`: membership CSV parsing
//! - `notify`: notification email templates
//! - `auth`: session tokens and authorization checks
//! - `db`: connection pool and migrations

pub mod access_code;
pub mod auth;
pub mod catalog;
pub mod db;
pub mod models;
pub mod notify;
pub mod report;
pub mod roster;
pub mod store;

/// Current version of the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
