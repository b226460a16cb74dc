//! # Council Hours API Server Library
//!
//! Members sign in with their last name and an access code, record service
//! hours and donations against the council's annual report form, and admins
//! pull the council-wide report.
//!
//! ## Modules
//!
//! - `app`: application state and router builder
//! - `config`: configuration from the environment
//! - `error`: error handling and HTTP response mapping
//! - `middleware`: security headers and request context
//! - `routes`: route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
