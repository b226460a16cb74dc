//! # Council Hours Notification Worker
//!
//! Drains the notification outbox the API fills and hands each email to a
//! mail transport.
//!
//! ## Modules
//!
//! - `config`: configuration from the environment
//! - `queue`: outbox claiming and outcome recording
//! - `mailer`: mail transports (log, HTTP API)
//! - `dispatcher`: the poll-and-send loop

pub mod config;
pub mod dispatcher;
pub mod mailer;
pub mod queue;
