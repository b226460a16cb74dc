/// API route handlers, one module per resource
///
/// - `health`: liveness and database connectivity
/// - `auth`: login and logout
/// - `catalog`: the activity taxonomy
/// - `dashboard`: a member's own totals
/// - `activities`: form save and autosave
/// - `admin`: reports, roster import and member management

pub mod activities;
pub mod admin;
pub mod auth;
pub mod catalog;
pub mod dashboard;
pub mod health;
