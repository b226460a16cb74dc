/// Middleware for the API server
///
/// - `security`: security response headers
/// - `request_context`: request ids, client IP resolution and access logging

pub mod request_context;
pub mod security;
