/// Authentication and authorization
///
/// # Modules
///
/// - [`jwt`]: HS256 session tokens
/// - [`middleware`]: bearer-token extraction into an [`middleware::AuthContext`]
/// - [`authorization`]: member and admin checks against the current roster
///
/// Members authenticate with last name plus access code; see
/// [`crate::models::member::Member::find_by_login`].

pub mod authorization;
pub mod jwt;
pub mod middleware;
