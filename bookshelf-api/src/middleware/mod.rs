/// Middleware and request guards
///
/// - `auth`: Bearer token extractor for protected routes
/// - `security`: Security response headers

pub mod auth;
pub mod security;
