//! # Bookshelf Shared Library
//!
//! Domain types, persistence and business rules behind the Bookshelf API.
//!
//! ## Module Organization
//!
//! - `models`: Users, books, reviews, pagination and their SQL
//! - `store`: The `Store` trait with PostgreSQL and in-memory backends
//! - `rating`: Average rating / review count aggregation
//! - `auth`: Password hashing, tokens and ownership checks
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod db;
pub mod models;
pub mod rating;
pub mod store;

/// Current version of the Bookshelf shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
