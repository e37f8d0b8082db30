/// Database layer: PostgreSQL pool and migrations
///
/// Queries themselves live with their models in [`crate::models`].

pub mod migrations;
pub mod pool;
