/// Database models for Bookshelf
///
/// Each model owns its row type, its input types and the PostgreSQL queries
/// that read and write it. Handlers never call these directly; they go
/// through [`crate::store::Store`].
///
/// # Models
///
/// - `user`: Accounts and their public summary
/// - `book`: Books, genres, listing filters and sort orders
/// - `review`: One rating and text per (book, user)
/// - `page`: Pagination shared by every listing

pub mod book;
pub mod page;
pub mod review;
pub mod user;
