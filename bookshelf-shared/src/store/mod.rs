/// Storage abstraction for users, books and reviews
///
/// Handlers talk to a `dyn Store` so the same code runs against PostgreSQL in
/// production ([`PgStore`]) and against process memory in tests or demos
/// ([`MemoryStore`]).
///
/// # Store Contract
///
/// Every implementation must:
/// 1. Normalize emails and reject a second account for the same address
///    with `StoreError::Duplicate(DuplicateKind::Email)`
/// 2. Reject a second review for the same (book, user) pair with
///    `StoreError::Duplicate(DuplicateKind::Review)`, atomically, so that two
///    concurrent inserts cannot both succeed
/// 3. Delete a book's reviews together with the book
/// 4. Return books newest-first by default and reviews newest-first always,
///    breaking timestamp ties by id
/// 5. Leave `average_rating` / `total_reviews` alone except through
///    `refresh_book_rating`, which reads the reviews and writes both fields
///    as one atomic step
///
/// # Example
///
/// ```
/// use bookshelf_shared::store::{MemoryStore, Store};
/// use bookshelf_shared::models::user::CreateUser;
///
/// # async fn example() -> Result<(), bookshelf_shared::store::StoreError> {
/// let store = MemoryStore::new();
/// let user = store.create_user(CreateUser {
///     name: "Jane".to_string(),
///     email: "Jane@Example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
/// }).await?;
///
/// assert_eq!(user.email, "jane@example.com");
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use std::fmt;
use uuid::Uuid;

use crate::models::book::{Book, BookChanges, BookDetail, BookFilter, NewBook};
use crate::models::page::{Page, PageRequest};
use crate::models::review::{NewReview, Review, ReviewChanges, ReviewDetail};
use crate::models::user::{CreateUser, User};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// What a duplicate insert collided with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateKind {
    /// An account with the same (normalized) email exists
    Email,

    /// The user already reviewed this book
    Review,
}

impl fmt::Display for DuplicateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateKind::Email => f.write_str("email"),
            DuplicateKind::Review => f.write_str("review"),
        }
    }
}

/// Store error types
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A referenced row does not exist (e.g. reviewing a deleted book)
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A uniqueness constraint rejected the write
    #[error("Duplicate {0}")]
    Duplicate(DuplicateKind),

    /// Any other database failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence operations used by the request handlers
#[async_trait]
pub trait Store: Send + Sync {
    /// Short backend name reported by the health check
    fn backend(&self) -> &'static str;

    /// Verifies the backend is reachable
    async fn ping(&self) -> StoreResult<()>;

    async fn create_user(&self, data: CreateUser) -> StoreResult<User>;

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Case-insensitive lookup
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn create_book(&self, data: NewBook) -> StoreResult<Book>;

    async fn find_book(&self, id: Uuid) -> StoreResult<Option<Book>>;

    /// Book with its owner summary
    async fn find_book_detail(&self, id: Uuid) -> StoreResult<Option<BookDetail>>;

    async fn list_books(
        &self,
        filter: &BookFilter,
        page: PageRequest,
    ) -> StoreResult<Page<BookDetail>>;

    /// Returns None if the book doesn't exist
    async fn update_book(&self, id: Uuid, changes: BookChanges) -> StoreResult<Option<Book>>;

    /// Deletes the book and all of its reviews; false if it didn't exist
    async fn delete_book(&self, id: Uuid) -> StoreResult<bool>;

    /// Re-aggregates the rating fields from the current reviews
    ///
    /// Returns the updated book, or None if it is gone.
    async fn refresh_book_rating(&self, id: Uuid) -> StoreResult<Option<Book>>;

    async fn create_review(&self, data: NewReview) -> StoreResult<Review>;

    async fn find_review(&self, id: Uuid) -> StoreResult<Option<Review>>;

    /// Review with user and book summaries
    async fn find_review_detail(&self, id: Uuid) -> StoreResult<Option<ReviewDetail>>;

    async fn find_review_by_book_and_user(
        &self,
        book_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Review>>;

    async fn list_reviews_by_book(
        &self,
        book_id: Uuid,
        page: PageRequest,
    ) -> StoreResult<Page<ReviewDetail>>;

    async fn list_reviews_by_user(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> StoreResult<Page<ReviewDetail>>;

    async fn update_review(
        &self,
        id: Uuid,
        changes: ReviewChanges,
    ) -> StoreResult<Option<Review>>;

    async fn delete_review(&self, id: Uuid) -> StoreResult<bool>;
}
