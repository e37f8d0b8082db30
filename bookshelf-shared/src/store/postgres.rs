/// PostgreSQL-backed store
///
/// Thin delegation to the query functions on each model. The only logic here
/// is translating constraint violations into [`StoreError`] variants:
///
/// - unique violation on `users_email_key` -> `Duplicate(Email)`
/// - unique violation on `reviews_book_user_key` -> `Duplicate(Review)`
/// - foreign key violation on insert -> `NotFound` for the missing parent

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{DuplicateKind, Store, StoreError, StoreResult};
use crate::db::pool::health_check;
use crate::models::book::{Book, BookChanges, BookDetail, BookFilter, NewBook};
use crate::models::page::{Page, PageRequest};
use crate::models::review::{NewReview, Review, ReviewChanges, ReviewDetail};
use crate::models::user::{CreateUser, User};

/// Store backed by a PostgreSQL connection pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool (for migrations and shutdown)
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn map_insert_error(
    err: sqlx::Error,
    duplicate: Option<DuplicateKind>,
    parent: &'static str,
) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if let Some(kind) = duplicate.filter(|_| db_err.is_unique_violation()) {
            return StoreError::Duplicate(kind);
        }
        if db_err.is_foreign_key_violation() {
            return StoreError::NotFound(parent);
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(health_check(&self.pool).await?)
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        User::create(&self.pool, data)
            .await
            .map_err(|e| map_insert_error(e, Some(DuplicateKind::Email), "User"))
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn create_book(&self, data: NewBook) -> StoreResult<Book> {
        Book::create(&self.pool, data)
            .await
            .map_err(|e| map_insert_error(e, None, "User"))
    }

    async fn find_book(&self, id: Uuid) -> StoreResult<Option<Book>> {
        Ok(Book::find_by_id(&self.pool, id).await?)
    }

    async fn find_book_detail(&self, id: Uuid) -> StoreResult<Option<BookDetail>> {
        Ok(Book::find_detail_by_id(&self.pool, id).await?)
    }

    async fn list_books(
        &self,
        filter: &BookFilter,
        page: PageRequest,
    ) -> StoreResult<Page<BookDetail>> {
        Ok(Book::list(&self.pool, filter, page).await?)
    }

    async fn update_book(&self, id: Uuid, changes: BookChanges) -> StoreResult<Option<Book>> {
        Ok(Book::update(&self.pool, id, changes).await?)
    }

    async fn delete_book(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Book::delete(&self.pool, id).await?)
    }

    async fn refresh_book_rating(&self, id: Uuid) -> StoreResult<Option<Book>> {
        Ok(Book::refresh_rating(&self.pool, id).await?)
    }

    async fn create_review(&self, data: NewReview) -> StoreResult<Review> {
        Review::create(&self.pool, data)
            .await
            .map_err(|e| map_insert_error(e, Some(DuplicateKind::Review), "Book"))
    }

    async fn find_review(&self, id: Uuid) -> StoreResult<Option<Review>> {
        Ok(Review::find_by_id(&self.pool, id).await?)
    }

    async fn find_review_detail(&self, id: Uuid) -> StoreResult<Option<ReviewDetail>> {
        Ok(Review::find_detail_by_id(&self.pool, id).await?)
    }

    async fn find_review_by_book_and_user(
        &self,
        book_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Review>> {
        Ok(Review::find_by_book_and_user(&self.pool, book_id, user_id).await?)
    }

    async fn list_reviews_by_book(
        &self,
        book_id: Uuid,
        page: PageRequest,
    ) -> StoreResult<Page<ReviewDetail>> {
        Ok(Review::list_by_book(&self.pool, book_id, page).await?)
    }

    async fn list_reviews_by_user(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> StoreResult<Page<ReviewDetail>> {
        Ok(Review::list_by_user(&self.pool, user_id, page).await?)
    }

    async fn update_review(
        &self,
        id: Uuid,
        changes: ReviewChanges,
    ) -> StoreResult<Option<Review>> {
        Ok(Review::update(&self.pool, id, changes).await?)
    }

    async fn delete_review(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Review::delete(&self.pool, id).await?)
    }
}
