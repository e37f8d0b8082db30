/// Review model and database operations
///
/// A review is one user's star rating (1-5) plus text for one book. The
/// `reviews_book_user_key` unique constraint allows at most one review per
/// (book, user) pair, and reviews are removed together with their book.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE reviews (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     book_id UUID NOT NULL REFERENCES books(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
///     review_text VARCHAR(1000) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT reviews_book_user_key UNIQUE (book_id, user_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::book::BookSummary;
use super::page::{Page, PageRequest};
use super::user::UserSummary;

/// Review row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,

    /// Reviewed book (immutable)
    pub book_id: Uuid,

    /// Author of the review (immutable)
    pub user_id: Uuid,

    /// Star rating, 1 to 5
    pub rating: i32,

    pub review_text: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Review with its author and book expanded
#[derive(Debug, Clone, Serialize)]
pub struct ReviewDetail {
    #[serde(flatten)]
    pub review: Review,

    pub user: Option<UserSummary>,

    pub book: Option<BookSummary>,
}

/// Validated input for creating a review
#[derive(Debug, Clone)]
pub struct NewReview {
    pub book_id: Uuid,
    pub user_id: Uuid,
    pub rating: i32,
    pub review_text: String,
}

/// Partial update; only `Some` fields change
#[derive(Debug, Clone, Default)]
pub struct ReviewChanges {
    pub rating: Option<i32>,
    pub review_text: Option<String>,
}

impl ReviewChanges {
    /// Applies the changes to an in-memory review
    pub fn apply_to(self, review: &mut Review) {
        if let Some(rating) = self.rating {
            review.rating = rating;
        }
        if let Some(review_text) = self.review_text {
            review.review_text = review_text;
        }
    }
}

const REVIEW_COLUMNS: &str = "id, book_id, user_id, rating, review_text, created_at, updated_at";

const REVIEW_DETAIL_SELECT: &str = "SELECT r.id, r.book_id, r.user_id, r.rating, \
     r.review_text, r.created_at, r.updated_at, \
     u.name AS user_name, u.email AS user_email, \
     b.title AS book_title, b.author AS book_author \
     FROM reviews r \
     LEFT JOIN users u ON u.id = r.user_id \
     LEFT JOIN books b ON b.id = r.book_id";

#[derive(sqlx::FromRow)]
struct ReviewDetailRow {
    #[sqlx(flatten)]
    review: Review,
    user_name: Option<String>,
    user_email: Option<String>,
    book_title: Option<String>,
    book_author: Option<String>,
}

impl From<ReviewDetailRow> for ReviewDetail {
    fn from(row: ReviewDetailRow) -> Self {
        let user = match (row.user_name, row.user_email) {
            (Some(name), Some(email)) => Some(UserSummary {
                id: row.review.user_id,
                name,
                email,
            }),
            _ => None,
        };
        let book = match (row.book_title, row.book_author) {
            (Some(title), Some(author)) => Some(BookSummary {
                id: row.review.book_id,
                title,
                author,
            }),
            _ => None,
        };

        ReviewDetail {
            review: row.review,
            user,
            book,
        }
    }
}

impl Review {
    /// Inserts a review
    ///
    /// # Errors
    ///
    /// Fails with a unique violation on `reviews_book_user_key` if the user
    /// already reviewed this book, or a foreign key violation if the book is gone.
    pub async fn create(pool: &PgPool, data: NewReview) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO reviews (book_id, user_id, rating, review_text)
            VALUES ($1, $2, $3, $4)
            RETURNING {REVIEW_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Review>(&query)
            .bind(data.book_id)
            .bind(data.user_id)
            .bind(data.rating)
            .bind(data.review_text)
            .fetch_one(pool)
            .await
    }

    /// Finds a review by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1");

        sqlx::query_as::<_, Review>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a review by ID with user and book summaries
    pub async fn find_detail_by_id(
        pool: &PgPool,
        id: Uuid,
    ) -> Result<Option<ReviewDetail>, sqlx::Error> {
        let query = format!("{REVIEW_DETAIL_SELECT} WHERE r.id = $1");

        let row = sqlx::query_as::<_, ReviewDetailRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(ReviewDetail::from))
    }

    /// Finds the review a user wrote for a book, if any
    pub async fn find_by_book_and_user(
        pool: &PgPool,
        book_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query =
            format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE book_id = $1 AND user_id = $2");

        sqlx::query_as::<_, Review>(&query)
            .bind(book_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Reviews of a book, newest first
    pub async fn list_by_book(
        pool: &PgPool,
        book_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<ReviewDetail>, sqlx::Error> {
        Self::list_where(pool, "r.book_id", book_id, page).await
    }

    /// Reviews written by a user, newest first
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<ReviewDetail>, sqlx::Error> {
        Self::list_where(pool, "r.user_id", user_id, page).await
    }

    async fn list_where(
        pool: &PgPool,
        column: &'static str,
        value: Uuid,
        page: PageRequest,
    ) -> Result<Page<ReviewDetail>, sqlx::Error> {
        let count_query = format!("SELECT COUNT(*) FROM reviews r WHERE {column} = $1");
        let total = sqlx::query_scalar::<_, i64>(&count_query)
            .bind(value)
            .fetch_one(pool)
            .await?;

        let query = format!(
            "{REVIEW_DETAIL_SELECT} WHERE {column} = $1 \
             ORDER BY r.created_at DESC, r.id DESC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, ReviewDetailRow>(&query)
            .bind(value)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        Ok(Page::new(
            rows.into_iter().map(ReviewDetail::from).collect(),
            total,
            page,
        ))
    }

    /// Applies a partial update; returns None if the review doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        changes: ReviewChanges,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE reviews
            SET rating = COALESCE($2, rating),
                review_text = COALESCE($3, review_text),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {REVIEW_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Review>(&query)
            .bind(id)
            .bind(changes.rating)
            .bind(changes.review_text)
            .fetch_optional(pool)
            .await
    }

    /// Deletes a review
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
