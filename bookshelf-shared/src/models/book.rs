/// Book model and database operations
///
/// Books are created by an authenticated user (`added_by`) and carry two
/// derived fields, `average_rating` and `total_reviews`, which are only ever
/// written by the rating aggregator (see [`crate::rating`]).
///
/// # Schema
///
/// ```sql
/// CREATE TYPE book_genre AS ENUM ('Fiction', 'Non-Fiction', ..., 'Other');
///
/// CREATE TABLE books (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(200) NOT NULL,
///     author VARCHAR(100) NOT NULL,
///     description VARCHAR(2000) NOT NULL,
///     genre book_genre NOT NULL,
///     published_year INTEGER NOT NULL,
///     added_by UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     average_rating DOUBLE PRECISION NOT NULL DEFAULT 0,
///     total_reviews INTEGER NOT NULL DEFAULT 0,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use bookshelf_shared::models::book::{Book, BookFilter, Genre, NewBook};
/// use bookshelf_shared::models::page::PageRequest;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, owner: Uuid) -> Result<(), sqlx::Error> {
/// let book = Book::create(&pool, NewBook {
///     title: "Dune".to_string(),
///     author: "Frank Herbert".to_string(),
///     description: "A desert planet and its spice.".to_string(),
///     genre: Genre::ScienceFiction,
///     published_year: 1965,
///     added_by: owner,
/// }).await?;
///
/// let filter = BookFilter {
///     search: Some("dune".to_string()),
///     ..Default::default()
/// };
/// let page = Book::list(&pool, &filter, PageRequest::new(1, 5)).await?;
/// assert!(page.items.iter().any(|detail| detail.book.id == book.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use super::page::{Page, PageRequest};
use super::user::UserSummary;

/// Genre filter value meaning "no genre filter"
pub const ALL_GENRES: &str = "All";

/// Fixed set of book categories
///
/// Declaration order matches the `book_genre` enum in PostgreSQL, so sorting
/// by genre gives the same order in every store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "book_genre")]
pub enum Genre {
    Fiction,
    #[serde(rename = "Non-Fiction")]
    #[sqlx(rename = "Non-Fiction")]
    NonFiction,
    Mystery,
    Thriller,
    Romance,
    #[serde(rename = "Science Fiction")]
    #[sqlx(rename = "Science Fiction")]
    ScienceFiction,
    Fantasy,
    Horror,
    Biography,
    History,
    #[serde(rename = "Self-Help")]
    #[sqlx(rename = "Self-Help")]
    SelfHelp,
    Business,
    Poetry,
    Drama,
    Adventure,
    Other,
}

impl Genre {
    /// Every genre, in display order
    pub const ALL: [Genre; 16] = [
        Genre::Fiction,
        Genre::NonFiction,
        Genre::Mystery,
        Genre::Thriller,
        Genre::Romance,
        Genre::ScienceFiction,
        Genre::Fantasy,
        Genre::Horror,
        Genre::Biography,
        Genre::History,
        Genre::SelfHelp,
        Genre::Business,
        Genre::Poetry,
        Genre::Drama,
        Genre::Adventure,
        Genre::Other,
    ];

    /// Display label, identical to the stored value
    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Fiction => "Fiction",
            Genre::NonFiction => "Non-Fiction",
            Genre::Mystery => "Mystery",
            Genre::Thriller => "Thriller",
            Genre::Romance => "Romance",
            Genre::ScienceFiction => "Science Fiction",
            Genre::Fantasy => "Fantasy",
            Genre::Horror => "Horror",
            Genre::Biography => "Biography",
            Genre::History => "History",
            Genre::SelfHelp => "Self-Help",
            Genre::Business => "Business",
            Genre::Poetry => "Poetry",
            Genre::Drama => "Drama",
            Genre::Adventure => "Adventure",
            Genre::Other => "Other",
        }
    }

    /// Parses the `genre` query parameter: empty or `All` disables the filter
    pub fn parse_filter(raw: Option<&str>) -> Result<Option<Genre>, UnknownGenre> {
        match raw.map(str::trim) {
            None | Some("") | Some(ALL_GENRES) => Ok(None),
            Some(value) => value.parse().map(Some),
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a genre label outside the fixed set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0} is not a valid genre")]
pub struct UnknownGenre(pub String);

impl FromStr for Genre {
    type Err = UnknownGenre;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Genre::ALL
            .into_iter()
            .find(|genre| genre.as_str() == s)
            .ok_or_else(|| UnknownGenre(s.to_string()))
    }
}

/// Book row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub description: String,
    pub genre: Genre,
    pub published_year: i32,

    /// Owner; immutable after creation
    pub added_by: Uuid,

    /// Mean review rating rounded to one decimal (0 when unreviewed)
    pub average_rating: f64,

    /// Number of reviews referencing this book
    pub total_reviews: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Book with its owner expanded, as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct BookDetail {
    #[serde(flatten)]
    pub book: Book,

    /// Owner's public profile (None if the account no longer exists)
    pub owner: Option<UserSummary>,
}

/// Minimal book projection embedded in review responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSummary {
    pub id: Uuid,
    pub title: String,
    pub author: String,
}

impl From<&Book> for BookSummary {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            author: book.author.clone(),
        }
    }
}

/// Validated input for creating a book
#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub description: String,
    pub genre: Genre,
    pub published_year: i32,
    pub added_by: Uuid,
}

/// Partial update; only `Some` fields change
#[derive(Debug, Clone, Default)]
pub struct BookChanges {
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub genre: Option<Genre>,
    pub published_year: Option<i32>,
}

impl BookChanges {
    /// Applies the changes to an in-memory book
    pub fn apply_to(self, book: &mut Book) {
        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(author) = self.author {
            book.author = author;
        }
        if let Some(description) = self.description {
            book.description = description;
        }
        if let Some(genre) = self.genre {
            book.genre = genre;
        }
        if let Some(published_year) = self.published_year {
            book.published_year = published_year;
        }
    }
}

/// Sortable book columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookSortField {
    CreatedAt,
    UpdatedAt,
    Title,
    Author,
    Genre,
    PublishedYear,
    AverageRating,
    TotalReviews,
}

impl BookSortField {
    /// SQL sort keys over the `books b` alias, most significant first
    ///
    /// Text columns compare case-insensitively first and then bytewise, both
    /// under the `C` collation. The memory store orders the same way, so the
    /// result does not depend on the database's locale.
    pub fn sort_keys(&self) -> &'static [&'static str] {
        match self {
            BookSortField::CreatedAt => &["b.created_at"],
            BookSortField::UpdatedAt => &["b.updated_at"],
            BookSortField::Title => &[r#"LOWER(b.title) COLLATE "C""#, r#"b.title COLLATE "C""#],
            BookSortField::Author => &[r#"LOWER(b.author) COLLATE "C""#, r#"b.author COLLATE "C""#],
            BookSortField::Genre => &["b.genre"],
            BookSortField::PublishedYear => &["b.published_year"],
            BookSortField::AverageRating => &["b.average_rating"],
            BookSortField::TotalReviews => &["b.total_reviews"],
        }
    }
}

/// Error for an unrecognized `sortBy` value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Cannot sort books by '{0}'")]
pub struct UnknownSortField(pub String);

impl FromStr for BookSortField {
    type Err = UnknownSortField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createdAt" => Ok(BookSortField::CreatedAt),
            "updatedAt" => Ok(BookSortField::UpdatedAt),
            "title" => Ok(BookSortField::Title),
            "author" => Ok(BookSortField::Author),
            "genre" => Ok(BookSortField::Genre),
            "publishedYear" => Ok(BookSortField::PublishedYear),
            "averageRating" => Ok(BookSortField::AverageRating),
            "totalReviews" => Ok(BookSortField::TotalReviews),
            other => Err(UnknownSortField(other.to_string())),
        }
    }
}

/// Sort order for book listings; `-field` means descending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookSort {
    pub field: BookSortField,
    pub descending: bool,
}

impl Default for BookSort {
    /// Newest first
    fn default() -> Self {
        Self {
            field: BookSortField::CreatedAt,
            descending: true,
        }
    }
}

impl BookSort {
    /// Parses the `sortBy` query parameter; empty means the default order
    pub fn parse(raw: Option<&str>) -> Result<Self, UnknownSortField> {
        let raw = raw.map(str::trim).unwrap_or_default();
        if raw.is_empty() {
            return Ok(Self::default());
        }

        let (descending, name) = match raw.strip_prefix('-') {
            Some(name) => (true, name),
            None => (false, raw),
        };

        Ok(Self {
            field: name.parse()?,
            descending,
        })
    }

    fn direction(&self) -> &'static str {
        if self.descending {
            "DESC"
        } else {
            "ASC"
        }
    }
}

/// Listing filter
#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    /// Case-insensitive substring matched against title OR author
    pub search: Option<String>,

    /// Exact genre match (None = all genres)
    pub genre: Option<Genre>,

    /// Restrict to books added by this user
    pub added_by: Option<Uuid>,

    pub sort: BookSort,
}

impl BookFilter {
    /// Non-empty, trimmed search term
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }

    /// Checks a book against the search/genre/owner criteria
    pub fn matches(&self, book: &Book) -> bool {
        if let Some(term) = self.search_term() {
            let term = term.to_lowercase();
            if !book.title.to_lowercase().contains(&term)
                && !book.author.to_lowercase().contains(&term)
            {
                return false;
            }
        }

        self.genre.map_or(true, |genre| book.genre == genre)
            && self.added_by.map_or(true, |owner| book.added_by == owner)
    }
}

/// Builds an ILIKE pattern matching `term` literally anywhere in the value
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

const BOOK_COLUMNS: &str = "id, title, author, description, genre, published_year, added_by, \
                            average_rating, total_reviews, created_at, updated_at";

const BOOK_DETAIL_SELECT: &str = "SELECT b.id, b.title, b.author, b.description, b.genre, \
     b.published_year, b.added_by, b.average_rating, b.total_reviews, b.created_at, b.updated_at, \
     u.name AS owner_name, u.email AS owner_email \
     FROM books b LEFT JOIN users u ON u.id = b.added_by";

#[derive(sqlx::FromRow)]
struct BookDetailRow {
    #[sqlx(flatten)]
    book: Book,
    owner_name: Option<String>,
    owner_email: Option<String>,
}

impl From<BookDetailRow> for BookDetail {
    fn from(row: BookDetailRow) -> Self {
        let owner = match (row.owner_name, row.owner_email) {
            (Some(name), Some(email)) => Some(UserSummary {
                id: row.book.added_by,
                name,
                email,
            }),
            _ => None,
        };

        BookDetail {
            book: row.book,
            owner,
        }
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &BookFilter) {
    builder.push(" WHERE TRUE");

    if let Some(term) = filter.search_term() {
        let pattern = like_pattern(term);
        builder
            .push(" AND (b.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR b.author ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(genre) = filter.genre {
        builder.push(" AND b.genre = ").push_bind(genre);
    }
    if let Some(owner) = filter.added_by {
        builder.push(" AND b.added_by = ").push_bind(owner);
    }
}

impl Book {
    /// Inserts a new book with zeroed aggregate fields
    pub async fn create(pool: &PgPool, data: NewBook) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO books (title, author, description, genre, published_year, added_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {BOOK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Book>(&query)
            .bind(data.title)
            .bind(data.author)
            .bind(data.description)
            .bind(data.genre)
            .bind(data.published_year)
            .bind(data.added_by)
            .fetch_one(pool)
            .await
    }

    /// Finds a book by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1");

        sqlx::query_as::<_, Book>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a book by ID with its owner expanded
    pub async fn find_detail_by_id(
        pool: &PgPool,
        id: Uuid,
    ) -> Result<Option<BookDetail>, sqlx::Error> {
        let query = format!("{BOOK_DETAIL_SELECT} WHERE b.id = $1");

        let row = sqlx::query_as::<_, BookDetailRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(BookDetail::from))
    }

    /// Lists books matching `filter`, one page at a time
    ///
    /// Issues a `COUNT(*)` with the same predicate so the caller can report
    /// the total number of pages.
    pub async fn list(
        pool: &PgPool,
        filter: &BookFilter,
        page: PageRequest,
    ) -> Result<Page<BookDetail>, sqlx::Error> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM books b");
        push_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(BOOK_DETAIL_SELECT);
        push_filter(&mut select, filter);

        // Sort keys come from a closed enum, never from user input
        let direction = filter.sort.direction();
        select.push(" ORDER BY ");
        for key in filter.sort.field.sort_keys() {
            select.push(format!("{key} {direction}, "));
        }
        select.push(format!("b.id {direction}"));
        select
            .push(" LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows: Vec<BookDetailRow> = select.build_query_as().fetch_all(pool).await?;

        Ok(Page::new(
            rows.into_iter().map(BookDetail::from).collect(),
            total,
            page,
        ))
    }

    /// Applies a partial update; returns None if the book doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        changes: BookChanges,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE books
            SET title = COALESCE($2, title),
                author = COALESCE($3, author),
                description = COALESCE($4, description),
                genre = COALESCE($5, genre),
                published_year = COALESCE($6, published_year),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {BOOK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Book>(&query)
            .bind(id)
            .bind(changes.title)
            .bind(changes.author)
            .bind(changes.description)
            .bind(changes.genre)
            .bind(changes.published_year)
            .fetch_optional(pool)
            .await
    }

    /// Re-aggregates the rating fields from the book's reviews
    ///
    /// One statement, so the count and the average always come from the same
    /// review set. The rounding is `rating::rounded_average` in integer
    /// tenths. Returns None if the book no longer exists.
    pub async fn refresh_rating(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE books b
            SET (average_rating, total_reviews, updated_at) = (
                SELECT COALESCE(
                           ((SUM(r.rating) * 20 + COUNT(*)) / NULLIF(COUNT(*) * 2, 0))::FLOAT8 / 10,
                           0
                       ),
                       COUNT(*)::INT,
                       NOW()
                FROM reviews r
                WHERE r.book_id = b.id
            )
            WHERE b.id = $1
            RETURNING {BOOK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Book>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Deletes a book; its reviews go with it (`ON DELETE CASCADE`)
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
