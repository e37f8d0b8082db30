/// Book catalogue endpoints
///
/// # Endpoints
///
/// - `GET /api/books` - Search, filter, sort and paginate books
/// - `POST /api/books` - Add a book (auth)
/// - `GET /api/books/genres` - Fixed genre list
/// - `GET /api/books/user/my-books` - Books added by the requester (auth)
/// - `GET /api/books/:id` - Single book with owner
/// - `PUT /api/books/:id` - Partial update (auth, owner)
/// - `DELETE /api/books/:id` - Delete book and its reviews (auth, owner)

use crate::{
    app::AppState,
    error::{validation_messages, ApiError, ApiResult},
    extract::{trim_field, trimmed, ApiJson},
    middleware::auth::AuthContext,
    routes::{parse_id, BookListResponse, DataResponse, Empty, PageParams},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use bookshelf_shared::{
    auth::authorization::require_ownership,
    models::book::{BookChanges, BookDetail, BookFilter, BookSort, Genre, NewBook},
};
use chrono::{Datelike, Utc};
use serde::Deserialize;
use validator::Validate;

/// Page size for the public catalogue
const DEFAULT_LIST_LIMIT: i64 = 5;

/// Page size for "my books"
const DEFAULT_MY_BOOKS_LIMIT: i64 = 10;

/// Query parameters for `GET /api/books`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub genre: Option<String>,
    pub sort_by: Option<String>,
}

/// Body for creating or updating a book
///
/// Every field is optional at the type level: creation requires all of
/// them, updates change only the ones provided.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BookRequest {
    #[validate(length(min = 2, max = 200, message = "Title must be between 2 and 200 characters"))]
    pub title: Option<String>,

    #[validate(length(
        min = 2,
        max = 100,
        message = "Author name must be between 2 and 100 characters"
    ))]
    pub author: Option<String>,

    #[validate(length(
        min = 10,
        max = 2000,
        message = "Description must be between 10 and 2000 characters"
    ))]
    pub description: Option<String>,

    pub genre: Option<String>,

    #[validate(range(min = 1000, message = "Published year must be after 1000"))]
    pub published_year: Option<i32>,
}

impl BookRequest {
    /// Trims every provided string; blank values stay present
    fn trimmed(self) -> Self {
        Self {
            title: trim_field(self.title),
            author: trim_field(self.author),
            description: trim_field(self.description),
            genre: trim_field(self.genre),
            published_year: self.published_year,
        }
    }

    /// All fields present and non-blank, as creation requires
    fn is_complete(&self) -> bool {
        let filled = |field: &Option<String>| field.as_deref().is_some_and(|s| !s.is_empty());

        filled(&self.title)
            && filled(&self.author)
            && filled(&self.description)
            && filled(&self.genre)
            && self.published_year.is_some()
    }

    /// Validates every provided field, reporting all violations at once
    fn into_changes(self) -> ApiResult<BookChanges> {
        let mut errors = match self.validate() {
            Ok(()) => Vec::new(),
            Err(e) => validation_messages(&e),
        };

        let genre = match self.genre.as_deref() {
            Some("") => {
                errors.push("Genre cannot be empty".to_string());
                None
            }
            Some(label) => match label.parse::<Genre>() {
                Ok(genre) => Some(genre),
                Err(e) => {
                    errors.push(e.to_string());
                    None
                }
            },
            None => None,
        };

        if self.published_year.is_some_and(|year| year > latest_published_year()) {
            errors.push("Published year cannot be in the future".to_string());
        }

        if !errors.is_empty() {
            return Err(ApiError::ValidationFailed(errors));
        }

        Ok(BookChanges {
            title: self.title,
            author: self.author,
            description: self.description,
            genre,
            published_year: self.published_year,
        })
    }
}

/// Books announced for next year are accepted
fn latest_published_year() -> i32 {
    Utc::now().year() + 1
}

fn missing_fields() -> ApiError {
    ApiError::BadRequest("Please provide all required fields".to_string())
}

fn book_not_found() -> ApiError {
    ApiError::NotFound("Book not found".to_string())
}

/// List books
///
/// ```text
/// GET /api/books?page=1&limit=5&search=dune&genre=Science%20Fiction&sortBy=-averageRating
/// ```
///
/// # Response
///
/// ```json
/// {
///   "success": true,
///   "count": 1,
///   "totalBooks": 1,
///   "totalPages": 1,
///   "currentPage": 1,
///   "data": [{ "id": "...", "title": "Dune", "owner": { "name": "..." } }]
/// }
/// ```
///
/// # Errors
///
/// - `400`: unknown genre or sort field
pub async fn list_books(
    State(state): State<AppState>,
    Query(params): Query<BookListParams>,
) -> ApiResult<Json<BookListResponse<BookDetail>>> {
    let filter = BookFilter {
        search: trimmed(params.search),
        genre: Genre::parse_filter(params.genre.as_deref())?,
        added_by: None,
        sort: BookSort::parse(params.sort_by.as_deref())?,
    };
    let page = PageParams {
        page: params.page,
        limit: params.limit,
    }
    .resolve(DEFAULT_LIST_LIMIT);

    let books = state.store.list_books(&filter, page).await?;

    Ok(Json(books.into()))
}

/// Get a single book with its owner
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DataResponse<BookDetail>>> {
    let id = parse_id(&id, "Book")?;

    let book = state
        .store
        .find_book_detail(id)
        .await?
        .ok_or_else(book_not_found)?;

    Ok(Json(DataResponse::new(book)))
}

/// Add a book
///
/// ```text
/// POST /api/books
/// Authorization: Bearer <token>
///
/// {
///   "title": "Dune",
///   "author": "Frank Herbert",
///   "description": "Politics and sandworms on Arrakis.",
///   "genre": "Science Fiction",
///   "publishedYear": 1965
/// }
/// ```
///
/// # Errors
///
/// - `400`: a field is missing or invalid
/// - `401`: not authenticated
pub async fn create_book(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(req): ApiJson<BookRequest>,
) -> ApiResult<(StatusCode, Json<DataResponse<BookDetail>>)> {
    let req = req.trimmed();
    if !req.is_complete() {
        return Err(missing_fields());
    }

    let BookChanges {
        title: Some(title),
        author: Some(author),
        description: Some(description),
        genre: Some(genre),
        published_year: Some(published_year),
    } = req.into_changes()?
    else {
        return Err(missing_fields());
    };

    let book = state
        .store
        .create_book(NewBook {
            title,
            author,
            description,
            genre,
            published_year,
            added_by: auth.user_id,
        })
        .await?;

    tracing::info!(book_id = %book.id, user_id = %auth.user_id, "Book added");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::with_message(
            "Book added successfully",
            BookDetail {
                book,
                owner: Some(auth.user),
            },
        )),
    ))
}

/// Update a book (owner only)
///
/// # Errors
///
/// - `400`: a provided field is invalid
/// - `403`: requester didn't add this book
/// - `404`: no such book
pub async fn update_book(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<BookRequest>,
) -> ApiResult<Json<DataResponse<BookDetail>>> {
    let id = parse_id(&id, "Book")?;
    let book = require_ownership(state.store.find_book(id).await?, auth.user_id)?;

    let changes = req.trimmed().into_changes()?;

    let book = state
        .store
        .update_book(book.id, changes)
        .await?
        .ok_or_else(book_not_found)?;

    tracing::info!(book_id = %book.id, "Book updated");

    Ok(Json(DataResponse::with_message(
        "Book updated successfully",
        BookDetail {
            book,
            owner: Some(auth.user),
        },
    )))
}

/// Delete a book and all of its reviews (owner only)
pub async fn delete_book(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<Json<DataResponse<Empty>>> {
    let id = parse_id(&id, "Book")?;
    let book = require_ownership(state.store.find_book(id).await?, auth.user_id)?;

    if !state.store.delete_book(book.id).await? {
        return Err(book_not_found());
    }

    tracing::info!(book_id = %book.id, reviews = book.total_reviews, "Book deleted");

    Ok(Json(DataResponse::with_message(
        "Book deleted successfully",
        Empty {},
    )))
}

/// Books added by the requester, newest first
pub async fn my_books(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<BookListResponse<BookDetail>>> {
    let filter = BookFilter {
        added_by: Some(auth.user_id),
        ..BookFilter::default()
    };

    let books = state
        .store
        .list_books(&filter, params.resolve(DEFAULT_MY_BOOKS_LIMIT))
        .await?;

    Ok(Json(books.into()))
}

/// The fixed genre list
pub async fn list_genres() -> Json<DataResponse<[Genre; 16]>> {
    Json(DataResponse::new(Genre::ALL))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dune() -> BookRequest {
        BookRequest {
            title: Some("  Dune ".to_string()),
            author: Some("Frank Herbert".to_string()),
            description: Some("Politics and sandworms on Arrakis.".to_string()),
            genre: Some("Science Fiction".to_string()),
            published_year: Some(1965),
        }
    }

    #[test]
    fn test_complete_request_converts() {
        let req = dune().trimmed();
        assert!(req.is_complete());

        let changes = req.into_changes().unwrap();
        assert_eq!(changes.title.as_deref(), Some("Dune"));
        assert_eq!(changes.genre, Some(Genre::ScienceFiction));
        assert_eq!(changes.published_year, Some(1965));
    }

    #[test]
    fn test_blank_field_counts_as_missing() {
        let req = BookRequest {
            description: Some("   ".to_string()),
            ..dune()
        }
        .trimmed();

        assert!(!req.is_complete());
    }

    #[test]
    fn test_blank_update_fields_fail_validation() {
        let req = BookRequest {
            title: Some("   ".to_string()),
            genre: Some(" ".to_string()),
            ..Default::default()
        }
        .trimmed();

        match req.into_changes().unwrap_err() {
            ApiError::ValidationFailed(errors) => assert_eq!(
                errors,
                vec![
                    "Title must be between 2 and 200 characters",
                    "Genre cannot be empty",
                ]
            ),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_all_violations_are_reported() {
        let req = BookRequest {
            title: Some("D".to_string()),
            genre: Some("Cookbook".to_string()),
            published_year: Some(latest_published_year() + 1),
            ..dune()
        };

        match req.into_changes().unwrap_err() {
            ApiError::ValidationFailed(errors) => assert_eq!(
                errors,
                vec![
                    "Title must be between 2 and 200 characters",
                    "Cookbook is not a valid genre",
                    "Published year cannot be in the future",
                ]
            ),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_next_year_is_allowed() {
        let req = BookRequest {
            published_year: Some(latest_published_year()),
            ..Default::default()
        };
        assert!(req.into_changes().is_ok());
    }

    #[test]
    fn test_year_lower_bound() {
        let req = BookRequest {
            published_year: Some(999),
            ..Default::default()
        };

        match req.into_changes().unwrap_err() {
            ApiError::ValidationFailed(errors) => {
                assert_eq!(errors, vec!["Published year must be after 1000"])
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_partial_update_only_sets_provided_fields() {
        let changes = BookRequest {
            author: Some("F. Herbert".to_string()),
            ..Default::default()
        }
        .into_changes()
        .unwrap();

        assert_eq!(changes.author.as_deref(), Some("F. Herbert"));
        assert!(changes.title.is_none());
        assert!(changes.genre.is_none());
    }
}
