/// API route handlers
///
/// Handlers are organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Signup, login and current user
/// - `books`: Book catalogue
/// - `reviews`: Reviews and per-book rating listings
///
/// Successful responses share a `{ "success": true, ... }` envelope defined
/// here.

pub mod auth;
pub mod books;
pub mod health;
pub mod reviews;

use bookshelf_shared::models::page::{Page, PageRequest};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// Single-entity response
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,

    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    pub fn with_message(message: &'static str, data: T) -> Self {
        Self {
            success: true,
            message: Some(message),
            data,
        }
    }
}

/// Empty `{}` payload returned by deletes
#[derive(Debug, Default, Serialize)]
pub struct Empty {}

/// Paginated book listing
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookListResponse<T> {
    pub success: bool,

    /// Items on this page
    pub count: usize,
    pub total_books: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub data: Vec<T>,
}

impl<T> From<Page<T>> for BookListResponse<T> {
    fn from(page: Page<T>) -> Self {
        Self {
            success: true,
            count: page.items.len(),
            total_books: page.total,
            total_pages: page.total_pages(),
            current_page: page.request.page(),
            data: page.items,
        }
    }
}

/// Paginated review listing
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewListResponse<T> {
    pub success: bool,
    pub count: usize,
    pub total_reviews: i64,
    pub total_pages: i64,
    pub current_page: i64,

    /// Rating snapshot of the book, for per-book listings only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,

    pub data: Vec<T>,
}

impl<T> From<Page<T>> for ReviewListResponse<T> {
    fn from(page: Page<T>) -> Self {
        Self {
            success: true,
            count: page.items.len(),
            total_reviews: page.total,
            total_pages: page.total_pages(),
            current_page: page.request.page(),
            average_rating: None,
            data: page.items,
        }
    }
}

/// Raw `page` / `limit` query parameters
///
/// Kept as strings so junk values fall back to defaults instead of failing
/// extraction.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageParams {
    pub fn resolve(&self, default_limit: i64) -> PageRequest {
        PageRequest::from_query(self.page.as_deref(), self.limit.as_deref(), default_limit)
    }
}

/// Parses a path id; anything that isn't a UUID can't name an entity
pub fn parse_id(raw: &str, resource: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::NotFound(format!("{} not found", resource)))
}

/// Fallback for unmatched routes
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}
