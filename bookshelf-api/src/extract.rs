/// Request body extraction
///
/// `ApiJson` behaves like `axum::Json` but rejects malformed bodies with an
/// `ApiError`, so clients always get the JSON error envelope.

use axum::extract::FromRequest;

use crate::error::ApiError;

/// JSON body extractor with API-shaped rejections
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Trims a string field, treating blank input as absent
pub fn trimmed(value: Option<String>) -> Option<String> {
    trim_field(value).filter(|s| !s.is_empty())
}

/// Trims a provided string field but keeps it, even when blank
///
/// Used for partial updates, where a blank value must still reach validation.
pub fn trim_field(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string())
}
