/// Error handling for the API server
///
/// Every handler returns `ApiResult<T>`; the error side renders as
///
/// ```json
/// { "success": false, "message": "...", "errors": ["..."] }
/// ```
///
/// with `errors` present only for validation failures.
///
/// # Example
///
/// ```
/// use bookshelf_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::{json, Value};
///
/// async fn handler(found: bool) -> ApiResult<Json<Value>> {
///     if !found {
///         return Err(ApiError::NotFound("Book not found".to_string()));
///     }
///     Ok(Json(json!({ "success": true })))
/// }
/// ```

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bookshelf_shared::{
    auth::{authorization::OwnershipError, jwt::JwtError, password::PasswordError},
    models::book::{UnknownGenre, UnknownSortField},
    store::{DuplicateKind, StoreError},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::ValidationErrors;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Shown for duplicate signups
pub const EMAIL_TAKEN: &str = "User already exists with this email";

/// Shown when the review insert itself hits the uniqueness constraint
pub const ALREADY_REVIEWED: &str = "You have already reviewed this book";

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Field validation failed (400), one message per violated rule
    ValidationFailed(Vec<String>),

    /// Missing fields or malformed body (400)
    BadRequest(String),

    /// Uniqueness conflict (400): duplicate review or email
    Conflict(String),

    /// Missing, invalid or expired credentials (401)
    Unauthorized(String),

    /// Authenticated but not the owner (403)
    Forbidden(String),

    /// Unknown or malformed id (404)
    NotFound(String),

    /// Internal server error (500), details are logged but not returned
    InternalError(String),
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,

    /// Human-readable error message
    pub message: String,

    /// Individual validation messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl ApiError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::ValidationFailed(_) | ApiError::BadRequest(_) | ApiError::Conflict(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::ValidationFailed(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (message, errors) = match self {
            ApiError::ValidationFailed(errors) => ("Validation failed".to_string(), Some(errors)),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("Internal server error".to_string(), None)
            }
            ApiError::BadRequest(msg)
            | ApiError::Conflict(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg) => (msg, None),
        };

        let body = Json(ErrorResponse {
            success: false,
            message,
            errors,
        });

        (status, body).into_response()
    }
}

/// Flattens validator output into messages, ordered by field name
pub fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|(a, _), (b, _)| a.cmp(b));

    fields
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field))
            })
        })
        .collect()
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::ValidationFailed(validation_messages(&errors))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(DuplicateKind::Email) => ApiError::Conflict(EMAIL_TAKEN.to_string()),
            StoreError::Duplicate(DuplicateKind::Review) => {
                ApiError::Conflict(ALREADY_REVIEWED.to_string())
            }
            StoreError::NotFound(resource) => ApiError::NotFound(format!("{} not found", resource)),
            StoreError::Database(err) => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

impl From<OwnershipError> for ApiError {
    fn from(err: OwnershipError) -> Self {
        match err {
            OwnershipError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            OwnershipError::NotOwner { .. } => ApiError::Forbidden(err.to_string()),
        }
    }
}

impl From<UnknownGenre> for ApiError {
    fn from(err: UnknownGenre) -> Self {
        ApiError::ValidationFailed(vec![err.to_string()])
    }
}

impl From<UnknownSortField> for ApiError {
    fn from(err: UnknownSortField) -> Self {
        ApiError::ValidationFailed(vec![err.to_string()])
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::CreateError(msg) => ApiError::InternalError(msg),
            _ => ApiError::Unauthorized("Invalid token".to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::InternalError(format!("Blocking task failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 2, message = "Title is too short"))]
        title: String,

        #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
        rating: i64,
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("Book not found".to_string());
        assert_eq!(err.to_string(), "Not found: Book not found");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::ValidationFailed(vec![]).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Conflict(String::new()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized(String::new()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden(String::new()).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound(String::new()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::InternalError(String::new()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_validation_messages_are_collected_in_field_order() {
        let sample = Sample {
            title: "x".to_string(),
            rating: 9,
        };
        let err = ApiError::from(sample.validate().unwrap_err());

        match err {
            ApiError::ValidationFailed(messages) => assert_eq!(
                messages,
                vec!["Rating must be between 1 and 5", "Title is too short"]
            ),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_store_error_mapping() {
        let err = ApiError::from(StoreError::Duplicate(DuplicateKind::Review));
        assert!(matches!(err, ApiError::Conflict(ref m) if m == ALREADY_REVIEWED));

        let err = ApiError::from(StoreError::Duplicate(DuplicateKind::Email));
        assert!(matches!(err, ApiError::Conflict(ref m) if m == EMAIL_TAKEN));

        let err = ApiError::from(StoreError::NotFound("Book"));
        assert!(matches!(err, ApiError::NotFound(ref m) if m == "Book not found"));

        let err = ApiError::from(StoreError::Database(sqlx::Error::PoolTimedOut));
        assert!(matches!(err, ApiError::InternalError(_)));
    }

    #[test]
    fn test_jwt_error_mapping() {
        let err = ApiError::from(JwtError::Expired);
        assert!(matches!(err, ApiError::Unauthorized(ref m) if m == "Token expired"));

        let err = ApiError::from(JwtError::ValidationError("bad signature".to_string()));
        assert!(matches!(err, ApiError::Unauthorized(ref m) if m == "Invalid token"));
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let response = ApiError::InternalError("connection refused".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Internal server error");
        assert!(body.get("errors").is_none());
    }

    #[tokio::test]
    async fn test_validation_response_lists_errors() {
        let response =
            ApiError::ValidationFailed(vec!["Rating must be between 1 and 5".to_string()])
                .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["message"], "Validation failed");
        assert_eq!(body["errors"][0], "Rating must be between 1 and 5");
    }
}
