/// Review endpoints
///
/// Every mutation here ends with [`rating::recompute`] so the book's
/// `averageRating` / `totalReviews` follow the review set.
///
/// # Endpoints
///
/// - `POST /api/reviews` - Review a book (auth, once per book)
/// - `GET /api/reviews/book/:book_id` - Reviews of a book, newest first
/// - `GET /api/reviews/user/my-reviews` - Requester's reviews (auth)
/// - `GET /api/reviews/check/:book_id` - Has the requester reviewed it? (auth)
/// - `GET /api/reviews/:id` - Single review
/// - `PUT /api/reviews/:id` - Change rating / text (auth, owner)
/// - `DELETE /api/reviews/:id` - Delete (auth, owner)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{trim_field, trimmed, ApiJson},
    middleware::auth::AuthContext,
    routes::{parse_id, DataResponse, Empty, PageParams, ReviewListResponse},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use bookshelf_shared::{
    auth::authorization::require_ownership,
    models::{
        book::BookSummary,
        review::{NewReview, ReviewChanges, ReviewDetail},
    },
    rating,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

const DEFAULT_REVIEW_LIMIT: i64 = 10;

/// Body for `POST /api/reviews`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateReviewRequest {
    pub book_id: Option<String>,
    pub rating: Option<i32>,
    pub review_text: Option<String>,
}

/// Review content once every field is present
#[derive(Debug, Validate)]
struct ReviewFields {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    rating: i32,

    #[validate(length(
        min = 10,
        max = 1000,
        message = "Review text must be between 10 and 1000 characters"
    ))]
    review_text: String,
}

/// Body for `PUT /api/reviews/:id`; the book can't be changed
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateReviewRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<i32>,

    #[validate(length(
        min = 10,
        max = 1000,
        message = "Review text must be between 10 and 1000 characters"
    ))]
    pub review_text: Option<String>,
}

/// Response of the "have I reviewed this?" check
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReviewResponse {
    pub success: bool,
    pub has_reviewed: bool,
    pub data: Option<ReviewDetail>,
}

fn review_not_found() -> ApiError {
    ApiError::NotFound("Review not found".to_string())
}

fn book_not_found() -> ApiError {
    ApiError::NotFound("Book not found".to_string())
}

/// Review a book
///
/// ```text
/// POST /api/reviews
/// Authorization: Bearer <token>
///
/// { "bookId": "...", "rating": 5, "reviewText": "A desert planet epic." }
/// ```
///
/// # Errors
///
/// - `400`: missing or invalid field, or the requester already reviewed it
/// - `401`: not authenticated
/// - `404`: no such book
pub async fn create_review(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(req): ApiJson<CreateReviewRequest>,
) -> ApiResult<(StatusCode, Json<DataResponse<ReviewDetail>>)> {
    let (Some(book_id), Some(score), Some(review_text)) = (
        trimmed(req.book_id),
        req.rating,
        trimmed(req.review_text),
    ) else {
        return Err(ApiError::BadRequest(
            "Please provide bookId, rating, and reviewText".to_string(),
        ));
    };

    let fields = ReviewFields {
        rating: score,
        review_text,
    };
    fields.validate()?;

    let book_id = parse_id(&book_id, "Book")?;
    let book = state
        .store
        .find_book(book_id)
        .await?
        .ok_or_else(book_not_found)?;

    if state
        .store
        .find_review_by_book_and_user(book.id, auth.user_id)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict(
            "You have already reviewed this book. You can edit your existing review.".to_string(),
        ));
    }

    // A concurrent request can still win the race; the store's uniqueness
    // check turns that into the same 400
    let review = state
        .store
        .create_review(NewReview {
            book_id: book.id,
            user_id: auth.user_id,
            rating: fields.rating,
            review_text: fields.review_text,
        })
        .await?;

    tracing::info!(
        review_id = %review.id,
        book_id = %book.id,
        rating = review.rating,
        "Review added"
    );

    rating::recompute(state.store.as_ref(), book.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::with_message(
            "Review added successfully",
            ReviewDetail {
                review,
                user: Some(auth.user),
                book: Some(BookSummary::from(&book)),
            },
        )),
    ))
}

/// Reviews of one book, newest first, with the book's rating snapshot
pub async fn book_reviews(
    State(state): State<AppState>,
    Path(book_id): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<ReviewListResponse<ReviewDetail>>> {
    let book_id = parse_id(&book_id, "Book")?;
    let book = state
        .store
        .find_book(book_id)
        .await?
        .ok_or_else(book_not_found)?;

    let reviews = state
        .store
        .list_reviews_by_book(book.id, params.resolve(DEFAULT_REVIEW_LIMIT))
        .await?;

    let mut response = ReviewListResponse::from(reviews);
    response.average_rating = Some(book.average_rating);

    Ok(Json(response))
}

/// Single review with reviewer and book summaries
pub async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DataResponse<ReviewDetail>>> {
    let id = parse_id(&id, "Review")?;

    let review = state
        .store
        .find_review_detail(id)
        .await?
        .ok_or_else(review_not_found)?;

    Ok(Json(DataResponse::new(review)))
}

/// Change rating and/or text (owner only)
///
/// # Errors
///
/// - `400`: a provided field is invalid
/// - `403`: requester didn't write this review
/// - `404`: no such review
pub async fn update_review(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateReviewRequest>,
) -> ApiResult<Json<DataResponse<ReviewDetail>>> {
    let id = parse_id(&id, "Review")?;
    let review = require_ownership(state.store.find_review(id).await?, auth.user_id)?;

    let req = UpdateReviewRequest {
        rating: req.rating,
        review_text: trim_field(req.review_text),
    };
    req.validate()?;

    let updated = state
        .store
        .update_review(
            review.id,
            ReviewChanges {
                rating: req.rating,
                review_text: req.review_text,
            },
        )
        .await?
        .ok_or_else(review_not_found)?;

    tracing::info!(review_id = %updated.id, rating = updated.rating, "Review updated");

    rating::recompute(state.store.as_ref(), updated.book_id).await?;

    let detail = state
        .store
        .find_review_detail(updated.id)
        .await?
        .ok_or_else(review_not_found)?;

    Ok(Json(DataResponse::with_message(
        "Review updated successfully",
        detail,
    )))
}

/// Delete a review (owner only)
pub async fn delete_review(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<Json<DataResponse<Empty>>> {
    let id = parse_id(&id, "Review")?;
    let review = require_ownership(state.store.find_review(id).await?, auth.user_id)?;

    if !state.store.delete_review(review.id).await? {
        return Err(review_not_found());
    }

    tracing::info!(review_id = %review.id, book_id = %review.book_id, "Review deleted");

    rating::recompute(state.store.as_ref(), review.book_id).await?;

    Ok(Json(DataResponse::with_message(
        "Review deleted successfully",
        Empty {},
    )))
}

/// Reviews written by the requester, newest first
pub async fn my_reviews(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<ReviewListResponse<ReviewDetail>>> {
    let reviews = state
        .store
        .list_reviews_by_user(auth.user_id, params.resolve(DEFAULT_REVIEW_LIMIT))
        .await?;

    Ok(Json(reviews.into()))
}

/// Whether the requester has reviewed a book, and the review if so
///
/// A malformed book id simply matches nothing.
pub async fn check_review(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(book_id): Path<String>,
) -> ApiResult<Json<CheckReviewResponse>> {
    let review = match Uuid::parse_str(book_id.trim()) {
        Ok(book_id) => {
            state
                .store
                .find_review_by_book_and_user(book_id, auth.user_id)
                .await?
        }
        Err(_) => None,
    };

    let data = match review {
        Some(review) => state.store.find_review_detail(review.id).await?,
        None => None,
    };

    Ok(Json(CheckReviewResponse {
        success: true,
        has_reviewed: data.is_some(),
        data,
    }))
}
