/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/signup` - Register and receive a token
/// - `POST /api/auth/login` - Exchange credentials for a token
/// - `GET /api/auth/me` - Current user profile

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{trimmed, ApiJson},
    middleware::auth::AuthContext,
    routes::DataResponse,
};
use axum::{extract::State, http::StatusCode, Json};
use bookshelf_shared::{
    auth::{jwt, password},
    models::user::{CreateUser, UserSummary},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Signup request
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Signup fields once all of them are present
#[derive(Debug, Validate)]
struct NewAccount {
    #[validate(length(min = 2, max = 50, message = "Name must be between 2 and 50 characters"))]
    name: String,

    #[validate(email(message = "Please provide a valid email"))]
    email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    password: String,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// User summary plus a fresh token
#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub token: String,
}

impl AuthPayload {
    fn new(user: UserSummary, token: String) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            token,
        }
    }
}

fn issue(state: &AppState, user_id: Uuid) -> ApiResult<String> {
    Ok(jwt::issue_token(
        user_id,
        state.jwt_secret(),
        state.config.jwt.expire_hours,
    )?)
}

/// Register a new user
///
/// ```text
/// POST /api/auth/signup
///
/// { "name": "Jane Doe", "email": "jane@example.com", "password": "secret1" }
/// ```
///
/// # Errors
///
/// - `400`: missing fields, validation failure, or email already registered
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> ApiResult<(StatusCode, Json<DataResponse<AuthPayload>>)> {
    let (Some(name), Some(email), Some(password)) = (
        trimmed(req.name),
        trimmed(req.email),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::BadRequest(
            "Please provide all required fields".to_string(),
        ));
    };

    let account = NewAccount {
        name,
        email,
        password,
    };
    account.validate()?;

    let NewAccount {
        name,
        email,
        password: plain,
    } = account;

    // Hashing is CPU-bound
    let password_hash =
        tokio::task::spawn_blocking(move || password::hash_password(&plain)).await??;

    let user = state
        .store
        .create_user(CreateUser {
            name,
            email,
            password_hash,
        })
        .await?;

    tracing::info!(user_id = %user.id, "User registered");

    let token = issue(&state, user.id)?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::with_message(
            "User registered successfully",
            AuthPayload::new(UserSummary::from(user), token),
        )),
    ))
}

/// Log in with email and password
///
/// # Errors
///
/// - `400`: email or password missing
/// - `401`: unknown email or wrong password (same message for both)
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<DataResponse<AuthPayload>>> {
    let (Some(email), Some(plain)) = (trimmed(req.email), req.password.filter(|p| !p.is_empty()))
    else {
        return Err(ApiError::BadRequest(
            "Please provide email and password".to_string(),
        ));
    };

    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(invalid)?;

    let hash = user.password_hash.clone();
    let matches =
        tokio::task::spawn_blocking(move || password::verify_password(&plain, &hash)).await??;
    if !matches {
        tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
        return Err(invalid());
    }

    let token = issue(&state, user.id)?;

    Ok(Json(DataResponse::with_message(
        "Login successful",
        AuthPayload::new(UserSummary::from(user), token),
    )))
}

/// Current user profile
pub async fn me(auth: AuthContext) -> Json<DataResponse<UserSummary>> {
    Json(DataResponse::new(auth.user))
}
