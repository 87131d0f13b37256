use axum::{
    Json,
    extract::{Path, State},
    http::header::SET_COOKIE,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use super::types::{AccountToken, StandingDto, UserDto};
use super::{ApiError, ApiResponse, AppState};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    /// Confirmation field; must match `password`.
    pub verified_password: String,
}

/// POST /api/users
/// Register a new account. On success the user is logged in immediately:
/// the session cookie is set and the token is returned alongside the
/// created account.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = payload.username.trim();
    if username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }
    if payload.password != payload.verified_password {
        return Err(ApiError::validation("Passwords do not match"));
    }

    let password_hash = crate::auth::hash_password(&payload.password).await?;

    // Uniqueness is enforced by the storage constraint; a duplicate surfaces
    // here as a conflict, including under concurrent registrations.
    let user = state.store().create_user(username, &password_hash).await?;

    let token = state
        .auth()
        .issue(&user)
        .map_err(|e| ApiError::internal(format!("Failed to issue token: {e}")))?;
    let cookie = state.auth().session_cookie(&token);

    Ok((
        [(SET_COOKIE, cookie)],
        Json(ApiResponse::success(AccountToken {
            access_token: token,
            token_type: "Bearer".to_string(),
            user: UserDto::from(user),
        })),
    ))
}

/// GET /api/users
/// League standings, best (lowest) summed rank first.
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<StandingDto>>>, ApiError> {
    let standings = state.store().standings().await?;
    let dtos: Vec<StandingDto> = standings.into_iter().map(StandingDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

/// GET /api/users/{username}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user = state
        .store()
        .get_user(&username)
        .await?
        .ok_or_else(|| ApiError::not_found("User", &username))?;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}
