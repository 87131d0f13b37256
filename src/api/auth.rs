use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use std::sync::Arc;

use super::types::{AccountToken, UserDto};
use super::{ApiError, ApiResponse, AppState};

/// Authenticated principal for the current request, inserted by
/// `auth_middleware` after the session token checks out.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i32,
    pub username: String,
}

// ============================================================================
// Middleware
// ============================================================================

/// Authentication middleware. Accepts the session token from:
/// 1. The session cookie (set on login/registration)
/// 2. An `Authorization: Bearer <token>` header
///
/// The token is verified (signature + expiry) and the account is re-resolved
/// by username, so tokens for deleted accounts stop working immediately.
/// Rejected requests never reach the query layer handlers.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = extract_token(&state, &jar, &headers) else {
        return Err(ApiError::Unauthorized("Not authenticated".to_string()));
    };

    let claims = state
        .auth()
        .verify(&token)
        .map_err(|_| ApiError::Unauthorized("Invalid session token".to_string()))?;

    let user = state
        .store()
        .get_user(&claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Unknown account".to_string()))?;

    tracing::Span::current().record("user_id", user.id);
    request.extensions_mut().insert(CurrentUser {
        id: user.id,
        username: user.username,
    });

    Ok(next.run(request).await)
}

/// Extract the session token from the cookie or bearer header
fn extract_token(state: &AppState, jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(state.auth().cookie_name()) {
        return Some(cookie.value().to_string());
    }

    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    None
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// POST /token
/// Authenticate with username and password; sets the session cookie and
/// returns the token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    // A missing account and a wrong password produce the same response.
    let Some((user, password_hash)) = state
        .store()
        .get_user_with_password(&payload.username)
        .await?
    else {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    };

    let is_valid = crate::auth::verify_password(&payload.password, &password_hash).await?;
    if !is_valid {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let token = state
        .auth()
        .issue(&user)
        .map_err(|e| ApiError::internal(format!("Failed to issue token: {e}")))?;
    let cookie = state.auth().session_cookie(&token);

    tracing::info!("User logged in: {}", user.username);

    Ok((
        [(SET_COOKIE, cookie)],
        Json(ApiResponse::success(AccountToken {
            access_token: token,
            token_type: "Bearer".to_string(),
            user: UserDto::from(user),
        })),
    ))
}

/// DELETE /token
/// Log out by expiring the session cookie. Tokens are stateless, so there is
/// nothing to revoke server-side.
pub async fn logout(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let clear_cookie = state.auth().clear_cookie();
    (
        [(SET_COOKIE, clear_cookie)],
        Json(ApiResponse::success("Logged out".to_string())),
    )
}

/// GET /token
/// Echo the current session's token and account if a valid cookie is
/// present; `data` is null otherwise (not an error).
pub async fn get_token(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Json<ApiResponse<Option<AccountToken>>>, ApiError> {
    let Some(cookie) = jar.get(state.auth().cookie_name()) else {
        return Ok(Json(ApiResponse::success(None)));
    };
    let token = cookie.value().to_string();

    let Ok(claims) = state.auth().verify(&token) else {
        return Ok(Json(ApiResponse::success(None)));
    };

    let Some(user) = state.store().get_user(&claims.sub).await? else {
        return Ok(Json(ApiResponse::success(None)));
    };

    Ok(Json(ApiResponse::success(Some(AccountToken {
        access_token: token,
        token_type: "Bearer".to_string(),
        user: UserDto::from(user),
    }))))
}
