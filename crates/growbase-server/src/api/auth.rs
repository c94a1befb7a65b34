//! First-party identity handlers: signup, login, logout, session introspection.
//!
//! Passwords are stored as argon2 hashes; session tokens are random 256-bit
//! values handed to the client verbatim and persisted only as digests.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderName, StatusCode},
    Extension, Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::{session_token_from_headers, CurrentUser, RequestId, SESSION_COOKIE};

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

// ---------------------------------------------------------------------------
// Request/response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(super) struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub(super) struct SessionResponse {
    pub user_id: Uuid,
    pub email: String,
    pub session_token: String,
}

#[derive(Debug, Serialize)]
pub(super) struct MeResponse {
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
}

// ---------------------------------------------------------------------------
// Password and session helpers
// ---------------------------------------------------------------------------

fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
        .is_ok()
}

fn mint_session_token() -> String {
    let bytes: [u8; 32] = rand::random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn session_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/")
}

fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
}

/// Display name for a fresh profile: the provided name, else the email's
/// local part, else a generic placeholder.
fn display_name(name: Option<&str>, email: &str) -> String {
    if let Some(name) = name {
        let trimmed = name.trim();
        if !trimmed.is_empty() {
            return trimmed.to_owned();
        }
    }
    let local = email.split('@').next().unwrap_or("").trim();
    if local.is_empty() {
        "User".to_owned()
    } else {
        local.to_owned()
    }
}

fn validate_credentials(request_id: &str, email: &str, password: &str) -> Result<(), ApiError> {
    if email.len() < 3 || !email.contains('@') {
        return Err(ApiError::new(
            request_id,
            "validation_error",
            "email must be a valid address",
        ));
    }
    if password.len() < 8 {
        return Err(ApiError::new(
            request_id,
            "validation_error",
            "password must be at least 8 characters",
        ));
    }
    Ok(())
}

fn invalid_credentials(request_id: &str) -> ApiError {
    // One message for unknown email and wrong password alike.
    ApiError::new(request_id, "unauthorized", "invalid email or password")
}

fn map_unique_violation(request_id: &str, e: &growbase_db::DbError) -> ApiError {
    if let growbase_db::DbError::Sqlx(sqlx::Error::Database(db_err)) = e {
        if db_err.code().as_deref() == Some("23505") {
            return ApiError::new(
                request_id,
                "conflict",
                "an account with that email already exists",
            );
        }
    }
    map_db_error(request_id.to_owned(), e)
}

/// Mints a session token, persists its digest, and builds the response body.
async fn establish_session(
    state: &AppState,
    request_id: &str,
    user_id: Uuid,
    email: String,
) -> Result<SessionResponse, ApiError> {
    let token = mint_session_token();
    let expires_at = Utc::now() + Duration::hours(state.config.session_ttl_hours);
    growbase_db::create_session(&state.pool, user_id, &token, expires_at)
        .await
        .map_err(|e| map_db_error(request_id.to_owned(), &e))?;

    Ok(SessionResponse {
        user_id,
        email,
        session_token: token,
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/auth/signup — create an account and start a session.
pub(super) async fn signup(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<SignupRequest>,
) -> Result<(StatusCode, [(HeaderName, String); 1], Json<ApiResponse<SessionResponse>>), ApiError> {
    let rid = &req_id.0;

    let email = body.email.trim().to_lowercase();
    validate_credentials(rid, &email, &body.password)?;

    let password_hash = hash_password(&body.password).map_err(|e| {
        tracing::error!(error = %e, "password hashing failed");
        ApiError::new(rid, "internal_error", "failed to create account")
    })?;

    let user = growbase_db::create_user(&state.pool, &email, &password_hash)
        .await
        .map_err(|e| map_unique_violation(rid, &e))?;

    let name = display_name(body.name.as_deref(), &user.email);
    growbase_db::ensure_profile(&state.pool, user.id, &name)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let session = establish_session(&state, rid, user.id, user.email).await?;
    tracing::info!(user_id = %session.user_id, "account created");

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, session_cookie(&session.session_token))],
        Json(ApiResponse {
            data: session,
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// POST /api/auth/login — verify credentials and start a session.
pub(super) async fn login(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<LoginRequest>,
) -> Result<([(HeaderName, String); 1], Json<ApiResponse<SessionResponse>>), ApiError> {
    let rid = &req_id.0;

    let email = body.email.trim().to_lowercase();
    let user = growbase_db::find_user_by_email(&state.pool, &email)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    let Some(user) = user else {
        return Err(invalid_credentials(rid));
    };
    if !verify_password(&body.password, &user.password_hash) {
        return Err(invalid_credentials(rid));
    }

    // Fills a missing profile row only; an existing name wins.
    growbase_db::ensure_profile(&state.pool, user.id, &display_name(None, &user.email))
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let session = establish_session(&state, rid, user.id, user.email).await?;

    Ok((
        [(header::SET_COOKIE, session_cookie(&session.session_token))],
        Json(ApiResponse {
            data: session,
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// POST /api/auth/logout — delete the presented session and expire the cookie.
pub(super) async fn logout(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
) -> Result<([(HeaderName, String); 1], Json<ApiResponse<serde_json::Value>>), ApiError> {
    let rid = &req_id.0;

    if let Some(token) = session_token_from_headers(&headers) {
        growbase_db::delete_session(&state.pool, &token)
            .await
            .map_err(|e| map_db_error(rid.clone(), &e))?;
    }

    Ok((
        [(header::SET_COOKIE, expired_session_cookie())],
        Json(ApiResponse {
            data: serde_json::json!({ "logged_out": true }),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// GET /api/auth/me — identity and profile of the current session.
pub(super) async fn me(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<MeResponse>>, ApiError> {
    let rid = &req_id.0;

    let profile = growbase_db::get_profile(&state.pool, user.id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: MeResponse {
            user_id: user.id,
            email: user.email,
            name: profile.map(|p| p.name),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
