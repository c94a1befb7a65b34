//! Database operations for `users`, `sessions`, and `user_profiles`.
//!
//! Session tokens are opaque random strings handed to the browser; only their
//! SHA-256 digest is stored, so a leaked table cannot be replayed as cookies.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `users` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The user behind a live session, as resolved by [`find_session_user`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
}

/// A row from the `user_profiles` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn token_digest(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

// ---------------------------------------------------------------------------
// users operations
// ---------------------------------------------------------------------------

/// Inserts a new user.
///
/// The caller supplies an already-hashed password. A duplicate email violates
/// the unique constraint and surfaces as [`DbError::Sqlx`]; callers map that
/// to a conflict response.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_user(pool: &PgPool, email: &str, password_hash: &str) -> Result<UserRow, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (email, password_hash) \
         VALUES ($1, $2) \
         RETURNING id, email, password_hash, created_at, updated_at",
    )
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Looks up a user by email, if one exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, email, password_hash, created_at, updated_at \
         FROM users \
         WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

// ---------------------------------------------------------------------------
// sessions operations
// ---------------------------------------------------------------------------

/// Stores a new session for `user_id`, valid until `expires_at`.
///
/// Only the digest of `token` is persisted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_session(
    pool: &PgPool,
    user_id: Uuid,
    token: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO sessions (token_digest, user_id, expires_at) \
         VALUES ($1, $2, $3)",
    )
    .bind(token_digest(token))
    .bind(user_id)
    .bind(expires_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Resolves a presented session token to its user.
///
/// Returns `None` for unknown tokens and for sessions past their expiry.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_session_user(pool: &PgPool, token: &str) -> Result<Option<SessionUser>, DbError> {
    let row = sqlx::query_as::<_, SessionUser>(
        "SELECT u.id, u.email \
         FROM sessions s \
         JOIN users u ON u.id = s.user_id \
         WHERE s.token_digest = $1 \
           AND s.expires_at > NOW()",
    )
    .bind(token_digest(token))
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Deletes the session for a presented token.
///
/// Returns `true` if a row was removed. Unknown tokens are a no-op so logout
/// is idempotent.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_session(pool: &PgPool, token: &str) -> Result<bool, DbError> {
    let rows_affected = sqlx::query("DELETE FROM sessions WHERE token_digest = $1")
        .bind(token_digest(token))
        .execute(pool)
        .await?
        .rows_affected();

    Ok(rows_affected > 0)
}

// ---------------------------------------------------------------------------
// user_profiles operations
// ---------------------------------------------------------------------------

/// Creates the profile row for a user if it does not exist yet.
///
/// Runs on every signup and login; an existing profile is left untouched, so
/// the name recorded at first sight wins.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn ensure_profile(pool: &PgPool, user_id: Uuid, name: &str) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO user_profiles (id, name) \
         VALUES ($1, $2) \
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(user_id)
    .bind(name)
    .execute(pool)
    .await?;

    Ok(())
}

/// Fetches a user's profile, if one exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_profile(pool: &PgPool, user_id: Uuid) -> Result<Option<ProfileRow>, DbError> {
    let row = sqlx::query_as::<_, ProfileRow>(
        "SELECT id, name, created_at, updated_at \
         FROM user_profiles \
         WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
