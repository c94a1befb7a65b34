//! Database operations for `gsc_connections` — stored Search Console OAuth
//! grants, one row per `(user_id, site_url)`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `gsc_connections` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConnectionRow {
    pub id: i64,
    pub user_id: Uuid,
    pub site_url: String,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub scope: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Field set written by the OAuth callback.
#[derive(Debug, Clone)]
pub struct NewConnection {
    pub user_id: Uuid,
    pub site_url: String,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub scope: String,
}

// ---------------------------------------------------------------------------
// gsc_connections operations
// ---------------------------------------------------------------------------

/// Upserts a connection row.
///
/// Conflicts on `(user_id, site_url)` replace every token field and bump
/// `updated_at`, so re-running the OAuth flow for the same site swaps in the
/// newest grant in place.
///
/// Returns the internal `id` of the upserted row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_connection(pool: &PgPool, conn: &NewConnection) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar::<_, i64>(
        "INSERT INTO gsc_connections \
             (user_id, site_url, access_token, refresh_token, token_type, expires_at, scope) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         ON CONFLICT (user_id, site_url) DO UPDATE SET \
             access_token  = EXCLUDED.access_token, \
             refresh_token = EXCLUDED.refresh_token, \
             token_type    = EXCLUDED.token_type, \
             expires_at    = EXCLUDED.expires_at, \
             scope         = EXCLUDED.scope, \
             updated_at    = NOW() \
         RETURNING id",
    )
    .bind(conn.user_id)
    .bind(&conn.site_url)
    .bind(&conn.access_token)
    .bind(&conn.refresh_token)
    .bind(&conn.token_type)
    .bind(conn.expires_at)
    .bind(&conn.scope)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Returns the user's connection, if any.
///
/// The connect flow stores one site per user (first owned site, else first
/// listed), so this reads "the" connection; ordering makes the pick
/// deterministic should older data carry several.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_connection_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<ConnectionRow>, DbError> {
    let row = sqlx::query_as::<_, ConnectionRow>(
        "SELECT id, user_id, site_url, access_token, refresh_token, token_type, \
                expires_at, scope, created_at, updated_at \
         FROM gsc_connections \
         WHERE user_id = $1 \
         ORDER BY created_at, id \
         LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Overwrites the stored access token after a refresh.
///
/// Keyed by `user_id` alone and unconditional: whatever token and expiry the
/// refresher produced replaces what is there, across all of the user's rows.
///
/// Returns the number of rows updated (zero when the user has no connection).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_access_token(
    pool: &PgPool,
    user_id: Uuid,
    access_token: &str,
    expires_at: DateTime<Utc>,
) -> Result<u64, DbError> {
    let rows_affected = sqlx::query(
        "UPDATE gsc_connections \
         SET access_token = $2, expires_at = $3, updated_at = NOW() \
         WHERE user_id = $1",
    )
    .bind(user_id)
    .bind(access_token)
    .bind(expires_at)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(rows_affected)
}

/// Whether the user has any stored connection at all.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn connection_exists(pool: &PgPool, user_id: Uuid) -> Result<bool, DbError> {
    let exists: bool =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM gsc_connections WHERE user_id = $1)")
            .bind(user_id)
            .fetch_one(pool)
            .await?;

    Ok(exists)
}
