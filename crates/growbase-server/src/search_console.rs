//! Access-token resolution and the three Search Console fetch operations.
//!
//! Every fetch resolves its own token and degrades to a zero/empty shape on
//! failure; "cannot fetch" and "no traffic" are indistinguishable to the
//! dashboard. One attempt per query, no retries.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use growbase_core::DateRange;
use growbase_db::ConnectionRow;
use growbase_gsc::{
    pages_from_rows, summary_from_rows, time_series_from_rows, Dimension, GscClient, PageRow,
    QueryRequest, SearchSummary, TimeSeriesPoint,
};

/// Refreshed access tokens are stored with a fixed one-hour lifetime,
/// independent of the lifetime the token endpoint declares.
const REFRESHED_TOKEN_TTL_SECS: i64 = 3600;

/// A usable access token plus the property it is scoped to.
pub struct ResolvedAccess {
    pub access_token: String,
    pub site_url: String,
}

/// Resolves a working access token for the user.
///
/// - No stored connection: `None`.
/// - Stored token still valid: returned as-is, no token-endpoint traffic.
/// - Stored token at or past expiry: exchanged for a fresh one, which is
///   persisted and returned. A failed refresh yields `None`, which callers
///   read the same as "not connected".
pub async fn resolve_valid_access(
    pool: &PgPool,
    gsc: &GscClient,
    user_id: Uuid,
) -> Option<ResolvedAccess> {
    let connection = match growbase_db::find_connection_for_user(pool, user_id).await {
        Ok(Some(row)) => row,
        Ok(None) => {
            tracing::info!(%user_id, "no Search Console connection");
            return None;
        }
        Err(e) => {
            tracing::error!(%user_id, error = %e, "connection lookup failed");
            return None;
        }
    };

    if Utc::now() < connection.expires_at {
        return Some(ResolvedAccess {
            access_token: connection.access_token,
            site_url: connection.site_url,
        });
    }

    refresh_connection(pool, gsc, &connection).await
}

/// Exchanges the stored refresh token and persists the result.
///
/// The write is keyed by `user_id` alone and its failure is non-fatal: the
/// fresh token still serves the current request.
async fn refresh_connection(
    pool: &PgPool,
    gsc: &GscClient,
    connection: &ConnectionRow,
) -> Option<ResolvedAccess> {
    let access_token = match gsc.refresh_access_token(&connection.refresh_token).await {
        Ok(token) => token,
        Err(e) => {
            tracing::warn!(user_id = %connection.user_id, error = %e, "access token refresh failed");
            return None;
        }
    };

    let expires_at = Utc::now() + Duration::seconds(REFRESHED_TOKEN_TTL_SECS);
    if let Err(e) =
        growbase_db::update_access_token(pool, connection.user_id, &access_token, expires_at).await
    {
        tracing::warn!(user_id = %connection.user_id, error = %e, "failed to persist refreshed access token");
    }

    Some(ResolvedAccess {
        access_token,
        site_url: connection.site_url.clone(),
    })
}

/// Whether the user has any stored connection.
pub async fn is_connected(pool: &PgPool, user_id: Uuid) -> bool {
    match growbase_db::connection_exists(pool, user_id).await {
        Ok(connected) => connected,
        Err(e) => {
            tracing::error!(%user_id, error = %e, "connection status lookup failed");
            false
        }
    }
}

/// Aggregate totals for the range. No data, no connection, and upstream
/// failure all read as zeros.
pub async fn fetch_summary(
    pool: &PgPool,
    gsc: &GscClient,
    user_id: Uuid,
    range: &DateRange,
) -> SearchSummary {
    let Some(access) = resolve_valid_access(pool, gsc, user_id).await else {
        return SearchSummary::default();
    };

    let query = QueryRequest {
        start_date: range.start_date.clone(),
        end_date: range.end_date.clone(),
        dimensions: Vec::new(),
        row_limit: None,
    };

    match gsc
        .query_search_analytics(&access.access_token, &access.site_url, &query)
        .await
    {
        Ok(rows) => summary_from_rows(&rows),
        Err(e) => {
            tracing::warn!(%user_id, range = %range, error = %e, "summary query returned no data");
            SearchSummary::default()
        }
    }
}

/// Daily points for the range, in provider order. Failures read as empty.
pub async fn fetch_time_series(
    pool: &PgPool,
    gsc: &GscClient,
    user_id: Uuid,
    range: &DateRange,
) -> Vec<TimeSeriesPoint> {
    let Some(access) = resolve_valid_access(pool, gsc, user_id).await else {
        return Vec::new();
    };

    let query = QueryRequest {
        start_date: range.start_date.clone(),
        end_date: range.end_date.clone(),
        dimensions: vec![Dimension::Date],
        row_limit: None,
    };

    match gsc
        .query_search_analytics(&access.access_token, &access.site_url, &query)
        .await
    {
        Ok(rows) => time_series_from_rows(&rows),
        Err(e) => {
            tracing::warn!(%user_id, range = %range, error = %e, "time series query returned no data");
            Vec::new()
        }
    }
}

/// Top pages for the range, at most `limit` rows, in provider order (the API
/// ranks by clicks). Failures read as empty.
pub async fn fetch_top_pages(
    pool: &PgPool,
    gsc: &GscClient,
    user_id: Uuid,
    range: &DateRange,
    limit: u32,
) -> Vec<PageRow> {
    let Some(access) = resolve_valid_access(pool, gsc, user_id).await else {
        return Vec::new();
    };

    let query = QueryRequest {
        start_date: range.start_date.clone(),
        end_date: range.end_date.clone(),
        dimensions: vec![Dimension::Page],
        row_limit: Some(limit),
    };

    match gsc
        .query_search_analytics(&access.access_token, &access.site_url, &query)
        .await
    {
        Ok(rows) => pages_from_rows(&rows),
        Err(e) => {
            tracing::warn!(%user_id, range = %range, error = %e, "top pages query returned no data");
            Vec::new()
        }
    }
}
