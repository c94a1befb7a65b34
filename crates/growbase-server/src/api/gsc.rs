//! Search Console OAuth handshake and data handlers.
//!
//! The callback is browser-facing: every outcome, success or failure, is a
//! redirect back to the dashboard with a query flag the frontend renders.
//! Failure codes: `access_denied`, `invalid_request`, `unauthorized`,
//! `token_exchange_failed`, `fetch_sites_failed`, `no_sites_found`,
//! `storage_failed`.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Redirect,
    Extension, Json,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use growbase_core::DateRange;
use growbase_db::{NewConnection, SessionUser};
use growbase_gsc::{PageRow, SearchSummary, SiteEntry, TimeSeriesPoint, WEBMASTERS_READONLY_SCOPE};

use crate::middleware::{session_token_from_headers, CurrentUser, RequestId};
use crate::search_console;

use super::{normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

// ---------------------------------------------------------------------------
// OAuth state
// ---------------------------------------------------------------------------

/// Round-trips through the provider's `state` parameter. Base64-encoded JSON,
/// not signed; the callback independently re-checks the session and accepts
/// the state only when both name the same user.
#[derive(Debug, Serialize, Deserialize)]
struct StatePayload {
    user_id: Uuid,
}

fn encode_state(request_id: &str, user_id: Uuid) -> Result<String, ApiError> {
    let payload = serde_json::to_vec(&StatePayload { user_id }).map_err(|e| {
        tracing::error!(error = %e, "state encoding failed");
        ApiError::new(request_id, "internal_error", "failed to start authorization")
    })?;
    Ok(URL_SAFE_NO_PAD.encode(payload))
}

fn decode_state(raw: &str) -> Option<Uuid> {
    let bytes = URL_SAFE_NO_PAD.decode(raw).ok()?;
    let payload: StatePayload = serde_json::from_slice(&bytes).ok()?;
    Some(payload.user_id)
}

fn callback_uri(public_base_url: &str) -> String {
    format!("{public_base_url}/api/gsc/callback")
}

fn dashboard_redirect(public_base_url: &str, query: &str) -> Redirect {
    Redirect::temporary(&format!("{public_base_url}/dashboard?{query}"))
}

/// First owned property wins; an account with only delegated access falls
/// back to whatever the API listed first.
fn pick_site(sites: &[SiteEntry]) -> Option<&SiteEntry> {
    sites
        .iter()
        .find(|site| site.permission_level == "siteOwner")
        .or_else(|| sites.first())
}

// ---------------------------------------------------------------------------
// Handshake handlers
// ---------------------------------------------------------------------------

/// GET /api/gsc/auth — start the consent flow for the current user.
pub(super) async fn start_auth(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Redirect, ApiError> {
    let state_param = encode_state(&req_id.0, user.id)?;
    let redirect_uri = callback_uri(&state.config.public_base_url);
    let url = state.gsc.authorization_url(&redirect_uri, &state_param);
    Ok(Redirect::temporary(url.as_str()))
}

#[derive(Debug, Deserialize)]
pub(super) struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// GET /api/gsc/callback — the provider's redirect target.
pub(super) async fn oauth_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    match handle_callback(&state, &headers, params).await {
        Ok(()) => dashboard_redirect(&state.config.public_base_url, "gsc_success=true"),
        Err(code) => {
            dashboard_redirect(&state.config.public_base_url, &format!("gsc_error={code}"))
        }
    }
}

async fn handle_callback(
    state: &AppState,
    headers: &HeaderMap,
    params: CallbackParams,
) -> Result<(), &'static str> {
    if let Some(error) = params.error {
        tracing::info!(%error, "authorization declined at the consent screen");
        return Err("access_denied");
    }
    let (Some(code), Some(raw_state)) = (params.code, params.state) else {
        tracing::warn!("callback missing code or state");
        return Err("invalid_request");
    };
    let Some(state_user_id) = decode_state(&raw_state) else {
        tracing::warn!("callback state failed to decode");
        return Err("invalid_request");
    };

    let Some(session_user) = session_user_from_headers(state, headers).await else {
        tracing::warn!("callback without a valid session");
        return Err("unauthorized");
    };
    if session_user.id != state_user_id {
        tracing::warn!(
            session_user = %session_user.id,
            state_user = %state_user_id,
            "callback state names a different user"
        );
        return Err("unauthorized");
    }

    let redirect_uri = callback_uri(&state.config.public_base_url);
    let grant = match state.gsc.exchange_code(&code, &redirect_uri).await {
        Ok(grant) => grant,
        Err(e) => {
            tracing::warn!(user_id = %session_user.id, error = %e, "authorization code exchange failed");
            return Err("token_exchange_failed");
        }
    };
    let Some(refresh_token) = grant.refresh_token else {
        // Without offline credentials the connection dies within the hour.
        tracing::warn!(user_id = %session_user.id, "grant carried no refresh token");
        return Err("token_exchange_failed");
    };

    let sites = match state.gsc.list_sites(&grant.access_token).await {
        Ok(sites) => sites,
        Err(e) => {
            tracing::warn!(user_id = %session_user.id, error = %e, "site listing failed");
            return Err("fetch_sites_failed");
        }
    };
    let Some(site) = pick_site(&sites) else {
        tracing::info!(user_id = %session_user.id, "account has no Search Console properties");
        return Err("no_sites_found");
    };

    let connection = NewConnection {
        user_id: session_user.id,
        site_url: site.site_url.clone(),
        access_token: grant.access_token,
        refresh_token,
        token_type: grant.token_type.unwrap_or_else(|| "Bearer".to_owned()),
        expires_at: Utc::now() + Duration::seconds(grant.expires_in),
        scope: grant
            .scope
            .unwrap_or_else(|| WEBMASTERS_READONLY_SCOPE.to_owned()),
    };
    if let Err(e) = growbase_db::upsert_connection(&state.pool, &connection).await {
        tracing::error!(user_id = %session_user.id, error = %e, "failed to store connection");
        return Err("storage_failed");
    }

    tracing::info!(
        user_id = %session_user.id,
        site_url = %connection.site_url,
        "Search Console connected"
    );
    Ok(())
}

/// Session lookup for the callback, which sits outside `require_session`.
async fn session_user_from_headers(state: &AppState, headers: &HeaderMap) -> Option<SessionUser> {
    let token = session_token_from_headers(headers)?;
    match growbase_db::find_session_user(&state.pool, &token).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!(error = %e, "session lookup failed during callback");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Data handlers
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(super) struct ConnectionStatus {
    pub connected: bool,
}

/// GET /api/gsc/status — whether the user has a stored connection.
pub(super) async fn connection_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<CurrentUser>,
) -> Json<ApiResponse<ConnectionStatus>> {
    let connected = search_console::is_connected(&state.pool, user.id).await;
    Json(ApiResponse {
        data: ConnectionStatus { connected },
        meta: ResponseMeta::new(req_id.0),
    })
}

#[derive(Debug, Deserialize)]
pub(super) struct SearchDataQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub(super) struct SearchDataResponse {
    pub summary: SearchSummary,
    pub time_series: Vec<TimeSeriesPoint>,
    pub top_pages: Vec<PageRow>,
}

/// GET /api/gsc/data — the three dashboard queries, fanned out concurrently.
///
/// Each leg degrades to its zero/empty shape on its own; a partially failed
/// fan-out still answers 200 with whatever survived.
pub(super) async fn search_data(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<SearchDataQuery>,
) -> Result<Json<ApiResponse<SearchDataResponse>>, ApiError> {
    let rid = &req_id.0;

    let (Some(start_date), Some(end_date)) = (query.start_date, query.end_date) else {
        return Err(ApiError::new(
            rid,
            "bad_request",
            "start_date and end_date are required",
        ));
    };
    let range = DateRange::new(start_date, end_date);
    let limit = normalize_limit(query.limit);

    let (summary, time_series, top_pages) = tokio::join!(
        search_console::fetch_summary(&state.pool, &state.gsc, user.id, &range),
        search_console::fetch_time_series(&state.pool, &state.gsc, user.id, &range),
        search_console::fetch_top_pages(&state.pool, &state.gsc, user.id, &range, limit),
    );

    Ok(Json(ApiResponse {
        data: SearchDataResponse {
            summary,
            time_series,
            top_pages,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_round_trips_through_base64_json() {
        let user_id = Uuid::new_v4();
        let encoded = encode_state("req-1", user_id).expect("encode");
        assert_eq!(decode_state(&encoded), Some(user_id));
    }

    #[test]
    fn decode_state_rejects_garbage() {
        assert_eq!(decode_state("not base64!!"), None);
        assert_eq!(decode_state(&URL_SAFE_NO_PAD.encode(b"{\"nope\":1}")), None);
    }

    #[test]
    fn pick_site_prefers_owner_over_order() {
        let sites = vec![
            SiteEntry {
                site_url: "https://delegated.example.com/".to_owned(),
                permission_level: "siteFullUser".to_owned(),
            },
            SiteEntry {
                site_url: "sc-domain:owned.example.com".to_owned(),
                permission_level: "siteOwner".to_owned(),
            },
        ];
        let site = pick_site(&sites).expect("site");
        assert_eq!(site.site_url, "sc-domain:owned.example.com");
    }

    #[test]
    fn pick_site_falls_back_to_first_listed() {
        let sites = vec![
            SiteEntry {
                site_url: "https://first.example.com/".to_owned(),
                permission_level: "siteFullUser".to_owned(),
            },
            SiteEntry {
                site_url: "https://second.example.com/".to_owned(),
                permission_level: "siteRestrictedUser".to_owned(),
            },
        ];
        let site = pick_site(&sites).expect("site");
        assert_eq!(site.site_url, "https://first.example.com/");
    }

    #[test]
    fn pick_site_handles_empty_list() {
        assert!(pick_site(&[]).is_none());
    }

    #[test]
    fn callback_uri_extends_public_base() {
        assert_eq!(
            callback_uri("http://localhost:3000"),
            "http://localhost:3000/api/gsc/callback"
        );
    }
}
