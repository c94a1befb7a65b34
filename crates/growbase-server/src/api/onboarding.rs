//! Onboarding questionnaire handlers ("company DNA").
//!
//! Submissions append to `company_dna`; readers see the newest row. A
//! configured webhook gets a copy of each submission on a spawned task that
//! never affects the HTTP response.

use std::time::Duration;

use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use growbase_db::{CompanyDnaRow, NewCompanyDna};

use crate::middleware::{CurrentUser, RequestId};

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

const WEBHOOK_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
pub(super) struct OnboardingRequest {
    pub company_name: String,
    pub company_website: String,
    pub target_market: String,
    pub target_language: String,
}

#[derive(Debug, Serialize)]
pub(super) struct OnboardingResponse {
    pub id: i64,
    pub company_name: String,
    pub company_website: String,
    pub target_market: String,
    pub target_language: String,
    pub created_at: DateTime<Utc>,
}

impl From<CompanyDnaRow> for OnboardingResponse {
    fn from(row: CompanyDnaRow) -> Self {
        Self {
            id: row.id,
            company_name: row.company_name,
            company_website: row.company_website,
            target_market: row.target_market,
            target_language: row.target_language,
            created_at: row.created_at,
        }
    }
}

fn required_field(request_id: &str, field: &str, value: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::new(
            request_id,
            "validation_error",
            format!("'{field}' is required"),
        ));
    }
    Ok(trimmed.to_owned())
}

/// Prefixes `https://` when the value carries no scheme, so bare domains
/// entered in the dialog become fetchable URLs.
fn normalize_website(raw: &str) -> String {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_owned()
    } else {
        format!("https://{raw}")
    }
}

async fn notify_webhook(url: String, payload: serde_json::Value) {
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(WEBHOOK_TIMEOUT_SECS))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(error = %e, "webhook client build failed");
            return;
        }
    };

    match client.post(&url).json(&payload).send().await {
        Ok(response) if response.status().is_success() => {
            tracing::debug!("onboarding webhook delivered");
        }
        Ok(response) => {
            tracing::warn!(status = %response.status(), "onboarding webhook rejected");
        }
        Err(e) => {
            tracing::warn!(error = %e, "onboarding webhook delivery failed");
        }
    }
}

/// POST /api/onboarding — store a questionnaire submission.
pub(super) async fn submit_onboarding(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<OnboardingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OnboardingResponse>>), ApiError> {
    let rid = &req_id.0;

    let dna = NewCompanyDna {
        company_name: required_field(rid, "company_name", &body.company_name)?,
        company_website: normalize_website(&required_field(
            rid,
            "company_website",
            &body.company_website,
        )?),
        target_market: required_field(rid, "target_market", &body.target_market)?,
        target_language: required_field(rid, "target_language", &body.target_language)?,
    };

    let row = growbase_db::insert_company_dna(&state.pool, user.id, &dna)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    if let Some(url) = state.config.onboarding_webhook_url.clone() {
        let payload = serde_json::json!({
            "user_id": user.id,
            "company_name": row.company_name,
            "company_website": row.company_website,
            "target_market": row.target_market,
            "target_language": row.target_language,
        });
        tokio::spawn(notify_webhook(url, payload));
    }

    tracing::info!(user_id = %user.id, "onboarding submitted");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: OnboardingResponse::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// GET /api/onboarding — the newest submission, or `data: null` before one
/// exists.
pub(super) async fn get_onboarding(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<Option<OnboardingResponse>>>, ApiError> {
    let rid = &req_id.0;

    let row = growbase_db::latest_company_dna_for_user(&state.pool, user.id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: row.map(OnboardingResponse::from),
        meta: ResponseMeta::new(req_id.0),
    }))
}
