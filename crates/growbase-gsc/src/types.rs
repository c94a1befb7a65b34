//! OAuth token and Search Console wire types.
//!
//! Google's JSON is camelCase; everything here renames accordingly. Fields
//! whose absence means "no data" carry `#[serde(default)]` so thin responses
//! read as zeros and empty lists rather than parse failures.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Token endpoint
// ---------------------------------------------------------------------------

/// Raw token-endpoint response body.
///
/// The endpoint reuses one shape for success and failure: on success
/// `access_token` is populated, on failure `error`/`error_description` are.
/// Error bodies can arrive with a 200 as well, so both halves are optional.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenEndpointResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// A successful authorization-code exchange.
///
/// `refresh_token` is only issued on the first consent (or with
/// `prompt=consent`); `expires_in` is the provider's declared access-token
/// lifetime in seconds.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    pub scope: Option<String>,
    pub token_type: Option<String>,
}

// ---------------------------------------------------------------------------
// Site listing
// ---------------------------------------------------------------------------

/// One verified property from the `sites` listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteEntry {
    pub site_url: String,
    /// `siteOwner`, `siteFullUser`, `siteRestrictedUser`, or `siteUnverifiedUser`.
    #[serde(default)]
    pub permission_level: String,
}

/// Response body of the `sites` listing; `siteEntry` is absent when the
/// account has no properties.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SitesResponse {
    #[serde(default)]
    pub site_entry: Vec<SiteEntry>,
}

// ---------------------------------------------------------------------------
// Search analytics
// ---------------------------------------------------------------------------

/// Row grouping for a search-analytics query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Date,
    Page,
}

/// Request body for `searchAnalytics/query`.
///
/// `dimensions` is always sent, even empty: an empty list asks for one
/// aggregate row over the whole range. `row_limit` is omitted unless set.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub start_date: String,
    pub end_date: String,
    pub dimensions: Vec<Dimension>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_limit: Option<u32>,
}

/// One row of a search-analytics response.
///
/// `keys` holds the dimension values in request order (a date or a page URL
/// here); it is empty for the aggregate query.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiRow {
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub clicks: u64,
    #[serde(default)]
    pub impressions: u64,
    #[serde(default)]
    pub ctr: f64,
    #[serde(default)]
    pub position: f64,
}

/// Response body of `searchAnalytics/query`; `rows` is absent when the range
/// has no data.
#[derive(Debug, Deserialize)]
pub(crate) struct QueryResponse {
    #[serde(default)]
    pub rows: Vec<ApiRow>,
}
