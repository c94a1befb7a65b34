//! HTTP client for Google's OAuth 2.0 token service and the Search Console API.
//!
//! Wraps `reqwest` with credential management, endpoint configuration, and
//! typed response deserialization. The browser consent URL is built here too,
//! so every Google URL the app emits comes from one place.

use std::time::Duration;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::{Client, Url};

use crate::error::GscError;
use crate::types::{
    ApiRow, QueryRequest, QueryResponse, SiteEntry, SitesResponse, TokenEndpointResponse,
    TokenGrant,
};

const DEFAULT_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/webmasters/v3/";

/// OAuth scope for read-only Search Console access.
pub const WEBMASTERS_READONLY_SCOPE: &str =
    "https://www.googleapis.com/auth/webmasters.readonly";

/// Client for Google's OAuth token service and the Search Console API.
///
/// Manages the HTTP client, the OAuth credential pair, and the three Google
/// endpoints. Use [`GscClient::new`] for production or
/// [`GscClient::with_endpoints`] to point at a mock server in tests.
pub struct GscClient {
    client: Client,
    client_id: String,
    client_secret: String,
    auth_url: Url,
    token_url: Url,
    api_base_url: Url,
}

impl GscClient {
    /// Creates a new client pointed at the production Google endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`GscError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed.
    pub fn new(
        client_id: &str,
        client_secret: &str,
        timeout_secs: u64,
    ) -> Result<Self, GscError> {
        Self::with_endpoints(
            client_id,
            client_secret,
            timeout_secs,
            DEFAULT_AUTH_URL,
            DEFAULT_TOKEN_URL,
            DEFAULT_API_BASE_URL,
        )
    }

    /// Creates a new client with custom endpoints (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`GscError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed, or [`GscError::Api`] if any endpoint is not a valid URL.
    pub fn with_endpoints(
        client_id: &str,
        client_secret: &str,
        timeout_secs: u64,
        auth_url: &str,
        token_url: &str,
        api_base_url: &str,
    ) -> Result<Self, GscError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("growbase/0.1 (search-console)")
            .build()?;

        // Normalise: the API base must end with exactly one slash so joined
        // paths append rather than replace the last path segment. The auth and
        // token endpoints are complete URLs and are taken as given.
        let normalised = format!("{}/", api_base_url.trim_end_matches('/'));
        let api_base_url = parse_url(&normalised)?;

        Ok(Self {
            client,
            client_id: client_id.to_owned(),
            client_secret: client_secret.to_owned(),
            auth_url: parse_url(auth_url)?,
            token_url: parse_url(token_url)?,
            api_base_url,
        })
    }

    /// Builds the browser consent URL for the authorization-code flow.
    ///
    /// `access_type=offline` plus `prompt=consent` makes Google issue a
    /// refresh token on every pass through the flow, not just the first.
    #[must_use]
    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> Url {
        let mut url = self.auth_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("client_id", &self.client_id);
            pairs.append_pair("redirect_uri", redirect_uri);
            pairs.append_pair("response_type", "code");
            pairs.append_pair("scope", WEBMASTERS_READONLY_SCOPE);
            pairs.append_pair("access_type", "offline");
            pairs.append_pair("prompt", "consent");
            pairs.append_pair("state", state);
        }
        url
    }

    /// Exchanges an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// - [`GscError::TokenEndpoint`] if the endpoint rejects the code or the
    ///   response carries an OAuth error.
    /// - [`GscError::Http`] on network failure.
    /// - [`GscError::Deserialize`] if the response is not valid JSON.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenGrant, GscError> {
        let response = self
            .client
            .post(self.token_url.clone())
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await?;

        let body = read_token_response(response, "exchange_code").await?;
        let access_token = body.access_token.ok_or_else(|| {
            GscError::TokenEndpoint("exchange_code: response missing access_token".to_string())
        })?;

        Ok(TokenGrant {
            access_token,
            refresh_token: body.refresh_token,
            expires_in: body.expires_in.unwrap_or(3600),
            scope: body.scope,
            token_type: body.token_type,
        })
    }

    /// Trades a refresh token for a new access token.
    ///
    /// Only the access token is returned; the declared lifetime is ignored by
    /// callers, which assign their own fixed expiry.
    ///
    /// # Errors
    ///
    /// - [`GscError::TokenEndpoint`] if the grant is rejected (for a revoked
    ///   consent Google answers `invalid_grant`).
    /// - [`GscError::Http`] on network failure.
    /// - [`GscError::Deserialize`] if the response is not valid JSON.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<String, GscError> {
        let response = self
            .client
            .post(self.token_url.clone())
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        let body = read_token_response(response, "refresh_access_token").await?;
        body.access_token.ok_or_else(|| {
            GscError::TokenEndpoint(
                "refresh_access_token: response missing access_token".to_string(),
            )
        })
    }

    /// Lists the verified properties the token can read.
    ///
    /// An account with no properties yields an empty list, not an error.
    ///
    /// # Errors
    ///
    /// - [`GscError::Http`] on network failure or non-2xx HTTP status.
    /// - [`GscError::Deserialize`] if the response does not match the
    ///   expected shape.
    pub async fn list_sites(&self, access_token: &str) -> Result<Vec<SiteEntry>, GscError> {
        let url = self.api_url("sites")?;
        let response = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await?;
        let response = response.error_for_status()?;
        let body = response.text().await?;

        let parsed: SitesResponse =
            serde_json::from_str(&body).map_err(|e| GscError::Deserialize {
                context: "list_sites".to_string(),
                source: e,
            })?;

        Ok(parsed.site_entry)
    }

    /// Runs one search-analytics query against a property.
    ///
    /// A range with no data yields an empty list, not an error.
    ///
    /// # Errors
    ///
    /// - [`GscError::Http`] on network failure or non-2xx HTTP status.
    /// - [`GscError::Deserialize`] if the response does not match the
    ///   expected shape.
    pub async fn query_search_analytics(
        &self,
        access_token: &str,
        site_url: &str,
        query: &QueryRequest,
    ) -> Result<Vec<ApiRow>, GscError> {
        let url = self.api_url(&analytics_path(site_url))?;
        let response = self
            .client
            .post(url)
            .bearer_auth(access_token)
            .json(query)
            .send()
            .await?;
        let response = response.error_for_status()?;
        let body = response.text().await?;

        let parsed: QueryResponse =
            serde_json::from_str(&body).map_err(|e| GscError::Deserialize {
                context: format!("searchAnalytics/query({site_url})"),
                source: e,
            })?;

        Ok(parsed.rows)
    }

    /// Resolves a path against the API base URL.
    fn api_url(&self, path: &str) -> Result<Url, GscError> {
        self.api_base_url
            .join(path)
            .map_err(|e| GscError::Api(format!("invalid API path '{path}': {e}")))
    }
}

/// Builds the query path for a property, with the site URL carried as a
/// single percent-encoded path segment ("https://example.com/" and
/// "sc-domain:example.com" both contain segment-breaking characters).
fn analytics_path(site_url: &str) -> String {
    let encoded = utf8_percent_encode(site_url, NON_ALPHANUMERIC);
    format!("sites/{encoded}/searchAnalytics/query")
}

fn parse_url(raw: &str) -> Result<Url, GscError> {
    Url::parse(raw).map_err(|e| GscError::Api(format!("invalid URL '{raw}': {e}")))
}

/// Parses a token-endpoint response, folding HTTP-level and OAuth-level
/// failures into [`GscError::TokenEndpoint`].
async fn read_token_response(
    response: reqwest::Response,
    context: &str,
) -> Result<TokenEndpointResponse, GscError> {
    let status = response.status();
    let body = response.text().await?;

    let parsed: TokenEndpointResponse = match serde_json::from_str(&body) {
        Ok(parsed) => parsed,
        // 2xx with an unreadable body is a deserialization problem; a failure
        // status with one is just the failure.
        Err(e) if status.is_success() => {
            return Err(GscError::Deserialize {
                context: context.to_string(),
                source: e,
            })
        }
        Err(_) => return Err(GscError::TokenEndpoint(format!("{context}: HTTP {status}"))),
    };

    if let Some(error) = parsed.error {
        return Err(GscError::TokenEndpoint(match parsed.error_description {
            Some(description) => format!("{context}: {error}: {description}"),
            None => format!("{context}: {error}"),
        }));
    }
    if !status.is_success() {
        return Err(GscError::TokenEndpoint(format!("{context}: HTTP {status}")));
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(auth_url: &str, token_url: &str, api_base_url: &str) -> GscClient {
        GscClient::with_endpoints(
            "test-client-id",
            "test-client-secret",
            30,
            auth_url,
            token_url,
            api_base_url,
        )
        .expect("client construction should not fail")
    }

    fn default_client() -> GscClient {
        test_client(
            "https://accounts.google.com/o/oauth2/v2/auth",
            "https://oauth2.googleapis.com/token",
            "https://www.googleapis.com/webmasters/v3/",
        )
    }

    #[test]
    fn authorization_url_carries_full_offline_consent_parameter_set() {
        let client = default_client();
        let url = client.authorization_url("http://localhost:3000/api/gsc/callback", "state-123");

        assert!(url.as_str().starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let get = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
                .unwrap_or_default()
        };

        assert_eq!(get("client_id"), "test-client-id");
        assert_eq!(get("redirect_uri"), "http://localhost:3000/api/gsc/callback");
        assert_eq!(get("response_type"), "code");
        assert_eq!(get("scope"), WEBMASTERS_READONLY_SCOPE);
        assert_eq!(get("access_type"), "offline");
        assert_eq!(get("prompt"), "consent");
        assert_eq!(get("state"), "state-123");
    }

    #[test]
    fn authorization_url_percent_encodes_redirect_uri() {
        let client = default_client();
        let url = client.authorization_url("http://localhost:3000/api/gsc/callback", "s");
        assert!(
            url.as_str().contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fapi%2Fgsc%2Fcallback"),
            "redirect URI should be encoded: {url}"
        );
    }

    #[test]
    fn api_base_url_gains_exactly_one_trailing_slash() {
        let client = test_client(
            "https://accounts.google.com/o/oauth2/v2/auth",
            "https://oauth2.googleapis.com/token",
            "https://www.googleapis.com/webmasters/v3",
        );
        let url = client.api_url("sites").expect("join should succeed");
        assert_eq!(url.as_str(), "https://www.googleapis.com/webmasters/v3/sites");
    }

    #[test]
    fn analytics_path_encodes_url_properties_as_one_segment() {
        assert_eq!(
            analytics_path("https://example.com/"),
            "sites/https%3A%2F%2Fexample%2Ecom%2F/searchAnalytics/query"
        );
    }

    #[test]
    fn analytics_path_encodes_domain_properties_as_one_segment() {
        assert_eq!(
            analytics_path("sc-domain:example.com"),
            "sites/sc%2Ddomain%3Aexample%2Ecom/searchAnalytics/query"
        );
    }

    #[test]
    fn with_endpoints_rejects_invalid_urls() {
        let result = GscClient::with_endpoints("id", "secret", 30, "not a url", "also bad", "nope");
        assert!(matches!(result, Err(GscError::Api(_))));
    }
}
