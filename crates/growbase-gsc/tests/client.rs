//! Integration tests for `GscClient` using wiremock HTTP mocks.
//!
//! One mock server stands in for all three Google endpoints; the client is
//! pointed at distinct paths on it so token and API traffic stay separable.

use growbase_gsc::{Dimension, GscClient, GscError, QueryRequest};
use wiremock::matchers::{body_string_contains, header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(server: &MockServer) -> GscClient {
    let uri = server.uri();
    GscClient::with_endpoints(
        "test-client-id",
        "test-client-secret",
        30,
        &format!("{uri}/o/oauth2/v2/auth"),
        &format!("{uri}/token"),
        &uri,
    )
    .expect("client construction should not fail")
}

fn page_query(limit: u32) -> QueryRequest {
    QueryRequest {
        start_date: "2024-01-01".to_string(),
        end_date: "2024-01-28".to_string(),
        dimensions: vec![Dimension::Page],
        row_limit: Some(limit),
    }
}

// ---------------------------------------------------------------------------
// Token endpoint
// ---------------------------------------------------------------------------

#[tokio::test]
async fn exchange_code_posts_form_and_parses_grant() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code-123"))
        .and(body_string_contains("client_id=test-client-id"))
        .and(body_string_contains("client_secret=test-client-secret"))
        .and(body_string_contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fapi%2Fgsc%2Fcallback",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "ya29.fresh-access",
            "refresh_token": "1//refresh",
            "expires_in": 3599,
            "scope": "https://www.googleapis.com/auth/webmasters.readonly",
            "token_type": "Bearer"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let grant = client
        .exchange_code("auth-code-123", "http://localhost:3000/api/gsc/callback")
        .await
        .expect("exchange should succeed");

    assert_eq!(grant.access_token, "ya29.fresh-access");
    assert_eq!(grant.refresh_token.as_deref(), Some("1//refresh"));
    assert_eq!(grant.expires_in, 3599);
    assert_eq!(grant.token_type.as_deref(), Some("Bearer"));
}

#[tokio::test]
async fn exchange_code_surfaces_oauth_error_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Bad Request"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client
        .exchange_code("expired-code", "http://localhost:3000/api/gsc/callback")
        .await
        .expect_err("exchange should fail");

    match err {
        GscError::TokenEndpoint(msg) => {
            assert!(msg.contains("invalid_grant"), "message was: {msg}");
            assert!(msg.contains("Bad Request"), "message was: {msg}");
        }
        other => panic!("expected TokenEndpoint, got: {other:?}"),
    }
}

#[tokio::test]
async fn refresh_posts_refresh_grant_and_returns_new_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=1%2F%2Fstored-refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "ya29.refreshed",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let token = client
        .refresh_access_token("1//stored-refresh")
        .await
        .expect("refresh should succeed");

    assert_eq!(token, "ya29.refreshed");
}

#[tokio::test]
async fn refresh_maps_plain_http_failure_to_token_endpoint_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client
        .refresh_access_token("1//revoked")
        .await
        .expect_err("refresh should fail");

    match err {
        GscError::TokenEndpoint(msg) => {
            assert!(msg.contains("401"), "message was: {msg}");
        }
        other => panic!("expected TokenEndpoint, got: {other:?}"),
    }
}

#[tokio::test]
async fn refresh_rejects_success_body_without_access_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token_type": "Bearer"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client
        .refresh_access_token("1//odd")
        .await
        .expect_err("refresh should fail");

    assert!(matches!(err, GscError::TokenEndpoint(_)), "got: {err:?}");
}

// ---------------------------------------------------------------------------
// Site listing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_sites_sends_bearer_and_parses_entries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sites"))
        .and(header("authorization", "Bearer ya29.access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "siteEntry": [
                { "siteUrl": "https://example.com/", "permissionLevel": "siteFullUser" },
                { "siteUrl": "sc-domain:example.org", "permissionLevel": "siteOwner" }
            ]
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let sites = client
        .list_sites("ya29.access")
        .await
        .expect("listing should succeed");

    assert_eq!(sites.len(), 2);
    assert_eq!(sites[0].site_url, "https://example.com/");
    assert_eq!(sites[0].permission_level, "siteFullUser");
    assert_eq!(sites[1].permission_level, "siteOwner");
}

#[tokio::test]
async fn list_sites_with_no_properties_is_empty() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let sites = client
        .list_sites("ya29.access")
        .await
        .expect("listing should succeed");

    assert!(sites.is_empty());
}

#[tokio::test]
async fn list_sites_maps_http_failure_to_http_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sites"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client
        .list_sites("ya29.limited")
        .await
        .expect_err("listing should fail");

    assert!(matches!(err, GscError::Http(_)), "got: {err:?}");
}

// ---------------------------------------------------------------------------
// Search analytics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn query_posts_dimensions_and_row_limit_and_parses_rows() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/sites/.+/searchAnalytics/query$"))
        .and(header("authorization", "Bearer ya29.access"))
        .and(body_string_contains(r#""startDate":"2024-01-01""#))
        .and(body_string_contains(r#""endDate":"2024-01-28""#))
        .and(body_string_contains(r#""dimensions":["page"]"#))
        .and(body_string_contains(r#""rowLimit":10"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "rows": [
                { "keys": ["https://example.com/pricing"], "clicks": 31, "impressions": 520, "ctr": 0.0596, "position": 3.4 },
                { "keys": ["https://example.com/blog"], "clicks": 18, "impressions": 900, "ctr": 0.02, "position": 11.8 }
            ],
            "responseAggregationType": "byPage"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let rows = client
        .query_search_analytics("ya29.access", "https://example.com/", &page_query(10))
        .await
        .expect("query should succeed");

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].keys, vec!["https://example.com/pricing"]);
    assert_eq!(rows[0].clicks, 31);
    assert_eq!(rows[1].impressions, 900);
}

#[tokio::test]
async fn query_carries_site_url_as_single_encoded_segment() {
    let server = MockServer::start().await;

    // Exact path carries the percent-encoded property identifier.
    Mock::given(method("POST"))
        .and(path_regex(r"^/sites/sc%2Ddomain%3Aexample%2Ecom/searchAnalytics/query$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let rows = client
        .query_search_analytics("ya29.access", "sc-domain:example.com", &page_query(5))
        .await
        .expect("query should succeed");

    assert!(rows.is_empty());
}

#[tokio::test]
async fn query_with_no_rows_is_empty() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/sites/.+/searchAnalytics/query$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "responseAggregationType": "auto"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let rows = client
        .query_search_analytics("ya29.access", "https://example.com/", &page_query(10))
        .await
        .expect("query should succeed");

    assert!(rows.is_empty());
}

#[tokio::test]
async fn query_maps_http_failure_to_http_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/sites/.+/searchAnalytics/query$"))
        .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client
        .query_search_analytics("ya29.access", "https://example.com/", &page_query(10))
        .await
        .expect_err("query should fail");

    assert!(matches!(err, GscError::Http(_)), "got: {err:?}");
}
