use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// The authenticated user, resolved by [`require_session`] and stored as a
/// request extension for handlers behind it.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
}

/// Name of the browser session cookie.
pub(crate) const SESSION_COOKIE: &str = "growbase_session";

#[derive(Debug, Serialize)]
struct MiddlewareErrorBody {
    error: MiddlewareError,
}

#[derive(Debug, Serialize)]
struct MiddlewareError {
    code: &'static str,
    message: &'static str,
}

fn error_response(status: StatusCode, code: &'static str, message: &'static str) -> Response {
    (
        status,
        Json(MiddlewareErrorBody {
            error: MiddlewareError { code, message },
        }),
    )
        .into_response()
}

fn unauthorized() -> Response {
    error_response(
        StatusCode::UNAUTHORIZED,
        "unauthorized",
        "missing or invalid session token",
    )
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware gating routes behind a valid session.
///
/// The token is taken from `Authorization: Bearer …` first, then from the
/// `growbase_session` cookie, and resolved against the `sessions` table.
/// On success the handler sees a [`CurrentUser`] extension; otherwise the
/// request ends here with a 401.
pub async fn require_session(State(pool): State<PgPool>, mut req: Request, next: Next) -> Response {
    let Some(token) = session_token_from_headers(req.headers()) else {
        return unauthorized();
    };

    match growbase_db::find_session_user(&pool, &token).await {
        Ok(Some(user)) => {
            req.extensions_mut().insert(CurrentUser {
                id: user.id,
                email: user.email,
            });
            next.run(req).await
        }
        Ok(None) => unauthorized(),
        Err(e) => {
            tracing::error!(error = %e, "session lookup failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "session lookup failed",
            )
        }
    }
}

/// Pulls the presented session token out of the request headers.
///
/// Also used directly by the OAuth callback (which must redirect rather than
/// 401) and by logout (which needs the raw token to delete its row).
pub(crate) fn session_token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = bearer_token(headers.get(AUTHORIZATION)) {
        return Some(token.to_owned());
    }
    cookie_token(headers.get(COOKIE))
}

fn bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn cookie_token(value: Option<&HeaderValue>) -> Option<String> {
    let cookies = value?.to_str().ok()?;
    cookies.split(';').find_map(|cookie| {
        let token = cookie
            .trim()
            .strip_prefix(SESSION_COOKIE)?
            .strip_prefix('=')?
            .trim();
        (!token.is_empty()).then(|| token.to_owned())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_accepts_valid_header() {
        let header = HeaderValue::from_static("Bearer test-token");
        assert_eq!(bearer_token(Some(&header)), Some("test-token"));
    }

    #[test]
    fn bearer_token_rejects_non_bearer_header() {
        let header = HeaderValue::from_static("Basic abc123");
        assert_eq!(bearer_token(Some(&header)), None);
    }

    #[test]
    fn bearer_token_rejects_empty_token() {
        let header = HeaderValue::from_static("Bearer   ");
        assert_eq!(bearer_token(Some(&header)), None);
    }

    #[test]
    fn cookie_token_finds_session_among_other_cookies() {
        let header = HeaderValue::from_static("theme=dark; growbase_session=abc123; lang=en");
        assert_eq!(cookie_token(Some(&header)), Some("abc123".to_owned()));
    }

    #[test]
    fn cookie_token_skips_empty_value() {
        let header = HeaderValue::from_static("growbase_session=; theme=dark");
        assert_eq!(cookie_token(Some(&header)), None);
    }

    #[test]
    fn cookie_token_ignores_prefixed_cookie_names() {
        let header = HeaderValue::from_static("not_growbase_session=nope");
        assert_eq!(cookie_token(Some(&header)), None);
    }

    #[test]
    fn session_token_prefers_authorization_header_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        headers.insert(COOKIE, HeaderValue::from_static("growbase_session=from-cookie"));
        assert_eq!(
            session_token_from_headers(&headers),
            Some("from-header".to_owned())
        );
    }
}
