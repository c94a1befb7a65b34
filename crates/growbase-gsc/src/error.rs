use thiserror::Error;

/// Errors returned by the Google OAuth / Search Console client.
#[derive(Debug, Error)]
pub enum GscError {
    /// Network or TLS failure from the underlying HTTP client, or a non-2xx
    /// status from a Search Console endpoint.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The token endpoint rejected an exchange: non-2xx status or an OAuth
    /// error body (`invalid_grant` and friends).
    #[error("token endpoint error: {0}")]
    TokenEndpoint(String),

    /// Client misconfiguration, e.g. an endpoint URL that does not parse.
    #[error("Search Console API error: {0}")]
    Api(String),

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}
