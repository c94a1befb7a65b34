//! Client for Google's OAuth 2.0 token service and the Search Console API.
//!
//! [`client::GscClient`] owns the outbound HTTP surface: consent-URL
//! construction, authorization-code and refresh-token exchanges, site listing,
//! and search-analytics queries. [`report`] maps raw response rows into the
//! shapes the dashboard consumes.

pub mod client;
pub mod error;
pub mod report;
pub mod types;

pub use client::{GscClient, WEBMASTERS_READONLY_SCOPE};
pub use error::GscError;
pub use report::{
    pages_from_rows, summary_from_rows, time_series_from_rows, PageRow, SearchSummary,
    TimeSeriesPoint,
};
pub use types::{ApiRow, Dimension, QueryRequest, SiteEntry, TokenGrant};
