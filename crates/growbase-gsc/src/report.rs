//! Dashboard-facing report shapes mapped from raw search-analytics rows.
//!
//! The mappings are deliberately dumb: first row wins for the aggregate,
//! dimension keys pass through verbatim, and provider row order is preserved
//! (the API already ranks top pages by clicks).

use serde::Serialize;

use crate::types::ApiRow;

/// Aggregate totals across the whole requested range.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchSummary {
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: f64,
    pub position: f64,
}

/// One day of traffic; `date` is the provider's row key (`YYYY-MM-DD`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesPoint {
    pub date: String,
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: f64,
    pub position: f64,
}

/// Totals for one page; `page` is the provider's row key (a full URL).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageRow {
    pub page: String,
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: f64,
    pub position: f64,
}

fn first_key(row: &ApiRow) -> String {
    row.keys.first().cloned().unwrap_or_default()
}

/// Collapses an aggregate (dimensionless) response into totals.
///
/// The aggregate query yields at most one row; no rows means no traffic in
/// the range, which reads as all zeros.
#[must_use]
pub fn summary_from_rows(rows: &[ApiRow]) -> SearchSummary {
    rows.first().map_or_else(SearchSummary::default, |row| SearchSummary {
        clicks: row.clicks,
        impressions: row.impressions,
        ctr: row.ctr,
        position: row.position,
    })
}

/// Maps `date`-dimension rows into daily points, in provider order.
#[must_use]
pub fn time_series_from_rows(rows: &[ApiRow]) -> Vec<TimeSeriesPoint> {
    rows.iter()
        .map(|row| TimeSeriesPoint {
            date: first_key(row),
            clicks: row.clicks,
            impressions: row.impressions,
            ctr: row.ctr,
            position: row.position,
        })
        .collect()
}

/// Maps `page`-dimension rows into per-page totals, in provider order.
#[must_use]
pub fn pages_from_rows(rows: &[ApiRow]) -> Vec<PageRow> {
    rows.iter()
        .map(|row| PageRow {
            page: first_key(row),
            clicks: row.clicks,
            impressions: row.impressions,
            ctr: row.ctr,
            position: row.position,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(keys: &[&str], clicks: u64, impressions: u64, ctr: f64, position: f64) -> ApiRow {
        ApiRow {
            keys: keys.iter().map(|k| (*k).to_string()).collect(),
            clicks,
            impressions,
            ctr,
            position,
        }
    }

    #[test]
    fn summary_of_no_rows_is_all_zeros() {
        assert_eq!(summary_from_rows(&[]), SearchSummary::default());
    }

    #[test]
    fn summary_takes_the_first_row() {
        let rows = vec![row(&[], 42, 1000, 0.042, 8.3), row(&[], 7, 70, 0.1, 1.0)];
        assert_eq!(
            summary_from_rows(&rows),
            SearchSummary {
                clicks: 42,
                impressions: 1000,
                ctr: 0.042,
                position: 8.3,
            }
        );
    }

    #[test]
    fn time_series_maps_date_key_through_verbatim() {
        let rows = vec![row(&["2024-01-01"], 10, 100, 0.1, 5.2)];
        assert_eq!(
            time_series_from_rows(&rows),
            vec![TimeSeriesPoint {
                date: "2024-01-01".to_string(),
                clicks: 10,
                impressions: 100,
                ctr: 0.1,
                position: 5.2,
            }]
        );
    }

    #[test]
    fn time_series_preserves_provider_order() {
        let rows = vec![
            row(&["2024-01-02"], 2, 20, 0.1, 3.0),
            row(&["2024-01-01"], 1, 10, 0.1, 4.0),
        ];
        let points = time_series_from_rows(&rows);
        assert_eq!(points[0].date, "2024-01-02");
        assert_eq!(points[1].date, "2024-01-01");
    }

    #[test]
    fn pages_preserve_provider_order_and_fields() {
        let rows = vec![
            row(&["https://example.com/a"], 30, 300, 0.1, 2.0),
            row(&["https://example.com/b"], 20, 400, 0.05, 4.5),
            row(&["https://example.com/c"], 10, 500, 0.02, 9.9),
        ];
        let pages = pages_from_rows(&rows);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].page, "https://example.com/a");
        assert_eq!(pages[1].page, "https://example.com/b");
        assert_eq!(pages[2].page, "https://example.com/c");
        assert_eq!(pages[1].clicks, 20);
        assert_eq!(pages[2].impressions, 500);
    }

    #[test]
    fn missing_dimension_key_maps_to_empty_string() {
        let rows = vec![row(&[], 1, 2, 0.5, 1.0)];
        assert_eq!(pages_from_rows(&rows)[0].page, "");
    }

    #[test]
    fn summary_serializes_whole_counts_without_decimals() {
        let summary = SearchSummary {
            clicks: 10,
            impressions: 100,
            ctr: 0.1,
            position: 5.2,
        };
        let rendered = serde_json::to_string(&summary).expect("serialize");
        assert_eq!(
            rendered,
            r#"{"clicks":10,"impressions":100,"ctr":0.1,"position":5.2}"#
        );
    }
}
