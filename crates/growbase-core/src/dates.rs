/// Inclusive calendar-date window for a Search Console query.
///
/// Dates are kept as `YYYY-MM-DD` strings and handed to the provider verbatim;
/// the provider is the authority on date syntax, and a range it rejects is
/// treated like any other upstream failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub start_date: String,
    pub end_date: String,
}

impl DateRange {
    #[must_use]
    pub fn new(start_date: impl Into<String>, end_date: impl Into<String>) -> Self {
        Self {
            start_date: start_date.into(),
            end_date: end_date.into(),
        }
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start_date, self.end_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_accepts_str_and_string() {
        let range = DateRange::new("2024-01-01", String::from("2024-01-28"));
        assert_eq!(range.start_date, "2024-01-01");
        assert_eq!(range.end_date, "2024-01-28");
    }

    #[test]
    fn display_joins_bounds() {
        let range = DateRange::new("2024-01-01", "2024-01-28");
        assert_eq!(range.to_string(), "2024-01-01..2024-01-28");
    }
}
