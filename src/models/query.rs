// Aggregation queries: the untyped request shape and the validated query built from it.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Granularity;
use crate::bucket_filler;
use crate::error::{FieldViolation, ValidationError};

/// A validated query. `start <= end` holds for every value of this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AggregationQuery {
    pub name: String,
    #[serde(rename = "startDate")]
    pub start: DateTime<Utc>,
    #[serde(rename = "endDate")]
    pub end: DateTime<Utc>,
    #[serde(rename = "interval")]
    pub granularity: Granularity,
    #[serde(rename = "include_zeros")]
    pub fill_zeros: bool,
}

impl AggregationQuery {
    pub fn new(
        name: impl Into<String>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        granularity: Granularity,
        fill_zeros: bool,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        let start = start.unwrap_or(DateTime::<Utc>::MIN_UTC);
        let end = end.unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut violations = Vec::new();
        if name.trim().is_empty() {
            violations.push(FieldViolation::new("name", "is required"));
        }
        if start > end {
            violations.push(FieldViolation::new(
                "startDate",
                "start date must be less than or equal to end date",
            ));
        }
        ValidationError::check(violations)?;

        Ok(Self {
            name,
            start,
            end,
            granularity,
            fill_zeros,
        })
    }

    /// Number of buckets a zero-filled answer would contain.
    pub fn bucket_count(&self) -> u64 {
        bucket_filler::bucket_count(self.start, self.end, self.granularity)
    }
}

/// POST /metrics/get_metrics body (also the `request_metrics` WebSocket payload).
/// Every field is optional at the serde layer so that `validate` can report all
/// violations at once instead of failing on the first missing key.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(default, rename = "endDate")]
    pub end_date: Option<String>,
    #[serde(default)]
    pub interval: Option<String>,
    #[serde(default)]
    pub include_zeros: bool,
}

impl MetricsRequest {
    /// Builds the query, rejecting zero-filled ranges wider than `max_buckets`.
    pub fn validate(&self, max_buckets: u64) -> Result<AggregationQuery, ValidationError> {
        let mut violations = Vec::new();

        let name = self.name.as_deref().map(str::trim).unwrap_or_default();
        if name.is_empty() {
            violations.push(FieldViolation::new("name", "is required"));
        }

        let granularity = match self.interval.as_deref() {
            None => {
                violations.push(FieldViolation::new("interval", "is required"));
                None
            }
            Some(raw) => match raw.parse::<Granularity>() {
                Ok(g) => Some(g),
                Err(e) => {
                    violations.push(FieldViolation::new("interval", e));
                    None
                }
            },
        };

        let start = parse_optional_instant("startDate", self.start_date.as_deref(), &mut violations);
        let end = parse_optional_instant("endDate", self.end_date.as_deref(), &mut violations);

        ValidationError::check(violations)?;
        let Some(granularity) = granularity else {
            return Err(ValidationError::single("interval", "is required"));
        };

        let query = AggregationQuery::new(name, start, end, granularity, self.include_zeros)?;
        if query.fill_zeros && query.bucket_count() > max_buckets {
            return Err(ValidationError::single(
                "include_zeros",
                format!(
                    "zero-filled range spans {} {} buckets; at most {} allowed, narrow startDate/endDate",
                    query.bucket_count(),
                    query.granularity,
                    max_buckets
                ),
            ));
        }
        Ok(query)
    }
}

fn parse_optional_instant(
    field: &'static str,
    raw: Option<&str>,
    violations: &mut Vec<FieldViolation>,
) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    match parse_instant(raw) {
        Some(t) => Some(t),
        None => {
            violations.push(FieldViolation::new(
                field,
                format!("{raw:?} is not an ISO-8601 date or date-time"),
            ));
            None
        }
    }
}

/// ISO-8601 date or date-time. Values without an offset are taken as UTC.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(n) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(n.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| n.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request(interval: &str, start: Option<&str>, end: Option<&str>) -> MetricsRequest {
        MetricsRequest {
            name: Some("m".into()),
            start_date: start.map(Into::into),
            end_date: end.map(Into::into),
            interval: Some(interval.into()),
            include_zeros: false,
        }
    }

    #[test]
    fn open_bounds_map_to_extreme_instants() {
        let q = request("hour", None, None).validate(1_000).unwrap();
        assert_eq!(q.start, DateTime::<Utc>::MIN_UTC);
        assert_eq!(q.end, DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn rejects_unknown_interval() {
        let err = request("fortnight", None, None).validate(1_000).unwrap_err();
        assert!(err.has_field("interval"));
    }

    #[test]
    fn interval_is_case_insensitive() {
        let q = request("DAY", None, None).validate(1_000).unwrap();
        assert_eq!(q.granularity, Granularity::Day);
    }

    #[test]
    fn rejects_start_after_end() {
        let err = request("hour", Some("2021-01-02T00:00:00Z"), Some("2021-01-01T00:00:00Z"))
            .validate(1_000)
            .unwrap_err();
        assert!(err.has_field("startDate"));
    }

    #[test]
    fn rejects_malformed_dates_and_reports_all_fields() {
        let req = MetricsRequest {
            name: None,
            start_date: Some("yesterday".into()),
            end_date: Some("2021-13-45".into()),
            interval: Some("week".into()),
            include_zeros: false,
        };
        let err = req.validate(1_000).unwrap_err();
        for field in ["name", "interval", "startDate", "endDate"] {
            assert!(err.has_field(field), "missing violation for {field}");
        }
    }

    #[test]
    fn rejects_zero_filled_range_over_cap() {
        let mut req = request("minute", Some("2021-01-01T00:00:00Z"), Some("2021-01-02T00:00:00Z"));
        req.include_zeros = true;
        let err = req.validate(100).unwrap_err();
        assert!(err.has_field("include_zeros"));

        // the cap only bounds zero-filled output
        req.include_zeros = false;
        assert!(req.validate(100).is_ok());
    }

    #[test]
    fn parses_supported_date_shapes() {
        let midnight = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_instant("2021-01-01T00:00:00Z"), Some(midnight));
        assert_eq!(parse_instant("2021-01-01T02:00:00+02:00"), Some(midnight));
        assert_eq!(parse_instant("2021-01-01T00:00:00"), Some(midnight));
        assert_eq!(parse_instant("2021-01-01 00:00:00.000"), Some(midnight));
        assert_eq!(parse_instant("2021-01-01"), Some(midnight));
        assert_eq!(parse_instant("not a date"), None);
    }
}
