// Raw samples: what ingestion accepts and what the store keeps.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::parse_instant;
use crate::error::{FieldViolation, ValidationError};

/// A stored sample. Never mutated after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub name: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// POST /metrics/log_metrics body. `timestamp` is any ISO-8601 date or date-time
/// (naive values are UTC) and defaults to the time of ingestion.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewSample {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl NewSample {
    pub fn into_sample(self, now: DateTime<Utc>) -> Result<Sample, ValidationError> {
        let mut violations = Vec::new();

        let name = self.name.map(|n| n.trim().to_string()).unwrap_or_default();
        if name.is_empty() {
            violations.push(FieldViolation::new("name", "is required"));
        }
        match self.value {
            None => violations.push(FieldViolation::new("value", "is required")),
            Some(v) if !v.is_finite() => {
                violations.push(FieldViolation::new("value", "must be a finite number"))
            }
            Some(_) => {}
        }
        let timestamp = match self.timestamp.as_deref().map(str::trim) {
            None | Some("") => Some(now),
            Some(raw) => match parse_instant(raw) {
                Some(t) if (0..=9999).contains(&t.year()) => Some(t),
                Some(_) => {
                    violations.push(FieldViolation::new(
                        "timestamp",
                        "year must be between 0000 and 9999",
                    ));
                    None
                }
                None => {
                    violations.push(FieldViolation::new(
                        "timestamp",
                        format!("{raw:?} is not an ISO-8601 date or date-time"),
                    ));
                    None
                }
            },
        };
        ValidationError::check(violations)?;

        Ok(Sample {
            name,
            value: self.value.unwrap_or_default(),
            timestamp: timestamp.unwrap_or(now),
        })
    }
}
