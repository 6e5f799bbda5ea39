// Bucket width and the label format shared by the sample store and the bucket filler.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, TimeDelta, Timelike, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Minute,
    Hour,
    Day,
}

impl Granularity {
    pub const ALL: [Granularity; 3] = [Granularity::Minute, Granularity::Hour, Granularity::Day];

    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Minute => "minute",
            Granularity::Hour => "hour",
            Granularity::Day => "day",
        }
    }

    /// Width of one bucket.
    pub fn step(self) -> TimeDelta {
        match self {
            Granularity::Minute => TimeDelta::minutes(1),
            Granularity::Hour => TimeDelta::hours(1),
            Granularity::Day => TimeDelta::days(1),
        }
    }

    /// strftime pattern for bucket labels. Valid for both chrono and SQLite.
    pub fn label_format(self) -> &'static str {
        match self {
            Granularity::Minute => "%Y-%m-%d %H:%M",
            Granularity::Hour => "%Y-%m-%d %H",
            Granularity::Day => "%Y-%m-%d",
        }
    }

    pub fn label(self, at: DateTime<Utc>) -> String {
        at.format(self.label_format()).to_string()
    }

    /// Start of the bucket containing `at`.
    pub fn floor(self, at: DateTime<Utc>) -> DateTime<Utc> {
        let naive = at.naive_utc();
        let date = naive.date();
        let floored: Option<NaiveDateTime> = match self {
            Granularity::Minute => date.and_hms_opt(naive.hour(), naive.minute(), 0),
            Granularity::Hour => date.and_hms_opt(naive.hour(), 0, 0),
            Granularity::Day => date.and_hms_opt(0, 0, 0),
        };
        floored.map(|n| n.and_utc()).unwrap_or(at)
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = String;

    /// Case-insensitive: "Hour" and "HOUR" are both accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minute" => Ok(Granularity::Minute),
            "hour" => Ok(Granularity::Hour),
            "day" => Ok(Granularity::Day),
            other => Err(format!(
                "unsupported interval {other:?}; supported intervals: minute, hour, day"
            )),
        }
    }
}
