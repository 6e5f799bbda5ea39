// Live push events and their wire envelope.

use serde::Serialize;

use super::{Bucket, Sample};
use crate::cache::CacheKey;

/// Topic for both new samples and refreshed aggregations.
pub const METRICS_UPDATE_TOPIC: &str = "metrics_update";

/// A refreshed cache entry whose buckets changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationUpdate {
    pub key: CacheKey,
    pub buckets: Vec<Bucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LiveEvent {
    Sample(Sample),
    Aggregation(AggregationUpdate),
}

/// What subscribers receive: `{"event": <topic>, "data": <payload>}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub event: &'static str,
    pub data: LiveEvent,
}
