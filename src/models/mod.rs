// Domain models: samples, queries, buckets and live events

mod bucket;
mod event;
mod granularity;
mod query;
mod sample;

pub use bucket::Bucket;
pub use event::{AggregationUpdate, Envelope, LiveEvent, METRICS_UPDATE_TOPIC};
pub use granularity::Granularity;
pub use query::{AggregationQuery, MetricsRequest, parse_instant};
pub use sample::{NewSample, Sample};
