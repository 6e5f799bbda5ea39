// Aggregation service: answers queries through the cache, ingests samples and pushes them live.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use crate::bucket_filler;
use crate::cache::{CacheKey, QueryCache};
use crate::models::{AggregationQuery, Bucket, LiveEvent, METRICS_UPDATE_TOPIC, Sample};
use crate::notify::NotificationSink;
use crate::sample_repo::SampleStore;

pub struct MetricsService<S> {
    store: Arc<S>,
    cache: Arc<QueryCache>,
    sink: Arc<dyn NotificationSink>,
    max_buckets: u64,
}

impl<S: SampleStore> MetricsService<S> {
    /// `max_buckets` bounds every zero-filled computation, whatever built the query.
    pub fn new(
        store: Arc<S>,
        cache: Arc<QueryCache>,
        sink: Arc<dyn NotificationSink>,
        max_buckets: u64,
    ) -> Self {
        Self {
            store,
            cache,
            sink,
            max_buckets,
        }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn sink(&self) -> &Arc<dyn NotificationSink> {
        &self.sink
    }

    /// Cached answer, or a fresh computation that is then cached.
    ///
    /// A store failure is logged and answered with an empty list rather than surfaced to
    /// the caller. The failure is not cached, so the next request tries the store again.
    #[instrument(skip(self, query), fields(name = %query.name, interval = %query.granularity))]
    pub async fn resolve(&self, query: &AggregationQuery) -> Vec<Bucket> {
        let key = CacheKey::from(query);
        if let Some(entry) = self.cache.get(&key) {
            return entry.buckets;
        }
        match self.compute(query).await {
            Ok(buckets) => {
                self.cache.put(key, buckets.clone(), Utc::now());
                buckets
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    operation = "aggregate",
                    "Sample store aggregation failed; returning no data"
                );
                Vec::new()
            }
        }
    }

    /// Uncached path shared with the refresh worker: store aggregate, then zero-fill if asked.
    pub async fn compute(&self, query: &AggregationQuery) -> anyhow::Result<Vec<Bucket>> {
        if query.fill_zeros {
            let count = query.bucket_count();
            anyhow::ensure!(
                count <= self.max_buckets,
                "zero-filled range spans {count} {} buckets, above the limit of {}",
                query.granularity,
                self.max_buckets
            );
        }
        let sparse = self
            .store
            .aggregate(&query.name, query.start, query.end, query.granularity)
            .await?;
        if query.fill_zeros {
            Ok(bucket_filler::fill(
                &sparse,
                query.start,
                query.end,
                query.granularity,
            ))
        } else {
            Ok(sparse)
        }
    }

    /// Stores a validated sample and pushes it to live subscribers.
    /// Cached aggregations pick the sample up on the next refresh cycle.
    #[instrument(skip(self, sample), fields(name = %sample.name))]
    pub async fn ingest(&self, sample: Sample) -> anyhow::Result<Sample> {
        self.store.insert(&sample).await?;
        self.sink
            .publish(METRICS_UPDATE_TOPIC, LiveEvent::Sample(sample.clone()));
        Ok(sample)
    }

    pub async fn metric_names(&self) -> anyhow::Result<Vec<String>> {
        self.store.metric_names().await
    }
}
