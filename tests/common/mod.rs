// Shared test helpers: in-memory sample store with call counting, recording sink

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use metricboard::cache::QueryCache;
use metricboard::models::{Bucket, Envelope, Granularity, LiveEvent, Sample};
use metricboard::notify::NotificationSink;
use metricboard::sample_repo::SampleStore;
use metricboard::service::MetricsService;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

pub fn sample(name: &str, value: f64, timestamp: DateTime<Utc>) -> Sample {
    Sample {
        name: name.into(),
        value,
        timestamp,
    }
}

/// Sample store backed by a Vec. Counts aggregate calls and can be switched to fail.
#[derive(Default)]
pub struct MemoryStore {
    samples: Mutex<Vec<Sample>>,
    pub aggregate_calls: AtomicUsize,
    pub failing: AtomicBool,
}

impl MemoryStore {
    pub fn with_samples(samples: Vec<Sample>) -> Self {
        Self {
            samples: Mutex::new(samples),
            ..Default::default()
        }
    }

    pub fn push(&self, sample: Sample) {
        self.samples.lock().unwrap().push(sample);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.aggregate_calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.samples.lock().unwrap().len()
    }
}

impl SampleStore for MemoryStore {
    async fn insert(&self, sample: &Sample) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("store unavailable");
        }
        self.push(sample.clone());
        Ok(())
    }

    async fn aggregate(
        &self,
        name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        granularity: Granularity,
    ) -> anyhow::Result<Vec<Bucket>> {
        self.aggregate_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("store unavailable");
        }
        let mut groups: BTreeMap<String, (f64, u32)> = BTreeMap::new();
        for s in self.samples.lock().unwrap().iter() {
            if s.name == name && s.timestamp >= start && s.timestamp <= end {
                let slot = groups.entry(granularity.label(s.timestamp)).or_default();
                slot.0 += s.value;
                slot.1 += 1;
            }
        }
        Ok(groups
            .into_iter()
            .map(|(label, (sum, n))| Bucket::new(label, sum / n as f64))
            .collect())
    }

    async fn metric_names(&self) -> anyhow::Result<Vec<String>> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("store unavailable");
        }
        let mut names: Vec<String> = self
            .samples
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.name.clone())
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}

/// Sink that records every publish.
#[derive(Default)]
pub struct RecordingSink {
    pub published: Mutex<Vec<Envelope>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<Envelope> {
        self.published.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.published.lock().unwrap().clear();
    }
}

impl NotificationSink for RecordingSink {
    fn publish(&self, topic: &'static str, event: LiveEvent) {
        self.published.lock().unwrap().push(Envelope { event: topic, data: event });
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub cache: Arc<QueryCache>,
    pub sink: Arc<RecordingSink>,
    pub service: Arc<MetricsService<MemoryStore>>,
}

pub const HARNESS_MAX_BUCKETS: u64 = 100_000;

pub fn harness(samples: Vec<Sample>) -> Harness {
    let store = Arc::new(MemoryStore::with_samples(samples));
    let cache = Arc::new(QueryCache::new(chrono::TimeDelta::minutes(30)));
    let sink = Arc::new(RecordingSink::default());
    let service = Arc::new(MetricsService::new(
        store.clone(),
        cache.clone(),
        sink.clone(),
        HARNESS_MAX_BUCKETS,
    ));
    Harness {
        store,
        cache,
        sink,
        service,
    }
}
