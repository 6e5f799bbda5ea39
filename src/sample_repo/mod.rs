// Sample store adapter: the minimal insert/aggregate interface the core consumes,
// plus the SQLite implementation used by the server binary.

mod schema;

use std::future::Future;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::instrument;

use crate::models::{Bucket, Granularity, Sample};

/// Storage collaborator. Single attempt per call; callers decide how to degrade on error.
pub trait SampleStore: Send + Sync + 'static {
    fn insert(&self, sample: &Sample) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// Per-bucket averages of `name` in `[start, end]`, ascending by label.
    /// Only buckets containing at least one sample are returned.
    fn aggregate(
        &self,
        name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        granularity: Granularity,
    ) -> impl Future<Output = anyhow::Result<Vec<Bucket>>> + Send;

    /// Distinct sample names, sorted.
    fn metric_names(&self) -> impl Future<Output = anyhow::Result<Vec<String>>> + Send;
}

pub struct SqliteSampleStore {
    pool: SqlitePool,
}

impl SqliteSampleStore {
    /// Connect to SQLite at `path`, create parent dir and DB if missing, enable WAL + pragmas.
    pub async fn connect(path: &str, max_pool_size: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        schema::init_samples_table(&self.pool).await
    }
}

impl SampleStore for SqliteSampleStore {
    #[instrument(skip(self, sample), fields(repo = "samples", operation = "insert", name = %sample.name))]
    async fn insert(&self, sample: &Sample) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO samples (name, value, timestamp_ms) VALUES ($1, $2, $3)")
            .bind(&sample.name)
            .bind(sample.value)
            .bind(sample.timestamp.timestamp_millis())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(repo = "samples", operation = "aggregate"))]
    async fn aggregate(
        &self,
        name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        granularity: Granularity,
    ) -> anyhow::Result<Vec<Bucket>> {
        let rows = sqlx::query(
            "SELECT strftime($1, timestamp_ms / 1000.0, 'unixepoch') AS label, AVG(value) AS average
             FROM samples
             WHERE name = $2 AND timestamp_ms >= $3 AND timestamp_ms <= $4
             GROUP BY label
             ORDER BY label ASC",
        )
        .bind(granularity.label_format())
        .bind(name)
        .bind(start.timestamp_millis())
        .bind(end.timestamp_millis())
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let label: Option<String> = row.try_get("label")?;
            let average: f64 = row.try_get("average")?;
            // strftime yields NULL outside years 0000-9999
            if let Some(label) = label {
                out.push(Bucket { label, average });
            }
        }
        Ok(out)
    }

    #[instrument(skip(self), fields(repo = "samples", operation = "metric_names"))]
    async fn metric_names(&self) -> anyhow::Result<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>("SELECT DISTINCT name FROM samples ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(names)
    }
}
