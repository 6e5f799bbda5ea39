// samples table + index. Timestamps are stored as UTC epoch milliseconds.

use sqlx::SqlitePool;

/// Creates the samples table and its (name, timestamp_ms) index if not present.
pub(super) async fn init_samples_table(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS samples (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            value REAL NOT NULL,
            timestamp_ms INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_samples_name_timestamp ON samples(name, timestamp_ms)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
