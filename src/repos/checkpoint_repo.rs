//! Checkpoints and run logs: the only warehouse state the ETL reads back.

use chrono::NaiveDate;
use sqlx::PgPool;

use super::WarehouseError;

/// Last successfully ingested date for a stream, if any.
pub async fn get_checkpoint(
    pool: &PgPool,
    stream: &str,
) -> Result<Option<NaiveDate>, WarehouseError> {
    let row: Option<(NaiveDate,)> =
        sqlx::query_as("SELECT last_date FROM etl_checkpoint WHERE stream_name = $1")
            .bind(stream)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(|(d,)| d))
}

/// Advance a stream's checkpoint. Called only after a whole window has
/// been written.
pub async fn set_checkpoint(
    pool: &PgPool,
    stream: &str,
    last_date: NaiveDate,
) -> Result<(), WarehouseError> {
    sqlx::query(
        r#"
        INSERT INTO etl_checkpoint (stream_name, last_date)
        VALUES ($1, $2)
        ON CONFLICT (stream_name) DO UPDATE SET
            last_date = EXCLUDED.last_date,
            updated_at = NOW()
        "#,
    )
    .bind(stream)
    .bind(last_date)
    .execute(pool)
    .await?;

    Ok(())
}

/// Append one audit row for a completed (or failed) window.
pub async fn append_run_log(
    pool: &PgPool,
    stream: &str,
    rows: i32,
    status: &str,
    error: Option<&str>,
) -> Result<(), WarehouseError> {
    sqlx::query(
        "INSERT INTO etl_run_log (stream_name, rows, status, error) VALUES ($1, $2, $3, $4)",
    )
    .bind(stream)
    .bind(rows)
    .bind(status)
    .bind(error)
    .execute(pool)
    .await?;

    Ok(())
}
