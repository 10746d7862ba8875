use anyhow::Result;
use sqlx::PgPool;

/// Applies the `kv_records` schema (table, prefix index, change trigger).
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("kv_records schema is up to date");
    Ok(())
}
