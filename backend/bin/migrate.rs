use kindred::db::{DatabaseConfig, migrations::run_migrations};
use kindred::{get_db_pool, utils};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::init_logging();

    let db_config = DatabaseConfig::from_env()?;
    let pool = get_db_pool(&db_config).await?;

    println!("Applying kv_records migrations...");
    run_migrations(&pool).await?;
    println!("Store schema ready.");

    Ok(())
}
