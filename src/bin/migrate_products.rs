use anyhow::Result;
use catalog_migrate::logging::{init_tracing, DEFAULT_FILTER};
use catalog_migrate::migrate::migrate_products_from_file;
use catalog_migrate::util::env;
use catalog_migrate::{open_store, MigrationConfig};

#[tokio::main]
async fn main() -> Result<()> {
    env::init_env();
    init_tracing(DEFAULT_FILTER)?;
    env::bootstrap_cli("migrate_products");
    let cfg = MigrationConfig::from_env()?;
    cfg.validate()?;
    let store = open_store(&cfg, env::env_flag("MIGRATE_DRY_RUN", false)).await?;
    let report = migrate_products_from_file(store.as_ref(), &cfg).await;
    store.close().await;
    print!("{}", report?);
    Ok(())
}
