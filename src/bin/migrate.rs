use std::path::PathBuf;

use anyhow::{Context, Result};
use catalog_migrate::config::{parse_delimiter, MigrationConfig, OrphanPolicy};
use catalog_migrate::logging::{init_tracing, DEFAULT_FILTER};
use catalog_migrate::migrate;
use catalog_migrate::resolver::ResolutionPolicy;
use catalog_migrate::source::{self, CATEGORY_COLUMNS};
use catalog_migrate::util::env;
use clap::{Args, Parser, Subcommand};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "migrate", version, about = "Catalog flat-file to document store migration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Optional override for the database URL
    #[arg(long, global = true)]
    db_url: Option<String>,
    /// Rows per bulk write (overrides MIGRATE_BATCH_SIZE)
    #[arg(long, global = true)]
    batch_size: Option<usize>,
    /// Field delimiter: a single character or "tab"
    #[arg(long, global = true)]
    delimiter: Option<String>,
    /// Write to an in-memory store and only print the report
    #[arg(long, global = true, default_value_t = false)]
    dry_run: bool,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Migrate categories and the category tree
    Categories {
        #[arg(long)]
        file: Option<PathBuf>,
        /// drop | fail
        #[arg(long)]
        orphans: Option<OrphanPolicy>,
    },
    /// Migrate vendors
    Vendors {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Migrate products (categories and vendors must already be migrated)
    Products {
        #[arg(long)]
        file: Option<PathBuf>,
        /// lenient | strict
        #[arg(long)]
        resolution: Option<ResolutionPolicy>,
        /// Where to write rows whose vendor did not resolve
        #[arg(long)]
        missing_vendor_report: Option<PathBuf>,
    },
    /// Run categories, vendors, then products
    All,
    /// Print the category forest as JSON without touching the store
    Tree {
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env::init_env();
    init_tracing(DEFAULT_FILTER)?;
    env::bootstrap_cli("migrate");
    let cli = Cli::parse();

    let dry_run = cli.common.dry_run || env::env_flag("MIGRATE_DRY_RUN", false);
    let mut cfg = MigrationConfig::from_env()?;
    if let Some(url) = cli.common.db_url {
        cfg.database_url = Some(url);
    }
    if let Some(n) = cli.common.batch_size {
        cfg.batch_size = n;
    }
    if let Some(d) = cli.common.delimiter.as_deref() {
        cfg.delimiter = parse_delimiter(d)?;
    }

    match cli.command {
        Commands::Categories { file, orphans } => {
            if let Some(f) = file {
                cfg.categories_file = f;
            }
            if let Some(p) = orphans {
                cfg.orphans = p;
            }
            cfg.validate()?;
            let store = catalog_migrate::open_store(&cfg, dry_run).await?;
            let report = migrate::migrate_categories_from_file(store.as_ref(), &cfg).await;
            store.close().await;
            print!("{}", report?);
        }
        Commands::Vendors { file } => {
            if let Some(f) = file {
                cfg.vendors_file = f;
            }
            cfg.validate()?;
            let store = catalog_migrate::open_store(&cfg, dry_run).await?;
            let report = migrate::migrate_vendors_from_file(store.as_ref(), &cfg).await;
            store.close().await;
            print!("{}", report?);
        }
        Commands::Products {
            file,
            resolution,
            missing_vendor_report,
        } => {
            if let Some(f) = file {
                cfg.products_file = f;
            }
            if let Some(p) = resolution {
                cfg.resolution = p;
            }
            if let Some(p) = missing_vendor_report {
                cfg.missing_vendor_report = p;
            }
            cfg.validate()?;
            let store = catalog_migrate::open_store(&cfg, dry_run).await?;
            let report = migrate::migrate_products_from_file(store.as_ref(), &cfg).await;
            store.close().await;
            print!("{}", report?);
        }
        Commands::All => {
            cfg.validate()?;
            let store = catalog_migrate::open_store(&cfg, dry_run).await?;
            let report = migrate::migrate_all(store.as_ref(), &cfg).await;
            store.close().await;
            print!("{}", report?);
        }
        Commands::Tree { file } => {
            let path = file.unwrap_or(cfg.categories_file);
            let rows = source::read_rows(&path, CATEGORY_COLUMNS, cfg.delimiter)?;
            let forest = migrate::categories::forest_from_rows(&rows);
            println!(
                "{}",
                serde_json::to_string_pretty(&forest.roots).context("encoding forest")?
            );
            if !forest.orphans.is_empty() {
                eprintln!("orphaned codes: {}", forest.orphans.join(", "));
            }
        }
    }
    info!("migrate done");
    Ok(())
}
