use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;

use shelfsync::reconcile::gaps::reconcile_gaps;
use shelfsync::reconcile::scan::scan_coverage;
use shelfsync::remote::http::HttpApiFactory;
use shelfsync::store::pg::PgStore;
use shelfsync::sync::commit::DEFAULT_BATCH_CAP;
use shelfsync::sync::orchestrator::{list_merchants, SyncOrchestrator};
use shelfsync::util::env as env_util;

#[derive(Parser, Debug)]
#[command(name = "shelfsync", version, about = "Merchant inventory sync & reconciliation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Sync every merchant's catalog and stock counts into the document store
    Sync {
        /// Optional override for the database URL
        #[arg(long)]
        db_url: Option<String>,
        /// Override the per-batch write cap
        #[arg(long)]
        batch_cap: Option<usize>,
    },
    /// Scan cross-merchant coverage and fill gaps with placeholder records
    Reconcile {
        /// Optional override for the database URL
        #[arg(long)]
        db_url: Option<String>,
        /// Issue writes; without this flag DRY_RUN (default on) governs
        #[arg(long, default_value_t = false)]
        apply: bool,
        /// Stop scanning once the global GTIN union reaches this size
        #[arg(long)]
        sample_limit: Option<usize>,
    },
    /// Print per-merchant coverage statistics as JSON without writing anything
    CoverageStats {
        /// Optional override for the database URL
        #[arg(long)]
        db_url: Option<String>,
        /// Stop scanning once the global GTIN union reaches this size
        #[arg(long)]
        sample_limit: Option<usize>,
    },
}

async fn connect_store(db_url: Option<String>) -> Result<PgStore> {
    let url = match db_url {
        Some(url) => url,
        None => env_util::db_url()?,
    };
    let max_connections = env_util::env_parse("DB_MAX_CONNECTIONS", 5u32);
    PgStore::connect(&url, max_connections).await
}

fn sample_limit_or_env(cli_value: Option<usize>) -> Option<usize> {
    cli_value.or_else(|| env_util::env_parse_opt("GTIN_SAMPLE_LIMIT"))
}

#[tokio::main]
async fn main() -> Result<()> {
    shelfsync::logging::init_tracing("info,sqlx=warn")?;
    env_util::init_env();

    let cli = Cli::parse();
    match cli.command {
        Commands::Sync { db_url, batch_cap } => {
            env_util::preflight_check(
                "sync",
                &[],
                &["DATABASE_URL", "SYNC_API_BASE", "SYNC_API_TOKEN"],
            )?;
            let store = connect_store(db_url).await?;
            let factory = HttpApiFactory::from_env()?;
            let batch_cap =
                batch_cap.unwrap_or_else(|| env_util::env_parse("WRITE_BATCH_CAP", DEFAULT_BATCH_CAP));

            let summary = SyncOrchestrator::new(&store, &factory)
                .with_batch_cap(batch_cap)
                .run()
                .await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Reconcile {
            db_url,
            apply,
            sample_limit,
        } => {
            env_util::preflight_check(
                "reconcile",
                &[],
                &["DATABASE_URL", "DRY_RUN", "WRITE_BATCH_CAP", "GTIN_SAMPLE_LIMIT"],
            )?;
            let store = connect_store(db_url).await?;
            let merchants = list_merchants(&store).await?;
            let report =
                scan_coverage(&store, &merchants, sample_limit_or_env(sample_limit)).await?;

            let dry_run = if apply {
                false
            } else {
                env_util::env_flag("DRY_RUN", true)
            };
            let batch_cap = env_util::env_parse("WRITE_BATCH_CAP", DEFAULT_BATCH_CAP);
            let summary = reconcile_gaps(&store, &report, &merchants, dry_run, batch_cap).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::CoverageStats {
            db_url,
            sample_limit,
        } => {
            env_util::preflight_check(
                "coverage-stats",
                &[],
                &["DATABASE_URL", "GTIN_SAMPLE_LIMIT"],
            )?;
            let store = connect_store(db_url).await?;
            let merchants = list_merchants(&store).await?;
            let report =
                scan_coverage(&store, &merchants, sample_limit_or_env(sample_limit)).await?;

            let mut per_merchant = serde_json::Map::new();
            for merchant in &merchants {
                let gtins = report
                    .merchant_gtins
                    .get(&merchant.id)
                    .map_or(0, |set| set.len());
                per_merchant.insert(
                    merchant.id.clone(),
                    json!({
                        "name": merchant.name,
                        "gtins": gtins,
                        "missing": report.missing_for(&merchant.id).len(),
                        "default_location": report.default_locations.get(&merchant.id),
                    }),
                );
            }
            let out = json!({
                "merchants": per_merchant,
                "global_gtins": report.global_gtins.len(),
                "records_scanned": report.records_scanned,
                "placeholders_seen": report.placeholders_seen,
                "truncated": report.truncated,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
            info!("coverage-stats done");
        }
    }
    Ok(())
}
