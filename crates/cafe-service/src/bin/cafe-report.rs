//! # cafe-report
//!
//! Prints period statistics for a date range as JSON.
//!
//! ```text
//! cafe-report --from 2024-01-01 --to 2024-02-01 --group-by week
//! ```
//!
//! `--to` is exclusive. Configuration comes from the `CAFE_*` environment
//! variables.

use std::sync::Arc;

use anyhow::Context;
use chrono::{NaiveDate, NaiveTime};
use clap::Parser;
use tracing::info;

use cafe_service::{KnownTables, ServiceConfig, Services, SnapshotValidator};

#[derive(Parser)]
#[command(version, about = "Revenue report over closed orders")]
struct Cli {
    /// First day of the report (UTC, inclusive)
    #[arg(long)]
    from: NaiveDate,

    /// Day after the last day of the report (UTC, exclusive)
    #[arg(long)]
    to: NaiveDate,

    /// Bucket granularity: day, week or month
    #[arg(long, default_value = "day")]
    group_by: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ServiceConfig::load()?;
    cafe_service::telemetry::init_tracing(&config.log_filter)?;
    info!(path = %config.database_path.display(), "Configuration loaded");

    let services = Services::connect(
        &config,
        Arc::new(SnapshotValidator),
        Arc::new(KnownTables::default()),
    )
    .await
    .context("opening orders database")?;

    let from = cli.from.and_time(NaiveTime::MIN).and_utc();
    let to = cli.to.and_time(NaiveTime::MIN).and_utc();

    let stats = services
        .statistics
        .period_stats(&config.request_context(), from, to, &cli.group_by)
        .await?;

    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
