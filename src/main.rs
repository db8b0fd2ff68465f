use std::sync::Arc;
use tipster::services::{
    CycleOutcome, MarketCalendar, SignalPipeline, SignalScanner, SqliteCompletionStore,
    StaticIndicatorProvider, SystemClock, TimeframeScheduler, TokenBucket,
};
use tipster::Config;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tipster=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Starting tipster: {} symbols, exchange timezone {}",
        config.universe.len(),
        config.exchange.timezone
    );

    // Completion records survive restarts so a timeframe is never signalled twice a day
    let store = Arc::new(SqliteCompletionStore::new(&config.completion_db_path)?);
    info!(
        "Completion store at {}",
        config.completion_db_path.display()
    );

    let provider = match &config.snapshot_file {
        Some(path) => StaticIndicatorProvider::from_json_file(path)?,
        None => {
            warn!("SNAPSHOT_FILE not set; every symbol will report missing indicator data");
            StaticIndicatorProvider::new()
        }
    };

    let scheduler = Arc::new(TimeframeScheduler::new(
        store,
        Arc::new(MarketCalendar::nyse()),
        Arc::new(SystemClock::new(config.exchange.timezone)),
        config.exchange.clone(),
    ));
    let scanner = Arc::new(SignalScanner::new(
        Arc::new(provider),
        TokenBucket::new(config.rate_limit.rate_per_sec, config.rate_limit.burst),
        config.profiles.clone(),
        config.scanner.clone(),
    ));
    let pipeline = SignalPipeline::new(scheduler, scanner, config.universe.clone());

    match pipeline.run_cycle(config.requested_timeframe).await? {
        CycleOutcome::Skipped(decision) => {
            info!("Skipped: {}", decision.reason);
            println!("{}", serde_json::to_string_pretty(&decision)?);
        }
        CycleOutcome::NoSignal { decision, report } => {
            info!(
                "No signal for {} ({} pairs evaluated, {} failed)",
                decision.date,
                report.evaluated,
                report.failures.len()
            );
        }
        CycleOutcome::Generated { signal, .. } => {
            println!("{}", serde_json::to_string_pretty(&signal)?);
        }
        CycleOutcome::Superseded { signal } => {
            warn!(
                "{} {} signal discarded: timeframe completed elsewhere",
                signal.symbol, signal.timeframe
            );
        }
    }

    Ok(())
}
