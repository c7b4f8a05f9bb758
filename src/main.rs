//! MEXC Spot Trader - Main Entry Point
//!
//! Wires the exchange client, filter cache, position store and decision
//! loop together and runs the loop until shutdown.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use mexc_spot_trader::common::channels::create_event_channel;
use mexc_spot_trader::config::loader::load_config;
use mexc_spot_trader::trading::confirmation::strategy_for;
use mexc_spot_trader::trading::filters::FilterCache;
use mexc_spot_trader::trading::store::{MemoryStore, PgStore, PositionStore};
use mexc_spot_trader::trading::trader::Trader;
use mexc_spot_trader::{AdviceBook, ExchangeApi, MexcRestClient};

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Comma-separated symbol universe, overriding the configured one
    #[arg(long)]
    symbols: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting MEXC spot trader");
    info!("Configuration file: {}", args.config);

    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();
    let config = load_config(Some(&args.config))?;

    let symbols: Vec<String> = match &args.symbols {
        Some(raw) => raw
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect(),
        None => config.trading.symbols.clone(),
    };

    // Exchange client, with credentials when configured
    let mut client = MexcRestClient::with_timeout(
        &config.exchange.base_url,
        Duration::from_secs(config.exchange.request_timeout_seconds),
    )?
    .with_recv_window(config.exchange.recv_window_ms);
    match config.exchange.credentials() {
        Some(credentials) => client = client.with_credentials(credentials),
        None if config.trading.live => {
            anyhow::bail!("live trading requires MEXC_API_KEY and MEXC_API_SECRET")
        }
        None => warn!("no API credentials configured; signed endpoints unavailable"),
    }
    let api: Arc<dyn ExchangeApi> = Arc::new(client);

    // Position store: Postgres when configured, in-memory otherwise
    let store: Arc<dyn PositionStore> = match &config.database {
        Some(db) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(db.max_connections)
                .acquire_timeout(Duration::from_secs(db.connection_timeout_seconds))
                .connect(&db.url)
                .await?;
            let store = PgStore::new(pool);
            store.init_schema().await?;
            Arc::new(store)
        }
        None => {
            warn!("no database configured; positions will not survive restarts");
            Arc::new(MemoryStore::new())
        }
    };

    let filters = Arc::new(FilterCache::new(
        api.clone(),
        Duration::from_secs(config.exchange.metadata_ttl_seconds),
        config.trading.min_notional_floor,
    ));
    // The technical-analysis engine is an external collaborator that
    // publishes into this book; every symbol reads as HOLD until it does.
    let advice = Arc::new(AdviceBook::new());
    let confirmation = strategy_for(api.clone(), config.trading.live);
    let (event_tx, mut event_rx) = create_event_channel();

    let trader = Arc::new(Trader::new(
        api,
        filters,
        store,
        advice,
        confirmation,
        event_tx,
        config.trading.clone(),
    ));

    // Drain broadcast events into the log until a real sink is attached
    let event_task = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            info!(symbol = event.symbol(), event = ?event, "trade event");
        }
    });

    let loop_trader = trader.clone();
    let loop_task = tokio::spawn(async move {
        loop_trader.run_loop(&symbols).await;
    });

    info!("Application initialized successfully");

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal, cleaning up...");

    loop_task.abort();
    event_task.abort();

    Ok(())
}
