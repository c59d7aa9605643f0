use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use common::{CandleSource, Config};
use engine::{BinanceKlines, FallbackSource, ScanContext, Scanner};
use strategy::{DetectorRegistry, WatchlistConfig};
use telegram_ctrl::{start_bot, BotDeps, RecipientStore, TelegramNotifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env()?;
    let watchlist = WatchlistConfig::load(&cfg.watchlist_config_path)?;
    info!(
        entries = watchlist.entries.len(),
        interval_secs = cfg.scan_interval_secs,
        "VegasBot starting"
    );

    // ── Database ──────────────────────────────────────────────────────────────
    let db = SqlitePoolOptions::new()
        .connect(&cfg.database_url)
        .await
        .context("failed to connect to database")?;
    RecipientStore::migrate(&db).await?;
    let store = RecipientStore::new(db);
    info!("Database ready");

    // ── Market data ───────────────────────────────────────────────────────────
    let primary: Arc<dyn CandleSource> =
        Arc::new(BinanceKlines::new("binance", &cfg.market_data_url)?);
    let fallback: Arc<dyn CandleSource> =
        Arc::new(BinanceKlines::new("binance-data", &cfg.fallback_market_data_url)?);
    let source: Arc<dyn CandleSource> = Arc::new(FallbackSource::new(primary, fallback));

    // ── Delivery ──────────────────────────────────────────────────────────────
    let bot = teloxide::Bot::new(cfg.telegram_token.clone());
    let notifier = Arc::new(TelegramNotifier::new(bot.clone(), store.clone()));

    // ── Scanner ───────────────────────────────────────────────────────────────
    let registry = Arc::new(DetectorRegistry::new());
    let ctx = ScanContext {
        source,
        notifier,
        registry: registry.clone(),
        candle_limit: cfg.candle_limit,
    };
    let watch_count = watchlist.entries.len();
    let (scanner, scanner_handle) = Scanner::new(
        watchlist.entries,
        ctx,
        Duration::from_secs(cfg.scan_interval_secs),
    );

    // ── Telegram bot ──────────────────────────────────────────────────────────
    let bot_deps = BotDeps {
        store,
        scanner: scanner_handle.clone(),
        registry: registry.clone(),
        admin_ids: Arc::new(cfg.telegram_admin_ids.clone()),
    };

    // ── HTTP API ──────────────────────────────────────────────────────────────
    let api_state = api::AppState {
        scanner: scanner_handle,
        registry,
        watch_count,
        api_token: cfg.api_token.clone(),
        webhook_secret: cfg.webhook_secret.clone(),
    };

    // ── Spawn all tasks ───────────────────────────────────────────────────────
    let port = cfg.api_port;
    tokio::spawn(scanner.run());
    tokio::spawn(start_bot(bot, bot_deps));
    tokio::spawn(async move {
        if let Err(e) = api::serve(api_state, port).await {
            error!(error = %e, "HTTP API stopped");
        }
    });

    info!("All subsystems started. Waiting for shutdown signal.");
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting.");
    Ok(())
}
