use crate::{Error, Result};

/// All configuration loaded from environment variables at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub telegram_token: String,
    /// Users allowed to run operator commands such as `/scan`.
    pub telegram_admin_ids: Vec<i64>,

    // HTTP
    pub api_token: String,
    pub webhook_secret: String,
    pub api_port: u16,

    // Database
    pub database_url: String,

    // Scanning
    pub watchlist_config_path: String,
    pub scan_interval_secs: u64,
    pub candle_limit: usize,
    pub market_data_url: String,
    pub fallback_market_data_url: String,
}

impl Config {
    pub const DEFAULT_CANDLE_LIMIT: usize = 1000;
    pub const DEFAULT_MARKET_DATA_URL: &'static str = "https://api.binance.com";
    pub const DEFAULT_FALLBACK_MARKET_DATA_URL: &'static str = "https://data-api.binance.vision";

    /// Load all configuration from environment variables.
    /// Loads `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let telegram_admin_ids = optional_env("TELEGRAM_ADMIN_IDS")
            .map(|raw| parse_id_list(&raw))
            .transpose()?
            .unwrap_or_default();

        let scan_interval_secs = parse_or("SCAN_INTERVAL_SECS", 300)?;
        if scan_interval_secs == 0 {
            return Err(Error::Config("SCAN_INTERVAL_SECS must be > 0".into()));
        }

        Ok(Config {
            telegram_token: required_env("TELEGRAM_TOKEN")?,
            telegram_admin_ids,
            api_token: required_env("API_TOKEN")?,
            webhook_secret: required_env("WEBHOOK_SECRET")?,
            api_port: parse_or("API_PORT", 8080)?,
            database_url: required_env("DATABASE_URL")?,
            watchlist_config_path: optional_env("WATCHLIST_CONFIG_PATH")
                .unwrap_or_else(|| "config/watchlist.toml".to_string()),
            scan_interval_secs,
            candle_limit: parse_or("CANDLE_LIMIT", Self::DEFAULT_CANDLE_LIMIT)?,
            market_data_url: optional_env("MARKET_DATA_URL")
                .unwrap_or_else(|| Self::DEFAULT_MARKET_DATA_URL.to_string()),
            fallback_market_data_url: optional_env("FALLBACK_MARKET_DATA_URL")
                .unwrap_or_else(|| Self::DEFAULT_FALLBACK_MARKET_DATA_URL.to_string()),
        })
    }
}

fn required_env(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        Error::Config(format!(
            "Required environment variable '{key}' is not set. Check your .env file."
        ))
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{key} has an invalid value: '{raw}'"))),
        None => Ok(default),
    }
}

fn parse_id_list(raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>().map_err(|_| {
                Error::Config(format!("TELEGRAM_ADMIN_IDS contains non-numeric ID: '{s}'"))
            })
        })
        .collect()
}
