use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use common::{Error, Result};

use crate::registry::DetectorKey;
use crate::targets::DEFAULT_SWING_LOOKBACK;

/// Kline intervals accepted as timeframe labels.
pub const TIMEFRAMES: [&str; 15] = [
    "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "8h", "12h", "1d", "3d", "1w", "1M",
];

/// Watchlist file (TOML).
///
/// Example `config/watchlist.toml`:
/// ```toml
/// [[watch]]
/// symbol = "BTCUSDT"
/// timeframe = "1h"
/// leverage = 10
/// swing_lookback = 50
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatchlistConfig {
    #[serde(rename = "watch")]
    pub entries: Vec<WatchEntry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WatchEntry {
    /// Trading pair, e.g. "BTCUSDT".
    pub symbol: String,
    /// Kline interval label, e.g. "1h".
    pub timeframe: String,
    /// Leverage quoted in the delivered signal.
    #[serde(default = "default_leverage")]
    pub leverage: u32,
    /// Candles used for the swing high/low behind the targets.
    #[serde(default = "default_swing_lookback")]
    pub swing_lookback: usize,
}

fn default_leverage() -> u32 {
    10
}

fn default_swing_lookback() -> usize {
    DEFAULT_SWING_LOOKBACK
}

impl WatchEntry {
    pub fn key(&self) -> DetectorKey {
        DetectorKey::new(&self.symbol, &self.timeframe)
    }
}

impl WatchlistConfig {
    /// Load and validate from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read watchlist at '{path}': {e}"))
        })?;
        Self::from_toml(&content, &format!("watchlist at '{path}'"))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Self::from_toml(content, "watchlist")
    }

    fn from_toml(content: &str, origin: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid {origin}: {e}")))?;
        cfg.validate()
            .map_err(|msg| Error::Config(format!("Invalid {origin}: {msg}")))?;
        Ok(cfg)
    }

    /// Returns the first problem found.
    fn validate(&self) -> std::result::Result<(), String> {
        if self.entries.is_empty() {
            return Err("no entries".into());
        }
        let mut seen = HashSet::new();
        for entry in &self.entries {
            if entry.symbol.trim().is_empty() {
                return Err("empty symbol".into());
            }
            if !TIMEFRAMES.contains(&entry.timeframe.as_str()) {
                return Err(format!(
                    "unknown timeframe '{}' for {}",
                    entry.timeframe, entry.symbol
                ));
            }
            if entry.leverage == 0 {
                return Err(format!("leverage must be >= 1 for {}", entry.symbol));
            }
            if !seen.insert(entry.key()) {
                return Err(format!("duplicate watch entry {}", entry.key()));
            }
        }
        Ok(())
    }
}
