use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV bar. `timestamp` is the candle open time in milliseconds.
///
/// Series are ordered oldest first with no duplicate timestamps, and every
/// candle satisfies `low <= open, close <= high`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Millisecond timestamp as a UTC datetime. Falls back to the epoch for
/// out-of-range values.
pub fn millis_to_utc(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or_default()
}

/// Latest value of each tunnel EMA.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub ema12: f64,
    pub ema144: f64,
    pub ema169: f64,
    pub ema576: f64,
    pub ema676: f64,
}

/// Outcome of one detector evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
    None,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
            Direction::None => write!(f, "none"),
        }
    }
}

/// Tradeable direction. `Direction::None` never converts into a `Side`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl TryFrom<Direction> for Side {
    type Error = Direction;

    fn try_from(direction: Direction) -> std::result::Result<Self, Self::Error> {
        match direction {
            Direction::Long => Ok(Side::Long),
            Direction::Short => Ok(Side::Short),
            Direction::None => Err(direction),
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Long => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
        }
    }
}

/// Signal emitted by the tunnel detector for the newest candle of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub direction: Direction,
    /// Close of the evaluated candle.
    pub price: f64,
    /// Timestamp (ms) of the evaluated candle.
    pub timestamp: i64,
    pub indicators: IndicatorSnapshot,
}

/// Three take-profit levels, nearest first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Targets {
    pub target1: f64,
    pub target2: f64,
    pub target3: f64,
}

/// A projected long/short call, ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingSignal {
    pub symbol: String,
    pub side: Side,
    pub timeframe: String,
    pub leverage: u32,
    pub entry_price: f64,
    #[serde(flatten)]
    pub targets: Targets,
    pub timestamp: i64,
}

impl TradingSignal {
    pub fn time(&self) -> DateTime<Utc> {
        millis_to_utc(self.timestamp)
    }
}
