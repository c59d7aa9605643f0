use common::{Candle, Side, Signal, Targets, TradingSignal};

/// Fibonacci extensions applied to the swing range, nearest target first.
pub const TARGET_MULTIPLIERS: [f64; 3] = [1.0, 1.618, 2.0];

/// Range used when no swing data is available, as a fraction of entry.
pub const DEFAULT_RANGE_PCT: f64 = 0.05;

/// Default trailing window for the swing range.
pub const DEFAULT_SWING_LOOKBACK: usize = 50;

/// High/low extremes of a recent window of candles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwingRange {
    pub high: f64,
    pub low: f64,
}

impl SwingRange {
    /// Max high and min low over the last `lookback` candles.
    /// Returns `None` for an empty window.
    pub fn from_candles(candles: &[Candle], lookback: usize) -> Option<Self> {
        let window = &candles[candles.len().saturating_sub(lookback)..];
        window.iter().fold(None, |acc, c| {
            Some(match acc {
                None => SwingRange { high: c.high, low: c.low },
                Some(r) => SwingRange { high: r.high.max(c.high), low: r.low.min(c.low) },
            })
        })
    }

    pub fn width(&self) -> f64 {
        (self.high - self.low).abs()
    }
}

/// Project three take-profit levels from `entry` in the direction of `side`.
pub fn project_targets(entry: f64, side: Side, swing: Option<SwingRange>) -> Targets {
    let range = swing.map_or(entry * DEFAULT_RANGE_PCT, |s| s.width());
    let sign = match side {
        Side::Long => 1.0,
        Side::Short => -1.0,
    };
    let [m1, m2, m3] = TARGET_MULTIPLIERS.map(|m| entry + sign * range * m);
    Targets { target1: m1, target2: m2, target3: m3 }
}

/// Turn an actionable detector signal into a deliverable trading signal.
/// Returns `None` for `Direction::None`.
pub fn build_trading_signal(
    symbol: &str,
    timeframe: &str,
    leverage: u32,
    signal: &Signal,
    swing: Option<SwingRange>,
) -> Option<TradingSignal> {
    let side = Side::try_from(signal.direction).ok()?;
    Some(TradingSignal {
        symbol: symbol.to_string(),
        side,
        timeframe: timeframe.to_string(),
        leverage,
        entry_price: signal.price,
        targets: project_targets(signal.price, side, swing),
        timestamp: signal.timestamp,
    })
}
