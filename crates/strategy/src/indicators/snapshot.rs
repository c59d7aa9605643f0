use common::{Candle, IndicatorSnapshot};

use super::ema::latest_ema;

/// Periods of the five tunnel EMAs, fastest first.
pub const TUNNEL_PERIODS: [usize; 5] = [12, 144, 169, 576, 676];

/// Fewest candles for which a snapshot is computed. Matches the longest
/// period so the SMA seed no longer dominates the slowest average.
pub const MIN_CANDLES: usize = 676;

/// Build the tunnel snapshot from the close prices of `candles`.
///
/// Returns `None` ("insufficient data") when fewer than [`MIN_CANDLES`]
/// candles are supplied.
pub fn build_snapshot(candles: &[Candle]) -> Option<IndicatorSnapshot> {
    if candles.len() < MIN_CANDLES {
        return None;
    }

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let [p12, p144, p169, p576, p676] = TUNNEL_PERIODS;

    Some(IndicatorSnapshot {
        ema12: latest_ema(&closes, p12)?,
        ema144: latest_ema(&closes, p144)?,
        ema169: latest_ema(&closes, p169)?,
        ema576: latest_ema(&closes, p576)?,
        ema676: latest_ema(&closes, p676)?,
    })
}
