//! Vegas tunnel retest detector.
//!
//! The five tunnel EMAs must be in strict order for a trend to exist. Within
//! a bullish alignment a candle whose low reaches EMA144 arms the setup, and
//! a close at or above EMA12 confirms it (`long`). Bearish is the mirror
//! image using the high, EMA144 and EMA12 (`short`). Both steps may happen
//! on the same candle.

use serde::{Deserialize, Serialize};
use tracing::debug;

use common::{Candle, Direction, IndicatorSnapshot, Signal};

use crate::indicators::build_snapshot;

/// Ordering of the five tunnel EMAs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    None,
    Bullish,
    Bearish,
}

impl Alignment {
    /// Strict total order: `bullish` iff ema12 > ema144 > ema169 > ema576 > ema676,
    /// `bearish` iff the reverse holds, otherwise `none`.
    pub fn classify(s: &IndicatorSnapshot) -> Self {
        let lanes = [s.ema12, s.ema144, s.ema169, s.ema576, s.ema676];
        if lanes.windows(2).all(|w| w[0] > w[1]) {
            Alignment::Bullish
        } else if lanes.windows(2).all(|w| w[0] < w[1]) {
            Alignment::Bearish
        } else {
            Alignment::None
        }
    }
}

impl std::fmt::Display for Alignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Alignment::None => write!(f, "none"),
            Alignment::Bullish => write!(f, "bullish"),
            Alignment::Bearish => write!(f, "bearish"),
        }
    }
}

/// State carried between evaluations of one (symbol, timeframe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DetectorState {
    pub alignment: Alignment,
    /// A retest into EMA144 happened and a confirming close is pending.
    pub armed: bool,
}

impl DetectorState {
    pub const fn new(alignment: Alignment, armed: bool) -> Self {
        Self { alignment, armed }
    }
}

/// Pure transition: previous state plus the latest snapshot and candle
/// yield the next state and the emitted direction.
pub fn transition(
    state: DetectorState,
    snapshot: &IndicatorSnapshot,
    candle: &Candle,
) -> (DetectorState, Direction) {
    let alignment = Alignment::classify(snapshot);
    let armed = state.armed;

    match alignment {
        Alignment::None => (DetectorState::new(Alignment::None, false), Direction::None),
        Alignment::Bullish => {
            let touched = candle.low <= snapshot.ema144;
            let confirmed = candle.close >= snapshot.ema12;
            let invalidated = snapshot.ema12 <= snapshot.ema144;
            step(alignment, armed, touched, confirmed, invalidated, Direction::Long)
        }
        Alignment::Bearish => {
            let touched = candle.high >= snapshot.ema144;
            let confirmed = candle.close <= snapshot.ema12;
            let invalidated = snapshot.ema12 >= snapshot.ema144;
            step(alignment, armed, touched, confirmed, invalidated, Direction::Short)
        }
    }
}

fn step(
    alignment: Alignment,
    armed: bool,
    touched: bool,
    confirmed: bool,
    invalidated: bool,
    trigger: Direction,
) -> (DetectorState, Direction) {
    let disarmed = DetectorState::new(alignment, false);
    if armed {
        if confirmed {
            (disarmed, trigger)
        } else if invalidated {
            (disarmed, Direction::None)
        } else {
            (DetectorState::new(alignment, true), Direction::None)
        }
    } else if touched && confirmed {
        // Retest and confirmation on the same candle.
        (disarmed, trigger)
    } else if touched {
        (DetectorState::new(alignment, true), Direction::None)
    } else {
        (disarmed, Direction::None)
    }
}

/// Stateful detector for a single (symbol, timeframe).
#[derive(Debug, Clone, Default)]
pub struct TunnelDetector {
    state: DetectorState,
}

impl TunnelDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    /// Evaluate the newest candle of `candles` (oldest first).
    ///
    /// Returns `None` when the series is too short for a snapshot; the
    /// state is left untouched in that case.
    pub fn evaluate(&mut self, candles: &[Candle]) -> Option<Signal> {
        let Some(snapshot) = build_snapshot(candles) else {
            debug!(len = candles.len(), "Insufficient candles for tunnel snapshot");
            return None;
        };
        let latest = candles.last()?;

        let (next, direction) = transition(self.state, &snapshot, latest);
        if next != self.state {
            debug!(
                from = %self.state.alignment,
                to = %next.alignment,
                armed = next.armed,
                "Tunnel state changed"
            );
        }
        self.state = next;

        Some(Signal {
            direction,
            price: latest.close,
            timestamp: latest.timestamp,
            indicators: snapshot,
        })
    }
}
