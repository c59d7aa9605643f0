use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::debug;

use common::{Candle, Signal};

use crate::tunnel::{DetectorState, TunnelDetector};

/// Identity of one tracked pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DetectorKey {
    pub symbol: String,
    pub timeframe: String,
}

impl DetectorKey {
    pub fn new(symbol: impl Into<String>, timeframe: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe: timeframe.into(),
        }
    }
}

impl std::fmt::Display for DetectorKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.symbol, self.timeframe)
    }
}

type Slot = Arc<Mutex<TunnelDetector>>;

/// One tunnel detector per (symbol, timeframe).
///
/// Evaluations of the same key are serialized by the slot's mutex; the map
/// lock is only held to look up or insert a slot, so different keys run in
/// parallel.
#[derive(Default)]
pub struct DetectorRegistry {
    detectors: Mutex<HashMap<DetectorKey, Slot>>,
}

impl DetectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate `candles` with the detector for `key`, creating it on first use.
    pub fn evaluate(&self, key: &DetectorKey, candles: &[Candle]) -> Option<Signal> {
        let slot = self.slot(key);
        let mut detector = lock(&*slot);
        let signal = detector.evaluate(candles);
        debug!(key = %key, state = ?detector.state(), "Detector evaluated");
        signal
    }

    /// Current state of `key`, if it has been evaluated before.
    pub fn state(&self, key: &DetectorKey) -> Option<DetectorState> {
        let slot = lock(&self.detectors).get(key).cloned()?;
        let state = lock(&*slot).state();
        Some(state)
    }

    /// All tracked keys with their state, sorted by key.
    pub fn states(&self) -> Vec<(DetectorKey, DetectorState)> {
        let slots: Vec<(DetectorKey, Slot)> = lock(&self.detectors)
            .iter()
            .map(|(k, s)| (k.clone(), s.clone()))
            .collect();
        let mut states: Vec<_> = slots
            .into_iter()
            .map(|(k, s)| {
                let state = lock(&*s).state();
                (k, state)
            })
            .collect();
        states.sort_by(|a, b| a.0.cmp(&b.0));
        states
    }

    pub fn len(&self) -> usize {
        lock(&self.detectors).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, key: &DetectorKey) -> Slot {
        lock(&self.detectors)
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(TunnelDetector::new())))
            .clone()
    }
}

/// Detector evaluation never panics mid-update, so a poisoned lock still
/// holds a consistent state.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tunnel::Alignment;
    use common::Direction;

    fn rising(n: usize, wick_low: Option<f64>) -> Vec<Candle> {
        let mut candles: Vec<Candle> = (0..n)
            .map(|i| {
                let p = 100.0 + i as f64 * 0.1;
                Candle { timestamp: i as i64, open: p, high: p, low: p, close: p, volume: 1.0 }
            })
            .collect();
        if let (Some(low), Some(last)) = (wick_low, candles.last_mut()) {
            last.low = low;
        }
        candles
    }

    #[test]
    fn keys_keep_independent_state() {
        let registry = DetectorRegistry::new();
        let btc = DetectorKey::new("BTCUSDT", "1h");
        let eth = DetectorKey::new("ETHUSDT", "1h");

        // Arm BTC: wick below EMA144 but close below EMA12.
        let mut armed = rising(1000, Some(150.0));
        armed[999].close = 190.0;
        armed[999].open = 190.0;
        let signal = registry.evaluate(&btc, &armed).unwrap();
        assert_eq!(signal.direction, Direction::None);
        assert_eq!(registry.state(&btc), Some(DetectorState::new(Alignment::Bullish, true)));

        let signal = registry.evaluate(&eth, &rising(1000, None)).unwrap();
        assert_eq!(signal.direction, Direction::None);
        assert_eq!(registry.state(&eth), Some(DetectorState::new(Alignment::Bullish, false)));

        // Confirming close on BTC fires from the armed state.
        let signal = registry.evaluate(&btc, &rising(1000, None)).unwrap();
        assert_eq!(signal.direction, Direction::Long);
        assert_eq!(registry.state(&btc), Some(DetectorState::new(Alignment::Bullish, false)));
    }

    #[test]
    fn unknown_key_has_no_state() {
        let registry = DetectorRegistry::new();
        assert!(registry.state(&DetectorKey::new("X", "1m")).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn short_series_still_registers_key() {
        let registry = DetectorRegistry::new();
        let key = DetectorKey::new("SOLUSDT", "15m");
        assert!(registry.evaluate(&key, &rising(10, None)).is_none());
        assert_eq!(registry.state(&key), Some(DetectorState::default()));
    }

    #[test]
    fn states_are_sorted_by_key() {
        let registry = DetectorRegistry::new();
        for key in [DetectorKey::new("ETHUSDT", "1h"), DetectorKey::new("BTCUSDT", "4h"), DetectorKey::new("BTCUSDT", "1h")] {
            let _ = registry.evaluate(&key, &[]);
        }
        let keys: Vec<String> = registry.states().into_iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["BTCUSDT@1h", "BTCUSDT@4h", "ETHUSDT@1h"]);
    }

    #[test]
    fn concurrent_keys_evaluate_in_parallel_threads() {
        let registry = Arc::new(DetectorRegistry::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    let key = DetectorKey::new(format!("PAIR{i}"), "1h");
                    registry.evaluate(&key, &rising(700, None))
                })
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap().is_some());
        }
        assert_eq!(registry.len(), 4);
    }
}
