use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use common::{CandleSource, SignalNotifier, TradingSignal};
use strategy::{build_trading_signal, DetectorRegistry, SwingRange, WatchEntry};

/// What started a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerSource {
    Schedule,
    Api,
    Webhook,
    Telegram,
}

impl std::fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerSource::Schedule => write!(f, "schedule"),
            TriggerSource::Api => write!(f, "api"),
            TriggerSource::Webhook => write!(f, "webhook"),
            TriggerSource::Telegram => write!(f, "telegram"),
        }
    }
}

/// What happened to a scan request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Queued,
    /// The queue is full; scans are already pending.
    Busy,
    /// The scanner task has stopped.
    Closed,
}

/// Result of evaluating one watch entry.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryOutcome {
    /// Fewer candles than the tunnel needs.
    Insufficient,
    NoSignal,
    Signal(TradingSignal),
    Failed(String),
}

/// Summary of the most recent scan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub trigger: Option<TriggerSource>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub evaluated: usize,
    pub insufficient: usize,
    pub failed: usize,
    pub signals: Vec<TradingSignal>,
}

impl ScanReport {
    fn record(&mut self, outcome: EntryOutcome) {
        self.evaluated += 1;
        match outcome {
            EntryOutcome::Insufficient => self.insufficient += 1,
            EntryOutcome::NoSignal => {}
            EntryOutcome::Signal(signal) => self.signals.push(signal),
            EntryOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// Cloneable handle passed to the bot and the HTTP layer.
#[derive(Clone)]
pub struct ScannerHandle {
    trigger_tx: mpsc::Sender<TriggerSource>,
    report: Arc<RwLock<ScanReport>>,
}

impl ScannerHandle {
    pub fn new(trigger_tx: mpsc::Sender<TriggerSource>, report: Arc<RwLock<ScanReport>>) -> Self {
        Self { trigger_tx, report }
    }

    /// Queue a scan without waiting for room in the queue.
    pub fn trigger(&self, source: TriggerSource) -> TriggerOutcome {
        match self.trigger_tx.try_send(source) {
            Ok(()) => TriggerOutcome::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(%source, "Scan queue full, trigger dropped");
                TriggerOutcome::Busy
            }
            Err(mpsc::error::TrySendError::Closed(_)) => TriggerOutcome::Closed,
        }
    }

    pub async fn last_report(&self) -> ScanReport {
        self.report.read().await.clone()
    }
}

/// Shared dependencies of a single entry evaluation.
#[derive(Clone)]
pub struct ScanContext {
    pub source: Arc<dyn CandleSource>,
    pub notifier: Arc<dyn SignalNotifier>,
    pub registry: Arc<DetectorRegistry>,
    pub candle_limit: usize,
}

/// Periodically fetches candles for every watch entry, runs the tunnel
/// detector and hands projected signals to the notifier.
pub struct Scanner {
    watchlist: Vec<WatchEntry>,
    ctx: ScanContext,
    interval: Duration,
    trigger_rx: mpsc::Receiver<TriggerSource>,
    report: Arc<RwLock<ScanReport>>,
}

impl Scanner {
    pub fn new(watchlist: Vec<WatchEntry>, ctx: ScanContext, interval: Duration) -> (Self, ScannerHandle) {
        let (trigger_tx, trigger_rx) = mpsc::channel(8);
        let report = Arc::new(RwLock::new(ScanReport::default()));

        let handle = ScannerHandle::new(trigger_tx, report.clone());
        let scanner = Scanner {
            watchlist,
            ctx,
            interval,
            trigger_rx,
            report,
        };
        (scanner, handle)
    }

    /// Run the scan loop. Call from `tokio::spawn`.
    ///
    /// Scans run one at a time; the first tick fires immediately.
    pub async fn run(mut self) {
        info!(
            entries = self.watchlist.len(),
            interval = ?self.interval,
            "Scanner running"
        );
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.scan(TriggerSource::Schedule).await;
                }
                trigger = self.trigger_rx.recv() => {
                    match trigger {
                        Some(source) => {
                            self.scan(source).await;
                        }
                        None => {
                            warn!("Scan trigger channel closed — stopping scanner");
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Evaluate every watch entry concurrently and publish the report.
    pub async fn scan(&self, trigger: TriggerSource) -> ScanReport {
        let mut report = ScanReport {
            trigger: Some(trigger),
            started_at: Some(Utc::now()),
            ..ScanReport::default()
        };

        let mut tasks = JoinSet::new();
        for entry in self.watchlist.iter().cloned() {
            let ctx = self.ctx.clone();
            tasks.spawn(async move { evaluate_entry(&entry, &ctx).await });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    error!(error = %e, "Scan task panicked");
                    report.record(EntryOutcome::Failed(e.to_string()));
                }
            }
        }

        report.finished_at = Some(Utc::now());
        info!(
            %trigger,
            evaluated = report.evaluated,
            signals = report.signals.len(),
            insufficient = report.insufficient,
            failed = report.failed,
            "Scan complete"
        );
        *self.report.write().await = report.clone();
        report
    }
}

/// Fetch, detect, project and deliver for one watch entry.
pub async fn evaluate_entry(entry: &WatchEntry, ctx: &ScanContext) -> EntryOutcome {
    let candles = match ctx
        .source
        .fetch_candles(&entry.symbol, &entry.timeframe, ctx.candle_limit)
        .await
    {
        Ok(candles) => candles,
        Err(e) => {
            warn!(symbol = %entry.symbol, timeframe = %entry.timeframe, error = %e, "Candle fetch failed");
            return EntryOutcome::Failed(e.to_string());
        }
    };

    let Some(signal) = ctx.registry.evaluate(&entry.key(), &candles) else {
        info!(
            symbol = %entry.symbol,
            timeframe = %entry.timeframe,
            candles = candles.len(),
            "Not enough candles for the tunnel"
        );
        return EntryOutcome::Insufficient;
    };

    let swing = SwingRange::from_candles(&candles, entry.swing_lookback);
    let Some(trading) =
        build_trading_signal(&entry.symbol, &entry.timeframe, entry.leverage, &signal, swing)
    else {
        return EntryOutcome::NoSignal;
    };

    info!(
        symbol = %trading.symbol,
        timeframe = %trading.timeframe,
        side = %trading.side,
        entry = trading.entry_price,
        "Tunnel signal"
    );
    if let Err(e) = ctx.notifier.notify(&trading).await {
        error!(symbol = %trading.symbol, error = %e, "Signal delivery failed");
    }
    EntryOutcome::Signal(trading)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common::{Candle, Error, Result, Side};
    use tokio::sync::Mutex;

    /// Serves a rising series; the last candle wicks into the tunnel when
    /// `retest` is set.
    struct Rising {
        len: usize,
        retest: bool,
        fail_symbol: Option<&'static str>,
    }

    #[async_trait]
    impl CandleSource for Rising {
        fn name(&self) -> &str {
            "rising"
        }

        async fn fetch_candles(&self, symbol: &str, _: &str, limit: usize) -> Result<Vec<Candle>> {
            if self.fail_symbol == Some(symbol) {
                return Err(Error::MarketData("boom".into()));
            }
            let mut candles: Vec<Candle> = (0..self.len.min(limit))
                .map(|i| {
                    let p = 100.0 + i as f64 * 0.1;
                    Candle { timestamp: i as i64 * 3_600_000, open: p, high: p, low: p, close: p, volume: 1.0 }
                })
                .collect();
            if self.retest {
                if let Some(last) = candles.last_mut() {
                    last.low = 150.0;
                }
            }
            Ok(candles)
        }
    }

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<TradingSignal>>,
        fail: bool,
    }

    #[async_trait]
    impl SignalNotifier for Recorder {
        async fn notify(&self, signal: &TradingSignal) -> Result<()> {
            if self.fail {
                return Err(Error::Notify("offline".into()));
            }
            self.sent.lock().await.push(signal.clone());
            Ok(())
        }
    }

    fn entry(symbol: &str) -> WatchEntry {
        WatchEntry {
            symbol: symbol.into(),
            timeframe: "1h".into(),
            leverage: 10,
            swing_lookback: 50,
        }
    }

    fn ctx(source: Rising, notifier: Arc<Recorder>) -> ScanContext {
        ScanContext {
            source: Arc::new(source),
            notifier,
            registry: Arc::new(DetectorRegistry::new()),
            candle_limit: 1000,
        }
    }

    #[tokio::test]
    async fn retest_candle_produces_delivered_long() {
        let notifier = Arc::new(Recorder::default());
        let ctx = ctx(Rising { len: 1000, retest: true, fail_symbol: None }, notifier.clone());

        let outcome = evaluate_entry(&entry("BTCUSDT"), &ctx).await;
        let EntryOutcome::Signal(signal) = &outcome else {
            panic!("expected a signal, got {outcome:?}");
        };
        assert_eq!(signal.side, Side::Long);
        assert_eq!(signal.leverage, 10);
        assert_eq!(signal.timeframe, "1h");
        assert!(signal.targets.target1 > signal.entry_price);
        assert_eq!(notifier.sent.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn short_history_is_insufficient() {
        let notifier = Arc::new(Recorder::default());
        let ctx = ctx(Rising { len: 500, retest: true, fail_symbol: None }, notifier.clone());
        assert_eq!(evaluate_entry(&entry("BTCUSDT"), &ctx).await, EntryOutcome::Insufficient);
        assert!(notifier.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn trend_without_retest_is_quiet() {
        let notifier = Arc::new(Recorder::default());
        let ctx = ctx(Rising { len: 1000, retest: false, fail_symbol: None }, notifier);
        assert_eq!(evaluate_entry(&entry("BTCUSDT"), &ctx).await, EntryOutcome::NoSignal);
    }

    #[tokio::test]
    async fn delivery_failure_still_records_signal() {
        let notifier = Arc::new(Recorder { fail: true, ..Recorder::default() });
        let ctx = ctx(Rising { len: 1000, retest: true, fail_symbol: None }, notifier);
        assert!(matches!(evaluate_entry(&entry("BTCUSDT"), &ctx).await, EntryOutcome::Signal(_)));
    }

    #[tokio::test]
    async fn scan_counts_outcomes_and_publishes_report() {
        let notifier = Arc::new(Recorder::default());
        let ctx = ctx(Rising { len: 1000, retest: true, fail_symbol: Some("BADUSDT") }, notifier.clone());
        let watchlist = vec![entry("BTCUSDT"), entry("ETHUSDT"), entry("BADUSDT")];
        let (scanner, handle) = Scanner::new(watchlist, ctx, Duration::from_secs(60));

        let report = scanner.scan(TriggerSource::Api).await;
        assert_eq!(report.trigger, Some(TriggerSource::Api));
        assert_eq!(report.evaluated, 3);
        assert_eq!(report.failed, 1);
        assert_eq!(report.signals.len(), 2);
        assert!(report.finished_at >= report.started_at);

        let published = handle.last_report().await;
        assert_eq!(published.evaluated, 3);
        assert_eq!(notifier.sent.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn handle_trigger_fails_after_scanner_dropped() {
        let notifier = Arc::new(Recorder::default());
        let ctx = ctx(Rising { len: 0, retest: false, fail_symbol: None }, notifier);
        let (scanner, handle) = Scanner::new(vec![entry("BTCUSDT")], ctx, Duration::from_secs(60));
        assert_eq!(handle.trigger(TriggerSource::Telegram), TriggerOutcome::Queued);
        drop(scanner);
        assert_eq!(handle.trigger(TriggerSource::Telegram), TriggerOutcome::Closed);
    }

    #[tokio::test]
    async fn full_queue_reports_busy_not_closed() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = ScannerHandle::new(tx, Arc::new(RwLock::new(ScanReport::default())));
        assert_eq!(handle.trigger(TriggerSource::Api), TriggerOutcome::Queued);
        assert_eq!(handle.trigger(TriggerSource::Api), TriggerOutcome::Busy);
    }

    #[tokio::test(start_paused = true)]
    async fn run_loop_scans_on_schedule_and_on_trigger() {
        let notifier = Arc::new(Recorder::default());
        let ctx = ctx(Rising { len: 1000, retest: false, fail_symbol: None }, notifier);
        let (scanner, handle) = Scanner::new(vec![entry("BTCUSDT")], ctx, Duration::from_secs(300));
        let task = tokio::spawn(scanner.run());

        // First tick fires immediately.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(handle.last_report().await.trigger, Some(TriggerSource::Schedule));

        assert_eq!(handle.trigger(TriggerSource::Webhook), TriggerOutcome::Queued);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(handle.last_report().await.trigger, Some(TriggerSource::Webhook));

        task.abort();
    }
}
