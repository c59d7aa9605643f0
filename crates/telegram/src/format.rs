use common::{Side, TradingSignal};
use engine::ScanReport;
use strategy::{Alignment, DetectorKey, DetectorState};

/// Render a price with precision suited to its magnitude.
pub fn format_price(price: f64) -> String {
    let abs = price.abs();
    if abs >= 1000.0 {
        format!("{price:.2}")
    } else if abs >= 1.0 {
        format!("{price:.4}")
    } else {
        format!("{price:.6}")
    }
}

/// Broadcast text for one trading signal.
pub fn format_signal(signal: &TradingSignal) -> String {
    let icon = match signal.side {
        Side::Long => "🟢",
        Side::Short => "🔴",
    };
    format!(
        "{icon} {side} {symbol} ({timeframe})\n\
         Leverage: {leverage}x\n\
         Entry: {entry}\n\
         TP1: {tp1}\n\
         TP2: {tp2}\n\
         TP3: {tp3}\n\
         Candle: {time}",
        side = signal.side,
        symbol = signal.symbol,
        timeframe = signal.timeframe,
        leverage = signal.leverage,
        entry = format_price(signal.entry_price),
        tp1 = format_price(signal.targets.target1),
        tp2 = format_price(signal.targets.target2),
        tp3 = format_price(signal.targets.target3),
        time = signal.time().format("%Y-%m-%d %H:%M UTC"),
    )
}

/// `/status` reply.
pub fn format_status(
    states: &[(DetectorKey, DetectorState)],
    report: &ScanReport,
    subscribers: i64,
) -> String {
    let mut lines = vec!["VegasBot Status".to_string()];

    match (report.trigger, report.finished_at) {
        (Some(trigger), Some(finished)) => lines.push(format!(
            "Last scan: {} ({trigger}), {} evaluated, {} signals, {} failed",
            finished.format("%Y-%m-%d %H:%M:%S UTC"),
            report.evaluated,
            report.signals.len(),
            report.failed,
        )),
        _ => lines.push("Last scan: none yet".to_string()),
    }
    lines.push(format!("Subscribers: {subscribers}"));

    if states.is_empty() {
        lines.push("No detectors evaluated yet.".to_string());
    }
    for (key, state) in states {
        let trend = match state.alignment {
            Alignment::Bullish => "bullish",
            Alignment::Bearish => "bearish",
            Alignment::None => "no trend",
        };
        let armed = if state.armed { ", retest armed" } else { "" };
        lines.push(format!("{key}: {trend}{armed}"));
    }
    lines.join("\n")
}
