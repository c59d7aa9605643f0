use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use common::{Candle, CandleSource, Error, Result};

/// Largest `limit` the klines endpoint accepts.
pub const MAX_KLINES: usize = 1000;

/// Public REST kline client. No credentials needed.
pub struct BinanceKlines {
    name: String,
    base_url: String,
    http: Client,
}

impl BinanceKlines {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }
}

#[async_trait]
impl CandleSource for BinanceKlines {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        let limit = limit.clamp(1, MAX_KLINES);
        let url = format!(
            "{}/api/v3/klines?symbol={}&interval={}&limit={}",
            self.base_url,
            symbol.to_uppercase(),
            timeframe,
            limit
        );

        debug!(source = %self.name, %symbol, %timeframe, limit, "Fetching klines");
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::MarketData(format!("HTTP {status}: {body}")));
        }
        parse_klines(&body)
    }
}

// ─── Kline JSON parsing ──────────────────────────────────────────────────────

/// Parse the klines array. Each row is
/// `[openTime, open, high, low, close, volume, closeTime, ...]` with prices
/// encoded as strings.
pub fn parse_klines(body: &str) -> Result<Vec<Candle>> {
    let rows: Vec<Vec<Value>> = serde_json::from_str(body)?;
    rows.iter().enumerate().map(|(i, row)| parse_row(i, row)).collect()
}

fn parse_row(index: usize, row: &[Value]) -> Result<Candle> {
    if row.len() < 6 {
        return Err(Error::MarketData(format!(
            "kline row {index} has {} fields, expected at least 6",
            row.len()
        )));
    }
    let timestamp = row[0]
        .as_i64()
        .ok_or_else(|| Error::MarketData(format!("kline row {index}: bad open time")))?;

    Ok(Candle {
        timestamp,
        open: number(index, "open", &row[1])?,
        high: number(index, "high", &row[2])?,
        low: number(index, "low", &row[3])?,
        close: number(index, "close", &row[4])?,
        volume: number(index, "volume", &row[5])?,
    })
}

fn number(index: usize, field: &str, value: &Value) -> Result<f64> {
    let parsed = match value {
        Value::String(s) => s.parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| Error::MarketData(format!("kline row {index}: bad {field} {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        [1700000000000, "36500.10", "36620.00", "36480.55", "36600.01", "812.4", 1700003599999, "0", 100, "0", "0", "0"],
        [1700003600000, "36600.01", "36700.00", "36550.00", "36690.50", "640.0", 1700007199999, "0", 90, "0", "0", "0"]
    ]"#;

    #[test]
    fn parses_string_encoded_rows() {
        let candles = parse_klines(SAMPLE).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].timestamp, 1_700_000_000_000);
        assert_eq!(candles[0].open, 36500.10);
        assert_eq!(candles[1].close, 36690.50);
        assert_eq!(candles[1].volume, 640.0);
    }

    #[test]
    fn accepts_numeric_prices() {
        let candles = parse_klines("[[1, 1.5, 2.0, 1.0, 1.75, 10]]").unwrap();
        assert_eq!(candles[0].close, 1.75);
    }

    #[test]
    fn empty_array_is_empty_series() {
        assert!(parse_klines("[]").unwrap().is_empty());
    }

    #[test]
    fn rejects_short_rows() {
        assert!(matches!(parse_klines("[[1, \"1\", \"2\"]]"), Err(Error::MarketData(_))));
    }

    #[test]
    fn rejects_non_numeric_price() {
        let body = r#"[[1, "abc", "2", "1", "1.5", "3"]]"#;
        assert!(matches!(parse_klines(body), Err(Error::MarketData(_))));
    }

    #[test]
    fn rejects_error_object() {
        assert!(matches!(parse_klines(r#"{"code":-1121,"msg":"Invalid symbol."}"#), Err(Error::Json(_))));
    }
}
