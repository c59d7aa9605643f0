use async_trait::async_trait;

use crate::{Candle, Result};

/// Abstraction over a market-data provider.
///
/// `BinanceKlines` implements this against the public REST API and
/// `FallbackSource` chains two providers. The scanner is the only caller.
#[async_trait]
pub trait CandleSource: Send + Sync {
    /// Short provider name used in logs.
    fn name(&self) -> &str;

    /// Fetch up to `limit` candles for `symbol` on `timeframe`, oldest first.
    async fn fetch_candles(&self, symbol: &str, timeframe: &str, limit: usize)
        -> Result<Vec<Candle>>;
}
