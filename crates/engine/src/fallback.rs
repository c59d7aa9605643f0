use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use common::{Candle, CandleSource, Result};

/// Tries `primary` first and `fallback` when it fails.
pub struct FallbackSource {
    primary: Arc<dyn CandleSource>,
    fallback: Arc<dyn CandleSource>,
}

impl FallbackSource {
    pub fn new(primary: Arc<dyn CandleSource>, fallback: Arc<dyn CandleSource>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl CandleSource for FallbackSource {
    fn name(&self) -> &str {
        self.primary.name()
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        match self.primary.fetch_candles(symbol, timeframe, limit).await {
            Ok(candles) => Ok(candles),
            Err(e) => {
                warn!(
                    primary = %self.primary.name(),
                    fallback = %self.fallback.name(),
                    %symbol,
                    %timeframe,
                    error = %e,
                    "Primary candle source failed, using fallback"
                );
                self.fallback.fetch_candles(symbol, timeframe, limit).await
            }
        }
    }
}
