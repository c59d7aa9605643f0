use async_trait::async_trait;

use crate::{Result, TradingSignal};

/// Delivery side of the pipeline. Receives every projected trading signal.
#[async_trait]
pub trait SignalNotifier: Send + Sync {
    async fn notify(&self, signal: &TradingSignal) -> Result<()>;
}
