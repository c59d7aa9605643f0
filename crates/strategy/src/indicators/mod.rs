pub mod ema;
pub mod snapshot;

pub use ema::{ema, latest_ema};
pub use snapshot::{build_snapshot, MIN_CANDLES, TUNNEL_PERIODS};
