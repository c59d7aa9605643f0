pub mod config;
pub mod indicators;
pub mod registry;
pub mod targets;
pub mod tunnel;

pub use config::{WatchEntry, WatchlistConfig};
pub use registry::{DetectorKey, DetectorRegistry};
pub use targets::{build_trading_signal, project_targets, SwingRange};
pub use tunnel::{Alignment, DetectorState, TunnelDetector};
