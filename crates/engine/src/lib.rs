pub mod binance;
pub mod fallback;
pub mod scanner;

pub use binance::BinanceKlines;
pub use fallback::FallbackSource;
pub use scanner::{EntryOutcome, ScanContext, ScanReport, Scanner, ScannerHandle, TriggerOutcome, TriggerSource};
