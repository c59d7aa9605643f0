pub mod config;
pub mod error;
pub mod notify;
pub mod source;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use notify::SignalNotifier;
pub use source::CandleSource;
pub use types::*;
