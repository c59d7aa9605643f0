pub mod rest;

pub use rest::{parse_klines, BinanceKlines, MAX_KLINES};
