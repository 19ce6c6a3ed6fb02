//! FlowScan Core: provider fallback fetching, indicators, candlestick patterns, signal flags.
//!
//! This crate contains the whole analysis path:
//! - Domain types (bars, decorated bar series)
//! - REST adapters for eight market-data vendors behind an ordered fallback fetcher
//! - Trading-session filtering for hourly bars
//! - MFI, MFI slope, moving averages, OBV and six candlestick patterns
//! - Buy and sell signal catalogs and the signaling rule
//! - Batch scanning and tabular export

pub mod config;
pub mod data;
pub mod domain;
pub mod frame;
pub mod indicators;
pub mod scan;
pub mod signals;

pub use config::{ConfigError, FlowScanConfig};
pub use domain::{Bar, BarSeries, Resolution};
pub use scan::{ScanError, ScanRequest, ScanSummary, Scanner};
