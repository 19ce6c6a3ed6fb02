//! Domain types for FlowScan

pub mod bar;
pub mod series;

pub use bar::{Bar, Resolution};
pub use series::{BarSeries, Column, Pattern};
