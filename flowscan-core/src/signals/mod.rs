//! Signal generation.
//!
//! Two disjoint rule catalogs (buy and sell) turn a decorated [`BarSeries`] into named
//! boolean flags. Only the caller's selection is computed.
//!
//! [`BarSeries`]: crate::domain::BarSeries

pub mod kind;
pub mod rules;

pub use kind::{SignalKind, SignalMode};
pub use rules::{evaluate, generate_flags, is_signaling, SignalParams};
