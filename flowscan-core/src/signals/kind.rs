//! Signal identifiers and the buy/sell catalogs.

use crate::domain::Pattern;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named boolean rule evaluated per bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SignalKind {
    #[serde(rename = "MA_Support")]
    MaSupport,
    #[serde(rename = "MFI_Oversold_Rebound")]
    MfiOversoldRebound,
    #[serde(rename = "Hammer")]
    Hammer,
    #[serde(rename = "Morning_Star")]
    MorningStar,
    #[serde(rename = "Bullish_Engulfing")]
    BullishEngulfing,
    #[serde(rename = "Volume_Surge")]
    VolumeSurge,
    #[serde(rename = "Price_Up")]
    PriceUp,
    #[serde(rename = "MFI_Overbought_Pullback")]
    MfiOverboughtPullback,
    #[serde(rename = "OBV_Bearish_Divergence")]
    ObvBearishDivergence,
    #[serde(rename = "Shooting_Star")]
    ShootingStar,
    #[serde(rename = "Evening_Star")]
    EveningStar,
    #[serde(rename = "Bearish_Engulfing")]
    BearishEngulfing,
    #[serde(rename = "MFI_Bearish_Divergence")]
    MfiBearishDivergence,
}

impl SignalKind {
    pub const ALL: [SignalKind; 13] = [
        SignalKind::MaSupport,
        SignalKind::MfiOversoldRebound,
        SignalKind::Hammer,
        SignalKind::MorningStar,
        SignalKind::BullishEngulfing,
        SignalKind::VolumeSurge,
        SignalKind::PriceUp,
        SignalKind::MfiOverboughtPullback,
        SignalKind::ObvBearishDivergence,
        SignalKind::ShootingStar,
        SignalKind::EveningStar,
        SignalKind::BearishEngulfing,
        SignalKind::MfiBearishDivergence,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::MaSupport => "MA_Support",
            Self::MfiOversoldRebound => "MFI_Oversold_Rebound",
            Self::Hammer => "Hammer",
            Self::MorningStar => "Morning_Star",
            Self::BullishEngulfing => "Bullish_Engulfing",
            Self::VolumeSurge => "Volume_Surge",
            Self::PriceUp => "Price_Up",
            Self::MfiOverboughtPullback => "MFI_Overbought_Pullback",
            Self::ObvBearishDivergence => "OBV_Bearish_Divergence",
            Self::ShootingStar => "Shooting_Star",
            Self::EveningStar => "Evening_Star",
            Self::BearishEngulfing => "Bearish_Engulfing",
            Self::MfiBearishDivergence => "MFI_Bearish_Divergence",
        }
    }

    /// The candlestick pattern a flag mirrors, for pattern-backed signals.
    pub fn pattern(&self) -> Option<Pattern> {
        match self {
            Self::Hammer => Some(Pattern::Hammer),
            Self::MorningStar => Some(Pattern::MorningStar),
            Self::BullishEngulfing => Some(Pattern::BullishEngulfing),
            Self::VolumeSurge => Some(Pattern::VolumeSurge),
            Self::ShootingStar => Some(Pattern::ShootingStar),
            Self::EveningStar => Some(Pattern::EveningStar),
            Self::BearishEngulfing => Some(Pattern::BearishEngulfing),
            _ => None,
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SignalKind {
    type Err = String;

    /// Case-insensitive; `-` and `_` are interchangeable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| format!("unknown signal '{s}'"))
    }
}

/// Which rule catalog is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalMode {
    Buy,
    Sell,
}

const BUY_CATALOG: [SignalKind; 7] = [
    SignalKind::MaSupport,
    SignalKind::MfiOversoldRebound,
    SignalKind::Hammer,
    SignalKind::MorningStar,
    SignalKind::BullishEngulfing,
    SignalKind::VolumeSurge,
    SignalKind::PriceUp,
];

const SELL_CATALOG: [SignalKind; 7] = [
    SignalKind::MfiOverboughtPullback,
    SignalKind::ObvBearishDivergence,
    SignalKind::ShootingStar,
    SignalKind::EveningStar,
    SignalKind::BearishEngulfing,
    SignalKind::VolumeSurge,
    SignalKind::MfiBearishDivergence,
];

impl SignalMode {
    pub fn catalog(&self) -> &'static [SignalKind] {
        match self {
            Self::Buy => &BUY_CATALOG,
            Self::Sell => &SELL_CATALOG,
        }
    }

    pub fn contains(&self, kind: SignalKind) -> bool {
        self.catalog().contains(&kind)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl fmt::Display for SignalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Self::Buy),
            "sell" => Ok(Self::Sell),
            other => Err(format!("unknown signal mode '{other}' (expected buy or sell)")),
        }
    }
}
