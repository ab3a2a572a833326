//! Ad opportunity classification shared by every stage of the auction.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Placement kind requested by the SDK (the `ad_type` path parameter).
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdType {
    #[default]
    #[display("banner")]
    Banner,
    #[display("interstitial")]
    Interstitial,
    #[display("rewarded")]
    Rewarded,
}

impl AdType {
    /// Parse the path parameter form (`banner`, `interstitial`, `rewarded`).
    #[must_use]
    pub fn from_path(value: &str) -> Option<Self> {
        match value {
            "banner" => Some(Self::Banner),
            "interstitial" => Some(Self::Interstitial),
            "rewarded" => Some(Self::Rewarded),
            _ => None,
        }
    }
}

/// Banner size class. Only meaningful for [`AdType::Banner`].
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AdFormat {
    #[display("BANNER")]
    Banner,
    #[display("LEADERBOARD")]
    Leaderboard,
    #[display("MREC")]
    Mrec,
    #[display("ADAPTIVE")]
    Adaptive,
}

/// Device class reported by the SDK.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceType {
    #[display("PHONE")]
    Phone,
    #[display("TABLET")]
    Tablet,
    #[default]
    #[serde(other)]
    #[display("")]
    Unknown,
}

/// Operating system family, derived from the free-form `device.os` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Android,
    Ios,
    Other,
}

impl Os {
    #[must_use]
    pub fn parse(os: &str) -> Self {
        if os.eq_ignore_ascii_case("android") {
            Self::Android
        } else if os.eq_ignore_ascii_case("ios") {
            Self::Ios
        } else {
            Self::Other
        }
    }
}
