//! Demand adapter identity.
//!
//! Every demand source the SDKs can integrate is an [`AdapterKey`]. Keys that
//! the server does not know are dropped when the request is normalised.

pub mod cache_filter;
pub mod init_config;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use init_config::{AdapterInitConfig, ProcessedConfigsMap};

/// Known demand adapter keys, sorted alphabetically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterKey {
    Admob,
    Amazon,
    Applovin,
    Bidmachine,
    #[serde(rename = "bigoads")]
    BigoAds,
    Chartboost,
    #[serde(rename = "dtexchange")]
    DtExchange,
    Gam,
    Inmobi,
    #[serde(rename = "ironsource")]
    IronSource,
    Meta,
    Mintegral,
    #[serde(rename = "mobilefuse")]
    MobileFuse,
    Moloco,
    #[serde(rename = "startio")]
    StartIo,
    #[serde(rename = "taurusx")]
    TaurusX,
    #[serde(rename = "unityads")]
    UnityAds,
    #[serde(rename = "vkads")]
    VkAds,
    Vungle,
    Yandex,
}

impl AdapterKey {
    pub const ALL: [AdapterKey; 20] = [
        Self::Admob,
        Self::Amazon,
        Self::Applovin,
        Self::Bidmachine,
        Self::BigoAds,
        Self::Chartboost,
        Self::DtExchange,
        Self::Gam,
        Self::Inmobi,
        Self::IronSource,
        Self::Meta,
        Self::Mintegral,
        Self::MobileFuse,
        Self::Moloco,
        Self::StartIo,
        Self::TaurusX,
        Self::UnityAds,
        Self::VkAds,
        Self::Vungle,
        Self::Yandex,
    ];

    /// Wire form of the key, as sent by the SDK and stored on ad units.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admob => "admob",
            Self::Amazon => "amazon",
            Self::Applovin => "applovin",
            Self::Bidmachine => "bidmachine",
            Self::BigoAds => "bigoads",
            Self::Chartboost => "chartboost",
            Self::DtExchange => "dtexchange",
            Self::Gam => "gam",
            Self::Inmobi => "inmobi",
            Self::IronSource => "ironsource",
            Self::Meta => "meta",
            Self::Mintegral => "mintegral",
            Self::MobileFuse => "mobilefuse",
            Self::Moloco => "moloco",
            Self::StartIo => "startio",
            Self::TaurusX => "taurusx",
            Self::UnityAds => "unityads",
            Self::VkAds => "vkads",
            Self::Vungle => "vungle",
            Self::Yandex => "yandex",
        }
    }
}

impl fmt::Display for AdapterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not a known adapter key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAdapterKey(pub String);

impl fmt::Display for UnknownAdapterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown adapter key '{}'", self.0)
    }
}

impl FromStr for AdapterKey {
    type Err = UnknownAdapterKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| UnknownAdapterKey(s.to_string()))
    }
}

/// Networks that must not serve when the request is flagged COPPA.
const DISABLED_FOR_COPPA: [AdapterKey; 3] =
    [AdapterKey::Meta, AdapterKey::VkAds, AdapterKey::Yandex];

/// True when `key` is excluded from child-directed traffic.
#[must_use]
pub fn is_disabled_for_coppa(key: AdapterKey) -> bool {
    DISABLED_FOR_COPPA.contains(&key)
}

/// Keys of `available` that are also present in `allowed`, in `available` order.
#[must_use]
pub fn common_adapters(allowed: &[AdapterKey], available: &[AdapterKey]) -> Vec<AdapterKey> {
    let allowed: HashSet<AdapterKey> = allowed.iter().copied().collect();
    available
        .iter()
        .copied()
        .filter(|key| allowed.contains(key))
        .collect()
}
