//! Per-adapter initialisation configs.
//!
//! Each adapter key owns exactly one config shape. [`AdapterInitConfig::default_for`]
//! is total over [`AdapterKey`], so there is no "unknown adapter" failure path.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::AdapterKey;

/// Adapter-init configs keyed by adapter, as handed to the bidding fan-out.
pub type ProcessedConfigsMap = HashMap<AdapterKey, AdapterInitConfig>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppIdConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub app_id: String,
    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppKeyConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub app_key: String,
    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplovinConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sdk_key: String,
    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BidmachineConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub seller_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mediation_config: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub placements: HashMap<String, String>,
    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartboostConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub app_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub app_signature: String,
    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GamConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub network_code: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub app_id: String,
    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppIdKeyConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub app_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub app_key: String,
    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MobileFuseConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub publisher_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub app_key: String,
    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InmobiConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub account_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub app_key: String,
    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnityAdsConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub game_id: String,
    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YandexConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub metrica_id: String,
    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaurusXConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub app_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub placements: Vec<String>,
    #[serde(default)]
    pub order: i32,
}

/// Initialisation parameters for one adapter, tagged by its key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "adapter", rename_all = "lowercase")]
pub enum AdapterInitConfig {
    Admob(AppIdConfig),
    Amazon(AppKeyConfig),
    Applovin(ApplovinConfig),
    Bidmachine(BidmachineConfig),
    #[serde(rename = "bigoads")]
    BigoAds(AppIdConfig),
    Chartboost(ChartboostConfig),
    #[serde(rename = "dtexchange")]
    DtExchange(AppIdConfig),
    Gam(GamConfig),
    Inmobi(InmobiConfig),
    #[serde(rename = "ironsource")]
    IronSource(AppKeyConfig),
    Meta(AppIdConfig),
    Mintegral(AppIdKeyConfig),
    #[serde(rename = "mobilefuse")]
    MobileFuse(MobileFuseConfig),
    Moloco(AppKeyConfig),
    #[serde(rename = "startio")]
    StartIo(AppIdConfig),
    #[serde(rename = "taurusx")]
    TaurusX(TaurusXConfig),
    #[serde(rename = "unityads")]
    UnityAds(UnityAdsConfig),
    #[serde(rename = "vkads")]
    VkAds(AppIdConfig),
    Vungle(AppIdConfig),
    Yandex(YandexConfig),
}

impl AdapterInitConfig {
    /// Empty config for `key`, with the adapter's default SDK init order applied
    /// when `set_order` is true.
    #[must_use]
    pub fn default_for(key: AdapterKey, set_order: bool) -> Self {
        let mut config = match key {
            AdapterKey::Admob => Self::Admob(AppIdConfig::default()),
            AdapterKey::Amazon => Self::Amazon(AppKeyConfig::default()),
            AdapterKey::Applovin => Self::Applovin(ApplovinConfig::default()),
            AdapterKey::Bidmachine => Self::Bidmachine(BidmachineConfig::default()),
            AdapterKey::BigoAds => Self::BigoAds(AppIdConfig::default()),
            AdapterKey::Chartboost => Self::Chartboost(ChartboostConfig::default()),
            AdapterKey::DtExchange => Self::DtExchange(AppIdConfig::default()),
            AdapterKey::Gam => Self::Gam(GamConfig::default()),
            AdapterKey::Inmobi => Self::Inmobi(InmobiConfig::default()),
            AdapterKey::IronSource => Self::IronSource(AppKeyConfig::default()),
            AdapterKey::Meta => Self::Meta(AppIdConfig::default()),
            AdapterKey::Mintegral => Self::Mintegral(AppIdKeyConfig::default()),
            AdapterKey::MobileFuse => Self::MobileFuse(MobileFuseConfig::default()),
            AdapterKey::Moloco => Self::Moloco(AppKeyConfig::default()),
            AdapterKey::StartIo => Self::StartIo(AppIdConfig::default()),
            AdapterKey::TaurusX => Self::TaurusX(TaurusXConfig::default()),
            AdapterKey::UnityAds => Self::UnityAds(UnityAdsConfig::default()),
            AdapterKey::VkAds => Self::VkAds(AppIdConfig::default()),
            AdapterKey::Vungle => Self::Vungle(AppIdConfig::default()),
            AdapterKey::Yandex => Self::Yandex(YandexConfig::default()),
        };
        if set_order {
            config.set_order(default_order(key));
        }
        config
    }

    #[must_use]
    pub fn key(&self) -> AdapterKey {
        match self {
            Self::Admob(_) => AdapterKey::Admob,
            Self::Amazon(_) => AdapterKey::Amazon,
            Self::Applovin(_) => AdapterKey::Applovin,
            Self::Bidmachine(_) => AdapterKey::Bidmachine,
            Self::BigoAds(_) => AdapterKey::BigoAds,
            Self::Chartboost(_) => AdapterKey::Chartboost,
            Self::DtExchange(_) => AdapterKey::DtExchange,
            Self::Gam(_) => AdapterKey::Gam,
            Self::Inmobi(_) => AdapterKey::Inmobi,
            Self::IronSource(_) => AdapterKey::IronSource,
            Self::Meta(_) => AdapterKey::Meta,
            Self::Mintegral(_) => AdapterKey::Mintegral,
            Self::MobileFuse(_) => AdapterKey::MobileFuse,
            Self::Moloco(_) => AdapterKey::Moloco,
            Self::StartIo(_) => AdapterKey::StartIo,
            Self::TaurusX(_) => AdapterKey::TaurusX,
            Self::UnityAds(_) => AdapterKey::UnityAds,
            Self::VkAds(_) => AdapterKey::VkAds,
            Self::Vungle(_) => AdapterKey::Vungle,
            Self::Yandex(_) => AdapterKey::Yandex,
        }
    }

    #[must_use]
    pub fn order(&self) -> i32 {
        match self {
            Self::Admob(c)
            | Self::BigoAds(c)
            | Self::DtExchange(c)
            | Self::Meta(c)
            | Self::StartIo(c)
            | Self::VkAds(c)
            | Self::Vungle(c) => c.order,
            Self::Amazon(c) | Self::IronSource(c) | Self::Moloco(c) => c.order,
            Self::Applovin(c) => c.order,
            Self::Bidmachine(c) => c.order,
            Self::Chartboost(c) => c.order,
            Self::Gam(c) => c.order,
            Self::Inmobi(c) => c.order,
            Self::Mintegral(c) => c.order,
            Self::MobileFuse(c) => c.order,
            Self::TaurusX(c) => c.order,
            Self::UnityAds(c) => c.order,
            Self::Yandex(c) => c.order,
        }
    }

    fn set_order(&mut self, order: i32) {
        match self {
            Self::Admob(c)
            | Self::BigoAds(c)
            | Self::DtExchange(c)
            | Self::Meta(c)
            | Self::StartIo(c)
            | Self::VkAds(c)
            | Self::Vungle(c) => c.order = order,
            Self::Amazon(c) | Self::IronSource(c) | Self::Moloco(c) => c.order = order,
            Self::Applovin(c) => c.order = order,
            Self::Bidmachine(c) => c.order = order,
            Self::Chartboost(c) => c.order = order,
            Self::Gam(c) => c.order = order,
            Self::Inmobi(c) => c.order = order,
            Self::Mintegral(c) => c.order = order,
            Self::MobileFuse(c) => c.order = order,
            Self::TaurusX(c) => c.order = order,
            Self::UnityAds(c) => c.order = order,
            Self::Yandex(c) => c.order = order,
        }
    }
}

/// SDK initialisation order per adapter. Lower initialises first.
fn default_order(key: AdapterKey) -> i32 {
    match key {
        AdapterKey::Amazon
        | AdapterKey::Bidmachine
        | AdapterKey::DtExchange
        | AdapterKey::Meta
        | AdapterKey::Moloco
        | AdapterKey::StartIo
        | AdapterKey::TaurusX => 0,
        AdapterKey::Admob | AdapterKey::Applovin | AdapterKey::Gam => 1,
        AdapterKey::BigoAds
        | AdapterKey::Chartboost
        | AdapterKey::IronSource
        | AdapterKey::UnityAds
        | AdapterKey::VkAds
        | AdapterKey::Vungle
        | AdapterKey::Yandex => 2,
        AdapterKey::Inmobi | AdapterKey::Mintegral | AdapterKey::MobileFuse => 3,
    }
}
