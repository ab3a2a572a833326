//! Ad units: the inventory slots an auction can return.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::adapter::AdapterKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BidType {
    /// Pre-priced; the unit's floor is the offer.
    #[serde(rename = "CPM")]
    Cpm,
    /// Price discovered per request through an adapter callout.
    #[serde(rename = "RTB")]
    Rtb,
}

/// Per-adapter extension bag stored with an ad unit.
///
/// Well-known keys are typed; anything else passes through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdUnitExtra {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement_id: Option<String>,
    /// Amazon slot identifier used to map a returned bid back to this unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signaldata: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl AdUnitExtra {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Lays this bag over `base`. Keys from `self` win on conflict.
    #[must_use]
    pub fn over(&self, mut base: Map<String, Value>) -> Self {
        base.extend(self.to_map());
        Self::from_map(base)
    }

    /// Flat key/value view of the bag.
    #[must_use]
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = self.other.clone();
        let known = [
            ("placement_id", &self.placement_id),
            ("slot_uuid", &self.slot_uuid),
            ("signaldata", &self.signaldata),
            ("bid_id", &self.bid_id),
            ("payload", &self.payload),
        ];
        for (key, value) in known {
            if let Some(value) = value {
                map.insert(key.to_string(), Value::String(value.clone()));
            }
        }
        map
    }
}

/// Creative data an adapter needs on the SDK side to render its bid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DemandExt {
    /// Payload is supplied out-of-band.
    Amazon,
    MobileFuse { signaldata: String },
    VkAds { bid_id: String },
    Payload { payload: String },
}

impl DemandExt {
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        let mut map = Map::new();
        match self {
            Self::Amazon => {}
            Self::MobileFuse { signaldata } => {
                map.insert("signaldata".to_string(), Value::String(signaldata));
            }
            Self::VkAds { bid_id } => {
                map.insert("bid_id".to_string(), Value::String(bid_id));
            }
            Self::Payload { payload } => {
                map.insert("payload".to_string(), Value::String(payload));
            }
        }
        map
    }
}

impl AdUnitExtra {
    /// Rebuilds the typed view from a flat bag. Non-string well-known values stay in `other`.
    #[must_use]
    pub fn from_map(mut map: Map<String, Value>) -> Self {
        let mut take = |key: &str| match map.get(key) {
            Some(Value::String(_)) => match map.remove(key) {
                Some(Value::String(s)) => Some(s),
                _ => None,
            },
            _ => None,
        };

        let placement_id = take("placement_id");
        let slot_uuid = take("slot_uuid");
        let signaldata = take("signaldata");
        let bid_id = take("bid_id");
        let payload = take("payload");

        Self {
            placement_id,
            slot_uuid,
            signaldata,
            bid_id,
            payload,
            other: map,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdUnit {
    pub demand_id: AdapterKey,
    pub uid: String,
    pub label: String,
    pub bid_type: BidType,
    #[serde(
        rename = "pricefloor",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub price_floor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i32>,
    #[serde(rename = "ext", default)]
    pub extra: AdUnitExtra,
}

impl AdUnit {
    /// Price used for sorting. Units without a floor sort as zero.
    #[must_use]
    pub fn effective_price_floor(&self) -> f64 {
        self.price_floor.unwrap_or(0.0)
    }

    #[must_use]
    pub fn is_cpm(&self) -> bool {
        self.bid_type == BidType::Cpm
    }
}

/// Ad units grouped by (demand, bid type). Insertion order within a bucket is kept.
#[derive(Debug, Clone, Default)]
pub struct AdUnitsMap {
    buckets: HashMap<(AdapterKey, BidType), Vec<AdUnit>>,
}

impl AdUnitsMap {
    #[must_use]
    pub fn new(ad_units: &[AdUnit]) -> Self {
        let mut buckets: HashMap<(AdapterKey, BidType), Vec<AdUnit>> = HashMap::new();
        for ad_unit in ad_units {
            buckets
                .entry((ad_unit.demand_id, ad_unit.bid_type))
                .or_default()
                .push(ad_unit.clone());
        }
        Self { buckets }
    }

    /// Units for `(key, bid_type)`; empty when the bucket does not exist.
    #[must_use]
    pub fn all(&self, key: AdapterKey, bid_type: BidType) -> &[AdUnit] {
        self.buckets
            .get(&(key, bid_type))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// First unit of the bucket.
    #[must_use]
    pub fn first(&self, key: AdapterKey, bid_type: BidType) -> Option<&AdUnit> {
        self.all(key, bid_type).first()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
