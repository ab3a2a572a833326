//! Candidate ad-unit lookup.

use async_trait::async_trait;
use error_stack::Report;
use serde::{Deserialize, Serialize};

use crate::ad::{AdFormat, AdType, DeviceType};
use crate::adapter::AdapterKey;
use crate::constants::{ADMOB_AD_UNIT_TIMEOUT_MS, DEFAULT_AD_UNIT_TIMEOUT_MS};
use crate::error::BidonError;

use super::ad_unit::{AdUnit, AdUnitExtra, BidType};

/// Opportunity an ad unit must be compatible with.
#[derive(Debug, Clone, Default)]
pub struct AdUnitsMatchParams {
    pub app_id: i64,
    pub ad_type: AdType,
    pub ad_format: Option<AdFormat>,
    pub device_type: DeviceType,
    pub adapters: Vec<AdapterKey>,
    /// Restricts the match to these ids when non-empty.
    pub ad_unit_ids: Vec<i64>,
}

#[async_trait]
pub trait AdUnitsMatcher: Send + Sync {
    /// Units compatible with `params`, limited to `params.adapters`.
    async fn match_cached(
        &self,
        params: &AdUnitsMatchParams,
    ) -> Result<Vec<AdUnit>, Report<BidonError>>;
}

/// Ad unit as persisted for an app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAdUnit {
    pub id: i64,
    pub app_id: i64,
    pub ad_type: AdType,
    #[serde(default)]
    pub format: Option<AdFormat>,
    pub demand_id: AdapterKey,
    pub public_uid: i64,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub bidding: bool,
    #[serde(default)]
    pub bid_floor: Option<f64>,
    #[serde(default)]
    pub extra: AdUnitExtra,
}

impl StoredAdUnit {
    fn to_ad_unit(&self) -> AdUnit {
        let bid_type = if self.bidding {
            BidType::Rtb
        } else {
            BidType::Cpm
        };
        AdUnit {
            demand_id: self.demand_id,
            uid: self.public_uid.to_string(),
            label: self.label.clone(),
            bid_type,
            price_floor: if self.bidding { None } else { self.bid_floor },
            timeout: Some(ad_unit_timeout(self.demand_id)),
            extra: self.extra.clone(),
        }
    }
}

/// Load timeout the SDK applies to a unit of `demand_id`.
#[must_use]
pub fn ad_unit_timeout(demand_id: AdapterKey) -> i32 {
    if demand_id == AdapterKey::Admob {
        ADMOB_AD_UNIT_TIMEOUT_MS
    } else {
        DEFAULT_AD_UNIT_TIMEOUT_MS
    }
}

/// Banner formats a request for `format` on `device_type` may be served with.
#[must_use]
pub fn compatible_formats(format: AdFormat, device_type: DeviceType) -> Vec<AdFormat> {
    let mut formats = vec![format];
    match format {
        AdFormat::Adaptive => match device_type {
            DeviceType::Tablet => formats.push(AdFormat::Leaderboard),
            DeviceType::Phone => formats.push(AdFormat::Banner),
            DeviceType::Unknown => {}
        },
        AdFormat::Banner | AdFormat::Leaderboard => formats.push(AdFormat::Adaptive),
        AdFormat::Mrec => {}
    }
    formats
}

/// Matches against an in-memory inventory snapshot.
#[derive(Debug, Clone, Default)]
pub struct InventoryAdUnitsMatcher {
    ad_units: Vec<StoredAdUnit>,
}

impl InventoryAdUnitsMatcher {
    #[must_use]
    pub fn new(ad_units: Vec<StoredAdUnit>) -> Self {
        Self { ad_units }
    }

    /// Uncached match. Inventory order is preserved.
    #[must_use]
    pub fn match_units(&self, params: &AdUnitsMatchParams) -> Vec<AdUnit> {
        let formats = match (params.ad_type, params.ad_format) {
            (AdType::Banner, None) => return Vec::new(),
            (AdType::Banner, Some(format)) => Some(compatible_formats(format, params.device_type)),
            _ => None,
        };

        self.ad_units
            .iter()
            .filter(|unit| unit.app_id == params.app_id && unit.ad_type == params.ad_type)
            .filter(|unit| params.adapters.contains(&unit.demand_id))
            .filter(|unit| params.ad_unit_ids.is_empty() || params.ad_unit_ids.contains(&unit.id))
            .filter(|unit| match (&formats, unit.format) {
                (Some(formats), Some(format)) => formats.contains(&format),
                (Some(_), None) => false,
                (None, _) => true,
            })
            .map(StoredAdUnit::to_ad_unit)
            .collect()
    }
}

#[async_trait]
impl AdUnitsMatcher for InventoryAdUnitsMatcher {
    async fn match_cached(
        &self,
        params: &AdUnitsMatchParams,
    ) -> Result<Vec<AdUnit>, Report<BidonError>> {
        Ok(self.match_units(params))
    }
}
