//! Per-adapter init configs handed to the RTB fan-out.

use async_trait::async_trait;
use error_stack::{Report, ResultExt};
use serde_json::{Map, Value};

use crate::adapter::{AdapterInitConfig, AdapterKey, ProcessedConfigsMap};
use crate::auction::ad_unit::{AdUnitsMap, BidType};
use crate::auction::config::ConfigFetcher;
use crate::error::BidonError;
use crate::schema::AdObject;

#[async_trait]
pub trait BiddingAdaptersConfigBuilder: Send + Sync {
    /// Init configs for `adapter_keys`.
    ///
    /// # Errors
    ///
    /// Returns [`BidonError::NoAdaptersFound`] when none of the keys has a
    /// config, or a store error when the profiles cannot be read.
    async fn build(
        &self,
        app_id: i64,
        adapter_keys: &[AdapterKey],
        imp: &AdObject,
        ad_units: &AdUnitsMap,
    ) -> Result<ProcessedConfigsMap, Report<BidonError>>;
}

/// Account and app level credentials stored for one adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct AppDemandProfile {
    pub adapter_key: AdapterKey,
    pub account_extra: Map<String, Value>,
    pub app_data: Map<String, Value>,
}

#[async_trait]
pub trait DemandProfileFetcher: Send + Sync {
    /// At most one profile per adapter key.
    async fn fetch(
        &self,
        app_id: i64,
        adapter_keys: &[AdapterKey],
    ) -> Result<Vec<AppDemandProfile>, Report<BidonError>>;
}

/// Builds configs from stored demand profiles.
pub struct StoreAdaptersConfigBuilder<P, F> {
    profiles: P,
    configs: F,
}

impl<P: DemandProfileFetcher, F: ConfigFetcher> StoreAdaptersConfigBuilder<P, F> {
    pub fn new(profiles: P, configs: F) -> Self {
        Self { profiles, configs }
    }

    async fn bidmachine_placements(&self, app_id: i64) -> Value {
        match self.configs.fetch_bidmachine_placements(app_id).await {
            Ok(placements) => Value::Object(
                placements
                    .into_iter()
                    .map(|(format, id)| (format, Value::String(id)))
                    .collect(),
            ),
            Err(report) => {
                log::warn!("Failed to fetch bidmachine placements: {:?}", report);
                Value::Object(Map::new())
            }
        }
    }
}

/// Overlays stored profile fields on the adapter's default config.
///
/// Fields the config shape does not accept are ignored. A profile whose
/// values do not fit the shape leaves the default in place.
fn apply_profile(profile: &AppDemandProfile, extra: Map<String, Value>) -> AdapterInitConfig {
    let key = profile.adapter_key;
    let default = AdapterInitConfig::default_for(key, true);

    let Ok(Value::Object(mut fields)) = serde_json::to_value(&default) else {
        return default;
    };
    for (name, value) in profile
        .account_extra
        .iter()
        .chain(profile.app_data.iter())
        .chain(extra.iter())
    {
        if name != "adapter" && name != "order" {
            fields.insert(name.clone(), value.clone());
        }
    }

    match serde_json::from_value(Value::Object(fields))
        .change_context(BidonError::Configuration {
            message: format!("invalid demand profile for {key}"),
        }) {
        Ok(config) => config,
        Err(report) => {
            log::warn!("{:?}", report);
            default
        }
    }
}

#[async_trait]
impl<P: DemandProfileFetcher, F: ConfigFetcher> BiddingAdaptersConfigBuilder
    for StoreAdaptersConfigBuilder<P, F>
{
    async fn build(
        &self,
        app_id: i64,
        adapter_keys: &[AdapterKey],
        imp: &AdObject,
        ad_units: &AdUnitsMap,
    ) -> Result<ProcessedConfigsMap, Report<BidonError>> {
        if adapter_keys.is_empty() {
            return Ok(ProcessedConfigsMap::new());
        }

        let profiles = self.profiles.fetch(app_id, adapter_keys).await?;
        let mut configs = ProcessedConfigsMap::new();

        for profile in profiles
            .iter()
            .filter(|profile| adapter_keys.contains(&profile.adapter_key))
        {
            let mut extra = Map::new();
            match profile.adapter_key {
                AdapterKey::Bidmachine => {
                    extra.insert(
                        "placements".to_string(),
                        self.bidmachine_placements(app_id).await,
                    );
                }
                AdapterKey::TaurusX => {
                    let placements: Vec<Value> = ad_units
                        .all(AdapterKey::TaurusX, BidType::Rtb)
                        .iter()
                        .filter_map(|unit| unit.extra.placement_id.clone())
                        .map(Value::String)
                        .collect();
                    extra.insert("placements".to_string(), Value::Array(placements));
                }
                _ => {}
            }
            configs.insert(profile.adapter_key, apply_profile(profile, extra));
        }

        if configs.is_empty() {
            log::debug!(
                "No adapter configs for auction '{}' (keys: {:?})",
                imp.auction_id,
                adapter_keys
            );
            return Err(Report::new(BidonError::NoAdaptersFound));
        }
        Ok(configs)
    }
}
