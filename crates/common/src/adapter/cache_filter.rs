//! Throttling of adapters that already have enough cached ads on the device.

use std::collections::HashMap;

use crate::ad::{AdType, Os};
use crate::schema::AdCacheObject;

use super::AdapterKey;

/// Fallback cache limit when no platform specific limit is configured.
pub const DEFAULT_MAX_CACHE_COUNT: usize = 3;

type Limits = HashMap<Os, HashMap<AdapterKey, HashMap<AdType, usize>>>;

/// Drops adapters whose cached ad count on the device reached the limit for
/// the (OS, adapter, ad type) triple.
#[derive(Debug, Clone)]
pub struct AdCacheAdaptersFilter {
    default_max_cache_count: usize,
    limits: Limits,
}

impl Default for AdCacheAdaptersFilter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CACHE_COUNT)
    }
}

impl AdCacheAdaptersFilter {
    /// Filter with the built-in per-platform limits.
    #[must_use]
    pub fn new(default_max_cache_count: usize) -> Self {
        use AdType::{Banner, Interstitial, Rewarded};

        let android = [
            (AdapterKey::Admob, vec![Rewarded]),
            (AdapterKey::Applovin, vec![Interstitial, Rewarded]),
            (AdapterKey::Gam, vec![Rewarded]),
            (AdapterKey::IronSource, vec![Interstitial, Rewarded, Banner]),
            (AdapterKey::UnityAds, vec![Interstitial, Rewarded]),
        ];
        let ios = [
            (AdapterKey::Admob, vec![Interstitial, Rewarded]),
            (AdapterKey::Applovin, vec![Interstitial, Banner]),
            (AdapterKey::Gam, vec![Interstitial, Rewarded]),
            (AdapterKey::IronSource, vec![Interstitial, Rewarded, Banner]),
            (AdapterKey::UnityAds, vec![Interstitial, Rewarded]),
            (AdapterKey::DtExchange, vec![Interstitial, Rewarded, Banner]),
            (AdapterKey::Mintegral, vec![Rewarded]),
        ];

        let single = |entries: Vec<(AdapterKey, Vec<AdType>)>| {
            entries
                .into_iter()
                .map(|(key, ad_types)| (key, ad_types.into_iter().map(|t| (t, 1)).collect()))
                .collect::<HashMap<_, _>>()
        };

        let mut limits = Limits::new();
        limits.insert(Os::Android, single(android.to_vec()));
        limits.insert(Os::Ios, single(ios.to_vec()));

        Self {
            default_max_cache_count,
            limits,
        }
    }

    fn max_count(&self, os: Os, key: AdapterKey, ad_type: AdType) -> usize {
        self.limits
            .get(&os)
            .and_then(|platform| platform.get(&key))
            .and_then(|by_type| by_type.get(&ad_type))
            .copied()
            .unwrap_or(self.default_max_cache_count)
    }

    /// Keeps every adapter whose cache count is below its limit, preserving order.
    #[must_use]
    pub fn filter(
        &self,
        os: Os,
        ad_type: AdType,
        adapters: &[AdapterKey],
        ad_cache: &[AdCacheObject],
    ) -> Vec<AdapterKey> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for entry in ad_cache {
            *counts.entry(entry.demand_id.as_str()).or_default() += 1;
        }

        adapters
            .iter()
            .copied()
            .filter(|key| {
                let cached = counts.get(key.as_str()).copied().unwrap_or(0);
                let keep = cached < self.max_count(os, *key, ad_type);
                if !keep {
                    log::debug!("Adapter '{}' throttled: {} cached ads", key, cached);
                }
                keep
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cached(demand_id: &str, price: f64) -> AdCacheObject {
        AdCacheObject {
            demand_id: demand_id.to_string(),
            price,
        }
    }

    #[test]
    fn keeps_adapters_without_cached_ads() {
        let filter = AdCacheAdaptersFilter::default();
        let adapters = [AdapterKey::Admob, AdapterKey::Bidmachine];
        assert_eq!(
            filter.filter(Os::Android, AdType::Rewarded, &adapters, &[]),
            adapters.to_vec()
        );
    }

    #[test]
    fn platform_limit_of_one_drops_adapter() {
        let filter = AdCacheAdaptersFilter::default();
        let adapters = [AdapterKey::Admob, AdapterKey::Bidmachine];
        let cache = [cached("admob", 0.5)];

        assert_eq!(
            filter.filter(Os::Android, AdType::Rewarded, &adapters, &cache),
            vec![AdapterKey::Bidmachine]
        );
        // Android admob interstitial falls back to the default limit.
        assert_eq!(
            filter.filter(Os::Android, AdType::Interstitial, &adapters, &cache),
            adapters.to_vec()
        );
    }

    #[test]
    fn default_limit_applies_per_adapter() {
        let filter = AdCacheAdaptersFilter::default();
        let adapters = [AdapterKey::Bidmachine, AdapterKey::Meta];
        let cache = [
            cached("bidmachine", 0.1),
            cached("bidmachine", 0.2),
            cached("bidmachine", 0.3),
            cached("meta", 0.3),
        ];

        assert_eq!(
            filter.filter(Os::Ios, AdType::Banner, &adapters, &cache),
            vec![AdapterKey::Meta]
        );
    }

    #[test]
    fn ios_specific_limits() {
        let filter = AdCacheAdaptersFilter::default();
        let adapters = [AdapterKey::DtExchange, AdapterKey::Mintegral];
        let cache = [cached("dtexchange", 0.1), cached("mintegral", 0.1)];

        assert_eq!(
            filter.filter(Os::Ios, AdType::Rewarded, &adapters, &cache),
            Vec::<AdapterKey>::new()
        );
        assert_eq!(
            filter.filter(Os::Android, AdType::Rewarded, &adapters, &cache),
            adapters.to_vec()
        );
    }

    #[test]
    fn custom_default_limit() {
        let filter = AdCacheAdaptersFilter::new(1);
        let cache = [cached("bidmachine", 0.1)];
        assert!(filter
            .filter(Os::Other, AdType::Banner, &[AdapterKey::Bidmachine], &cache)
            .is_empty());
    }
}
