//! Auction configuration and its resolution.

use std::collections::HashMap;

use async_trait::async_trait;
use error_stack::{Report, ResultExt};
use serde::{Deserialize, Serialize};

use crate::ad::AdType;
use crate::adapter::AdapterKey;
use crate::constants::DEFAULT_AUCTION_TIMEOUT_MS;
use crate::error::BidonError;

/// Configuration selected for one auction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuctionConfig {
    pub id: i64,
    pub uid: String,
    /// Adapters eligible for the CPM path, in priority order.
    #[serde(default)]
    pub demands: Vec<AdapterKey>,
    /// Adapters eligible for the RTB path.
    #[serde(default)]
    pub bidding: Vec<AdapterKey>,
    /// Ad units that may take part. An empty list means no auction is viable.
    #[serde(default)]
    pub ad_unit_ids: Vec<i64>,
    #[serde(rename = "pricefloor", default)]
    pub price_floor: f64,
    /// Milliseconds. Non-positive values fall back to the default.
    #[serde(default)]
    pub timeout: i64,
    #[serde(default)]
    pub external_win_notifications: bool,
}

impl AuctionConfig {
    /// Effective auction timeout in milliseconds.
    #[must_use]
    pub fn auction_timeout(&self) -> u32 {
        self.auction_timeout_or(DEFAULT_AUCTION_TIMEOUT_MS)
    }

    /// Configured timeout, or `default_ms` when it is not positive.
    #[must_use]
    pub fn auction_timeout_or(&self, default_ms: u32) -> u32 {
        if self.timeout > 0 {
            u32::try_from(self.timeout).unwrap_or(u32::MAX)
        } else {
            default_ms
        }
    }
}

/// Cached auction-configuration store.
#[async_trait]
pub trait ConfigFetcher: Send + Sync {
    /// Configuration for (app, ad type, segment). Fails when none applies.
    async fn match_config(
        &self,
        app_id: i64,
        ad_type: AdType,
        segment_id: i64,
        sdk_version: &str,
    ) -> Result<AuctionConfig, Report<BidonError>>;

    /// Configuration pinned by public UID.
    async fn fetch_by_uid_cached(&self, app_id: i64, id: &str, uid: &str) -> Option<AuctionConfig>;

    /// Bidmachine placement ids keyed by ad format.
    async fn fetch_bidmachine_placements(
        &self,
        app_id: i64,
    ) -> Result<HashMap<String, String>, Report<BidonError>>;
}

/// Decodes a base-32 auction key into the decimal UID it encodes.
///
/// # Errors
///
/// Returns [`BidonError::InvalidAuctionKey`] when the key is not a base-32 number.
pub fn decode_auction_key(auction_key: &str) -> Result<String, Report<BidonError>> {
    u128::from_str_radix(auction_key, 32)
        .map(|uid| uid.to_string())
        .change_context(BidonError::InvalidAuctionKey)
}

/// Picks the configuration for an auction, honouring a pinned auction key.
pub struct ConfigResolver<F> {
    fetcher: F,
}

impl<F: ConfigFetcher> ConfigResolver<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    /// # Errors
    ///
    /// - [`BidonError::InvalidAuctionKey`] when `auction_key` is set but does not resolve
    /// - [`BidonError::NoAdsFound`] when no configuration matches
    pub async fn resolve(
        &self,
        app_id: i64,
        ad_type: AdType,
        segment_id: i64,
        auction_key: &str,
        sdk_version: &str,
    ) -> Result<AuctionConfig, Report<BidonError>> {
        if !auction_key.is_empty() {
            let uid = decode_auction_key(auction_key)?;
            return self
                .fetcher
                .fetch_by_uid_cached(app_id, "0", &uid)
                .await
                .ok_or_else(|| {
                    log::info!("Auction key '{}' (uid {}) did not resolve", auction_key, uid);
                    Report::new(BidonError::InvalidAuctionKey)
                });
        }

        self.fetcher
            .match_config(app_id, ad_type, segment_id, sdk_version)
            .await
            .change_context(BidonError::NoAdsFound)
    }
}
