//! Auction orchestrator: one request in, one priced response out.

use std::sync::Arc;
use std::time::Duration;

use derive_more::Display;
use error_stack::{Report, ResultExt};
use tokio::time::Instant;

use crate::adapter::cache_filter::AdCacheAdaptersFilter;
use crate::adapter::{common_adapters, is_disabled_for_coppa, AdapterKey, ProcessedConfigsMap};
use crate::bidding::{
    BiddingAdaptersConfigBuilder, BiddingAuctionResult, BiddingBuilder, BiddingParams,
};
use crate::error::BidonError;
use crate::event::{EventLogger, LoggerEngine};
use crate::geo::GeoData;
use crate::schema::AuctionRequest;
use crate::segment::{Segment, SegmentFetcher, SegmentMatcher, SegmentParams};
use crate::settings::Settings;

use super::ad_unit::{AdUnit, AdUnitsMap};
use super::config::{AuctionConfig, ConfigFetcher, ConfigResolver};
use super::events::{auction_request_event, bidding_events};
use super::matcher::{AdUnitsMatchParams, AdUnitsMatcher};
use super::price_floor::effective_price_floor;
use super::response::{build_response, AuctionResponse};

/// Progress of a single auction.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum AuctionStage {
    Resolving,
    Matching,
    Dispatching,
    Assembling,
    Done,
    Failed,
}

/// Timing of one `build` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stat {
    /// Unix milliseconds.
    pub start_ts: i64,
    pub end_ts: i64,
    pub duration_us: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuctionResult {
    pub config: AuctionConfig,
    pub segment: Segment,
    /// Every unit returned by the matcher, CPM and RTB.
    pub ad_units: Vec<AdUnit>,
    pub cpm_ad_units: Vec<AdUnit>,
    pub bidding_result: BiddingAuctionResult,
    pub price_floor: f64,
    /// Milliseconds.
    pub auction_timeout: u32,
    pub stat: Stat,
}

#[derive(Debug, Clone, Copy)]
pub struct AuctionParams<'a> {
    pub app_id: i64,
    pub request: &'a AuctionRequest,
    pub geo: &'a GeoData,
}

/// Collaborators the orchestrator composes.
pub struct AuctionServices<S, C, E> {
    pub segments: SegmentMatcher<S>,
    pub configs: ConfigResolver<C>,
    pub ad_units: Arc<dyn AdUnitsMatcher>,
    pub adapters_config: Arc<dyn BiddingAdaptersConfigBuilder>,
    pub bidding: Arc<dyn BiddingBuilder>,
    pub events: EventLogger<E>,
}

pub struct AuctionOrchestrator<S, C, E> {
    services: AuctionServices<S, C, E>,
    ad_cache_filter: AdCacheAdaptersFilter,
    custom_mediators: Vec<String>,
    default_timeout_ms: u32,
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl<S, C, E> AuctionOrchestrator<S, C, E>
where
    S: SegmentFetcher,
    C: ConfigFetcher,
    E: LoggerEngine,
{
    pub fn new(services: AuctionServices<S, C, E>, settings: &Settings) -> Self {
        Self {
            services,
            ad_cache_filter: AdCacheAdaptersFilter::new(settings.ad_cache.default_max_cache_count),
            custom_mediators: settings.auction.custom_mediators.clone(),
            default_timeout_ms: settings.auction.default_timeout_ms,
        }
    }

    #[must_use]
    pub fn events(&self) -> &EventLogger<E> {
        &self.services.events
    }

    fn enter(auction_id: &str, stage: AuctionStage) {
        log::debug!("Auction '{}' stage: {}", auction_id, stage);
    }

    /// Resolves, matches and dispatches one auction.
    ///
    /// # Errors
    ///
    /// - [`BidonError::InvalidAuctionKey`] when a pinned configuration does not resolve
    /// - [`BidonError::NoAdsFound`] when no configuration, ad unit or adapter qualifies
    /// - store errors from the ad-unit matcher or adapter-config builder
    pub async fn build(
        &self,
        params: &AuctionParams<'_>,
    ) -> Result<AuctionResult, Report<BidonError>> {
        let auction_id = params.request.imp.auction_id.as_str();
        let result = self.build_stages(params).await;
        match &result {
            Ok(_) => Self::enter(auction_id, AuctionStage::Done),
            Err(report) => {
                Self::enter(auction_id, AuctionStage::Failed);
                log::info!("Auction '{}' failed: {}", auction_id, report.current_context());
            }
        }
        result
    }

    async fn build_stages(
        &self,
        params: &AuctionParams<'_>,
    ) -> Result<AuctionResult, Report<BidonError>> {
        let started = Instant::now();
        let start_ts = now_ms();
        let request = params.request;
        let auction_id = request.imp.auction_id.as_str();

        Self::enter(auction_id, AuctionStage::Resolving);
        let segment = self
            .services
            .segments
            .match_segment(&SegmentParams {
                app_id: params.app_id,
                country: params.geo.country().to_string(),
                ext: request.segment.ext.clone(),
            })
            .await;

        let adapters = self.ad_cache_filter.filter(
            request.device.os_family(),
            request.ad_type,
            &request.adapter_keys(),
            &request.ad_cache,
        );

        let config = self
            .services
            .configs
            .resolve(
                params.app_id,
                request.ad_type,
                segment.id,
                &request.imp.auction_key,
                &request.sdk_version,
            )
            .await?;

        let auction_timeout = config.auction_timeout_or(self.default_timeout_ms);
        let mut budget = Duration::from_millis(u64::from(auction_timeout));
        if let Ok(tmax) = u64::try_from(request.tmax) {
            if tmax > 0 {
                budget = budget.min(Duration::from_millis(tmax));
            }
        }
        let deadline = started + budget;

        if config.ad_unit_ids.is_empty() {
            log::debug!("Config {} has no ad units", config.id);
            return Err(Report::new(BidonError::NoAdsFound));
        }

        let price_floor = effective_price_floor(request, &config, &self.custom_mediators);

        Self::enter(auction_id, AuctionStage::Matching);
        let ad_units = self
            .services
            .ad_units
            .match_cached(&AdUnitsMatchParams {
                app_id: params.app_id,
                ad_type: request.ad_type,
                ad_format: request.format(),
                device_type: request.device.device_type,
                adapters: adapters.clone(),
                ad_unit_ids: config.ad_unit_ids.clone(),
            })
            .await?;
        if ad_units.is_empty() {
            return Err(Report::new(BidonError::NoAdsFound));
        }

        let coppa = request.is_coppa();
        let allowed = |keys: Vec<AdapterKey>| -> Vec<AdapterKey> {
            keys.into_iter()
                .filter(|key| !(coppa && is_disabled_for_coppa(*key)))
                .collect()
        };
        let cpm_keys = common_adapters(&adapters, &config.demands);
        let rtb_keys = common_adapters(&adapters, &config.bidding);
        if cpm_keys.is_empty() && rtb_keys.is_empty() {
            return Err(Report::new(BidonError::NoAdsFound));
        }
        let cpm_keys = allowed(cpm_keys);
        let rtb_keys = allowed(rtb_keys);

        let cpm_ad_units: Vec<AdUnit> = ad_units
            .iter()
            .filter(|unit| unit.is_cpm() && cpm_keys.contains(&unit.demand_id))
            .cloned()
            .collect();

        Self::enter(auction_id, AuctionStage::Dispatching);
        let ad_units_map = AdUnitsMap::new(&ad_units);
        let adapter_configs = self
            .adapter_configs(params.app_id, &rtb_keys, request, &ad_units_map)
            .await?;

        let bidding_result = if adapter_configs.is_empty() {
            BiddingAuctionResult::default()
        } else {
            self.services
                .bidding
                .hold_auction(&BiddingParams {
                    app_id: params.app_id,
                    request,
                    geo: params.geo,
                    adapter_configs: &adapter_configs,
                    bidding_adapters: &rtb_keys,
                    price_floor,
                    deadline,
                    start_ts,
                })
                .await
                .change_context(BidonError::Bidding {
                    message: "bidding round failed".to_string(),
                })?
        };

        if cpm_ad_units.is_empty() && bidding_result.bids.is_empty() {
            return Err(Report::new(BidonError::NoAdsFound));
        }

        let end_ts = now_ms();
        Ok(AuctionResult {
            config,
            segment,
            ad_units,
            cpm_ad_units,
            bidding_result,
            price_floor,
            auction_timeout,
            stat: Stat {
                start_ts,
                end_ts,
                duration_us: i64::try_from(started.elapsed().as_micros()).unwrap_or(i64::MAX),
            },
        })
    }

    async fn adapter_configs(
        &self,
        app_id: i64,
        rtb_keys: &[AdapterKey],
        request: &AuctionRequest,
        ad_units: &AdUnitsMap,
    ) -> Result<ProcessedConfigsMap, Report<BidonError>> {
        if rtb_keys.is_empty() {
            return Ok(ProcessedConfigsMap::new());
        }
        match self
            .services
            .adapters_config
            .build(app_id, rtb_keys, &request.imp, ad_units)
            .await
        {
            Ok(configs) => Ok(configs),
            Err(report) if matches!(report.current_context(), BidonError::NoAdaptersFound) => {
                log::debug!("No adapter configs, skipping RTB round");
                Ok(ProcessedConfigsMap::new())
            }
            Err(report) => Err(report),
        }
    }

    /// Runs the auction, emits its events and assembles the SDK response.
    ///
    /// Events are only emitted for successful auctions. Event failures are
    /// logged and never change the response.
    ///
    /// # Errors
    ///
    /// See [`Self::build`].
    pub async fn run(
        &self,
        app_id: i64,
        mut request: AuctionRequest,
        geo: &GeoData,
    ) -> Result<AuctionResponse, Report<BidonError>> {
        let result = self
            .build(&AuctionParams {
                app_id,
                request: &request,
                geo,
            })
            .await?;

        Self::enter(&request.imp.auction_id, AuctionStage::Assembling);
        request.segment.id = result.segment.string_id();
        request.segment.uid.clone_from(&result.segment.uid);
        request.imp.auction_configuration_id = result.config.id;
        request.imp.auction_configuration_uid.clone_from(&result.config.uid);

        self.log_events(&request, geo, &result);
        let response = build_response(&request, &result);

        log::info!(
            "Auction '{}' done: config {}, floor {}, {} ad units, {} no bids, took {}us",
            response.auction_id,
            response.config_id,
            response.price_floor,
            response.ad_units.len(),
            response.no_bids.len(),
            result.stat.duration_us
        );
        Ok(response)
    }

    fn log_events(&self, request: &AuctionRequest, geo: &GeoData, result: &AuctionResult) {
        let ad_units_map = AdUnitsMap::new(&result.ad_units);
        let mut events = bidding_events(
            request,
            geo,
            &result.config,
            result.price_floor,
            &result.bidding_result,
            &ad_units_map,
        );
        events.push(auction_request_event(
            request,
            geo,
            &result.config,
            result.price_floor,
        ));

        for event in &events {
            self.services.events.log(event, &|report| {
                log::warn!("Failed to log {} event: {:?}", event.event_type, report);
            });
        }
    }
}
