//! Concurrent RTB fan-out under the auction deadline.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use error_stack::Report;
use futures::future::join_all;
use serde_json::Value;
use tokio::time::{timeout_at, Instant};

use crate::adapter::{common_adapters, AdapterKey};
use crate::error::BidonError;
use crate::openrtb::BidRequest;
use crate::schema::AuctionRequest;

use super::{
    Bidder, BiddingAuctionResult, BiddingBuilder, BiddingParams, DemandResponse,
    NotificationHandler, TokenInfo,
};

/// Dispatches one request per eligible adapter and folds the answers.
///
/// An adapter is eligible when it is allowed by the configuration, installed
/// in the SDK, carries a bid token in `imp.demands` and has a processed
/// init config.
pub struct FanOutBiddingBuilder<N> {
    bidders: HashMap<AdapterKey, Arc<dyn Bidder>>,
    notification_handler: N,
}

impl<N: NotificationHandler> FanOutBiddingBuilder<N> {
    pub fn new(notification_handler: N) -> Self {
        Self {
            bidders: HashMap::new(),
            notification_handler,
        }
    }

    /// Register a bidder, replacing any previous one for the same key.
    pub fn register_bidder(&mut self, bidder: Arc<dyn Bidder>) {
        let key = bidder.key();
        log::info!("Registering bidder: {}", key);
        self.bidders.insert(key, bidder);
    }

    #[must_use]
    pub fn bidder_count(&self) -> usize {
        self.bidders.len()
    }

    fn dispatch_keys(params: &BiddingParams<'_>) -> Vec<AdapterKey> {
        let request = params.request;
        let with_token: Vec<AdapterKey> = AdapterKey::ALL
            .into_iter()
            .filter(|key| request.imp.token(*key).is_some())
            .collect();
        let configured: Vec<AdapterKey> = params.adapter_configs.keys().copied().collect();

        let keys = common_adapters(&request.adapter_keys(), params.bidding_adapters);
        let keys = common_adapters(&with_token, &keys);
        common_adapters(&configured, &keys)
    }

    async fn call_bidder(
        &self,
        key: AdapterKey,
        base: &BidRequest,
        params: &BiddingParams<'_>,
    ) -> Vec<DemandResponse> {
        let Some(bidder) = self.bidders.get(&key) else {
            log::warn!("Bidder '{}' not registered", key);
            return vec![DemandResponse::error(key, "bidder not registered")];
        };

        log::debug!("Launching bid request to: {}", key);
        match timeout_at(
            params.deadline,
            bidder.fetch_bids(base, params.request, params.adapter_configs),
        )
        .await
        {
            Ok(Ok(responses)) if responses.is_empty() => vec![DemandResponse::no_bid(key)],
            Ok(Ok(responses)) => responses,
            Ok(Err(report)) => {
                log::warn!("Bidder '{}' failed: {:?}", key, report);
                vec![DemandResponse::error(key, report.current_context().to_string())]
            }
            Err(_) => {
                log::info!("Bidder '{}' timed out", key);
                vec![DemandResponse::timeout(key)]
            }
        }
    }
}

#[async_trait]
impl<N: NotificationHandler> BiddingBuilder for FanOutBiddingBuilder<N> {
    async fn hold_auction(
        &self,
        params: &BiddingParams<'_>,
    ) -> Result<BiddingAuctionResult, Report<BidonError>> {
        let keys = Self::dispatch_keys(params);
        if keys.is_empty() {
            log::debug!("No bidding adapters matched, skipping RTB round");
            return Ok(BiddingAuctionResult::default());
        }

        let remaining = params.deadline.saturating_duration_since(Instant::now());
        let tmax = i64::try_from(remaining.as_millis()).unwrap_or(i64::MAX);
        let base = BidRequest::base(
            params.request,
            params.geo,
            params.app_id,
            params.price_floor,
            tmax,
        );

        log::info!(
            "Running {} bidders in parallel (tmax: {}ms)",
            keys.len(),
            tmax
        );

        let calls = keys
            .iter()
            .map(|key| self.call_bidder(*key, &base, params));
        let bids: Vec<DemandResponse> = join_all(calls)
            .await
            .into_iter()
            .flatten()
            .map(|mut response| {
                response.start_ts = params.start_ts;
                response.end_ts = chrono::Utc::now().timestamp_millis();
                response.token = token_info(params.request, response.demand_id);
                response
            })
            .collect();

        let result = BiddingAuctionResult {
            bids,
            round_number: 0,
        };
        log::info!(
            "Bidding round finished: {} responses, {} bids",
            result.bids.len(),
            result.bid_count()
        );

        if let Err(report) = self
            .notification_handler
            .handle_bidding_round(
                &params.request.imp,
                &result,
                &params.request.app.bundle,
                params.request.ad_type,
            )
            .await
        {
            log::warn!("Bidding round notification failed: {:?}", report);
        }

        Ok(result)
    }
}

/// Token data the SDK reported for `key` in `imp.demands`.
fn token_info(request: &AuctionRequest, key: AdapterKey) -> TokenInfo {
    let Some(demand) = request.imp.demand(key) else {
        return TokenInfo::default();
    };
    let string = |name: &str| {
        demand
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    #[allow(clippy::cast_possible_truncation)]
    let timestamp = |name: &str| demand.get(name).and_then(Value::as_f64).map_or(0, |ts| ts as i64);

    TokenInfo {
        value: string("token"),
        status: string("status"),
        start_ts: timestamp("token_start_ts"),
        end_ts: timestamp("token_finish_ts"),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::adapter::{AdapterInitConfig, ProcessedConfigsMap};
    use crate::bidding::DemandStatus;
    use crate::geo::GeoData;
    use crate::test_support::tests::{
        auction_request, RecordingNotificationHandler, StaticBidder,
    };

    fn configs(keys: &[AdapterKey]) -> ProcessedConfigsMap {
        keys.iter()
            .map(|key| (*key, AdapterInitConfig::default_for(*key, true)))
            .collect()
    }

    fn params<'a>(
        request: &'a AuctionRequest,
        geo: &'a GeoData,
        configs: &'a ProcessedConfigsMap,
        bidding: &'a [AdapterKey],
        deadline: Duration,
    ) -> BiddingParams<'a> {
        BiddingParams {
            app_id: 7,
            request,
            geo,
            adapter_configs: configs,
            bidding_adapters: bidding,
            price_floor: 0.1,
            deadline: Instant::now() + deadline,
            start_ts: 1_700_000_000_000,
        }
    }

    #[tokio::test]
    async fn dispatches_only_token_bearing_adapters() {
        let request = auction_request(
            &[AdapterKey::Bidmachine, AdapterKey::Mintegral, AdapterKey::Meta],
            &[AdapterKey::Bidmachine, AdapterKey::Meta],
        );
        let geo = GeoData::default();
        let bidding = [AdapterKey::Bidmachine, AdapterKey::Mintegral, AdapterKey::Meta];
        let configs = configs(&bidding);

        let mut builder = FanOutBiddingBuilder::new(RecordingNotificationHandler::default());
        builder.register_bidder(Arc::new(StaticBidder::bid(AdapterKey::Bidmachine, 0.5)));
        builder.register_bidder(Arc::new(StaticBidder::bid(AdapterKey::Mintegral, 0.9)));
        builder.register_bidder(Arc::new(StaticBidder::no_bid(AdapterKey::Meta)));
        assert_eq!(builder.bidder_count(), 3);

        let result = builder
            .hold_auction(&params(&request, &geo, &configs, &bidding, Duration::from_secs(5)))
            .await
            .expect("should hold auction");

        let demands: Vec<AdapterKey> = result.bids.iter().map(|r| r.demand_id).collect();
        assert_eq!(demands, vec![AdapterKey::Bidmachine, AdapterKey::Meta]);
        assert_eq!(result.bids[0].status, DemandStatus::Bid);
        assert_eq!(result.bids[1].status, DemandStatus::NoBid);
        assert_eq!(result.bids[0].start_ts, 1_700_000_000_000);
        assert!(result.bids[0].end_ts >= result.bids[0].start_ts);
        assert_eq!(result.bids[0].token.value, "token-bidmachine");
        assert_eq!(result.bids[0].token.start_ts, 1_700_000_000_001);
        assert_eq!(builder.notification_handler.rounds(), vec![2]);
    }

    #[tokio::test]
    async fn failures_and_timeouts_become_responses() {
        let keys = [AdapterKey::Bidmachine, AdapterKey::Mintegral, AdapterKey::Moloco];
        let request = auction_request(&keys, &keys);
        let geo = GeoData::default();
        let configs = configs(&keys);

        let mut builder = FanOutBiddingBuilder::new(RecordingNotificationHandler::default());
        builder.register_bidder(Arc::new(StaticBidder::failing(AdapterKey::Bidmachine)));
        builder.register_bidder(Arc::new(
            StaticBidder::bid(AdapterKey::Mintegral, 1.0).with_delay(Duration::from_secs(10)),
        ));

        let result = builder
            .hold_auction(&params(&request, &geo, &configs, &keys, Duration::from_millis(50)))
            .await
            .expect("should hold auction");

        assert_eq!(result.bids.len(), 3);
        assert_eq!(result.bids[0].status, DemandStatus::Error);
        assert_eq!(result.bids[1].status, DemandStatus::Timeout);
        assert_eq!(result.bids[1].error_message(), "deadline exceeded");
        assert_eq!(result.bids[2].status, DemandStatus::Error);
        assert_eq!(result.bids[2].error_message(), "bidder not registered");
        assert_eq!(result.bid_count(), 0);
    }

    #[tokio::test]
    async fn no_eligible_adapters_is_empty_round() {
        let request = auction_request(&[AdapterKey::Bidmachine], &[]);
        let geo = GeoData::default();
        let bidding = [AdapterKey::Bidmachine];
        let configs = configs(&bidding);

        let builder = FanOutBiddingBuilder::new(RecordingNotificationHandler::default());
        let result = builder
            .hold_auction(&params(&request, &geo, &configs, &bidding, Duration::from_secs(1)))
            .await
            .expect("should hold auction");

        assert!(result.bids.is_empty());
        assert!(builder.notification_handler.rounds().is_empty());
    }

    #[tokio::test]
    async fn adapters_without_config_are_skipped() {
        let keys = [AdapterKey::Bidmachine, AdapterKey::Mintegral];
        let request = auction_request(&keys, &keys);
        let geo = GeoData::default();
        let configs = configs(&[AdapterKey::Mintegral]);

        let mut builder = FanOutBiddingBuilder::new(RecordingNotificationHandler::default());
        builder.register_bidder(Arc::new(StaticBidder::bid(AdapterKey::Bidmachine, 0.5)));
        builder.register_bidder(Arc::new(StaticBidder::bid(AdapterKey::Mintegral, 0.9)));

        let result = builder
            .hold_auction(&params(&request, &geo, &configs, &keys, Duration::from_secs(5)))
            .await
            .expect("should hold auction");

        assert_eq!(result.bids.len(), 1);
        assert_eq!(result.bids[0].demand_id, AdapterKey::Mintegral);
        assert_eq!(result.max_bid_price(), 0.9);
    }
}
