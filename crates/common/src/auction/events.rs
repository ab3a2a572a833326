//! Analytics rows for one auction.

use crate::bidding::BiddingAuctionResult;
use crate::event::{AdEvent, TimingMap};
use crate::geo::GeoData;
use crate::schema::AuctionRequest;

use super::ad_unit::AdUnitsMap;
use super::config::AuctionConfig;
use super::response::select_ad_unit;

pub const AUCTION_REQUEST_EVENT: &str = "auction_request";
pub const BID_REQUEST_EVENT: &str = "bid_request";
pub const BID_EVENT: &str = "bid";
pub const SUCCESS_STATUS: &str = "SUCCESS";

fn base_event(
    event_type: &str,
    request: &AuctionRequest,
    geo: &GeoData,
    config: &AuctionConfig,
    price_floor: f64,
) -> AdEvent {
    AdEvent {
        event_type: event_type.to_string(),
        ad_type: request.ad_type.to_string(),
        ad_format: request
            .format()
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default(),
        auction_id: request.imp.auction_id.clone(),
        auction_configuration_id: config.id,
        auction_configuration_uid: config.uid.parse().unwrap_or_default(),
        price_floor,
        ..AdEvent::from_request(request, geo)
    }
}

#[must_use]
pub fn auction_request_event(
    request: &AuctionRequest,
    geo: &GeoData,
    config: &AuctionConfig,
    price_floor: f64,
) -> AdEvent {
    AdEvent {
        status: SUCCESS_STATUS.to_string(),
        ..base_event(AUCTION_REQUEST_EVENT, request, geo, config, price_floor)
    }
}

/// One `bid_request` row per adapter answer. Bids carry a `bid` row as a
/// child so both are produced together.
#[must_use]
pub fn bidding_events(
    request: &AuctionRequest,
    geo: &GeoData,
    config: &AuctionConfig,
    price_floor: f64,
    result: &BiddingAuctionResult,
    ad_units: &AdUnitsMap,
) -> Vec<AdEvent> {
    result
        .bids
        .iter()
        .map(|response| {
            let unit = select_ad_unit(response, ad_units);
            let ad_unit_uid = unit.and_then(|u| u.uid.parse().ok()).unwrap_or_default();
            let ad_unit_label = unit.map(|u| u.label.clone()).unwrap_or_default();
            let bid_timing = [response.start_ts, response.end_ts];

            let bid_request = AdEvent {
                status: response.status.to_string(),
                demand_id: response.demand_id.to_string(),
                bidding: true,
                ad_unit_uid,
                ad_unit_label: ad_unit_label.clone(),
                ecpm: response.price(),
                raw_request: response.raw_request.clone(),
                raw_response: response.raw_response.clone(),
                error: response.error_message().to_string(),
                timing_map: TimingMap::from([
                    ("bid".to_string(), bid_timing),
                    (
                        "token".to_string(),
                        [response.token.start_ts, response.token.end_ts],
                    ),
                ]),
                ..base_event(BID_REQUEST_EVENT, request, geo, config, price_floor)
            };

            if !response.is_bid() {
                return bid_request;
            }
            bid_request.with_child(AdEvent {
                status: SUCCESS_STATUS.to_string(),
                demand_id: response.demand_id.to_string(),
                bidding: true,
                ad_unit_uid,
                ad_unit_label,
                ecpm: response.price(),
                timing_map: TimingMap::from([("bid".to_string(), bid_timing)]),
                ..base_event(BID_EVENT, request, geo, config, price_floor)
            })
        })
        .collect()
}
