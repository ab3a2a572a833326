//! Real-time bidding round.
//!
//! One [`DemandResponse`] is produced per adapter call (Amazon may produce
//! several, one per slot). Adapter failures and timeouts never fail the
//! round; they are carried as responses with the matching status.

pub mod adapters_config;
pub mod bidder;
pub mod builder;
pub mod notification;

use async_trait::async_trait;
use derive_more::Display;
use error_stack::Report;
use serde::Serialize;
use tokio::time::Instant;

use crate::adapter::{AdapterKey, ProcessedConfigsMap};
use crate::error::BidonError;
use crate::geo::GeoData;
use crate::schema::AuctionRequest;

pub use adapters_config::{BiddingAdaptersConfigBuilder, StoreAdaptersConfigBuilder};
pub use bidder::Bidder;
pub use builder::FanOutBiddingBuilder;
pub use notification::{NoopNotificationHandler, NotificationHandler};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DemandStatus {
    #[display("NO_BID")]
    #[serde(rename = "NO_BID")]
    NoBid,
    #[display("BID")]
    #[serde(rename = "BID")]
    Bid,
    #[display("ERROR")]
    #[serde(rename = "ERROR")]
    Error,
    #[display("TIMEOUT")]
    #[serde(rename = "TIMEOUT")]
    Timeout,
}

/// Winning bid returned by an adapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BidDemandResponse {
    pub id: String,
    pub imp_id: String,
    pub price: f64,
    pub payload: String,
    pub signaldata: String,
    pub ad_id: String,
    pub seat_id: String,
    pub lurl: String,
    pub nurl: String,
    pub burl: String,
}

/// Client-side bid token data echoed from `imp.demands`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TokenInfo {
    pub value: String,
    pub status: String,
    pub start_ts: i64,
    pub end_ts: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemandResponse {
    pub demand_id: AdapterKey,
    pub status: DemandStatus,
    pub bid: Option<BidDemandResponse>,
    /// Amazon slot the bid belongs to.
    pub slot_uuid: Option<String>,
    pub tag_id: Option<String>,
    pub placement_id: Option<String>,
    pub raw_request: String,
    pub raw_response: String,
    pub error_message: Option<String>,
    /// Unix milliseconds.
    pub start_ts: i64,
    pub end_ts: i64,
    pub token: TokenInfo,
}

impl DemandResponse {
    fn with_status(demand_id: AdapterKey, status: DemandStatus) -> Self {
        Self {
            demand_id,
            status,
            bid: None,
            slot_uuid: None,
            tag_id: None,
            placement_id: None,
            raw_request: String::new(),
            raw_response: String::new(),
            error_message: None,
            start_ts: 0,
            end_ts: 0,
            token: TokenInfo::default(),
        }
    }

    #[must_use]
    pub fn no_bid(demand_id: AdapterKey) -> Self {
        Self::with_status(demand_id, DemandStatus::NoBid)
    }

    #[must_use]
    pub fn bid(demand_id: AdapterKey, bid: BidDemandResponse) -> Self {
        Self {
            bid: Some(bid),
            ..Self::with_status(demand_id, DemandStatus::Bid)
        }
    }

    #[must_use]
    pub fn error(demand_id: AdapterKey, message: impl Into<String>) -> Self {
        Self {
            error_message: Some(message.into()),
            ..Self::with_status(demand_id, DemandStatus::Error)
        }
    }

    #[must_use]
    pub fn timeout(demand_id: AdapterKey) -> Self {
        Self {
            error_message: Some("deadline exceeded".to_string()),
            ..Self::with_status(demand_id, DemandStatus::Timeout)
        }
    }

    #[must_use]
    pub fn with_slot_uuid(mut self, slot_uuid: impl Into<String>) -> Self {
        self.slot_uuid = Some(slot_uuid.into());
        self
    }

    #[must_use]
    pub fn is_bid(&self) -> bool {
        self.status == DemandStatus::Bid && self.bid.is_some()
    }

    /// Bid price, or zero when this is not a bid.
    #[must_use]
    pub fn price(&self) -> f64 {
        match &self.bid {
            Some(bid) if self.is_bid() => bid.price,
            _ => 0.0,
        }
    }

    #[must_use]
    pub fn error_message(&self) -> &str {
        self.error_message.as_deref().unwrap_or_default()
    }
}

/// Every response of one bidding round, in dispatch order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BiddingAuctionResult {
    pub bids: Vec<DemandResponse>,
    pub round_number: i32,
}

impl BiddingAuctionResult {
    #[must_use]
    pub fn max_bid_price(&self) -> f64 {
        self.bids
            .iter()
            .map(DemandResponse::price)
            .fold(0.0, f64::max)
    }

    #[must_use]
    pub fn bid_count(&self) -> usize {
        self.bids.iter().filter(|r| r.is_bid()).count()
    }
}

/// Inputs to one bidding round.
#[derive(Debug, Clone, Copy)]
pub struct BiddingParams<'a> {
    pub app_id: i64,
    pub request: &'a AuctionRequest,
    pub geo: &'a GeoData,
    pub adapter_configs: &'a ProcessedConfigsMap,
    /// RTB adapters allowed by the auction configuration.
    pub bidding_adapters: &'a [AdapterKey],
    pub price_floor: f64,
    /// Outstanding adapter calls are cancelled at this instant.
    pub deadline: Instant,
    /// Auction start, Unix milliseconds.
    pub start_ts: i64,
}

#[async_trait]
pub trait BiddingBuilder: Send + Sync {
    /// Runs one bidding round.
    ///
    /// # Errors
    ///
    /// Only infrastructure failures are errors; adapter failures are responses.
    async fn hold_auction(
        &self,
        params: &BiddingParams<'_>,
    ) -> Result<BiddingAuctionResult, Report<BidonError>>;
}
