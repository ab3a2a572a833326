//! Trait definition for RTB bidders.

use async_trait::async_trait;
use error_stack::Report;

use crate::adapter::{AdapterKey, ProcessedConfigsMap};
use crate::error::BidonError;
use crate::openrtb::{BidRequest, BidResponse};
use crate::schema::AuctionRequest;

use super::{BidDemandResponse, DemandResponse};

/// Implemented by every RTB adapter (Bidmachine, Mintegral, Amazon, ...).
///
/// Each adapter owns its wire codec. The fan-out cancels the call when the
/// auction deadline passes, so implementations must not hold state across an
/// `.await` that would be unsafe to drop.
#[async_trait]
pub trait Bidder: Send + Sync {
    /// Adapter this bidder serves.
    fn key(&self) -> AdapterKey;

    /// Specialise `base` for this adapter, send it, and parse the answer.
    ///
    /// Most adapters return exactly one response; Amazon returns one per slot.
    ///
    /// # Errors
    ///
    /// Returns an error when the request cannot be built or sent. The fan-out
    /// records it as an `ERROR` response.
    async fn fetch_bids(
        &self,
        base: &BidRequest,
        request: &AuctionRequest,
        configs: &ProcessedConfigsMap,
    ) -> Result<Vec<DemandResponse>, Report<BidonError>>;
}

/// Converts a parsed OpenRTB answer into a demand response.
///
/// `None` or an empty seat list is a `NO_BID`.
#[must_use]
pub fn demand_response_from_openrtb(
    key: AdapterKey,
    raw_request: String,
    raw_response: String,
    response: Option<&BidResponse>,
) -> DemandResponse {
    let best = response.and_then(BidResponse::best_bid);
    let mut demand_response = match best {
        Some((bid, seat)) => DemandResponse::bid(
            key,
            BidDemandResponse {
                id: bid.id.clone(),
                imp_id: bid.impid.clone(),
                price: bid.price,
                payload: bid.adm.clone().unwrap_or_default(),
                signaldata: String::new(),
                ad_id: bid.adid.clone().unwrap_or_default(),
                seat_id: seat.unwrap_or_default().to_string(),
                lurl: bid.lurl.clone().unwrap_or_default(),
                nurl: bid.nurl.clone().unwrap_or_default(),
                burl: bid.burl.clone().unwrap_or_default(),
            },
        ),
        None => DemandResponse::no_bid(key),
    };
    demand_response.raw_request = raw_request;
    demand_response.raw_response = raw_response;
    demand_response
}
