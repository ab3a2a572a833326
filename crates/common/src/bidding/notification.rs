//! Hook invoked once a bidding round has produced its responses.

use async_trait::async_trait;
use error_stack::Report;

use crate::ad::AdType;
use crate::error::BidonError;
use crate::schema::AdObject;

use super::BiddingAuctionResult;

/// Receives every finished bidding round, for win/loss bookkeeping.
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    /// # Errors
    ///
    /// Failures are logged by the caller and never affect the auction.
    async fn handle_bidding_round(
        &self,
        imp: &AdObject,
        result: &BiddingAuctionResult,
        bundle: &str,
        ad_type: AdType,
    ) -> Result<(), Report<BidonError>>;
}

/// Handler for deployments without win notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotificationHandler;

#[async_trait]
impl NotificationHandler for NoopNotificationHandler {
    async fn handle_bidding_round(
        &self,
        imp: &AdObject,
        result: &BiddingAuctionResult,
        _bundle: &str,
        _ad_type: AdType,
    ) -> Result<(), Report<BidonError>> {
        log::trace!(
            "Bidding round for auction '{}' finished with {} responses",
            imp.auction_id,
            result.bids.len()
        );
        Ok(())
    }
}
