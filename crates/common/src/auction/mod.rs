//! Auction core.
//!
//! A request flows through [`AuctionOrchestrator`]: segment match, config
//! resolution, price floor, ad-unit matching, the RTB round under the
//! auction deadline, then response assembly and analytics events.

pub mod ad_unit;
pub mod config;
pub mod endpoints;
pub mod events;
pub mod matcher;
pub mod orchestrator;
pub mod price_floor;
pub mod response;

pub use ad_unit::{AdUnit, AdUnitsMap, BidType};
pub use config::{AuctionConfig, ConfigFetcher, ConfigResolver};
pub use endpoints::handle_auction;
pub use matcher::{AdUnitsMatcher, InventoryAdUnitsMatcher};
pub use orchestrator::{AuctionOrchestrator, AuctionResult, AuctionServices};
pub use response::AuctionResponse;
