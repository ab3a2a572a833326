//! Auction core of the Bidon mediation backend.
//!
//! Given an SDK auction request this crate picks the auction configuration,
//! computes the price floor, matches ad units, runs the RTB round under a
//! deadline and returns a ranked list of ad units, emitting analytics events
//! along the way. Transport, storage and geocoding live outside; the crate
//! talks to them through the fetcher, bidder and engine traits.
//!
//! # Modules
//!
//! - [`ad`]: Ad types, banner formats, device types and OS families
//! - [`adapter`]: Ad network keys, init configs and ad-cache throttling
//! - [`auction`]: Orchestrator, config resolution, ad-unit matching and response assembly
//! - [`bidding`]: RTB fan-out, bidder trait and adapter config building
//! - [`constants`]: Headers, timeouts and defaults
//! - [`error`]: Error types and HTTP mapping
//! - [`event`]: Analytics events, the event logger and its engines
//! - [`geo`]: Resolved client location
//! - [`logging`]: Logger setup
//! - [`openrtb`]: OpenRTB 2.5 request and response subset
//! - [`schema`]: SDK request schema
//! - [`segment`]: Segment matching
//! - [`settings`]: Configuration management and validation
//! - [`test_support`]: Testing utilities and fakes

pub mod ad;
pub mod adapter;
pub mod auction;
pub mod bidding;
pub mod constants;
pub mod error;
pub mod event;
pub mod geo;
pub mod logging;
pub mod openrtb;
pub mod schema;
pub mod segment;
pub mod settings;
