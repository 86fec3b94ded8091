//! # Hotel Bid Modifiers
//!
//! A small Rust client for the Google Ads ad group bid modifier service, and
//! the submitter behind the `add_hotel_ad_group_bid_modifiers` command, which
//! creates a check-in-day and a length-of-stay bid modifier on a hotel ad
//! group in a single batch.
//!
//! ## Modules
//!
//! - [`client`] - REST client, OAuth token handling and the error types
//! - [`client_trait`] - The [`BidModifierClient`] seam used by the submitter
//! - [`config`] - `google-ads.yaml` credentials loading
//! - [`model`] - Request, response and failure payloads
//! - [`resources`] - Resource name builders
//! - [`submitter`] - Builds, submits and renders the bid modifier batch
//! - [`mock_client`] - In-memory client for tests
//! - [`mocks`] - HTTP mock server fixtures

pub mod client;
pub mod client_trait;
pub mod config;
pub mod mock_client;
pub mod mocks;
pub mod model;
pub mod resources;
pub mod submitter;

pub use client::{Error, GoogleAdsClient, GoogleAdsException, TokenError};
pub use client_trait::BidModifierClient;
pub use config::{ConfigError, GoogleAdsConfig};
pub use mock_client::{MockBidModifierClient, SubmittedBatch};
pub use model::{
    AdGroupBidModifier, AdGroupBidModifierOperation, GoogleAdsError, GoogleAdsFailure,
    HotelCheckInDayInfo, HotelLengthOfStayInfo, MutateAdGroupBidModifiersResponse,
};
pub use submitter::{BidModifierArgs, Outcome};
