//! Trait for bid modifier client implementations
//!
//! The submitter only needs the batched mutate call. Both the production
//! `GoogleAdsClient` and the test `MockBidModifierClient` implement this trait.

use async_trait::async_trait;

use crate::client::{Error, GoogleAdsClient};
use crate::model::{AdGroupBidModifierOperation, MutateAdGroupBidModifiersResponse};

#[async_trait]
pub trait BidModifierClient: Send + Sync {
    /// Creates the given bid modifiers in one batch under `customer_id`.
    ///
    /// Results are returned in operation order. A rejected batch yields
    /// `Error::GoogleAds`.
    async fn mutate_ad_group_bid_modifiers(
        &self,
        customer_id: &str,
        operations: Vec<AdGroupBidModifierOperation>,
    ) -> Result<MutateAdGroupBidModifiersResponse, Error>;
}

#[async_trait]
impl BidModifierClient for GoogleAdsClient {
    async fn mutate_ad_group_bid_modifiers(
        &self,
        customer_id: &str,
        operations: Vec<AdGroupBidModifierOperation>,
    ) -> Result<MutateAdGroupBidModifiersResponse, Error> {
        GoogleAdsClient::mutate_ad_group_bid_modifiers(self, customer_id, operations).await
    }
}
