//! Mock bid modifier client for testing
//!
//! `MockBidModifierClient` implements [`BidModifierClient`] without any HTTP
//! traffic. It records every submitted batch and answers with configured
//! results, a configured failure, or one synthesized result per operation.
//!
//! # Examples
//!
//! ```rust,no_run
//! use hotel_bid_modifiers::{BidModifierClient, MockBidModifierClient};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = MockBidModifierClient::new().with_results(["r1", "r2"]);
//! let response = client.mutate_ad_group_bid_modifiers("1234567890", vec![]).await?;
//! assert_eq!(response.results.len(), 2);
//! assert_eq!(client.submissions().len(), 1);
//! # Ok(())
//! # }
//! ```

#![allow(clippy::missing_panics_doc)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::client::{Error, GoogleAdsException};
use crate::client_trait::BidModifierClient;
use crate::model::{
    AdGroupBidModifierOperation, MutateAdGroupBidModifierResult, MutateAdGroupBidModifiersResponse,
};
use crate::resources::{ad_group_bid_modifier_path, composite_id};

/// One batch as received by the mock
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedBatch {
    pub customer_id: String,
    pub operations: Vec<AdGroupBidModifierOperation>,
}

#[derive(Debug, Clone)]
enum MockFailure {
    Validation(GoogleAdsException),
    Transport(String),
}

#[derive(Debug, Clone, Default)]
pub struct MockBidModifierClient {
    inner: Arc<MockBidModifierClientInner>,
}

#[derive(Debug, Default)]
struct MockBidModifierClientInner {
    results: Mutex<Option<Vec<String>>>,
    failure: Mutex<Option<MockFailure>>,
    submissions: Mutex<Vec<SubmittedBatch>>,
    next_criterion_id: AtomicU64,
}

impl MockBidModifierClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every batch with these resource names
    #[must_use]
    pub fn with_results<I, S>(self, resource_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.inner.results.lock().unwrap() =
            Some(resource_names.into_iter().map(Into::into).collect());
        self
    }

    /// Rejects every batch with this validation failure
    #[must_use]
    pub fn with_failure(self, exception: GoogleAdsException) -> Self {
        *self.inner.failure.lock().unwrap() = Some(MockFailure::Validation(exception));
        self
    }

    /// Fails every batch as if the connection broke
    #[must_use]
    pub fn with_transport_failure(self, message: impl Into<String>) -> Self {
        *self.inner.failure.lock().unwrap() = Some(MockFailure::Transport(message.into()));
        self
    }

    /// Batches received so far, oldest first
    pub fn submissions(&self) -> Vec<SubmittedBatch> {
        self.inner.submissions.lock().unwrap().clone()
    }

    fn synthesize_resource_name(&self, customer_id: &str, op: &AdGroupBidModifierOperation) -> String {
        if let Some(resource_name) = &op.create.resource_name {
            return resource_name.clone();
        }
        let ad_group_id = op
            .create
            .ad_group
            .as_deref()
            .and_then(|path| path.rsplit('/').next())
            .unwrap_or("0");
        let criterion_id = 270_000 + self.inner.next_criterion_id.fetch_add(1, Ordering::SeqCst);
        ad_group_bid_modifier_path(customer_id, &composite_id(ad_group_id, criterion_id))
    }
}

#[async_trait]
impl BidModifierClient for MockBidModifierClient {
    async fn mutate_ad_group_bid_modifiers(
        &self,
        customer_id: &str,
        operations: Vec<AdGroupBidModifierOperation>,
    ) -> Result<MutateAdGroupBidModifiersResponse, Error> {
        self.inner.submissions.lock().unwrap().push(SubmittedBatch {
            customer_id: customer_id.to_string(),
            operations: operations.clone(),
        });

        match self.inner.failure.lock().unwrap().clone() {
            Some(MockFailure::Validation(exception)) => return Err(Error::GoogleAds(exception)),
            Some(MockFailure::Transport(message)) => return Err(Error::RequestFailed(message)),
            None => {}
        }

        let resource_names = match self.inner.results.lock().unwrap().clone() {
            Some(names) => names,
            None => operations
                .iter()
                .map(|op| self.synthesize_resource_name(customer_id, op))
                .collect(),
        };

        Ok(MutateAdGroupBidModifiersResponse {
            results: resource_names
                .into_iter()
                .map(|resource_name| MutateAdGroupBidModifierResult { resource_name })
                .collect(),
        })
    }
}
