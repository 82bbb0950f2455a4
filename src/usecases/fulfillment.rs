//! Fulfillment Executor Use Case - Settlement and Order Submission
//!
//! Hands a selected order to the settlement backend, or a new offer /
//! listing to the marketplace, and normalizes whatever comes back into
//! one `FulfillmentOutcome`. Rejections keep the upstream message.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use tracing::{error, info, instrument};

use crate::domain::error::FlowError;
use crate::domain::order::Order;
use crate::domain::outcome::FulfillmentOutcome;
use crate::ports::marketplace::{ListingRequest, MarketplaceApi, OfferRequest};
use crate::ports::settlement::SettlementBackend;

/// Submits settlements and new orders.
pub struct FulfillmentExecutor<M: MarketplaceApi, S: SettlementBackend> {
  marketplace: Arc<M>,
  settlement: Arc<S>,
}

impl<M: MarketplaceApi, S: SettlementBackend> FulfillmentExecutor<M, S> {
  pub fn new(marketplace: Arc<M>, settlement: Arc<S>) -> Self {
    Self {
      marketplace,
      settlement,
    }
  }

  /// Settle `order` from `wallet`. `token_id` resolves criteria items.
  #[instrument(skip(self, order), fields(order_hash = %order.order_hash, side = %order.side))]
  pub async fn fulfill(
    &self,
    order: &Order,
    wallet: Address,
    recipient: Option<Address>,
    token_id: Option<U256>,
  ) -> Result<FulfillmentOutcome, FlowError> {
    let raw = self
      .settlement
      .fulfill(order, wallet, recipient, token_id)
      .await
      .map_err(|e| rejected(&e, "Settlement rejected"))?;

    let outcome = FulfillmentOutcome::from_success(raw);
    info!(reference = %outcome.transaction_reference, "Order fulfilled");
    Ok(outcome)
  }

  /// Post a new collection offer.
  #[instrument(skip(self, request), fields(collection = %request.collection.slug, amount = %request.amount))]
  pub async fn submit_offer(&self, request: &OfferRequest) -> Result<FulfillmentOutcome, FlowError> {
    let raw = self
      .marketplace
      .create_offer(request)
      .await
      .map_err(|e| rejected(&e, "Offer rejected"))?;

    let outcome = FulfillmentOutcome::from_success(raw);
    info!(reference = %outcome.transaction_reference, "Offer created");
    Ok(outcome)
  }

  /// Post a new listing.
  #[instrument(skip(self, request), fields(asset = %request.asset, price = %request.price))]
  pub async fn submit_listing(
    &self,
    request: &ListingRequest,
  ) -> Result<FulfillmentOutcome, FlowError> {
    let raw = self
      .marketplace
      .create_listing(request)
      .await
      .map_err(|e| rejected(&e, "Listing rejected"))?;

    let outcome = FulfillmentOutcome::from_success(raw);
    info!(reference = %outcome.transaction_reference, "Listing created");
    Ok(outcome)
  }
}

/// Classify a backend rejection, keeping its innermost message as-is.
fn rejected(err: &anyhow::Error, what: &str) -> FlowError {
  error!(error = %format!("{err:#}"), "{what}");
  FlowError::Fulfillment(err.root_cause().to_string())
}
