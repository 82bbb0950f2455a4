//! Settlement Backend Port - Order Fulfillment
//!
//! Executes a maker's order on behalf of the connected account. The
//! result is returned untouched; normalization happens in the core.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use serde_json::Value;

use crate::domain::order::Order;

/// Trait for order settlement.
#[async_trait]
pub trait SettlementBackend: Send + Sync + 'static {
  /// Fulfill `order` from `account`, delivering received items to
  /// `recipient` (or to `account` when `None`). Criteria-based items
  /// resolve to `token_id`.
  ///
  /// Errors carry the upstream rejection message.
  async fn fulfill(
    &self,
    order: &Order,
    account: Address,
    recipient: Option<Address>,
    token_id: Option<U256>,
  ) -> anyhow::Result<Value>;
}
