//! Marketplace Port - Order Book and Order Creation
//!
//! Orders cross this boundary as raw JSON; the domain layer extracts
//! the fields it needs. Order creation requests are typed.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use serde_json::Value;

use crate::domain::asset::{Asset, TradeTarget};
use crate::domain::order::{OrderSide, PaymentToken};

/// One page query against the order book.
#[derive(Debug, Clone)]
pub struct OrderQuery {
  /// Asset or collection the orders must name.
  pub target: TradeTarget,
  /// Listings or offers.
  pub side: OrderSide,
  /// Page size.
  pub limit: usize,
}

/// Marketplace metadata for a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionInfo {
  pub slug: String,
  /// Primary contract on the configured chain.
  pub contract: Option<Address>,
  /// Required creator / marketplace fees.
  pub fees: Vec<FeeShare>,
}

/// One fee recipient, in basis points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeShare {
  pub recipient: Address,
  pub basis_points: u16,
}

/// A collection-wide offer to create.
#[derive(Debug, Clone)]
pub struct OfferRequest {
  pub collection: CollectionInfo,
  pub offerer: Address,
  /// Total amount offered, minor units.
  pub amount: U256,
  /// Must be a fungible token.
  pub payment_token: Address,
  pub quantity: u64,
  /// Unix seconds.
  pub expiration: u64,
}

/// A fixed-price listing to create.
#[derive(Debug, Clone)]
pub struct ListingRequest {
  pub asset: Asset,
  pub offerer: Address,
  /// Total price, minor units.
  pub price: U256,
  pub payment_token: PaymentToken,
  pub quantity: u64,
  /// Unix seconds.
  pub expiration: u64,
}

/// Trait for marketplace order book access.
#[async_trait]
pub trait MarketplaceApi: Send + Sync + 'static {
  /// Look up one order by hash. `Ok(None)` when it does not exist.
  async fn get_order(&self, order_hash: &str, side: OrderSide) -> anyhow::Result<Option<Value>>;

  /// Fetch one page of open orders for a target.
  async fn list_orders(&self, query: &OrderQuery) -> anyhow::Result<Vec<Value>>;

  /// Collection metadata by slug.
  async fn get_collection(&self, slug: &str) -> anyhow::Result<CollectionInfo>;

  /// Sign and post a collection offer. Returns the created order.
  async fn create_offer(&self, request: &OfferRequest) -> anyhow::Result<Value>;

  /// Sign and post a listing. Returns the created order.
  async fn create_listing(&self, request: &ListingRequest) -> anyhow::Result<Value>;
}
