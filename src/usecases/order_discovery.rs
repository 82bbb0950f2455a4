//! Order Discovery Use Case - Candidate Lookup and Selection
//!
//! Queries one page of the marketplace order book for a target, drops
//! candidates that cannot be settled by this wallet, and picks the best
//! by exact integer price. Also serves exact-hash lookups and
//! collection metadata.
//!
//! Candidate filters:
//! 1. Unreadable records (no hash, price or maker) are skipped
//! 2. Expired orders are dropped
//! 3. Orders whose payload sits on the other side of the book are dropped
//! 4. Orders naming a different token than the target are dropped
//! 5. Offers asking for more units than the wallet holds are dropped
//!    (fungible-count assets, when bounding is enabled)

use std::sync::Arc;

use alloy::primitives::U256;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::domain::asset::{AssetStandard, TradeTarget};
use crate::domain::error::FlowError;
use crate::domain::order::{Order, OrderSide, select_best};
use crate::ports::marketplace::{CollectionInfo, MarketplaceApi, OrderQuery};

/// Default page size of an order book query.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Discovery tuning.
#[derive(Debug, Clone, Copy)]
pub struct DiscoverySettings {
  /// Orders fetched per query.
  pub page_size: usize,
  /// Drop offers requesting more units than the wallet holds.
  pub bound_offers_by_balance: bool,
}

impl Default for DiscoverySettings {
  fn default() -> Self {
    Self {
      page_size: DEFAULT_PAGE_SIZE,
      bound_offers_by_balance: true,
    }
  }
}

/// Finds settleable orders on the marketplace.
pub struct OrderDiscovery<M: MarketplaceApi> {
  marketplace: Arc<M>,
  settings: DiscoverySettings,
}

impl<M: MarketplaceApi> OrderDiscovery<M> {
  pub fn new(marketplace: Arc<M>, settings: DiscoverySettings) -> Self {
    Self {
      marketplace,
      settings,
    }
  }

  /// Look up one order by hash.
  #[instrument(skip(self, target), fields(target = %target))]
  pub async fn find_by_exact_hash(
    &self,
    target: &TradeTarget,
    order_hash: &str,
    side: OrderSide,
  ) -> Result<Order, FlowError> {
    let raw = self
      .marketplace
      .get_order(order_hash, side)
      .await
      .map_err(|e| FlowError::connection(&e.context("order lookup failed")))?
      .ok_or_else(|| FlowError::OrderNotFound(format!("no {side} with hash {order_hash}")))?;

    let order = Order::from_marketplace(raw, side)
      .map_err(|e| FlowError::OrderNotFound(format!("{side} {order_hash} is unreadable: {e}")))?;

    if let Some(actual) = order.payload_side().filter(|actual| *actual != side) {
      warn!(order_hash, expected = %side, %actual, "Order is on the other side of the book");
      return Err(FlowError::OrderNotFound(format!(
        "{order_hash} is a {actual}, not a {side}"
      )));
    }
    if order.is_expired(now_secs()) {
      return Err(FlowError::OrderNotFound(format!(
        "{side} {order_hash} expired at {}",
        order.expiration
      )));
    }
    if let Some(asset) = target.asset() {
      if !order.targets(asset) {
        return Err(FlowError::OrderNotFound(format!(
          "{side} {order_hash} does not name {asset}"
        )));
      }
    }

    info!(price = %order.price, maker = %order.maker, "Order found by hash");
    Ok(order)
  }

  /// Best open order for `target`, or `None` when nothing survives the
  /// filters. `held` is the wallet's balance of the target, when known.
  #[instrument(skip(self, target), fields(target = %target))]
  pub async fn find_best(
    &self,
    target: &TradeTarget,
    side: OrderSide,
    held: Option<U256>,
  ) -> Result<Option<Order>, FlowError> {
    let query = OrderQuery {
      target: target.clone(),
      side,
      limit: self.settings.page_size,
    };
    let page = self
      .marketplace
      .list_orders(&query)
      .await
      .map_err(|e| FlowError::connection(&e.context("order book query failed")))?;

    let fetched = page.len();
    let candidates = self.candidates(page, target, side, held, now_secs());
    let surviving = candidates.len();
    let best = select_best(candidates);

    match &best {
      Some(order) => info!(
        fetched,
        surviving,
        order_hash = %order.order_hash,
        price = %order.price,
        "Best order selected"
      ),
      None => info!(fetched, surviving, "No candidate order"),
    }
    Ok(best)
  }

  /// Apply the candidate filters to one raw page, preserving page order.
  pub fn candidates(
    &self,
    page: Vec<Value>,
    target: &TradeTarget,
    side: OrderSide,
    held: Option<U256>,
    now: u64,
  ) -> Vec<Order> {
    let bound = match (target.asset(), held) {
      (Some(asset), Some(held))
        if side == OrderSide::Offer
          && asset.standard == AssetStandard::FungibleCount
          && self.settings.bound_offers_by_balance =>
      {
        Some((asset, held))
      }
      _ => None,
    };

    page
      .into_iter()
      .filter_map(|raw| match Order::from_marketplace(raw, side) {
        Ok(order) => Some(order),
        Err(err) => {
          warn!(error = %err, "Skipping unreadable order");
          None
        }
      })
      .filter(|order| {
        let live = !order.is_expired(now);
        if !live {
          debug!(order_hash = %order.order_hash, "Skipping expired order");
        }
        live
      })
      .filter(|order| {
        if order.side_mismatch() {
          debug!(order_hash = %order.order_hash, "Skipping order from the other side of the book");
        }
        !order.side_mismatch()
      })
      .filter(|order| target.asset().is_none_or(|asset| order.targets(asset)))
      .filter(|order| match bound {
        Some((asset, held)) => {
          let wanted = order.quantity_for(asset);
          if wanted > held {
            debug!(
              order_hash = %order.order_hash,
              %wanted,
              %held,
              "Skipping offer larger than holdings"
            );
          }
          wanted <= held
        }
        None => true,
      })
      .collect()
  }

  /// Marketplace metadata for a collection.
  #[instrument(skip(self))]
  pub async fn collection(&self, slug: &str) -> Result<CollectionInfo, FlowError> {
    self
      .marketplace
      .get_collection(slug)
      .await
      .map_err(|e| FlowError::connection(&e.context(format!("collection {slug} lookup failed"))))
  }
}

fn now_secs() -> u64 {
  u64::try_from(Utc::now().timestamp()).unwrap_or_default()
}
