//! Marketplace Orders - Order Book Queries and Order Creation
//!
//! Implements the `MarketplaceApi` port on top of the shared
//! `MarketplaceClient`. Reads return raw order JSON. New offers and
//! listings are assembled as Seaport parameters, signed with the local
//! key through `SeaportSettlement` and posted.

use std::str::FromStr;
use std::sync::Arc;

use alloy::primitives::{Address, B256, U256};
use anyhow::{Context, Result, anyhow, ensure};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::client::MarketplaceClient;
use super::types::{
  BuildOfferRequest, BuildOfferResponse, CollectionListingsResponse, CollectionOffersResponse,
  CollectionResponse, CollectionSlug, ContractResponse, FeeEntry, OfferCriteria, OrderEnvelope,
  OrdersResponse, PostListingRequest, PostOfferRequest, SignedProtocolData,
};
use crate::adapters::chain::seaport::{
  ConsiderationItemJson, OfferItemJson, OrderParametersJson, SeaportSettlement,
};
use crate::domain::asset::{AssetStandard, TradeTarget};
use crate::domain::order::{OrderSide, PaymentToken};
use crate::ports::marketplace::{
  CollectionInfo, FeeShare, ListingRequest, MarketplaceApi, OfferRequest, OrderQuery,
};

const BASIS_POINTS: u64 = 10_000;

const ITEM_NATIVE: u8 = 0;
const ITEM_ERC20: u8 = 1;
const ITEM_ERC721: u8 = 2;
const ITEM_ERC1155: u8 = 3;

const ORDER_FULL_OPEN: u8 = 0;
const ORDER_PARTIAL_OPEN: u8 = 1;
const ORDER_FULL_RESTRICTED: u8 = 2;
const ORDER_PARTIAL_RESTRICTED: u8 = 3;

/// Marketplace adapter for one chain.
pub struct OpenSeaMarketplace {
  /// Shared client with auth, pacing and retry.
  client: Arc<MarketplaceClient>,
  /// Signs new orders and names the protocol address.
  seaport: Arc<SeaportSettlement>,
  /// Chain slug used in API paths, e.g. "base".
  chain: String,
}

impl OpenSeaMarketplace {
  pub fn new(
    client: Arc<MarketplaceClient>,
    seaport: Arc<SeaportSettlement>,
    chain: impl Into<String>,
  ) -> Self {
    Self {
      client,
      seaport,
      chain: chain.into(),
    }
  }

  fn protocol_address(&self) -> String {
    format!("{:#x}", self.seaport.address())
  }

  /// Collection slug of a token contract.
  async fn collection_of_contract(&self, contract: Address) -> Result<String> {
    let path = format!("/api/v2/chain/{}/contract/{contract:#x}", self.chain);
    let response: ContractResponse = self.client.get_json(&path).await?;
    response
      .collection
      .ok_or_else(|| anyhow!("contract {contract} belongs to no collection"))
  }
}

#[async_trait]
impl MarketplaceApi for OpenSeaMarketplace {
  #[instrument(skip(self))]
  async fn get_order(&self, order_hash: &str, _side: OrderSide) -> Result<Option<Value>> {
    let path = format!(
      "/api/v2/orders/chain/{}/protocol/{}/{order_hash}",
      self.chain,
      self.protocol_address()
    );
    let envelope: Option<OrderEnvelope> = self.client.get_optional_json(&path).await?;
    debug!(found = envelope.is_some(), "Order lookup");
    Ok(envelope.map(|e| e.order))
  }

  #[instrument(skip(self, query), fields(target = %query.target, side = %query.side, limit = query.limit))]
  async fn list_orders(&self, query: &OrderQuery) -> Result<Vec<Value>> {
    let orders = match &query.target {
      TradeTarget::Asset(asset) => {
        let path = format!(
          "/api/v2/orders/{}/seaport/{}?asset_contract_address={:#x}&token_ids={}&limit={}",
          self.chain,
          query.side.as_api_segment(),
          asset.contract,
          asset.token_id,
          query.limit
        );
        let page: OrdersResponse = self.client.get_json(&path).await?;
        page.orders
      }
      TradeTarget::Collection(collection) => match query.side {
        OrderSide::Offer => {
          let path = format!(
            "/api/v2/offers/collection/{}/all?limit={}",
            collection.slug, query.limit
          );
          let page: CollectionOffersResponse = self.client.get_json(&path).await?;
          page.offers
        }
        OrderSide::Listing => {
          let path = format!(
            "/api/v2/listings/collection/{}/all?limit={}",
            collection.slug, query.limit
          );
          let page: CollectionListingsResponse = self.client.get_json(&path).await?;
          page.listings
        }
      },
    };

    info!(count = orders.len(), "Order page fetched");
    Ok(orders)
  }

  #[instrument(skip(self))]
  async fn get_collection(&self, slug: &str) -> Result<CollectionInfo> {
    let response: CollectionResponse = self
      .client
      .get_json(&format!("/api/v2/collections/{slug}"))
      .await?;
    Ok(collection_info(response, &self.chain))
  }

  #[instrument(skip(self, request), fields(collection = %request.collection.slug))]
  async fn create_offer(&self, request: &OfferRequest) -> Result<Value> {
    ensure!(
      request.offerer == self.seaport.account(),
      "offerer {} is not the signing account",
      request.offerer
    );

    let build = BuildOfferRequest {
      offerer: format!("{:#x}", request.offerer),
      quantity: request.quantity,
      criteria: OfferCriteria {
        collection: CollectionSlug {
          slug: request.collection.slug.clone(),
        },
      },
      protocol_address: self.protocol_address(),
    };
    let built: BuildOfferResponse = self
      .client
      .post_json("/api/v2/offers/build", &build)
      .await
      .context("Failed to build offer")?;

    let mut parameters = offer_parameters(
      request,
      &built,
      self.seaport.conduit_key(),
      now_secs(),
    )?;
    let signature = self.seaport.sign(&mut parameters).await?;

    let post = PostOfferRequest {
      protocol_data: SignedProtocolData {
        parameters,
        signature: signature.to_string(),
      },
      criteria: built.criteria,
      protocol_address: self.protocol_address(),
    };
    let created: Value = self
      .client
      .post_json("/api/v2/offers", &post)
      .await
      .context("Failed to post offer")?;

    info!("Collection offer posted");
    Ok(created)
  }

  #[instrument(skip(self, request), fields(asset = %request.asset))]
  async fn create_listing(&self, request: &ListingRequest) -> Result<Value> {
    ensure!(
      request.offerer == self.seaport.account(),
      "offerer {} is not the signing account",
      request.offerer
    );

    let slug = self.collection_of_contract(request.asset.contract).await?;
    let collection = self.get_collection(&slug).await?;

    let mut parameters = listing_parameters(
      request,
      &collection.fees,
      self.seaport.conduit_key(),
      now_secs(),
    )?;
    let signature = self.seaport.sign(&mut parameters).await?;

    let post = PostListingRequest {
      parameters,
      signature: signature.to_string(),
      protocol_address: self.protocol_address(),
    };
    let path = format!("/api/v2/orders/{}/seaport/listings", self.chain);
    let created: Value = self
      .client
      .post_json(&path, &post)
      .await
      .context("Failed to post listing")?;

    info!(collection = %slug, "Listing posted");
    Ok(created)
  }
}

/// Map collection metadata, keeping the contract on `chain` and the
/// required fees.
fn collection_info(response: CollectionResponse, chain: &str) -> CollectionInfo {
  let contract = response
    .contracts
    .iter()
    .filter(|c| c.chain.eq_ignore_ascii_case(chain))
    .find_map(|c| Address::from_str(&c.address).ok());

  let fees = response
    .fees
    .iter()
    .filter(|f| f.required)
    .filter_map(|f| match fee_share(f) {
      Some(share) => Some(share),
      None => {
        warn!(recipient = %f.recipient, fee = f.fee, "Skipping unreadable fee");
        None
      }
    })
    .collect();

  CollectionInfo {
    slug: response.collection,
    contract,
    fees,
  }
}

fn fee_share(entry: &FeeEntry) -> Option<FeeShare> {
  let recipient = Address::from_str(&entry.recipient).ok()?;
  if !(0.0..=100.0).contains(&entry.fee) {
    return None;
  }
  // Percent with at most two decimals maps exactly onto basis points.
  let basis_points = (entry.fee * 100.0).round() as u16;
  Some(FeeShare {
    recipient,
    basis_points,
  })
}

/// `amount * bps / 10_000`, rounded down.
fn fee_amount(amount: U256, basis_points: u16) -> U256 {
  amount * U256::from(basis_points) / U256::from(BASIS_POINTS)
}

/// Currency item type and token of a payment token.
fn currency(token: PaymentToken) -> (u8, Address) {
  match token {
    PaymentToken::Native => (ITEM_NATIVE, Address::ZERO),
    PaymentToken::Erc20(address) => (ITEM_ERC20, address),
  }
}

fn random_salt() -> U256 {
  U256::from_be_slice(Uuid::new_v4().as_bytes())
}

fn now_secs() -> u64 {
  u64::try_from(Utc::now().timestamp()).unwrap_or_default()
}

/// Seaport parameters of a fixed-price listing. The seller receives the
/// price minus the collection fees.
fn listing_parameters(
  request: &ListingRequest,
  fees: &[FeeShare],
  conduit_key: B256,
  now: u64,
) -> Result<OrderParametersJson> {
  ensure!(request.expiration > now, "listing expiration is in the past");
  let (currency_type, currency_token) = currency(request.payment_token);
  let quantity = U256::from(request.quantity.max(1));

  let fee_items: Vec<ConsiderationItemJson> = fees
    .iter()
    .map(|fee| {
      let amount = fee_amount(request.price, fee.basis_points);
      ConsiderationItemJson {
        item_type: currency_type,
        token: currency_token,
        identifier_or_criteria: U256::ZERO,
        start_amount: amount,
        end_amount: amount,
        recipient: fee.recipient,
      }
    })
    .collect();
  let total_fees = fee_items
    .iter()
    .fold(U256::ZERO, |acc, item| acc + item.start_amount);
  let proceeds = request
    .price
    .checked_sub(total_fees)
    .context("fees exceed listing price")?;

  let mut consideration = vec![ConsiderationItemJson {
    item_type: currency_type,
    token: currency_token,
    identifier_or_criteria: U256::ZERO,
    start_amount: proceeds,
    end_amount: proceeds,
    recipient: request.offerer,
  }];
  consideration.extend(fee_items);

  let (item_type, order_type) = match request.asset.standard {
    AssetStandard::Unique => (ITEM_ERC721, ORDER_FULL_OPEN),
    AssetStandard::FungibleCount => (ITEM_ERC1155, ORDER_PARTIAL_OPEN),
  };

  Ok(OrderParametersJson {
    offerer: request.offerer,
    zone: Address::ZERO,
    offer: vec![OfferItemJson {
      item_type,
      token: request.asset.contract,
      identifier_or_criteria: request.asset.token_id,
      start_amount: quantity,
      end_amount: quantity,
    }],
    total_original_consideration_items: Some(consideration.len() as u64),
    consideration,
    order_type,
    start_time: U256::from(now),
    end_time: U256::from(request.expiration),
    zone_hash: B256::ZERO,
    salt: random_salt(),
    conduit_key,
    counter: None,
  })
}

/// Seaport parameters of a collection offer. The marketplace supplies
/// the criteria consideration and zone; fees are paid out of the
/// offered amount.
fn offer_parameters(
  request: &OfferRequest,
  built: &BuildOfferResponse,
  conduit_key: B256,
  now: u64,
) -> Result<OrderParametersJson> {
  ensure!(request.expiration > now, "offer expiration is in the past");
  let zone = Address::from_str(&built.partial_parameters.zone).context("Malformed offer zone")?;
  let zone_hash =
    B256::from_str(&built.partial_parameters.zone_hash).context("Malformed offer zone hash")?;

  let mut consideration = built.partial_parameters.consideration.clone();
  consideration.extend(request.collection.fees.iter().map(|fee| {
    let amount = fee_amount(request.amount, fee.basis_points);
    ConsiderationItemJson {
      item_type: ITEM_ERC20,
      token: request.payment_token,
      identifier_or_criteria: U256::ZERO,
      start_amount: amount,
      end_amount: amount,
      recipient: fee.recipient,
    }
  }));

  let order_type = match (zone.is_zero(), request.quantity > 1) {
    (true, false) => ORDER_FULL_OPEN,
    (true, true) => ORDER_PARTIAL_OPEN,
    (false, false) => ORDER_FULL_RESTRICTED,
    (false, true) => ORDER_PARTIAL_RESTRICTED,
  };

  Ok(OrderParametersJson {
    offerer: request.offerer,
    zone,
    offer: vec![OfferItemJson {
      item_type: ITEM_ERC20,
      token: request.payment_token,
      identifier_or_criteria: U256::ZERO,
      start_amount: request.amount,
      end_amount: request.amount,
    }],
    total_original_consideration_items: Some(consideration.len() as u64),
    consideration,
    order_type,
    start_time: U256::from(now),
    end_time: U256::from(request.expiration),
    zone_hash,
    salt: random_salt(),
    conduit_key,
    counter: None,
  })
}
