//! Marketplace API Request/Response Types
//!
//! Serialization types for the marketplace REST API (v2). Orders stay
//! raw `serde_json::Value` here; the domain layer reads them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adapters::chain::seaport::{ConsiderationItemJson, OrderParametersJson};

/// Page of orders for a single asset.
#[derive(Debug, Clone, Deserialize)]
pub struct OrdersResponse {
  #[serde(default)]
  pub orders: Vec<Value>,
  /// Cursor of the next page.
  pub next: Option<String>,
}

/// Page of collection-wide offers.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionOffersResponse {
  #[serde(default)]
  pub offers: Vec<Value>,
  pub next: Option<String>,
}

/// Page of listings across a collection.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionListingsResponse {
  #[serde(default)]
  pub listings: Vec<Value>,
  pub next: Option<String>,
}

/// Single order lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderEnvelope {
  pub order: Value,
}

/// Collection metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionResponse {
  /// Collection slug.
  pub collection: String,
  #[serde(default)]
  pub contracts: Vec<ContractEntry>,
  #[serde(default)]
  pub fees: Vec<FeeEntry>,
}

/// A contract belonging to a collection.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractEntry {
  pub address: String,
  /// Chain slug, e.g. "base".
  pub chain: String,
}

/// A collection fee. `fee` is a percentage (2.5 = 2.5%).
#[derive(Debug, Clone, Deserialize)]
pub struct FeeEntry {
  pub fee: f64,
  pub recipient: String,
  #[serde(default)]
  pub required: bool,
}

/// Contract to collection lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractResponse {
  pub collection: Option<String>,
}

/// Offer criteria: the whole collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferCriteria {
  pub collection: CollectionSlug,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionSlug {
  pub slug: String,
}

/// Request for the marketplace-built part of a collection offer.
#[derive(Debug, Clone, Serialize)]
pub struct BuildOfferRequest {
  pub offerer: String,
  pub quantity: u64,
  pub criteria: OfferCriteria,
  pub protocol_address: String,
}

/// Marketplace-built offer parts (zone and criteria consideration).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOfferResponse {
  pub partial_parameters: PartialParameters,
  /// Criteria echoed back for the post request.
  pub criteria: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialParameters {
  pub consideration: Vec<ConsiderationItemJson>,
  pub zone: String,
  pub zone_hash: String,
}

/// Signed order in the shape the marketplace stores it.
#[derive(Debug, Clone, Serialize)]
pub struct SignedProtocolData {
  pub parameters: OrderParametersJson,
  pub signature: String,
}

/// Post a signed collection offer.
#[derive(Debug, Clone, Serialize)]
pub struct PostOfferRequest {
  pub protocol_data: SignedProtocolData,
  pub criteria: Value,
  pub protocol_address: String,
}

/// Post a signed listing.
#[derive(Debug, Clone, Serialize)]
pub struct PostListingRequest {
  pub parameters: OrderParametersJson,
  pub signature: String,
  pub protocol_address: String,
}
