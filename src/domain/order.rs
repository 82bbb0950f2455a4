//! Marketplace orders: extraction from raw marketplace JSON and ranking.
//!
//! Orders cross the marketplace port as raw JSON. The core only reads a
//! handful of fields from them (hash, price, maker, taker, expiration,
//! payment token and the nested asset item list) and carries the rest as
//! an opaque settlement payload.
//!
//! The marketplace has served the same data under two naming
//! conventions over time: the SDK shape (`protocolData`, `currentPrice`,
//! `orderHash`) and the REST shape (`protocol_data`, `current_price`,
//! `order_hash`). Every field is read through an explicit ordered list of
//! JSON pointer strategies, first hit wins.

use std::str::FromStr;

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::asset::Asset;

/// Payload roots holding the settlement parameters, in strategy order.
pub const PAYLOAD_ROOTS: &[&str] = &["/protocolData", "/protocol_data"];

const HASH_PATHS: &[&str] = &["/orderHash", "/order_hash"];

const PRICE_PATHS: &[&str] = &[
    "/currentPrice",
    "/current_price",
    "/price/current/value",
    "/price/value",
];

const MAKER_PATHS: &[&str] = &[
    "/maker/address",
    "/maker",
    "/protocolData/parameters/offerer",
    "/protocol_data/parameters/offerer",
];

const TAKER_PATHS: &[&str] = &["/taker/address", "/taker"];

const EXPIRATION_PATHS: &[&str] = &[
    "/expirationTime",
    "/expiration_time",
    "/closingDate",
    "/closing_date",
    "/protocolData/parameters/endTime",
    "/protocol_data/parameters/endTime",
];

/// Seaport item type codes.
const ITEM_NATIVE: u64 = 0;
const ITEM_ERC20: u64 = 1;
const ITEM_ERC721: u64 = 2;
const ITEM_ERC1155_WITH_CRITERIA: u64 = 5;
const ITEM_ERC721_WITH_CRITERIA: u64 = 4;

/// Which side of the book an order sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    /// Maker sells an asset.
    Listing,
    /// Maker buys an asset (or any asset of a collection).
    Offer,
}

impl OrderSide {
    /// Path segment used by the marketplace REST API.
    pub fn as_api_segment(self) -> &'static str {
        match self {
            Self::Listing => "listings",
            Self::Offer => "offers",
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Listing => write!(f, "LISTING"),
            Self::Offer => write!(f, "OFFER"),
        }
    }
}

/// Currency an order is priced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentToken {
    /// The network's native currency (paid as transaction value).
    Native,
    /// A fungible token contract (paid through an allowance).
    Erc20(Address),
}

/// Payload array an item was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemSource {
    /// Given up by the maker.
    Offer,
    /// Received by the maker.
    Consideration,
}

/// A non-fungible item named inside an order payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetItem {
    /// Array the item came from.
    pub source: ItemSource,
    /// Token contract.
    pub token: Address,
    /// Token id, or a criteria root for criteria-based items.
    pub identifier: U256,
    /// Requested / offered quantity.
    pub quantity: U256,
    /// Whether `identifier` is a criteria root (any token matching).
    pub criteria: bool,
}

/// Why a raw marketplace order could not be read.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderExtractError {
    #[error("order has no {0} field under any known name")]
    MissingField(&'static str),

    #[error("order field {field} is malformed: {value}")]
    Malformed { field: &'static str, value: String },
}

/// Immutable snapshot of a marketplace order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_hash: String,
    pub side: OrderSide,
    /// Price in minor units of the payment token.
    pub price: U256,
    pub maker: Address,
    pub taker: Option<Address>,
    /// Opaque settlement data, handed to the settlement backend untouched.
    pub protocol_payload: Value,
    /// Unix seconds; 0 when the marketplace did not say.
    pub expiration: u64,
    pub payment_token: PaymentToken,
    /// Non-fungible items extracted from the payload.
    pub asset_items: Vec<AssetItem>,
}

impl Order {
    /// Read an order out of a raw marketplace record.
    pub fn from_marketplace(raw: Value, side: OrderSide) -> Result<Self, OrderExtractError> {
        let order_hash = first_string(&raw, HASH_PATHS)
            .ok_or(OrderExtractError::MissingField("order hash"))?;

        let price_text =
            first_string(&raw, PRICE_PATHS).ok_or(OrderExtractError::MissingField("price"))?;
        let price = parse_u256(&price_text).ok_or_else(|| OrderExtractError::Malformed {
            field: "price",
            value: price_text.clone(),
        })?;

        let maker_text =
            first_string(&raw, MAKER_PATHS).ok_or(OrderExtractError::MissingField("maker"))?;
        let maker = Address::from_str(&maker_text).map_err(|_| OrderExtractError::Malformed {
            field: "maker",
            value: maker_text.clone(),
        })?;

        let taker = first_string(&raw, TAKER_PATHS)
            .and_then(|t| Address::from_str(&t).ok())
            .filter(|t| !t.is_zero());

        let expiration = first_string(&raw, EXPIRATION_PATHS)
            .and_then(|t| parse_timestamp(&t))
            .unwrap_or(0);

        let payment_token = extract_payment_token(&raw);
        let asset_items = extract_asset_items(&raw);

        Ok(Self {
            order_hash,
            side,
            price,
            maker,
            taker,
            protocol_payload: raw,
            expiration,
            payment_token,
            asset_items,
        })
    }

    /// Whether the order has expired at `now` (unix seconds).
    pub fn is_expired(&self, now: u64) -> bool {
        self.expiration != 0 && self.expiration <= now
    }

    /// Whether the order names `asset`.
    ///
    /// Orders whose items could not be extracted are assumed to match:
    /// the marketplace query was already keyed by the asset.
    pub fn targets(&self, asset: &Asset) -> bool {
        if self.asset_items.is_empty() {
            return true;
        }
        self.asset_items.iter().any(|item| {
            item.token == asset.contract && (item.criteria || item.identifier == asset.token_id)
        })
    }

    /// Side implied by where the payload puts its non-fungible items:
    /// offered by the maker means a listing, requested means an offer.
    /// `None` when no item could be read.
    pub fn payload_side(&self) -> Option<OrderSide> {
        let item = self.asset_items.first()?;
        Some(match item.source {
            ItemSource::Offer => OrderSide::Listing,
            ItemSource::Consideration => OrderSide::Offer,
        })
    }

    /// Whether the payload contradicts the side this order was read as.
    pub fn side_mismatch(&self) -> bool {
        self.payload_side().is_some_and(|side| side != self.side)
    }

    /// Units of `asset` this order moves. Defaults to one.
    pub fn quantity_for(&self, asset: &Asset) -> U256 {
        self.asset_items
            .iter()
            .find(|item| item.token == asset.contract)
            .map_or(U256::from(1u8), |item| item.quantity)
    }
}

/// Pick the order with the highest price.
///
/// Exact integer comparison; among equal prices the first candidate seen
/// wins, so the result is reproducible for a given page order.
pub fn select_best<I>(candidates: I) -> Option<Order>
where
    I: IntoIterator<Item = Order>,
{
    candidates.into_iter().fold(None, |best, candidate| match best {
        Some(current) if candidate.price <= current.price => Some(current),
        _ => Some(candidate),
    })
}

/// Extract the non-fungible items from the payload, trying each payload
/// root in order. The first root yielding any item wins; empty when none
/// does.
pub fn extract_asset_items(raw: &Value) -> Vec<AssetItem> {
    for root in PAYLOAD_ROOTS {
        let Some(params) = raw.pointer(&format!("{root}/parameters")) else {
            continue;
        };
        let items: Vec<AssetItem> = [
            ("offer", ItemSource::Offer),
            ("consideration", ItemSource::Consideration),
        ]
        .into_iter()
        .filter_map(|(key, source)| {
            params
                .get(key)
                .and_then(Value::as_array)
                .map(|list| (list, source))
        })
        .flat_map(|(list, source)| list.iter().filter_map(move |item| asset_item(item, source)))
        .collect();
        if !items.is_empty() {
            return items;
        }
    }
    Vec::new()
}

fn asset_item(item: &Value, source: ItemSource) -> Option<AssetItem> {
    let item_type = item.get("itemType").and_then(value_as_u64)?;
    if !(ITEM_ERC721..=ITEM_ERC1155_WITH_CRITERIA).contains(&item_type) {
        return None;
    }
    let token = item
        .get("token")
        .and_then(Value::as_str)
        .and_then(|t| Address::from_str(t).ok())?;
    let identifier = item
        .get("identifierOrCriteria")
        .and_then(value_as_string)
        .and_then(|t| parse_u256(&t))
        .unwrap_or_default();
    let quantity = item
        .get("startAmount")
        .and_then(value_as_string)
        .and_then(|t| parse_u256(&t))
        .unwrap_or(U256::from(1u8));

    Some(AssetItem {
        source,
        token,
        identifier,
        quantity,
        criteria: matches!(item_type, ITEM_ERC721_WITH_CRITERIA | ITEM_ERC1155_WITH_CRITERIA),
    })
}

fn extract_payment_token(raw: &Value) -> PaymentToken {
    for root in PAYLOAD_ROOTS {
        let Some(params) = raw.pointer(&format!("{root}/parameters")) else {
            continue;
        };
        let currency = ["offer", "consideration"]
            .iter()
            .filter_map(|key| params.get(*key).and_then(Value::as_array))
            .flatten()
            .find_map(|item| {
                match item.get("itemType").and_then(value_as_u64)? {
                    ITEM_NATIVE => Some(PaymentToken::Native),
                    ITEM_ERC20 => item
                        .get("token")
                        .and_then(Value::as_str)
                        .and_then(|t| Address::from_str(t).ok())
                        .map(PaymentToken::Erc20),
                    _ => None,
                }
            });
        if let Some(currency) = currency {
            return currency;
        }
    }
    PaymentToken::Native
}

fn first_string(raw: &Value, paths: &[&str]) -> Option<String> {
    paths
        .iter()
        .filter_map(|path| raw.pointer(path))
        .find_map(value_as_string)
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Parse a decimal (or 0x-prefixed hex) integer amount.
pub fn parse_u256(text: &str) -> Option<U256> {
    let text = text.trim();
    if let Some(hex) = text.strip_prefix("0x") {
        return U256::from_str_radix(hex, 16).ok();
    }
    U256::from_str_radix(text, 10).ok()
}

fn parse_timestamp(text: &str) -> Option<u64> {
    if let Ok(secs) = text.parse::<u64>() {
        return Some(secs);
    }
    chrono::DateTime::parse_from_rfc3339(text)
        .ok()
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc().fixed_offset())
        })
        .and_then(|dt| u64::try_from(dt.timestamp()).ok())
}
