//! Seaport Settlement - Order Fulfillment and Order Signing
//!
//! Marketplace orders settle through the Seaport 1.6 contract. This
//! module holds the `sol!` bindings, the JSON shape the marketplace
//! serves orders in, EIP-712 signing of new orders with the on-chain
//! counter, and the `SettlementBackend` implementation.
//!
//! Fulfillment uses `fulfillAdvancedOrder` for every order so criteria
//! (collection-wide) items can be resolved to the target token id. The
//! transaction value is the sum of the native-currency consideration.

use std::sync::Arc;

use alloy::primitives::{Address, B256, Bytes, U256, Uint};
use alloy::signers::Signer as _;
use alloy::sol;
use alloy::sol_types::{Eip712Domain, SolStruct};
use anyhow::{Context, Result, anyhow, ensure};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Value, json};
use tracing::{debug, info, instrument};

use crate::domain::order::{Order, PAYLOAD_ROOTS, parse_u256};
use crate::ports::settlement::SettlementBackend;

use super::provider::ChainProvider;

/// EIP-712 domain version of the deployed contract.
pub const SEAPORT_VERSION: &str = "1.6";

const ITEM_NATIVE: u8 = 0;
const ITEM_ERC721_WITH_CRITERIA: u8 = 4;
const ITEM_ERC1155_WITH_CRITERIA: u8 = 5;

const SIDE_OFFER: u8 = 0;
const SIDE_CONSIDERATION: u8 = 1;

sol! {
    #[sol(rpc)]
    contract Seaport {
        struct OfferItem {
            uint8 itemType;
            address token;
            uint256 identifierOrCriteria;
            uint256 startAmount;
            uint256 endAmount;
        }

        struct ConsiderationItem {
            uint8 itemType;
            address token;
            uint256 identifierOrCriteria;
            uint256 startAmount;
            uint256 endAmount;
            address recipient;
        }

        struct OrderParameters {
            address offerer;
            address zone;
            OfferItem[] offer;
            ConsiderationItem[] consideration;
            uint8 orderType;
            uint256 startTime;
            uint256 endTime;
            bytes32 zoneHash;
            uint256 salt;
            bytes32 conduitKey;
            uint256 totalOriginalConsiderationItems;
        }

        struct OrderComponents {
            address offerer;
            address zone;
            OfferItem[] offer;
            ConsiderationItem[] consideration;
            uint8 orderType;
            uint256 startTime;
            uint256 endTime;
            bytes32 zoneHash;
            uint256 salt;
            bytes32 conduitKey;
            uint256 counter;
        }

        struct AdvancedOrder {
            OrderParameters parameters;
            uint120 numerator;
            uint120 denominator;
            bytes signature;
            bytes extraData;
        }

        struct CriteriaResolver {
            uint256 orderIndex;
            uint8 side;
            uint256 index;
            uint256 identifier;
            bytes32[] criteriaProof;
        }

        function fulfillAdvancedOrder(
            AdvancedOrder advancedOrder,
            CriteriaResolver[] criteriaResolvers,
            bytes32 fulfillerConduitKey,
            address recipient
        ) external payable returns (bool fulfilled);

        function getCounter(address offerer) external view returns (uint256 counter);
    }
}

/// An offer item as served in marketplace JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferItemJson {
    #[serde(deserialize_with = "de_u8")]
    pub item_type: u8,
    pub token: Address,
    #[serde(serialize_with = "ser_u256", deserialize_with = "de_u256")]
    pub identifier_or_criteria: U256,
    #[serde(serialize_with = "ser_u256", deserialize_with = "de_u256")]
    pub start_amount: U256,
    #[serde(serialize_with = "ser_u256", deserialize_with = "de_u256")]
    pub end_amount: U256,
}

/// A consideration item as served in marketplace JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsiderationItemJson {
    #[serde(deserialize_with = "de_u8")]
    pub item_type: u8,
    pub token: Address,
    #[serde(serialize_with = "ser_u256", deserialize_with = "de_u256")]
    pub identifier_or_criteria: U256,
    #[serde(serialize_with = "ser_u256", deserialize_with = "de_u256")]
    pub start_amount: U256,
    #[serde(serialize_with = "ser_u256", deserialize_with = "de_u256")]
    pub end_amount: U256,
    pub recipient: Address,
}

/// Order parameters in the marketplace JSON shape. Numbers arrive as
/// either JSON numbers or decimal / hex strings and are sent back as
/// decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderParametersJson {
    pub offerer: Address,
    pub zone: Address,
    pub offer: Vec<OfferItemJson>,
    pub consideration: Vec<ConsiderationItemJson>,
    #[serde(deserialize_with = "de_u8")]
    pub order_type: u8,
    #[serde(serialize_with = "ser_u256", deserialize_with = "de_u256")]
    pub start_time: U256,
    #[serde(serialize_with = "ser_u256", deserialize_with = "de_u256")]
    pub end_time: U256,
    pub zone_hash: B256,
    #[serde(serialize_with = "ser_u256", deserialize_with = "de_u256")]
    pub salt: U256,
    pub conduit_key: B256,
    #[serde(default, deserialize_with = "de_opt_u64")]
    pub total_original_consideration_items: Option<u64>,
    #[serde(
        default,
        serialize_with = "ser_opt_u256",
        deserialize_with = "de_opt_u256",
        skip_serializing_if = "Option::is_none"
    )]
    pub counter: Option<U256>,
}

/// Signed order as carried in an order's protocol payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolData {
    pub parameters: OrderParametersJson,
    #[serde(default)]
    pub signature: Option<Bytes>,
}

impl ProtocolData {
    /// Read the signed order out of a raw marketplace order, trying each
    /// payload root in turn.
    pub fn from_order_payload(raw: &Value) -> Result<Self> {
        let payload = PAYLOAD_ROOTS
            .iter()
            .find_map(|root| raw.pointer(root))
            .ok_or_else(|| anyhow!("order carries no protocol data"))?;
        serde_json::from_value(payload.clone()).context("Malformed order protocol data")
    }
}

impl From<&OfferItemJson> for Seaport::OfferItem {
    fn from(item: &OfferItemJson) -> Self {
        Self {
            itemType: item.item_type,
            token: item.token,
            identifierOrCriteria: item.identifier_or_criteria,
            startAmount: item.start_amount,
            endAmount: item.end_amount,
        }
    }
}

impl From<&ConsiderationItemJson> for Seaport::ConsiderationItem {
    fn from(item: &ConsiderationItemJson) -> Self {
        Self {
            itemType: item.item_type,
            token: item.token,
            identifierOrCriteria: item.identifier_or_criteria,
            startAmount: item.start_amount,
            endAmount: item.end_amount,
            recipient: item.recipient,
        }
    }
}

impl OrderParametersJson {
    /// Parameters for on-chain fulfillment.
    pub fn to_parameters(&self) -> Seaport::OrderParameters {
        let total = self
            .total_original_consideration_items
            .unwrap_or(self.consideration.len() as u64);
        Seaport::OrderParameters {
            offerer: self.offerer,
            zone: self.zone,
            offer: self.offer.iter().map(Into::into).collect(),
            consideration: self.consideration.iter().map(Into::into).collect(),
            orderType: self.order_type,
            startTime: self.start_time,
            endTime: self.end_time,
            zoneHash: self.zone_hash,
            salt: self.salt,
            conduitKey: self.conduit_key,
            totalOriginalConsiderationItems: U256::from(total),
        }
    }

    /// Components for EIP-712 signing.
    pub fn to_components(&self, counter: U256) -> Seaport::OrderComponents {
        Seaport::OrderComponents {
            offerer: self.offerer,
            zone: self.zone,
            offer: self.offer.iter().map(Into::into).collect(),
            consideration: self.consideration.iter().map(Into::into).collect(),
            orderType: self.order_type,
            startTime: self.start_time,
            endTime: self.end_time,
            zoneHash: self.zone_hash,
            salt: self.salt,
            conduitKey: self.conduit_key,
            counter,
        }
    }

    /// Native currency the fulfiller must attach.
    pub fn native_value(&self) -> U256 {
        self.consideration
            .iter()
            .filter(|item| item.item_type == ITEM_NATIVE)
            .fold(U256::ZERO, |acc, item| acc.saturating_add(item.start_amount))
    }

    /// Resolve every criteria item of the order to `token_id`.
    pub fn criteria_resolvers(&self, token_id: U256) -> Vec<Seaport::CriteriaResolver> {
        let offer = self
            .offer
            .iter()
            .enumerate()
            .filter(|(_, item)| is_criteria(item.item_type))
            .map(|(index, _)| (SIDE_OFFER, index));
        let consideration = self
            .consideration
            .iter()
            .enumerate()
            .filter(|(_, item)| is_criteria(item.item_type))
            .map(|(index, _)| (SIDE_CONSIDERATION, index));

        offer
            .chain(consideration)
            .map(|(side, index)| Seaport::CriteriaResolver {
                orderIndex: U256::ZERO,
                side,
                index: U256::from(index),
                identifier: token_id,
                criteriaProof: Vec::new(),
            })
            .collect()
    }
}

fn is_criteria(item_type: u8) -> bool {
    matches!(item_type, ITEM_ERC721_WITH_CRITERIA | ITEM_ERC1155_WITH_CRITERIA)
}

/// EIP-712 domain of a Seaport deployment.
pub fn seaport_domain(chain_id: u64, seaport: Address) -> Eip712Domain {
    Eip712Domain::new(
        Some("Seaport".into()),
        Some(SEAPORT_VERSION.into()),
        Some(U256::from(chain_id)),
        Some(seaport),
        None,
    )
}

/// Seaport access through the shared signing provider.
pub struct SeaportSettlement {
    provider: Arc<ChainProvider>,
    address: Address,
    /// Conduit the fulfiller and new orders pull tokens through
    /// (zero = the Seaport contract itself).
    conduit_key: B256,
}

impl SeaportSettlement {
    pub fn new(provider: Arc<ChainProvider>, address: Address, conduit_key: B256) -> Self {
        Self {
            provider,
            address,
            conduit_key,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn conduit_key(&self) -> B256 {
        self.conduit_key
    }

    /// Address of the signing account.
    pub fn account(&self) -> Address {
        self.provider.address()
    }

    /// Current on-chain counter of `offerer`.
    #[instrument(skip(self))]
    pub async fn counter(&self, offerer: Address) -> Result<U256> {
        let seaport = Seaport::new(self.address, self.provider.inner());
        seaport
            .getCounter(offerer)
            .call()
            .await
            .context("getCounter call failed")
    }

    /// Sign `parameters` as the connected account.
    ///
    /// Fills in the offerer's current counter and returns the 65-byte
    /// signature.
    #[instrument(skip_all, fields(offerer = %parameters.offerer))]
    pub async fn sign(&self, parameters: &mut OrderParametersJson) -> Result<Bytes> {
        ensure!(
            parameters.offerer == self.provider.address(),
            "offerer {} is not the signing account",
            parameters.offerer
        );

        let counter = self.counter(parameters.offerer).await?;
        parameters.counter = Some(counter);

        let domain = seaport_domain(self.provider.chain_id(), self.address);
        let hash = parameters.to_components(counter).eip712_signing_hash(&domain);
        let signature = self
            .provider
            .signer()
            .sign_hash(&hash)
            .await
            .context("Failed to sign order")?;

        debug!(%counter, order_digest = %hash, "Order signed");
        Ok(Bytes::from(signature.as_bytes().to_vec()))
    }
}

#[async_trait]
impl SettlementBackend for SeaportSettlement {
    #[instrument(skip(self, order), fields(order_hash = %order.order_hash))]
    async fn fulfill(
        &self,
        order: &Order,
        account: Address,
        recipient: Option<Address>,
        token_id: Option<U256>,
    ) -> Result<Value> {
        ensure!(
            account == self.provider.address(),
            "settlement account {account} is not the signing account"
        );

        let data = ProtocolData::from_order_payload(&order.protocol_payload)?;
        let resolvers = match token_id {
            Some(id) => data.parameters.criteria_resolvers(id),
            None => Vec::new(),
        };
        let value = data.parameters.native_value();
        let one = Uint::<120, 2>::from(1u8);

        let advanced = Seaport::AdvancedOrder {
            parameters: data.parameters.to_parameters(),
            numerator: one,
            denominator: one,
            signature: data.signature.unwrap_or_default(),
            extraData: Bytes::new(),
        };

        let seaport = Seaport::new(self.address, self.provider.inner());
        let pending = seaport
            .fulfillAdvancedOrder(
                advanced,
                resolvers,
                self.conduit_key,
                recipient.unwrap_or(Address::ZERO),
            )
            .value(value)
            .send()
            .await
            .context("fulfillAdvancedOrder submission failed")?;

        let receipt = pending
            .get_receipt()
            .await
            .context("Failed to get fulfillment receipt")?;

        ensure!(
            receipt.status(),
            "fulfillment transaction {} reverted",
            receipt.transaction_hash
        );

        info!(tx_hash = %receipt.transaction_hash, %value, "Order settled");
        Ok(json!({
            "transactionHash": receipt.transaction_hash,
            "blockNumber": receipt.block_number,
        }))
    }
}

fn ser_u256<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

fn ser_opt_u256<S: Serializer>(value: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.serialize_str(&v.to_string()),
        None => serializer.serialize_none(),
    }
}

fn flexible_u256(value: &Value) -> Option<U256> {
    match value {
        Value::String(s) => parse_u256(s),
        Value::Number(n) => parse_u256(&n.to_string()),
        _ => None,
    }
}

fn de_u256<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
    let value = Value::deserialize(deserializer)?;
    flexible_u256(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("not an integer: {value}")))
}

fn de_opt_u256<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<U256>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    flexible_u256(&value)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("not an integer: {value}")))
}

fn de_u8<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let value = de_u256(deserializer)?;
    u8::try_from(value).map_err(|_| serde::de::Error::custom(format!("{value} out of range")))
}

fn de_opt_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    de_opt_u256(deserializer)?
        .map(|v| {
            u64::try_from(v).map_err(|_| serde::de::Error::custom(format!("{v} out of range")))
        })
        .transpose()
}
