//! Asset and collection identity.
//!
//! A flow targets exactly one asset (buy listing, accept offer, create
//! listing) or one collection (standing offer). Both are immutable once
//! a flow has been described.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Token standard of the traded asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetStandard {
    /// One-of-a-kind token, a single owner address (ERC-721).
    Unique,
    /// Quantity-bearing token, one owner may hold many units (ERC-1155).
    FungibleCount,
}

impl std::fmt::Display for AssetStandard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unique => write!(f, "ERC721"),
            Self::FungibleCount => write!(f, "ERC1155"),
        }
    }
}

/// A single on-chain asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Token contract.
    pub contract: Address,
    /// Token identifier within the contract.
    pub token_id: U256,
    /// Token standard.
    pub standard: AssetStandard,
}

impl Asset {
    pub fn new(contract: Address, token_id: U256, standard: AssetStandard) -> Self {
        Self {
            contract,
            token_id,
            standard,
        }
    }
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{} ({})", self.contract, self.token_id, self.standard)
    }
}

/// A marketplace collection, the target of collection-wide offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRef {
    /// Marketplace collection slug.
    pub slug: String,
    /// Primary contract, when already known. Filled from collection
    /// metadata otherwise.
    pub contract: Option<Address>,
}

impl CollectionRef {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            contract: None,
        }
    }
}

/// What an order query is keyed by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeTarget {
    Asset(Asset),
    Collection(CollectionRef),
}

impl TradeTarget {
    /// The asset, for asset-keyed targets.
    pub fn asset(&self) -> Option<&Asset> {
        match self {
            Self::Asset(asset) => Some(asset),
            Self::Collection(_) => None,
        }
    }
}

impl std::fmt::Display for TradeTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Asset(asset) => write!(f, "{asset}"),
            Self::Collection(c) => write!(f, "collection:{}", c.slug),
        }
    }
}
