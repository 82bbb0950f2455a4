//! Spending approval state.
//!
//! Approvals are read fresh on every run and never cached. A write is
//! only justified when the read shows the authorization is short.

use alloy::primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};

/// Current authorization of `spender` over `owner`'s assets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub owner: Address,
    pub spender: Address,
    pub state: ApprovalState,
}

/// Fungible allowance or collection-wide operator flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    /// ERC-20 allowance in minor units.
    Allowance(U256),
    /// ERC-721 / ERC-1155 `isApprovedForAll`.
    ApprovedForAll(bool),
}

impl Approval {
    /// Whether this authorization covers `required` units.
    ///
    /// Collection-wide approval ignores the amount.
    pub fn covers(&self, required: U256) -> bool {
        match self.state {
            ApprovalState::Allowance(allowance) => allowance >= required,
            ApprovalState::ApprovedForAll(approved) => approved,
        }
    }
}

/// Result of a read-only collection approval probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalProbe {
    Approved,
    NotApproved,
    /// The approval query itself failed.
    Unknown,
}

/// What an approval gate did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalAction {
    /// Existing authorization was enough; nothing was written.
    AlreadySufficient,
    /// An approval transaction was submitted and confirmed.
    Submitted { tx_hash: TxHash },
}

impl ApprovalAction {
    pub fn submitted(&self) -> bool {
        matches!(self, Self::Submitted { .. })
    }
}
