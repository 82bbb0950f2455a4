//! Classified flow failures.
//!
//! Every failure that ends a run is one of these kinds. Components raise
//! the most specific kind they can determine; the orchestrator reports
//! it and tears the session down, it never retries.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure kinds, as they appear in a terminal report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Connection,
    Ownership,
    OrderNotFound,
    InsufficientBalance,
    Approval,
    Fulfillment,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Connection => "ConnectionError",
            Self::Ownership => "OwnershipError",
            Self::OrderNotFound => "OrderNotFoundError",
            Self::InsufficientBalance => "InsufficientBalanceError",
            Self::Approval => "ApprovalError",
            Self::Fulfillment => "FulfillmentError",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum FlowError {
    /// Transport or session failure, including timeouts and failed reads.
    #[error("connection error: {0}")]
    Connection(String),

    /// The wallet does not hold the asset.
    #[error("ownership error: {0}")]
    Ownership(String),

    /// No order matched. Expected and benign, still terminal.
    #[error("order not found: {0}")]
    OrderNotFound(String),

    #[error("insufficient balance of {token}: required {required}, available {available}")]
    InsufficientBalance {
        token: String,
        required: U256,
        available: U256,
    },

    /// Approval transaction reverted, failed to submit or to confirm.
    #[error("approval error: {0}")]
    Approval(String),

    /// Settlement rejected; the upstream message is kept verbatim.
    #[error("{0}")]
    Fulfillment(String),
}

impl FlowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection(_) => ErrorKind::Connection,
            Self::Ownership(_) => ErrorKind::Ownership,
            Self::OrderNotFound(_) => ErrorKind::OrderNotFound,
            Self::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Self::Approval(_) => ErrorKind::Approval,
            Self::Fulfillment(_) => ErrorKind::Fulfillment,
        }
    }

    /// Classify a transport failure, keeping the whole context chain.
    pub fn connection(err: &anyhow::Error) -> Self {
        Self::Connection(format!("{err:#}"))
    }

    /// Operator-facing hints for failures the wallet owner can fix.
    pub fn remediation(&self) -> Vec<&'static str> {
        match self {
            Self::Ownership(_) => vec![
                "check that the token id is correct",
                "check that the contract address is correct",
                "check that the connected wallet holds the asset",
            ],
            Self::InsufficientBalance { .. } => vec![
                "top up the payment token balance",
                "check whether the order is priced in the native currency or a wrapped token",
            ],
            Self::OrderNotFound(_) => vec!["no matching order is currently open for this target"],
            Self::Approval(_) => vec!["check the approval transaction on a block explorer"],
            Self::Connection(_) | Self::Fulfillment(_) => Vec::new(),
        }
    }
}
