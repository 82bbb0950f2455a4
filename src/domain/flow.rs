//! Flow descriptors, states and terminal reports.
//!
//! Every supported trade flow is the same state machine with different
//! steps switched on. A [`FlowDescriptor`] says which steps run, which
//! order side is discovered, what must be approved and what gets
//! submitted at the end.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::approval::ApprovalAction;
use super::asset::{Asset, CollectionRef, TradeTarget};
use super::error::{ErrorKind, FlowError};
use super::order::{Order, OrderSide, PaymentToken};
use super::outcome::FulfillmentOutcome;
use super::session::SessionMeta;

/// The supported flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    BuyListing,
    AcceptOffer,
    CreateStandingOffer,
    CreateListing,
}

impl std::fmt::Display for FlowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::BuyListing => "buy_listing",
            Self::AcceptOffer => "accept_offer",
            Self::CreateStandingOffer => "create_standing_offer",
            Self::CreateListing => "create_listing",
        };
        f.write_str(name)
    }
}

/// Orchestrator states. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    Idle,
    Connecting,
    Verifying,
    Discovering,
    Approving,
    Fulfilling,
    Completed,
    Failed,
}

impl FlowState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Spend that must be authorized before submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalRequirement {
    None,
    /// Allowance for the selected order's price, only when the order is
    /// paid in a fungible token.
    OrderPrice,
    /// Allowance for a fixed amount of a fungible token.
    Fungible { token: Address, amount: U256 },
    /// Collection-wide operator approval on the asset contract.
    CollectionWide,
}

/// Parameters of an order this flow creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCreation {
    /// Total price in minor units.
    pub amount: U256,
    pub payment_token: PaymentToken,
    /// Validity window in hours from submission.
    pub duration_hours: u64,
    pub quantity: u64,
}

/// Final step of a flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Settle the discovered order.
    Fulfill,
    /// Create a collection-wide offer.
    CreateOffer(OrderCreation),
    /// Create a listing for the target asset.
    CreateListing(OrderCreation),
}

/// Per-flow configuration of the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowDescriptor {
    pub kind: FlowKind,
    pub target: TradeTarget,
    /// Run the ownership gate (and approval probe) before anything else.
    pub verify_ownership: bool,
    /// Order side to discover; `None` skips discovery.
    pub discovery: Option<OrderSide>,
    /// Exact order to settle instead of the best candidate.
    pub order_hash: Option<String>,
    pub approval: ApprovalRequirement,
    pub submission: Submission,
    /// Recipient of the settled items, when not the wallet itself.
    pub recipient: Option<Address>,
}

impl FlowDescriptor {
    /// Buy a listed asset: discover listing, approve payment, settle.
    pub fn buy_listing(asset: Asset) -> Self {
        Self {
            kind: FlowKind::BuyListing,
            target: TradeTarget::Asset(asset),
            verify_ownership: false,
            discovery: Some(OrderSide::Listing),
            order_hash: None,
            approval: ApprovalRequirement::OrderPrice,
            submission: Submission::Fulfill,
            recipient: None,
        }
    }

    /// Sell a held asset into the best standing offer.
    pub fn accept_offer(asset: Asset) -> Self {
        Self {
            kind: FlowKind::AcceptOffer,
            target: TradeTarget::Asset(asset),
            verify_ownership: true,
            discovery: Some(OrderSide::Offer),
            order_hash: None,
            approval: ApprovalRequirement::None,
            submission: Submission::Fulfill,
            recipient: None,
        }
    }

    /// Place a collection-wide offer paid in a fungible token.
    pub fn standing_offer(collection: CollectionRef, token: Address, amount: U256) -> Self {
        Self {
            kind: FlowKind::CreateStandingOffer,
            target: TradeTarget::Collection(collection),
            verify_ownership: false,
            discovery: None,
            order_hash: None,
            approval: ApprovalRequirement::Fungible { token, amount },
            submission: Submission::CreateOffer(OrderCreation {
                amount,
                payment_token: PaymentToken::Erc20(token),
                duration_hours: 24,
                quantity: 1,
            }),
            recipient: None,
        }
    }

    /// List a held asset at a fixed price in the native currency.
    pub fn create_listing(asset: Asset, price: U256) -> Self {
        Self {
            kind: FlowKind::CreateListing,
            target: TradeTarget::Asset(asset),
            verify_ownership: true,
            discovery: None,
            order_hash: None,
            approval: ApprovalRequirement::CollectionWide,
            submission: Submission::CreateListing(OrderCreation {
                amount: price,
                payment_token: PaymentToken::Native,
                duration_hours: 240,
                quantity: 1,
            }),
            recipient: None,
        }
    }

    /// Settle this exact order instead of the best candidate.
    #[must_use]
    pub fn with_order_hash(mut self, order_hash: impl Into<String>) -> Self {
        let hash = order_hash.into();
        self.order_hash = (!hash.trim().is_empty()).then_some(hash);
        self
    }

    #[must_use]
    pub fn with_recipient(mut self, recipient: Address) -> Self {
        self.recipient = Some(recipient);
        self
    }

    /// Validity window for created orders.
    #[must_use]
    pub fn with_duration_hours(mut self, hours: u64) -> Self {
        if let Submission::CreateOffer(c) | Submission::CreateListing(c) = &mut self.submission {
            c.duration_hours = hours;
        }
        self
    }

    #[must_use]
    pub fn with_quantity(mut self, quantity: u64) -> Self {
        if let Submission::CreateOffer(c) | Submission::CreateListing(c) = &mut self.submission {
            c.quantity = quantity.max(1);
        }
        self
    }

    /// States this descriptor will walk through on success.
    pub fn planned_states(&self) -> Vec<FlowState> {
        let mut states = vec![FlowState::Idle, FlowState::Connecting];
        if self.verify_ownership {
            states.push(FlowState::Verifying);
        }
        if self.discovery.is_some() {
            states.push(FlowState::Discovering);
        }
        if self.approval != ApprovalRequirement::None {
            states.push(FlowState::Approving);
        }
        states.push(FlowState::Fulfilling);
        states.push(FlowState::Completed);
        states
    }
}

/// Short form of the order a flow settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_hash: String,
    pub side: OrderSide,
    pub price: U256,
    pub maker: Address,
    pub expiration: u64,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            order_hash: order.order_hash.clone(),
            side: order.side,
            price: order.price,
            maker: order.maker,
            expiration: order.expiration,
        }
    }
}

/// Classified failure as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    /// State the flow was in when it failed.
    pub failed_in: FlowState,
    pub remediation: Vec<String>,
}

impl ErrorReport {
    pub fn new(err: &FlowError, failed_in: FlowState) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            failed_in,
            remediation: err.remediation().into_iter().map(str::to_string).collect(),
        }
    }
}

/// Terminal report of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowReport {
    pub run_id: Uuid,
    pub kind: FlowKind,
    pub target: String,
    pub final_state: FlowState,
    /// Every state visited, in order.
    pub trace: Vec<FlowState>,
    pub order: Option<OrderSummary>,
    pub approvals: Vec<ApprovalAction>,
    pub outcome: Option<FulfillmentOutcome>,
    pub error: Option<ErrorReport>,
    pub session: SessionMeta,
    /// Extra data captured on failure (e.g. the offending order).
    pub diagnostic: Option<Value>,
}

impl FlowReport {
    pub fn succeeded(&self) -> bool {
        self.final_state == FlowState::Completed
    }
}
