//! Domain layer - Trade flow model.
//!
//! Assets, orders, approvals, outcomes, session metadata and the flow
//! state machine vocabulary. Pure data plus the few rules that need no
//! I/O (order extraction and ranking, outcome normalization).

pub mod amount;
pub mod approval;
pub mod asset;
pub mod error;
pub mod flow;
pub mod order;
pub mod outcome;
pub mod session;

// Re-export core types for convenience
pub use approval::{Approval, ApprovalAction, ApprovalProbe, ApprovalState};
pub use asset::{Asset, AssetStandard, CollectionRef, TradeTarget};
pub use error::{ErrorKind, FlowError};
pub use flow::{FlowDescriptor, FlowKind, FlowReport, FlowState};
pub use order::{Order, OrderSide, PaymentToken};
pub use outcome::{FulfillmentOutcome, FulfillmentStatus};
pub use session::{ConnectionState, ProviderEvent, SessionMeta, Signer};
