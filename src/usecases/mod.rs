//! Use Cases Layer - Trade Workflows
//!
//! Composes domain logic with port interfaces into the trade flows.
//! Each component is a self-contained step; the orchestrator sequences
//! them.
//!
//! Use cases:
//! - `WalletSession`: Connection lifecycle and provider notifications
//! - `AssetVerifier`: Ownership, balance and marketplace approval reads
//! - `ApprovalGate`: Read-then-write spending authorization
//! - `OrderDiscovery`: Order book lookup and best-order selection
//! - `FulfillmentExecutor`: Settlement and order submission
//! - `WorkflowOrchestrator`: The flow state machine

pub mod approval_gate;
pub mod asset_verifier;
pub mod fulfillment;
pub mod order_discovery;
pub mod orchestrator;
pub mod wallet_session;
