//! Chain Adapters - EVM Interaction Layer
//!
//! Provides on-chain access via alloy-rs for:
//! - RPC provider management with a local signing wallet
//! - ERC-20 / ERC-721 / ERC-1155 reads and approval writes
//! - Seaport order fulfillment and EIP-712 order signing
//! - The local-key wallet session transport

pub mod contracts;
pub mod provider;
pub mod seaport;
pub mod wallet;

pub use contracts::ChainContracts;
pub use provider::ChainProvider;
pub use seaport::SeaportSettlement;
pub use wallet::LocalWalletTransport;
