//! Wallet Transport Port - Signer-backed Session Interface
//!
//! The transport that owns the signing key and the RPC connection.
//! The core only asks it for an account, listens to its advisory
//! notifications and releases it at the end of a run.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::session::{ProviderEvent, Signer};

/// Trait for wallet session transports.
#[async_trait]
pub trait WalletTransport: Send + Sync + 'static {
  /// Request account and chain disclosure.
  ///
  /// Returns the signing identity bound to the active account.
  async fn connect(&self) -> anyhow::Result<Signer>;

  /// Release the transport.
  async fn disconnect(&self) -> anyhow::Result<()>;

  /// Accounts currently exposed by the transport.
  async fn accounts(&self) -> anyhow::Result<Vec<alloy::primitives::Address>>;

  /// Chain the transport is connected to.
  async fn chain_id(&self) -> anyhow::Result<u64>;

  /// Subscribe to provider notifications.
  fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}
