//! Local Wallet Transport - Private Key Session
//!
//! Implements the `WalletTransport` port over a local private key and
//! the shared RPC provider. Session notifications are published on a
//! tokio broadcast channel the same way an injected wallet provider
//! would push them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use alloy::primitives::Address;
use alloy::providers::Provider;
use alloy::signers::Signer as _;
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result, ensure};
use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument};

use crate::domain::session::{DisconnectInfo, ProviderEvent, Signer};
use crate::ports::wallet::WalletTransport;

use super::provider::ChainProvider;

/// Environment variable holding the hex private key.
pub const PRIVATE_KEY_ENV: &str = "WALLET_PRIVATE_KEY";

/// Close code reported when the client ends the session.
const NORMAL_CLOSURE: i64 = 1000;

/// Load the trading key from the environment.
pub fn signer_from_env(chain_id: u64) -> Result<PrivateKeySigner> {
    let raw = std::env::var(PRIVATE_KEY_ENV).context("WALLET_PRIVATE_KEY not set")?;
    let key = raw.trim();
    ensure!(!key.is_empty(), "WALLET_PRIVATE_KEY is empty");

    let signer: PrivateKeySigner = key.parse().context("Invalid WALLET_PRIVATE_KEY")?;
    Ok(signer.with_chain_id(Some(chain_id)))
}

/// Wallet session over a local key.
pub struct LocalWalletTransport {
    provider: Arc<ChainProvider>,
    events: broadcast::Sender<ProviderEvent>,
    connected: AtomicBool,
}

impl LocalWalletTransport {
    pub fn new(provider: Arc<ChainProvider>) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            provider,
            events,
            connected: AtomicBool::new(false),
        }
    }

    fn publish(&self, event: ProviderEvent) {
        // No subscriber is not an error.
        if self.events.send(event).is_err() {
            debug!("No provider event subscribers");
        }
    }
}

#[async_trait]
impl WalletTransport for LocalWalletTransport {
    #[instrument(skip(self))]
    async fn connect(&self) -> Result<Signer> {
        let chain_id = self.chain_id().await?;
        ensure!(
            chain_id == self.provider.chain_id(),
            "RPC switched chains: expected {}, got {chain_id}",
            self.provider.chain_id()
        );

        let address = self.provider.address();
        self.connected.store(true, Ordering::SeqCst);
        self.publish(ProviderEvent::Connected { chain_id });
        self.publish(ProviderEvent::AccountsChanged {
            accounts: vec![address],
        });

        info!(%address, chain_id, "Local wallet session opened");
        Ok(Signer { address, chain_id })
    }

    #[instrument(skip(self))]
    async fn disconnect(&self) -> Result<()> {
        if self.connected.swap(false, Ordering::SeqCst) {
            self.publish(ProviderEvent::Disconnected(DisconnectInfo {
                code: NORMAL_CLOSURE,
                message: "session closed by client".to_string(),
            }));
            info!("Local wallet session closed");
        }
        Ok(())
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(vec![self.provider.address()])
        } else {
            Ok(Vec::new())
        }
    }

    async fn chain_id(&self) -> Result<u64> {
        self.provider
            .inner()
            .get_chain_id()
            .await
            .context("eth_chainId failed")
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}
