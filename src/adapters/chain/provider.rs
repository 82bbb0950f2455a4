//! Chain RPC Provider - alloy-rs Connection Management
//!
//! Builds one signing provider for the configured chain and shares it
//! across the chain adapters. The chain id is validated at startup so a
//! misconfigured RPC endpoint fails before any flow begins.

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result, ensure};
use tracing::{info, instrument};

use crate::config::ChainConfig;

/// Shared signing provider backed by alloy-rs.
///
/// The provider carries the local wallet so contract writes are signed
/// and filled (nonce, gas, fees) before submission.
pub struct ChainProvider {
    /// Type-erased alloy HTTP provider with wallet fillers.
    provider: DynProvider,
    /// Key of the trading account.
    signer: PrivateKeySigner,
    chain_id: u64,
}

impl ChainProvider {
    /// Connect to the RPC endpoint and validate the chain id.
    #[instrument(skip_all, fields(expected_chain_id = config.chain_id))]
    pub async fn connect(config: &ChainConfig, signer: PrivateKeySigner) -> Result<Self> {
        let rpc_url = config.rpc_url.parse().context("Invalid RPC URL")?;

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer.clone()))
            .connect_http(rpc_url)
            .erased();

        let chain_id = provider
            .get_chain_id()
            .await
            .context("Failed to query chain ID")?;

        ensure!(
            chain_id == config.chain_id,
            "Expected chain_id={}, got {chain_id}",
            config.chain_id
        );

        info!(chain_id, address = %signer.address(), "Connected to chain RPC");

        Ok(Self {
            provider,
            signer,
            chain_id,
        })
    }

    /// The shared provider.
    pub fn inner(&self) -> &DynProvider {
        &self.provider
    }

    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }

    /// Address of the trading account.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Chain id validated at connect time.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }
}
