//! Token Contract Bindings - ERC-20 / ERC-721 / ERC-1155
//!
//! Implements the `TokenContracts` port with `sol!` generated bindings.
//! Approval writes wait for the receipt and report its status; a
//! reverted receipt is returned, not raised, so the caller classifies it.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use alloy::sol;
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info, instrument};

use crate::ports::token_contracts::{TokenContracts, TxConfirmation};

use super::provider::ChainProvider;

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }

    #[sol(rpc)]
    interface IERC721 {
        function ownerOf(uint256 tokenId) external view returns (address);
        function isApprovedForAll(address owner, address operator) external view returns (bool);
        function setApprovalForAll(address operator, bool approved) external;
    }

    #[sol(rpc)]
    interface IERC1155 {
        function balanceOf(address account, uint256 id) external view returns (uint256);
    }
}

/// Token contract access through the shared chain provider.
///
/// `isApprovedForAll` / `setApprovalForAll` share one ABI between
/// ERC-721 and ERC-1155, so both standards go through `IERC721`.
pub struct ChainContracts {
    provider: Arc<ChainProvider>,
}

impl ChainContracts {
    pub fn new(provider: Arc<ChainProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl TokenContracts for ChainContracts {
    #[instrument(skip(self))]
    async fn owner_of(&self, contract: Address, token_id: U256) -> Result<Address> {
        let nft = IERC721::new(contract, self.provider.inner());
        let owner = nft
            .ownerOf(token_id)
            .call()
            .await
            .context("ownerOf call failed")?;
        debug!(%owner, "ownerOf");
        Ok(owner)
    }

    #[instrument(skip(self))]
    async fn balance_of(&self, contract: Address, owner: Address, token_id: U256) -> Result<U256> {
        let multi = IERC1155::new(contract, self.provider.inner());
        let balance = multi
            .balanceOf(owner, token_id)
            .call()
            .await
            .context("ERC-1155 balanceOf call failed")?;
        debug!(%balance, "balanceOf");
        Ok(balance)
    }

    #[instrument(skip(self))]
    async fn erc20_balance(&self, token: Address, owner: Address) -> Result<U256> {
        let erc20 = IERC20::new(token, self.provider.inner());
        erc20
            .balanceOf(owner)
            .call()
            .await
            .context("ERC-20 balanceOf call failed")
    }

    #[instrument(skip(self))]
    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        let erc20 = IERC20::new(token, self.provider.inner());
        erc20
            .allowance(owner, spender)
            .call()
            .await
            .context("allowance call failed")
    }

    #[instrument(skip(self))]
    async fn approve(&self, token: Address, spender: Address, amount: U256) -> Result<TxConfirmation> {
        let erc20 = IERC20::new(token, self.provider.inner());
        let pending = erc20
            .approve(spender, amount)
            .send()
            .await
            .context("Failed to send approval transaction")?;

        let receipt = pending
            .get_receipt()
            .await
            .context("Failed to get approval receipt")?;

        info!(tx_hash = %receipt.transaction_hash, success = receipt.status(), "approve mined");
        Ok(TxConfirmation {
            tx_hash: receipt.transaction_hash,
            success: receipt.status(),
        })
    }

    #[instrument(skip(self))]
    async fn is_approved_for_all(
        &self,
        contract: Address,
        owner: Address,
        operator: Address,
    ) -> Result<bool> {
        let nft = IERC721::new(contract, self.provider.inner());
        nft.isApprovedForAll(owner, operator)
            .call()
            .await
            .context("isApprovedForAll call failed")
    }

    #[instrument(skip(self))]
    async fn set_approval_for_all(&self, contract: Address, operator: Address) -> Result<TxConfirmation> {
        let nft = IERC721::new(contract, self.provider.inner());
        let pending = nft
            .setApprovalForAll(operator, true)
            .send()
            .await
            .context("Failed to send setApprovalForAll transaction")?;

        let receipt = pending
            .get_receipt()
            .await
            .context("Failed to get setApprovalForAll receipt")?;

        info!(
            tx_hash = %receipt.transaction_hash,
            success = receipt.status(),
            "setApprovalForAll mined"
        );
        Ok(TxConfirmation {
            tx_hash: receipt.transaction_hash,
            success: receipt.status(),
        })
    }
}
