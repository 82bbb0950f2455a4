//! Token Contracts Port - ERC-20 / ERC-721 / ERC-1155 Interface
//!
//! Reads and approval writes against token contracts. Writes resolve
//! only once the transaction receipt is available.

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;

/// Receipt summary of a confirmed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxConfirmation {
  /// Transaction hash.
  pub tx_hash: TxHash,
  /// Whether the receipt reports success (false = reverted).
  pub success: bool,
}

/// Trait for token contract access via alloy-rs.
#[async_trait]
pub trait TokenContracts: Send + Sync + 'static {
  /// ERC-721 `ownerOf`.
  async fn owner_of(&self, contract: Address, token_id: U256) -> anyhow::Result<Address>;

  /// ERC-1155 `balanceOf`.
  async fn balance_of(
    &self,
    contract: Address,
    owner: Address,
    token_id: U256,
  ) -> anyhow::Result<U256>;

  /// ERC-20 `balanceOf`.
  async fn erc20_balance(&self, token: Address, owner: Address) -> anyhow::Result<U256>;

  /// ERC-20 `allowance`.
  async fn allowance(
    &self,
    token: Address,
    owner: Address,
    spender: Address,
  ) -> anyhow::Result<U256>;

  /// ERC-20 `approve`, waiting for the receipt.
  async fn approve(
    &self,
    token: Address,
    spender: Address,
    amount: U256,
  ) -> anyhow::Result<TxConfirmation>;

  /// ERC-721 / ERC-1155 `isApprovedForAll`.
  async fn is_approved_for_all(
    &self,
    contract: Address,
    owner: Address,
    operator: Address,
  ) -> anyhow::Result<bool>;

  /// ERC-721 / ERC-1155 `setApprovalForAll(operator, true)`, waiting for the receipt.
  async fn set_approval_for_all(
    &self,
    contract: Address,
    operator: Address,
  ) -> anyhow::Result<TxConfirmation>;
}
