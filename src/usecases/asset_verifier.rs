//! Asset Verifier Use Case - Ownership and Marketplace Approval Reads
//!
//! Pure reads that gate a flow before any order is discovered. A unique
//! asset must be owned by the wallet; a fungible-count asset must have a
//! positive balance.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use tracing::{info, instrument, warn};

use crate::domain::approval::ApprovalProbe;
use crate::domain::asset::{Asset, AssetStandard};
use crate::domain::error::FlowError;
use crate::ports::token_contracts::TokenContracts;

/// Verifies asset holdings and operator approval of a wallet.
pub struct AssetVerifier<T: TokenContracts> {
  contracts: Arc<T>,
}

impl<T: TokenContracts> AssetVerifier<T> {
  pub fn new(contracts: Arc<T>) -> Self {
    Self { contracts }
  }

  /// Check that `wallet` holds `asset`. Returns the held quantity.
  #[instrument(skip(self, asset), fields(asset = %asset))]
  pub async fn verify_ownership(&self, asset: &Asset, wallet: Address) -> Result<U256, FlowError> {
    match asset.standard {
      AssetStandard::Unique => {
        let owner = self
          .contracts
          .owner_of(asset.contract, asset.token_id)
          .await
          .map_err(|e| FlowError::connection(&e.context("ownerOf query failed")))?;

        if owner != wallet {
          warn!(%owner, %wallet, "Wallet does not own asset");
          return Err(FlowError::Ownership(format!(
            "{asset} is owned by {owner}, not by {wallet}"
          )));
        }

        info!(%wallet, "Ownership verified");
        Ok(U256::from(1u8))
      }
      AssetStandard::FungibleCount => {
        let balance = self
          .contracts
          .balance_of(asset.contract, wallet, asset.token_id)
          .await
          .map_err(|e| FlowError::connection(&e.context("balanceOf query failed")))?;

        if balance.is_zero() {
          warn!(%wallet, "Wallet holds no units of asset");
          return Err(FlowError::Ownership(format!(
            "{wallet} holds 0 units of {asset}"
          )));
        }

        info!(%wallet, %balance, "Balance verified");
        Ok(balance)
      }
    }
  }

  /// Whether `operator` may move `owner`'s tokens of `contract`.
  ///
  /// A failed query is reported as `Unknown`, never as an error.
  #[instrument(skip(self))]
  pub async fn check_marketplace_approval(
    &self,
    contract: Address,
    owner: Address,
    operator: Address,
  ) -> ApprovalProbe {
    match self
      .contracts
      .is_approved_for_all(contract, owner, operator)
      .await
    {
      Ok(true) => ApprovalProbe::Approved,
      Ok(false) => {
        info!("Marketplace operator not approved for collection");
        ApprovalProbe::NotApproved
      }
      Err(err) => {
        warn!(error = %format!("{err:#}"), "Approval probe failed");
        ApprovalProbe::Unknown
      }
    }
  }
}
