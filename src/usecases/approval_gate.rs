//! Approval Gate Use Case - Read-then-write Spending Authorization
//!
//! Each gate reads the current authorization and only writes when it
//! is short. With sufficient prior approval a gate performs reads only.
//! Written approvals are for exactly the required amount.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use tracing::{info, instrument, warn};

use crate::domain::approval::{Approval, ApprovalAction, ApprovalState};
use crate::domain::error::FlowError;
use crate::ports::token_contracts::{TokenContracts, TxConfirmation};

/// Ensures a marketplace operator may spend on behalf of the wallet.
pub struct ApprovalGate<T: TokenContracts> {
  contracts: Arc<T>,
}

impl<T: TokenContracts> ApprovalGate<T> {
  pub fn new(contracts: Arc<T>) -> Self {
    Self { contracts }
  }

  /// Ensure `spender` may move `required` units of `token` from `owner`.
  ///
  /// The balance is checked first: a short balance fails with
  /// `InsufficientBalance` and nothing is written. A failed allowance
  /// read counts as an unknown allowance and takes the write path.
  #[instrument(skip(self), fields(required = %required))]
  pub async fn ensure_fungible_allowance(
    &self,
    token: Address,
    owner: Address,
    spender: Address,
    required: U256,
  ) -> Result<ApprovalAction, FlowError> {
    let balance = self
      .contracts
      .erc20_balance(token, owner)
      .await
      .map_err(|e| FlowError::connection(&e.context("token balance query failed")))?;

    if balance < required {
      warn!(%token, %balance, "Insufficient token balance");
      return Err(FlowError::InsufficientBalance {
        token: token.to_string(),
        required,
        available: balance,
      });
    }

    match self.contracts.allowance(token, owner, spender).await {
      Ok(allowance) => {
        let current = Approval {
          owner,
          spender,
          state: ApprovalState::Allowance(allowance),
        };
        if current.covers(required) {
          info!(%allowance, "Allowance already sufficient");
          return Ok(ApprovalAction::AlreadySufficient);
        }
        info!(%allowance, "Allowance short, approving");
      }
      Err(err) => {
        warn!(error = %format!("{err:#}"), "Allowance read failed, approving");
      }
    }

    let confirmation = self
      .contracts
      .approve(token, spender, required)
      .await
      .map_err(|e| FlowError::Approval(format!("approve failed: {e:#}")))?;
    Self::confirmed(confirmation, "approve")
  }

  /// Ensure `operator` holds collection-wide approval over `owner`'s
  /// tokens of `contract`. Unknown state takes the write path.
  #[instrument(skip(self))]
  pub async fn ensure_collection_approval(
    &self,
    contract: Address,
    owner: Address,
    operator: Address,
  ) -> Result<ApprovalAction, FlowError> {
    match self
      .contracts
      .is_approved_for_all(contract, owner, operator)
      .await
    {
      Ok(true) => {
        info!("Collection approval already granted");
        return Ok(ApprovalAction::AlreadySufficient);
      }
      Ok(false) => info!("Collection approval missing, approving"),
      Err(err) => {
        warn!(error = %format!("{err:#}"), "Collection approval read failed, approving");
      }
    }

    let confirmation = self
      .contracts
      .set_approval_for_all(contract, operator)
      .await
      .map_err(|e| FlowError::Approval(format!("setApprovalForAll failed: {e:#}")))?;
    Self::confirmed(confirmation, "setApprovalForAll")
  }

  fn confirmed(confirmation: TxConfirmation, call: &str) -> Result<ApprovalAction, FlowError> {
    if !confirmation.success {
      warn!(tx_hash = %confirmation.tx_hash, call, "Approval transaction reverted");
      return Err(FlowError::Approval(format!(
        "{call} transaction {} reverted",
        confirmation.tx_hash
      )));
    }
    info!(tx_hash = %confirmation.tx_hash, call, "Approval confirmed");
    Ok(ApprovalAction::Submitted {
      tx_hash: confirmation.tx_hash,
    })
  }
}
