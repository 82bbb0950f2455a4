//! Workflow Orchestrator Use Case - Trade Flow State Machine
//!
//! Drives one flow through `Idle -> Connecting -> Verifying ->
//! Discovering -> Approving -> Fulfilling -> Completed | Failed`,
//! skipping the states the `FlowDescriptor` does not require.
//!
//! Run lifecycle:
//! 1. Connect the wallet session
//! 2. Verify ownership (and probe the marketplace approval)
//! 3. Discover the order to settle
//! 4. Ensure spending approvals
//! 5. Settle the order, or submit the new offer / listing
//! 6. Disconnect, whatever happened above
//!
//! Every failure moves straight to `Failed`. Nothing is retried.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use chrono::Utc;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::domain::approval::{ApprovalAction, ApprovalProbe};
use crate::domain::asset::{Asset, TradeTarget};
use crate::domain::error::FlowError;
use crate::domain::flow::{
  ApprovalRequirement, ErrorReport, FlowDescriptor, FlowReport, FlowState, OrderCreation,
  OrderSummary, Submission,
};
use crate::domain::order::{Order, PaymentToken};
use crate::domain::outcome::FulfillmentOutcome;
use crate::ports::marketplace::{ListingRequest, MarketplaceApi, OfferRequest};
use crate::ports::settlement::SettlementBackend;
use crate::ports::token_contracts::TokenContracts;
use crate::ports::wallet::WalletTransport;
use crate::usecases::approval_gate::ApprovalGate;
use crate::usecases::asset_verifier::AssetVerifier;
use crate::usecases::fulfillment::FulfillmentExecutor;
use crate::usecases::order_discovery::{DiscoverySettings, OrderDiscovery};
use crate::usecases::wallet_session::WalletSession;

/// Orchestrator tuning.
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorSettings {
  /// Marketplace contract (or conduit) that pulls approved tokens.
  pub marketplace_operator: Address,
  pub discovery: DiscoverySettings,
  pub connect_timeout: Duration,
}

/// Mutable record of one run in progress.
struct FlowRun {
  state: FlowState,
  trace: Vec<FlowState>,
  held: Option<U256>,
  order: Option<Order>,
  approvals: Vec<ApprovalAction>,
  outcome: Option<FulfillmentOutcome>,
}

impl FlowRun {
  fn new() -> Self {
    Self {
      state: FlowState::Idle,
      trace: vec![FlowState::Idle],
      held: None,
      order: None,
      approvals: Vec::new(),
      outcome: None,
    }
  }

  fn transition<W: WalletTransport>(&mut self, next: FlowState, session: &mut WalletSession<W>) {
    if self.state.is_terminal() {
      warn!(from = ?self.state, to = ?next, "Ignoring transition out of a terminal state");
      return;
    }
    debug!(from = ?self.state, to = ?next, "Flow transition");
    self.state = next;
    self.trace.push(next);
    session.drain_events();
  }
}

/// Composes the trade components into the supported flows.
pub struct WorkflowOrchestrator<W, T, M, S>
where
  W: WalletTransport,
  T: TokenContracts,
  M: MarketplaceApi,
  S: SettlementBackend,
{
  wallet: Arc<W>,
  verifier: AssetVerifier<T>,
  gate: ApprovalGate<T>,
  discovery: OrderDiscovery<M>,
  executor: FulfillmentExecutor<M, S>,
  settings: OrchestratorSettings,
}

impl<W, T, M, S> WorkflowOrchestrator<W, T, M, S>
where
  W: WalletTransport,
  T: TokenContracts,
  M: MarketplaceApi,
  S: SettlementBackend,
{
  /// Create an orchestrator over the four ports.
  pub fn new(
    wallet: Arc<W>,
    contracts: Arc<T>,
    marketplace: Arc<M>,
    settlement: Arc<S>,
    settings: OrchestratorSettings,
  ) -> Self {
    Self {
      wallet,
      verifier: AssetVerifier::new(Arc::clone(&contracts)),
      gate: ApprovalGate::new(contracts),
      discovery: OrderDiscovery::new(Arc::clone(&marketplace), settings.discovery),
      executor: FulfillmentExecutor::new(marketplace, settlement),
      settings,
    }
  }

  /// Run one flow to a terminal state. Never returns an error: failures
  /// are classified into the report. The wallet is always disconnected.
  pub async fn run(&self, descriptor: &FlowDescriptor) -> FlowReport {
    let run_id = Uuid::new_v4();
    let span = info_span!(
      "flow_run",
      %run_id,
      flow = %descriptor.kind,
      target = %descriptor.target
    );
    self.run_inner(run_id, descriptor).instrument(span).await
  }

  async fn run_inner(&self, run_id: Uuid, descriptor: &FlowDescriptor) -> FlowReport {
    info!(planned = ?descriptor.planned_states(), "Flow starting");

    let mut session = WalletSession::with_timeout(Arc::clone(&self.wallet), self.settings.connect_timeout);
    let mut run = FlowRun::new();

    let result = self.drive(descriptor, &mut session, &mut run).await;

    let mut error_report = None;
    match &result {
      Ok(()) => run.transition(FlowState::Completed, &mut session),
      Err(err) => {
        let failed_in = run.state;
        error!(
          kind = %err.kind(),
          failed_in = ?failed_in,
          error = %err,
          "Flow failed"
        );
        for hint in err.remediation() {
          warn!(hint, "Remediation");
        }
        if let FlowError::Fulfillment(message) = err {
          run.outcome = Some(FulfillmentOutcome::from_failure(message));
        }
        error_report = Some(ErrorReport::new(err, failed_in));
        run.transition(FlowState::Failed, &mut session);
      }
    }

    session.disconnect().await;

    let report = FlowReport {
      run_id,
      kind: descriptor.kind,
      target: descriptor.target.to_string(),
      final_state: run.state,
      trace: run.trace,
      order: run.order.as_ref().map(OrderSummary::from),
      approvals: run.approvals,
      outcome: run.outcome,
      diagnostic: result
        .is_err()
        .then(|| run.order.as_ref().map(|o| o.protocol_payload.clone()))
        .flatten(),
      error: error_report,
      session: session.meta().clone(),
    };

    info!(
      final_state = ?report.final_state,
      reference = report
        .outcome
        .as_ref()
        .map_or("-", |o| o.transaction_reference.as_str()),
      "Flow finished"
    );
    report
  }

  async fn drive(
    &self,
    descriptor: &FlowDescriptor,
    session: &mut WalletSession<W>,
    run: &mut FlowRun,
  ) -> Result<(), FlowError> {
    run.transition(FlowState::Connecting, session);
    let wallet = session.connect().await?.address;
    let operator = self.settings.marketplace_operator;

    if descriptor.verify_ownership {
      run.transition(FlowState::Verifying, session);
      let asset = target_asset(&descriptor.target)?;
      run.held = Some(self.verifier.verify_ownership(asset, wallet).await?);

      let probe = self
        .verifier
        .check_marketplace_approval(asset.contract, wallet, operator)
        .await;
      // Flows with a planned collection approval handle it in Approving.
      if probe != ApprovalProbe::Approved && descriptor.approval != ApprovalRequirement::CollectionWide {
        info!(?probe, "Remediating marketplace approval");
        let action = self
          .gate
          .ensure_collection_approval(asset.contract, wallet, operator)
          .await?;
        run.approvals.push(action);
      }
    }

    if let Some(side) = descriptor.discovery {
      run.transition(FlowState::Discovering, session);
      let order = match &descriptor.order_hash {
        Some(hash) => {
          self
            .discovery
            .find_by_exact_hash(&descriptor.target, hash, side)
            .await?
        }
        None => self
          .discovery
          .find_best(&descriptor.target, side, run.held)
          .await?
          .ok_or_else(|| {
            FlowError::OrderNotFound(format!("no open {side} for {}", descriptor.target))
          })?,
      };
      run.order = Some(order);
    }

    match &descriptor.approval {
      ApprovalRequirement::None => {}
      ApprovalRequirement::OrderPrice => {
        let (payment_token, price) = {
          let order = selected(run)?;
          (order.payment_token, order.price)
        };
        match payment_token {
          PaymentToken::Erc20(token) => {
            run.transition(FlowState::Approving, session);
            let action = self
              .gate
              .ensure_fungible_allowance(token, wallet, operator, price)
              .await?;
            run.approvals.push(action);
          }
          PaymentToken::Native => debug!("Order priced in native currency, no allowance needed"),
        }
      }
      ApprovalRequirement::Fungible { token, amount } => {
        run.transition(FlowState::Approving, session);
        let action = self
          .gate
          .ensure_fungible_allowance(*token, wallet, operator, *amount)
          .await?;
        run.approvals.push(action);
      }
      ApprovalRequirement::CollectionWide => {
        run.transition(FlowState::Approving, session);
        let contract = target_asset(&descriptor.target)?.contract;
        let action = self
          .gate
          .ensure_collection_approval(contract, wallet, operator)
          .await?;
        run.approvals.push(action);
      }
    }

    run.transition(FlowState::Fulfilling, session);
    session.confirm_account().await?;
    let outcome = match &descriptor.submission {
      Submission::Fulfill => {
        let order = selected(run)?;
        let token_id = descriptor.target.asset().map(|asset| asset.token_id);
        self
          .executor
          .fulfill(order, wallet, descriptor.recipient, token_id)
          .await?
      }
      Submission::CreateOffer(creation) => {
        let request = self.offer_request(descriptor, creation, wallet).await?;
        self.executor.submit_offer(&request).await?
      }
      Submission::CreateListing(creation) => {
        let request = listing_request(descriptor, creation, wallet, run.held)?;
        self.executor.submit_listing(&request).await?
      }
    };
    run.outcome = Some(outcome);
    Ok(())
  }

  async fn offer_request(
    &self,
    descriptor: &FlowDescriptor,
    creation: &OrderCreation,
    wallet: Address,
  ) -> Result<OfferRequest, FlowError> {
    let TradeTarget::Collection(collection) = &descriptor.target else {
      return Err(FlowError::Fulfillment(
        "standing offers target a collection".to_string(),
      ));
    };
    let PaymentToken::Erc20(payment_token) = creation.payment_token else {
      return Err(FlowError::Fulfillment(
        "offers must be paid in a fungible token".to_string(),
      ));
    };

    let mut info = self.discovery.collection(&collection.slug).await?;
    if info.contract.is_none() {
      info.contract = collection.contract;
    }

    Ok(OfferRequest {
      collection: info,
      offerer: wallet,
      amount: creation.amount,
      payment_token,
      quantity: creation.quantity,
      expiration: expiration_after(creation.duration_hours),
    })
  }
}

fn target_asset(target: &TradeTarget) -> Result<&Asset, FlowError> {
  target.asset().ok_or_else(|| {
    FlowError::Ownership(format!("{target} is not a single asset"))
  })
}

fn selected(run: &FlowRun) -> Result<&Order, FlowError> {
  run
    .order
    .as_ref()
    .ok_or_else(|| FlowError::OrderNotFound("no order selected".to_string()))
}

fn listing_request(
  descriptor: &FlowDescriptor,
  creation: &OrderCreation,
  wallet: Address,
  held: Option<U256>,
) -> Result<ListingRequest, FlowError> {
  let asset = target_asset(&descriptor.target)?;
  let quantity = U256::from(creation.quantity);
  if let Some(held) = held {
    if quantity > held {
      return Err(FlowError::InsufficientBalance {
        token: asset.to_string(),
        required: quantity,
        available: held,
      });
    }
  }

  Ok(ListingRequest {
    asset: asset.clone(),
    offerer: wallet,
    price: creation.amount,
    payment_token: creation.payment_token,
    quantity: creation.quantity,
    expiration: expiration_after(creation.duration_hours),
  })
}

/// Unix seconds `hours` from now.
fn expiration_after(hours: u64) -> u64 {
  let now = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
  now.saturating_add(hours.saturating_mul(3600))
}
