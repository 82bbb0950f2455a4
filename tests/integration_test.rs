//! Integration Tests - End-to-end Flow Orchestration
//!
//! Drives the `WorkflowOrchestrator` through every flow against mocked
//! ports. Uses mockall for trait mocking and tokio::test for async tests.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, TxHash, U256, address};
use mockall::predicate::*;
use mockall::{Sequence, mock};
use serde_json::{Value, json};
use tokio::sync::broadcast;

use nft_trade_orchestrator::domain::approval::ApprovalAction;
use nft_trade_orchestrator::domain::asset::{Asset, AssetStandard, CollectionRef};
use nft_trade_orchestrator::domain::error::ErrorKind;
use nft_trade_orchestrator::domain::flow::{FlowDescriptor, FlowReport, FlowState};
use nft_trade_orchestrator::domain::order::{Order, OrderSide, PaymentToken};
use nft_trade_orchestrator::domain::outcome::{FulfillmentStatus, UNKNOWN_REFERENCE};
use nft_trade_orchestrator::domain::session::{
  ConnectionState, DisconnectInfo, ProviderEvent, Signer,
};
use nft_trade_orchestrator::ports::marketplace::{
  CollectionInfo, FeeShare, ListingRequest, MarketplaceApi, OfferRequest, OrderQuery,
};
use nft_trade_orchestrator::ports::settlement::SettlementBackend;
use nft_trade_orchestrator::ports::token_contracts::{TokenContracts, TxConfirmation};
use nft_trade_orchestrator::ports::wallet::WalletTransport;
use nft_trade_orchestrator::usecases::order_discovery::DiscoverySettings;
use nft_trade_orchestrator::usecases::orchestrator::{OrchestratorSettings, WorkflowOrchestrator};

// ---- Mock Definitions ----

mock! {
  pub Wallet {}

  #[async_trait::async_trait]
  impl WalletTransport for Wallet {
    async fn connect(&self) -> anyhow::Result<Signer>;
    async fn disconnect(&self) -> anyhow::Result<()>;
    async fn accounts(&self) -> anyhow::Result<Vec<Address>>;
    async fn chain_id(&self) -> anyhow::Result<u64>;
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
  }
}

mock! {
  pub Contracts {}

  #[async_trait::async_trait]
  impl TokenContracts for Contracts {
    async fn owner_of(&self, contract: Address, token_id: U256) -> anyhow::Result<Address>;
    async fn balance_of(&self, contract: Address, owner: Address, token_id: U256)
      -> anyhow::Result<U256>;
    async fn erc20_balance(&self, token: Address, owner: Address) -> anyhow::Result<U256>;
    async fn allowance(&self, token: Address, owner: Address, spender: Address)
      -> anyhow::Result<U256>;
    async fn approve(&self, token: Address, spender: Address, amount: U256)
      -> anyhow::Result<TxConfirmation>;
    async fn is_approved_for_all(&self, contract: Address, owner: Address, operator: Address)
      -> anyhow::Result<bool>;
    async fn set_approval_for_all(&self, contract: Address, operator: Address)
      -> anyhow::Result<TxConfirmation>;
  }
}

mock! {
  pub Market {}

  #[async_trait::async_trait]
  impl MarketplaceApi for Market {
    async fn get_order(&self, order_hash: &str, side: OrderSide) -> anyhow::Result<Option<Value>>;
    async fn list_orders(&self, query: &OrderQuery) -> anyhow::Result<Vec<Value>>;
    async fn get_collection(&self, slug: &str) -> anyhow::Result<CollectionInfo>;
    async fn create_offer(&self, request: &OfferRequest) -> anyhow::Result<Value>;
    async fn create_listing(&self, request: &ListingRequest) -> anyhow::Result<Value>;
  }
}

mock! {
  pub Settlement {}

  #[async_trait::async_trait]
  impl SettlementBackend for Settlement {
    async fn fulfill(
      &self,
      order: &Order,
      account: Address,
      recipient: Option<Address>,
      token_id: Option<U256>,
    ) -> anyhow::Result<Value>;
  }
}

// ---- Fixtures ----

const WALLET: Address = address!("1111111111111111111111111111111111111111");
const MAKER: Address = address!("2222222222222222222222222222222222222222");
const NFT: Address = address!("9c451e5f05c03cefc30404dfd193788799c58c7a");
const WETH: Address = address!("4200000000000000000000000000000000000006");
const OPERATOR: Address = address!("0000000000000068f116a894984e2db1123eb395");
const TOKEN_ID: u64 = 41;
const FAR_FUTURE: u64 = 4_102_444_800;

fn unique_asset() -> Asset {
  Asset::new(NFT, U256::from(TOKEN_ID), AssetStandard::Unique)
}

fn counted_asset() -> Asset {
  Asset::new(NFT, U256::from(TOKEN_ID), AssetStandard::FungibleCount)
}

fn hex(address: Address) -> String {
  format!("{address:#x}")
}

/// A listing selling one unit of the test asset, priced in WETH.
fn weth_listing(hash: &str, price: u64) -> Value {
  json!({
    "order_hash": hash,
    "current_price": price.to_string(),
    "maker": { "address": hex(MAKER) },
    "expiration_time": FAR_FUTURE,
    "protocol_data": {
      "parameters": {
        "offerer": hex(MAKER),
        "offer": [
          { "itemType": 2, "token": hex(NFT), "identifierOrCriteria": TOKEN_ID.to_string(),
            "startAmount": "1", "endAmount": "1" }
        ],
        "consideration": [
          { "itemType": 1, "token": hex(WETH), "identifierOrCriteria": "0",
            "startAmount": price.to_string(), "endAmount": price.to_string(),
            "recipient": hex(MAKER) }
        ]
      },
      "signature": "0x"
    }
  })
}

/// An offer paying WETH for `quantity` units of the test asset.
fn weth_offer(hash: &str, price: u64, item_type: u8, quantity: u64) -> Value {
  json!({
    "order_hash": hash,
    "price": { "current": { "value": price.to_string() } },
    "maker": { "address": hex(MAKER) },
    "expiration_time": FAR_FUTURE,
    "protocol_data": {
      "parameters": {
        "offerer": hex(MAKER),
        "offer": [
          { "itemType": 1, "token": hex(WETH), "identifierOrCriteria": "0",
            "startAmount": price.to_string(), "endAmount": price.to_string() }
        ],
        "consideration": [
          { "itemType": item_type, "token": hex(NFT), "identifierOrCriteria": TOKEN_ID.to_string(),
            "startAmount": quantity.to_string(), "endAmount": quantity.to_string(),
            "recipient": hex(MAKER) }
        ]
      }
    }
  })
}

fn confirmed(byte: u8) -> TxConfirmation {
  TxConfirmation {
    tx_hash: TxHash::repeat_byte(byte),
    success: true,
  }
}

/// Wallet that connects as `WALLET` and must be released exactly once.
fn connected_wallet() -> MockWallet {
  let mut wallet = MockWallet::new();
  wallet
    .expect_subscribe()
    .returning(|| broadcast::channel(8).1);
  wallet.expect_connect().times(1).returning(|| {
    Ok(Signer {
      address: WALLET,
      chain_id: 8453,
    })
  });
  wallet
    .expect_accounts()
    .returning(|| Ok(vec![WALLET]));
  wallet.expect_chain_id().returning(|| Ok(8453));
  wallet.expect_disconnect().times(1).returning(|| Ok(()));
  wallet
}

async fn run(
  wallet: MockWallet,
  contracts: MockContracts,
  market: MockMarket,
  settlement: MockSettlement,
  descriptor: &FlowDescriptor,
) -> FlowReport {
  let settings = OrchestratorSettings {
    marketplace_operator: OPERATOR,
    discovery: DiscoverySettings::default(),
    connect_timeout: Duration::from_secs(5),
  };
  let orchestrator = WorkflowOrchestrator::new(
    Arc::new(wallet),
    Arc::new(contracts),
    Arc::new(market),
    Arc::new(settlement),
    settings,
  );
  orchestrator.run(descriptor).await
}

fn error_kind(report: &FlowReport) -> Option<ErrorKind> {
  report.error.as_ref().map(|e| e.kind)
}

// ---- Buy listing ----

#[tokio::test]
async fn test_buy_listing_approves_exact_price_then_fulfills() {
  let mut seq = Sequence::new();
  let mut contracts = MockContracts::new();
  contracts
    .expect_erc20_balance()
    .with(eq(WETH), eq(WALLET))
    .returning(|_, _| Ok(U256::from(200u64)));
  contracts
    .expect_allowance()
    .with(eq(WETH), eq(WALLET), eq(OPERATOR))
    .returning(|_, _, _| Ok(U256::from(50u64)));
  contracts
    .expect_approve()
    .with(eq(WETH), eq(OPERATOR), eq(U256::from(100u64)))
    .times(1)
    .in_sequence(&mut seq)
    .returning(|_, _, _| Ok(confirmed(0x77)));

  let mut market = MockMarket::new();
  market
    .expect_list_orders()
    .withf(|q| q.side == OrderSide::Listing && q.limit == 50)
    .times(1)
    .returning(|_| Ok(vec![weth_listing("0xaa", 100)]));

  let mut settlement = MockSettlement::new();
  settlement
    .expect_fulfill()
    .withf(|order, account, recipient, token_id| {
      order.order_hash == "0xaa"
        && *account == WALLET
        && recipient.is_none()
        && *token_id == Some(U256::from(TOKEN_ID))
    })
    .times(1)
    .in_sequence(&mut seq)
    .returning(|_, _, _, _| Ok(json!("0xabc")));

  let descriptor = FlowDescriptor::buy_listing(unique_asset());
  let report = run(connected_wallet(), contracts, market, settlement, &descriptor).await;

  assert!(report.succeeded(), "unexpected failure: {:?}", report.error);
  assert_eq!(report.trace, descriptor.planned_states());
  assert_eq!(report.approvals.len(), 1);
  assert!(report.approvals[0].submitted());
  let outcome = report.outcome.expect("outcome");
  assert_eq!(outcome.status, FulfillmentStatus::Success);
  assert_eq!(outcome.transaction_reference, "0xabc");
  assert_eq!(report.order.map(|o| o.price), Some(U256::from(100u64)));
  assert_eq!(report.session.connection_state, ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_sufficient_allowance_performs_no_writes() {
  let mut contracts = MockContracts::new();
  contracts
    .expect_erc20_balance()
    .returning(|_, _| Ok(U256::from(1_000u64)));
  contracts
    .expect_allowance()
    .returning(|_, _, _| Ok(U256::from(500u64)));
  contracts.expect_approve().never();

  let mut market = MockMarket::new();
  market
    .expect_list_orders()
    .returning(|_| Ok(vec![weth_listing("0xaa", 100)]));

  let mut settlement = MockSettlement::new();
  settlement
    .expect_fulfill()
    .returning(|_, _, _, _| Ok(json!({ "status": 1 })));

  let descriptor = FlowDescriptor::buy_listing(unique_asset());
  let report = run(connected_wallet(), contracts, market, settlement, &descriptor).await;

  assert!(report.succeeded());
  assert_eq!(report.approvals, vec![ApprovalAction::AlreadySufficient]);
  assert_eq!(
    report.outcome.map(|o| o.transaction_reference),
    Some(UNKNOWN_REFERENCE.to_string())
  );
}

#[tokio::test]
async fn test_insufficient_balance_never_approves() {
  let mut contracts = MockContracts::new();
  contracts
    .expect_erc20_balance()
    .returning(|_, _| Ok(U256::from(10u64)));
  contracts.expect_allowance().never();
  contracts.expect_approve().never();

  let mut market = MockMarket::new();
  market
    .expect_list_orders()
    .returning(|_| Ok(vec![weth_listing("0xaa", 100)]));

  let mut settlement = MockSettlement::new();
  settlement.expect_fulfill().never();

  let descriptor = FlowDescriptor::buy_listing(unique_asset());
  let report = run(connected_wallet(), contracts, market, settlement, &descriptor).await;

  assert_eq!(report.final_state, FlowState::Failed);
  assert_eq!(error_kind(&report), Some(ErrorKind::InsufficientBalance));
  let error = report.error.as_ref().expect("error");
  assert_eq!(error.failed_in, FlowState::Approving);
  assert!(error.message.contains("required 100, available 10"));
  assert!(!error.remediation.is_empty());
}

#[tokio::test]
async fn test_approval_revert_fails_the_flow() {
  let mut contracts = MockContracts::new();
  contracts
    .expect_erc20_balance()
    .returning(|_, _| Ok(U256::from(200u64)));
  contracts
    .expect_allowance()
    .returning(|_, _, _| Err(anyhow::anyhow!("rpc unavailable")));
  contracts.expect_approve().times(1).returning(|_, _, _| {
    Ok(TxConfirmation {
      tx_hash: TxHash::repeat_byte(0x55),
      success: false,
    })
  });

  let mut market = MockMarket::new();
  market
    .expect_list_orders()
    .returning(|_| Ok(vec![weth_listing("0xaa", 100)]));

  let mut settlement = MockSettlement::new();
  settlement.expect_fulfill().never();

  let descriptor = FlowDescriptor::buy_listing(unique_asset());
  let report = run(connected_wallet(), contracts, market, settlement, &descriptor).await;

  assert_eq!(error_kind(&report), Some(ErrorKind::Approval));
  assert_eq!(report.trace.last(), Some(&FlowState::Failed));
}

#[tokio::test]
async fn test_native_priced_listing_skips_approving() {
  let mut listing = weth_listing("0xnative", 100);
  listing["protocol_data"]["parameters"]["consideration"][0]["itemType"] = json!(0);
  listing["protocol_data"]["parameters"]["consideration"][0]["token"] = json!(hex(Address::ZERO));

  let mut contracts = MockContracts::new();
  contracts.expect_erc20_balance().never();
  contracts.expect_approve().never();

  let mut market = MockMarket::new();
  market
    .expect_list_orders()
    .return_once(move |_| Ok(vec![listing]));

  let mut settlement = MockSettlement::new();
  settlement
    .expect_fulfill()
    .withf(|order, _, _, _| order.payment_token == PaymentToken::Native)
    .returning(|_, _, _, _| Ok(json!({ "hash": "0x01" })));

  let descriptor = FlowDescriptor::buy_listing(unique_asset());
  let report = run(connected_wallet(), contracts, market, settlement, &descriptor).await;

  assert!(report.succeeded());
  assert!(!report.trace.contains(&FlowState::Approving));
  assert!(report.approvals.is_empty());
}

#[tokio::test]
async fn test_settlement_rejection_keeps_upstream_message() {
  let mut contracts = MockContracts::new();
  contracts
    .expect_erc20_balance()
    .returning(|_, _| Ok(U256::from(200u64)));
  contracts
    .expect_allowance()
    .returning(|_, _, _| Ok(U256::from(100u64)));

  let mut market = MockMarket::new();
  market
    .expect_list_orders()
    .returning(|_| Ok(vec![weth_listing("0xaa", 100)]));

  let mut settlement = MockSettlement::new();
  settlement.expect_fulfill().returning(|_, _, _, _| {
    Err(anyhow::anyhow!("execution reverted: order expired").context("submission failed"))
  });

  let descriptor = FlowDescriptor::buy_listing(unique_asset());
  let report = run(connected_wallet(), contracts, market, settlement, &descriptor).await;

  assert_eq!(error_kind(&report), Some(ErrorKind::Fulfillment));
  let error = report.error.as_ref().expect("error");
  assert_eq!(error.message, "execution reverted: order expired");
  assert_eq!(error.failed_in, FlowState::Fulfilling);
  let outcome = report.outcome.as_ref().expect("outcome");
  assert_eq!(outcome.status, FulfillmentStatus::Failed);
  assert!(report.diagnostic.is_some());
}

// ---- Accept offer ----

#[tokio::test]
async fn test_accept_offer_picks_highest_offer() {
  let mut contracts = MockContracts::new();
  contracts
    .expect_owner_of()
    .with(eq(NFT), eq(U256::from(TOKEN_ID)))
    .returning(|_, _| Ok(WALLET));
  contracts
    .expect_is_approved_for_all()
    .with(eq(NFT), eq(WALLET), eq(OPERATOR))
    .times(1)
    .returning(|_, _, _| Ok(true));
  contracts.expect_set_approval_for_all().never();

  let mut market = MockMarket::new();
  market.expect_list_orders().returning(|_| {
    Ok(vec![
      weth_offer("0x01", 100, 2, 1),
      weth_offer("0x02", 150, 2, 1),
      weth_offer("0x03", 150, 2, 1),
    ])
  });

  let mut settlement = MockSettlement::new();
  settlement
    .expect_fulfill()
    .withf(|order, _, _, _| order.order_hash == "0x02")
    .times(1)
    .returning(|_, _, _, _| Ok(json!({ "transactionHash": "0xdef" })));

  let descriptor = FlowDescriptor::accept_offer(unique_asset());
  let report = run(connected_wallet(), contracts, market, settlement, &descriptor).await;

  assert!(report.succeeded(), "unexpected failure: {:?}", report.error);
  assert_eq!(report.trace, descriptor.planned_states());
  assert_eq!(
    report.outcome.map(|o| o.transaction_reference),
    Some("0xdef".to_string())
  );
}

#[tokio::test]
async fn test_accept_offer_remediates_missing_approval() {
  let mut contracts = MockContracts::new();
  contracts.expect_owner_of().returning(|_, _| Ok(WALLET));
  contracts
    .expect_is_approved_for_all()
    .returning(|_, _, _| Ok(false));
  contracts
    .expect_set_approval_for_all()
    .with(eq(NFT), eq(OPERATOR))
    .times(1)
    .returning(|_, _| Ok(confirmed(0x99)));

  let mut market = MockMarket::new();
  market
    .expect_list_orders()
    .returning(|_| Ok(vec![weth_offer("0x01", 100, 2, 1)]));

  let mut settlement = MockSettlement::new();
  settlement
    .expect_fulfill()
    .returning(|_, _, _, _| Ok(json!("0xfeed")));

  let descriptor = FlowDescriptor::accept_offer(unique_asset());
  let report = run(connected_wallet(), contracts, market, settlement, &descriptor).await;

  assert!(report.succeeded());
  assert_eq!(
    report.approvals,
    vec![ApprovalAction::Submitted {
      tx_hash: TxHash::repeat_byte(0x99)
    }]
  );
}

#[tokio::test]
async fn test_ownership_mismatch_stops_before_discovery() {
  let mut contracts = MockContracts::new();
  contracts.expect_owner_of().returning(|_, _| Ok(MAKER));
  contracts.expect_is_approved_for_all().never();

  let mut market = MockMarket::new();
  market.expect_list_orders().never();

  let mut settlement = MockSettlement::new();
  settlement.expect_fulfill().never();

  let descriptor = FlowDescriptor::accept_offer(unique_asset());
  let report = run(connected_wallet(), contracts, market, settlement, &descriptor).await;

  assert_eq!(error_kind(&report), Some(ErrorKind::Ownership));
  let error = report.error.as_ref().expect("error");
  assert_eq!(error.failed_in, FlowState::Verifying);
  assert_eq!(error.remediation.len(), 3);
  assert!(report.outcome.is_none());
}

#[tokio::test]
async fn test_offers_beyond_holdings_mean_no_order() {
  let mut contracts = MockContracts::new();
  contracts
    .expect_balance_of()
    .with(eq(NFT), eq(WALLET), eq(U256::from(TOKEN_ID)))
    .returning(|_, _, _| Ok(U256::from(3u64)));
  contracts
    .expect_is_approved_for_all()
    .returning(|_, _, _| Ok(true));

  let mut market = MockMarket::new();
  market
    .expect_list_orders()
    .times(1)
    .returning(|_| Ok(vec![weth_offer("0x05", 500, 3, 5)]));

  let mut settlement = MockSettlement::new();
  settlement.expect_fulfill().never();

  let descriptor = FlowDescriptor::accept_offer(counted_asset());
  let report = run(connected_wallet(), contracts, market, settlement, &descriptor).await;

  assert_eq!(error_kind(&report), Some(ErrorKind::OrderNotFound));
  assert_eq!(
    report.error.as_ref().map(|e| e.failed_in),
    Some(FlowState::Discovering)
  );
  assert_eq!(report.session.connection_state, ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_empty_offer_book_is_order_not_found() {
  let mut contracts = MockContracts::new();
  contracts
    .expect_balance_of()
    .returning(|_, _, _| Ok(U256::from(3u64)));
  contracts
    .expect_is_approved_for_all()
    .returning(|_, _, _| Ok(true));

  let mut market = MockMarket::new();
  market.expect_list_orders().times(1).returning(|_| Ok(Vec::new()));

  let mut settlement = MockSettlement::new();
  settlement.expect_fulfill().never();

  let descriptor = FlowDescriptor::accept_offer(counted_asset());
  let report = run(connected_wallet(), contracts, market, settlement, &descriptor).await;

  assert_eq!(error_kind(&report), Some(ErrorKind::OrderNotFound));
  assert_eq!(report.final_state, FlowState::Failed);
  assert!(report.diagnostic.is_none());
}

#[tokio::test]
async fn test_offer_within_holdings_is_settled() {
  let mut contracts = MockContracts::new();
  contracts
    .expect_balance_of()
    .returning(|_, _, _| Ok(U256::from(3u64)));
  contracts
    .expect_is_approved_for_all()
    .returning(|_, _, _| Ok(true));

  let mut market = MockMarket::new();
  market.expect_list_orders().returning(|_| {
    Ok(vec![
      weth_offer("0x05", 500, 3, 5),
      weth_offer("0x02", 200, 3, 2),
    ])
  });

  let mut settlement = MockSettlement::new();
  settlement
    .expect_fulfill()
    .withf(|order, _, _, _| order.order_hash == "0x02")
    .returning(|_, _, _, _| Ok(json!("0x0202")));

  let descriptor = FlowDescriptor::accept_offer(counted_asset());
  let report = run(connected_wallet(), contracts, market, settlement, &descriptor).await;

  assert!(report.succeeded(), "unexpected failure: {:?}", report.error);
  assert_eq!(report.order.map(|o| o.order_hash), Some("0x02".to_string()));
}

#[tokio::test]
async fn test_exact_hash_lookup_miss() {
  let mut contracts = MockContracts::new();
  contracts.expect_owner_of().returning(|_, _| Ok(WALLET));
  contracts
    .expect_is_approved_for_all()
    .returning(|_, _, _| Ok(true));

  let mut market = MockMarket::new();
  market
    .expect_get_order()
    .with(eq("0xmissing"), eq(OrderSide::Offer))
    .times(1)
    .returning(|_, _| Ok(None));
  market.expect_list_orders().never();

  let mut settlement = MockSettlement::new();
  settlement.expect_fulfill().never();

  let descriptor = FlowDescriptor::accept_offer(unique_asset()).with_order_hash("0xmissing");
  let report = run(connected_wallet(), contracts, market, settlement, &descriptor).await;

  assert_eq!(error_kind(&report), Some(ErrorKind::OrderNotFound));
}

#[tokio::test]
async fn test_exact_hash_settles_that_order() {
  let mut contracts = MockContracts::new();
  contracts.expect_owner_of().returning(|_, _| Ok(WALLET));
  contracts
    .expect_is_approved_for_all()
    .returning(|_, _, _| Ok(true));

  let mut market = MockMarket::new();
  market
    .expect_get_order()
    .returning(|_, _| Ok(Some(weth_offer("0x07", 90, 2, 1))));

  let mut settlement = MockSettlement::new();
  settlement
    .expect_fulfill()
    .withf(|order, _, _, _| order.order_hash == "0x07")
    .returning(|_, _, _, _| Ok(json!("0x0707")));

  let descriptor = FlowDescriptor::accept_offer(unique_asset()).with_order_hash("0x07");
  let report = run(connected_wallet(), contracts, market, settlement, &descriptor).await;

  assert!(report.succeeded());
}

#[tokio::test]
async fn test_buy_listing_rejects_offer_hash() {
  let mut contracts = MockContracts::new();
  contracts.expect_erc20_balance().never();
  contracts.expect_allowance().never();
  contracts.expect_approve().never();

  let mut market = MockMarket::new();
  market
    .expect_get_order()
    .with(eq("0x07"), eq(OrderSide::Listing))
    .times(1)
    .returning(|_, _| Ok(Some(weth_offer("0x07", 90, 2, 1))));

  let mut settlement = MockSettlement::new();
  settlement.expect_fulfill().never();

  let descriptor = FlowDescriptor::buy_listing(unique_asset()).with_order_hash("0x07");
  let report = run(connected_wallet(), contracts, market, settlement, &descriptor).await;

  assert_eq!(error_kind(&report), Some(ErrorKind::OrderNotFound));
  assert_eq!(
    report.error.as_ref().map(|e| e.failed_in),
    Some(FlowState::Discovering)
  );
  assert!(report.approvals.is_empty());
}

#[tokio::test]
async fn test_accept_offer_rejects_listing_hash() {
  let mut contracts = MockContracts::new();
  contracts.expect_owner_of().returning(|_, _| Ok(WALLET));
  contracts
    .expect_is_approved_for_all()
    .returning(|_, _, _| Ok(true));
  contracts.expect_set_approval_for_all().never();

  let mut market = MockMarket::new();
  market
    .expect_get_order()
    .returning(|_, _| Ok(Some(weth_listing("0x08", 100))));

  let mut settlement = MockSettlement::new();
  settlement.expect_fulfill().never();

  let descriptor = FlowDescriptor::accept_offer(unique_asset()).with_order_hash("0x08");
  let report = run(connected_wallet(), contracts, market, settlement, &descriptor).await;

  assert_eq!(error_kind(&report), Some(ErrorKind::OrderNotFound));
}

// ---- Session ----

#[tokio::test]
async fn test_connection_failure_still_disconnects() {
  let mut wallet = MockWallet::new();
  wallet
    .expect_subscribe()
    .returning(|| broadcast::channel(8).1);
  wallet
    .expect_connect()
    .returning(|| Err(anyhow::anyhow!("user rejected request")));
  wallet.expect_disconnect().times(1).returning(|| Ok(()));

  let mut contracts = MockContracts::new();
  contracts.expect_owner_of().never();

  let descriptor = FlowDescriptor::accept_offer(unique_asset());
  let report = run(
    wallet,
    contracts,
    MockMarket::new(),
    MockSettlement::new(),
    &descriptor,
  )
  .await;

  assert_eq!(error_kind(&report), Some(ErrorKind::Connection));
  assert_eq!(
    report.trace,
    vec![FlowState::Idle, FlowState::Connecting, FlowState::Failed]
  );
}

#[tokio::test]
async fn test_failed_read_is_connection_error() {
  let mut contracts = MockContracts::new();
  contracts
    .expect_owner_of()
    .returning(|_, _| Err(anyhow::anyhow!("connection reset")));

  let descriptor = FlowDescriptor::accept_offer(unique_asset());
  let report = run(
    connected_wallet(),
    contracts,
    MockMarket::new(),
    MockSettlement::new(),
    &descriptor,
  )
  .await;

  assert_eq!(error_kind(&report), Some(ErrorKind::Connection));
  assert_eq!(
    report.error.map(|e| e.failed_in),
    Some(FlowState::Verifying)
  );
}

#[tokio::test]
async fn test_provider_events_update_session_meta() {
  let (events, receiver) = broadcast::channel(8);
  events
    .send(ProviderEvent::ChainChanged { chain_id: 8453 })
    .expect("send");
  events
    .send(ProviderEvent::Disconnected(DisconnectInfo {
      code: 4900,
      message: "provider disconnected".to_string(),
    }))
    .expect("send");
  drop(events);

  let mut wallet = MockWallet::new();
  wallet.expect_subscribe().return_once(move || receiver);
  wallet.expect_connect().returning(|| {
    Ok(Signer {
      address: WALLET,
      chain_id: 8453,
    })
  });
  wallet.expect_disconnect().times(1).returning(|| Ok(()));

  let mut contracts = MockContracts::new();
  contracts.expect_owner_of().returning(|_, _| Ok(MAKER));

  let descriptor = FlowDescriptor::accept_offer(unique_asset());
  let report = run(
    wallet,
    contracts,
    MockMarket::new(),
    MockSettlement::new(),
    &descriptor,
  )
  .await;

  assert_eq!(error_kind(&report), Some(ErrorKind::Ownership));
  assert_eq!(report.session.chain_id, Some(8453));
  assert_eq!(report.session.address, Some(WALLET));
  assert_eq!(report.session.last_disconnect.map(|d| d.code), Some(4900));
}

#[tokio::test]
async fn test_account_switch_before_settlement_stops_the_flow() {
  let mut wallet = MockWallet::new();
  wallet
    .expect_subscribe()
    .returning(|| broadcast::channel(8).1);
  wallet.expect_connect().returning(|| {
    Ok(Signer {
      address: WALLET,
      chain_id: 8453,
    })
  });
  wallet
    .expect_accounts()
    .returning(|| Ok(vec![MAKER]));
  wallet.expect_chain_id().returning(|| Ok(8453));
  wallet.expect_disconnect().times(1).returning(|| Ok(()));

  let mut contracts = MockContracts::new();
  contracts.expect_owner_of().returning(|_, _| Ok(WALLET));
  contracts
    .expect_is_approved_for_all()
    .returning(|_, _, _| Ok(true));

  let mut market = MockMarket::new();
  market
    .expect_list_orders()
    .returning(|_| Ok(vec![weth_offer("0x01", 100, 2, 1)]));

  let mut settlement = MockSettlement::new();
  settlement.expect_fulfill().never();

  let descriptor = FlowDescriptor::accept_offer(unique_asset());
  let report = run(wallet, contracts, market, settlement, &descriptor).await;

  assert_eq!(error_kind(&report), Some(ErrorKind::Connection));
  assert_eq!(
    report.error.as_ref().map(|e| e.failed_in),
    Some(FlowState::Fulfilling)
  );
  assert_eq!(report.session.address, Some(MAKER));
}

// ---- Standing offer ----

#[tokio::test]
async fn test_standing_offer_approves_then_posts() {
  let amount = U256::from(1_500_000_000_000_000u64);

  let mut contracts = MockContracts::new();
  contracts
    .expect_erc20_balance()
    .returning(|_, _| Ok(U256::from(10u64).pow(U256::from(18u8))));
  contracts
    .expect_allowance()
    .returning(|_, _, _| Ok(U256::ZERO));
  contracts
    .expect_approve()
    .with(eq(WETH), eq(OPERATOR), eq(amount))
    .times(1)
    .returning(|_, _, _| Ok(confirmed(0x33)));

  let mut market = MockMarket::new();
  market
    .expect_get_collection()
    .with(eq("superfrens"))
    .returning(|slug| {
      Ok(CollectionInfo {
        slug: slug.to_string(),
        contract: Some(NFT),
        fees: vec![FeeShare {
          recipient: MAKER,
          basis_points: 250,
        }],
      })
    });
  market
    .expect_create_offer()
    .withf(move |request| {
      request.offerer == WALLET
        && request.payment_token == WETH
        && request.amount == amount
        && request.quantity == 1
        && request.collection.fees.len() == 1
        && request.expiration > 1_700_000_000
    })
    .times(1)
    .returning(|_| Ok(json!({ "order": { "order_hash": "0xfeed" } })));
  market.expect_list_orders().never();

  let descriptor =
    FlowDescriptor::standing_offer(CollectionRef::new("superfrens"), WETH, amount);
  let report = run(
    connected_wallet(),
    contracts,
    market,
    MockSettlement::new(),
    &descriptor,
  )
  .await;

  assert!(report.succeeded(), "unexpected failure: {:?}", report.error);
  assert_eq!(report.trace, descriptor.planned_states());
  assert_eq!(
    report.outcome.map(|o| o.transaction_reference),
    Some("0xfeed".to_string())
  );
}

#[tokio::test]
async fn test_standing_offer_rejection_is_fulfillment_error() {
  let mut contracts = MockContracts::new();
  contracts
    .expect_erc20_balance()
    .returning(|_, _| Ok(U256::from(1_000u64)));
  contracts
    .expect_allowance()
    .returning(|_, _, _| Ok(U256::from(1_000u64)));

  let mut market = MockMarket::new();
  market.expect_get_collection().returning(|slug| {
    Ok(CollectionInfo {
      slug: slug.to_string(),
      contract: None,
      fees: Vec::new(),
    })
  });
  market
    .expect_create_offer()
    .returning(|_| Err(anyhow::anyhow!("Offer amount is below the collection floor")));

  let descriptor = FlowDescriptor::standing_offer(
    CollectionRef::new("superfrens"),
    WETH,
    U256::from(100u64),
  );
  let report = run(
    connected_wallet(),
    contracts,
    market,
    MockSettlement::new(),
    &descriptor,
  )
  .await;

  assert_eq!(error_kind(&report), Some(ErrorKind::Fulfillment));
  assert_eq!(
    report.error.map(|e| e.message),
    Some("Offer amount is below the collection floor".to_string())
  );
}

// ---- Create listing ----

#[tokio::test]
async fn test_create_listing_grants_collection_approval() {
  let price = U256::from(500_000_000_000_000_000u64);

  let mut contracts = MockContracts::new();
  contracts.expect_owner_of().returning(|_, _| Ok(WALLET));
  contracts
    .expect_is_approved_for_all()
    .times(2)
    .returning(|_, _, _| Ok(false));
  contracts
    .expect_set_approval_for_all()
    .times(1)
    .returning(|_, _| Ok(confirmed(0x44)));

  let mut market = MockMarket::new();
  market
    .expect_create_listing()
    .withf(move |request| {
      request.asset == unique_asset()
        && request.price == price
        && request.payment_token == PaymentToken::Native
        && request.quantity == 1
    })
    .times(1)
    .returning(|_| Ok(json!({ "order_hash": "0x1157" })));

  let descriptor = FlowDescriptor::create_listing(unique_asset(), price);
  let report = run(
    connected_wallet(),
    contracts,
    market,
    MockSettlement::new(),
    &descriptor,
  )
  .await;

  assert!(report.succeeded(), "unexpected failure: {:?}", report.error);
  assert_eq!(report.trace, descriptor.planned_states());
  assert_eq!(report.approvals.len(), 1);
  assert_eq!(
    report.outcome.map(|o| o.transaction_reference),
    Some("0x1157".to_string())
  );
}

#[tokio::test]
async fn test_listing_more_units_than_held_fails() {
  let mut contracts = MockContracts::new();
  contracts
    .expect_balance_of()
    .returning(|_, _, _| Ok(U256::from(2u64)));
  contracts
    .expect_is_approved_for_all()
    .returning(|_, _, _| Ok(true));

  let mut market = MockMarket::new();
  market.expect_create_listing().never();

  let descriptor =
    FlowDescriptor::create_listing(counted_asset(), U256::from(1_000u64)).with_quantity(5);
  let report = run(
    connected_wallet(),
    contracts,
    market,
    MockSettlement::new(),
    &descriptor,
  )
  .await;

  assert_eq!(error_kind(&report), Some(ErrorKind::InsufficientBalance));
  assert_eq!(
    report.error.map(|e| e.failed_in),
    Some(FlowState::Fulfilling)
  );
}
