//! NFT Trade Orchestrator - Entry Point
//!
//! Runs one configured trade flow against the marketplace and exits.
//!
//! Wiring sequence:
//! 1. Load config.toml (path from the first argument) + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Load the signing key from WALLET_PRIVATE_KEY, connect the RPC provider
//! 4. Load the API key from OPENSEA_API_KEY, create the marketplace client
//! 5. Wire wallet, token contracts, marketplace and settlement adapters
//! 6. Run the flow; print the terminal report as JSON on stdout
//! 7. Exit non-zero when the flow ended in `Failed`

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use nft_trade_orchestrator::adapters::api::{
  MarketplaceAuth, MarketplaceClient, MarketplaceClientConfig, OpenSeaMarketplace,
};
use nft_trade_orchestrator::adapters::chain::wallet::signer_from_env;
use nft_trade_orchestrator::adapters::chain::{
  ChainContracts, ChainProvider, LocalWalletTransport, SeaportSettlement,
};
use nft_trade_orchestrator::config;
use nft_trade_orchestrator::domain::amount::format_amount;
use nft_trade_orchestrator::domain::flow::Submission;
use nft_trade_orchestrator::usecases::orchestrator::WorkflowOrchestrator;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<ExitCode> {
  // ── 1. Load configuration ───────────────────────────────
  let path = std::env::args()
    .nth(1)
    .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
  let config = config::loader::load_config(&path).context("Failed to load configuration")?;

  // ── 2. Initialize structured JSON logging ───────────────
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.app.log_level)),
    )
    .with_writer(std::io::stderr)
    .json()
    .init();

  let descriptor = config
    .flow
    .to_descriptor(config.chain.payment_token)
    .context("Invalid [flow] section")?;

  info!(
    version = env!("CARGO_PKG_VERSION"),
    flow = %descriptor.kind,
    target = %descriptor.target,
    chain_id = config.chain.chain_id,
    "Starting NFT trade orchestrator"
  );
  if let Submission::CreateOffer(c) | Submission::CreateListing(c) = &descriptor.submission {
    info!(
      amount = %format_amount(c.amount, config.flow.decimals),
      duration_hours = c.duration_hours,
      quantity = c.quantity,
      "Order to create"
    );
  }

  // ── 3. Signing key + RPC provider ───────────────────────
  let signer = signer_from_env(config.chain.chain_id).context("Failed to load wallet key")?;
  let provider = Arc::new(
    ChainProvider::connect(&config.chain, signer)
      .await
      .context("Failed to connect RPC provider")?,
  );

  // ── 4. Marketplace client ───────────────────────────────
  let auth = MarketplaceAuth::from_env().context("Failed to load marketplace API key")?;
  let client_config = MarketplaceClientConfig {
    base_url: config.marketplace.base_url.clone(),
    timeout: Duration::from_secs(config.marketplace.timeout_secs),
    max_concurrent: config.marketplace.max_concurrent,
    max_retries: config.marketplace.max_retries,
    requests_per_second: config.marketplace.requests_per_second,
    ..MarketplaceClientConfig::default()
  };
  let client = Arc::new(
    MarketplaceClient::new(auth, client_config).context("Failed to create marketplace client")?,
  );

  // ── 5. Adapters ─────────────────────────────────────────
  let wallet = Arc::new(LocalWalletTransport::new(Arc::clone(&provider)));
  let contracts = Arc::new(ChainContracts::new(Arc::clone(&provider)));
  let seaport = Arc::new(SeaportSettlement::new(
    Arc::clone(&provider),
    config.chain.seaport_address,
    config.chain.conduit_key,
  ));
  let marketplace = Arc::new(OpenSeaMarketplace::new(
    client,
    Arc::clone(&seaport),
    config.marketplace.chain.clone(),
  ));

  let orchestrator = WorkflowOrchestrator::new(
    wallet,
    contracts,
    marketplace,
    seaport,
    config.orchestrator_settings(),
  );

  // ── 6. Run the flow ─────────────────────────────────────
  let report = orchestrator.run(&descriptor).await;
  let rendered = serde_json::to_string_pretty(&report).context("Failed to render report")?;
  println!("{rendered}");

  // ── 7. Exit status ──────────────────────────────────────
  if report.succeeded() {
    info!(run_id = %report.run_id, "Flow completed");
    Ok(ExitCode::SUCCESS)
  } else {
    warn!(
      run_id = %report.run_id,
      error = report.error.as_ref().map_or("-", |e| e.message.as_str()),
      "Flow failed"
    );
    Ok(ExitCode::FAILURE)
  }
}
