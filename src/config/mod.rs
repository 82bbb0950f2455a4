//! Configuration Module - TOML-based Orchestrator Configuration
//!
//! Loads and validates configuration from `config.toml`. Contract
//! addresses, endpoints and the flow to run are externalized here.
//! Secrets (API key, private key) are read from the environment by the
//! adapters and never appear in this file.

pub mod loader;

use std::time::Duration;

use alloy::primitives::{Address, B256, U256, address};
use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::domain::amount::{NATIVE_DECIMALS, parse_amount};
use crate::domain::asset::{Asset, AssetStandard, CollectionRef};
use crate::domain::flow::{FlowDescriptor, FlowKind};
use crate::domain::order::parse_u256;
use crate::usecases::order_discovery::{DEFAULT_PAGE_SIZE, DiscoverySettings};
use crate::usecases::orchestrator::OrchestratorSettings;

/// Seaport 1.6, same address on every supported chain.
pub const SEAPORT_ADDRESS: Address = address!("0000000000000068f116a894984e2db1123eb395");

/// Wrapped ether on Base.
pub const BASE_WETH: Address = address!("4200000000000000000000000000000000000006");

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  #[serde(default)]
  pub app: AppSection,
  pub chain: ChainConfig,
  #[serde(default)]
  pub marketplace: MarketplaceConfig,
  #[serde(default)]
  pub discovery: DiscoveryConfig,
  /// The flow this invocation runs.
  pub flow: FlowConfig,
}

/// Process-level settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
  /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins.
  #[serde(default = "default_log_level")]
  pub log_level: String,
}

impl Default for AppSection {
  fn default() -> Self {
    Self {
      log_level: default_log_level(),
    }
  }
}

/// Chain endpoint and contract addresses.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
  /// JSON-RPC endpoint.
  pub rpc_url: String,
  /// Expected chain id; the session refuses any other.
  #[serde(default = "default_chain_id")]
  pub chain_id: u64,
  /// Settlement contract.
  #[serde(default = "default_seaport")]
  pub seaport_address: Address,
  /// Spender / operator approvals are granted to. Defaults to the
  /// settlement contract.
  pub marketplace_operator: Option<Address>,
  /// Conduit key used when fulfilling and creating orders.
  #[serde(default)]
  pub conduit_key: B256,
  /// Fungible token offers are paid in.
  #[serde(default = "default_payment_token")]
  pub payment_token: Address,
  /// Wallet connect timeout in seconds.
  #[serde(default = "default_connect_timeout")]
  pub connect_timeout_secs: u64,
}

impl ChainConfig {
  pub fn operator(&self) -> Address {
    self.marketplace_operator.unwrap_or(self.seaport_address)
  }
}

/// Marketplace API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketplaceConfig {
  #[serde(default = "default_base_url")]
  pub base_url: String,
  /// Chain slug used in API paths.
  #[serde(default = "default_chain_slug")]
  pub chain: String,
  #[serde(default = "default_timeout")]
  pub timeout_secs: u64,
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
  #[serde(default = "default_max_concurrent")]
  pub max_concurrent: usize,
  #[serde(default = "default_requests_per_second")]
  pub requests_per_second: u32,
}

impl Default for MarketplaceConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
      chain: default_chain_slug(),
      timeout_secs: default_timeout(),
      max_retries: default_max_retries(),
      max_concurrent: default_max_concurrent(),
      requests_per_second: default_requests_per_second(),
    }
  }
}

/// Order discovery settings.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DiscoveryConfig {
  #[serde(default = "default_page_size")]
  pub page_size: usize,
  /// Ignore offers asking for more units than the wallet holds.
  #[serde(default = "default_true")]
  pub bound_offers_by_balance: bool,
}

impl Default for DiscoveryConfig {
  fn default() -> Self {
    Self {
      page_size: default_page_size(),
      bound_offers_by_balance: true,
    }
  }
}

/// The flow to run and its target.
#[derive(Debug, Clone, Deserialize)]
pub struct FlowConfig {
  pub kind: FlowKind,
  /// Asset contract (asset flows).
  pub contract: Option<Address>,
  /// Decimal or 0x-hex token id (asset flows).
  pub token_id: Option<String>,
  #[serde(default = "default_standard")]
  pub standard: AssetStandard,
  /// Settle this exact order instead of the best one.
  pub order_hash: Option<String>,
  /// Collection slug (standing offers).
  pub collection_slug: Option<String>,
  /// Decimal amount: offer total or listing price.
  pub amount: Option<String>,
  /// Decimals of `amount`.
  #[serde(default = "default_decimals")]
  pub decimals: u8,
  /// Overrides `chain.payment_token` for standing offers.
  pub payment_token: Option<Address>,
  pub duration_hours: Option<u64>,
  pub quantity: Option<u64>,
  /// Recipient of settled items, when not the wallet.
  pub recipient: Option<Address>,
}

impl FlowConfig {
  /// Build the descriptor of the configured flow.
  pub fn to_descriptor(&self, default_payment_token: Address) -> Result<FlowDescriptor> {
    let descriptor = match self.kind {
      FlowKind::BuyListing => FlowDescriptor::buy_listing(self.asset()?),
      FlowKind::AcceptOffer => FlowDescriptor::accept_offer(self.asset()?),
      FlowKind::CreateStandingOffer => {
        let slug = match self.collection_slug.as_deref().map(str::trim) {
          Some(slug) if !slug.is_empty() => slug,
          _ => bail!("flow.collection_slug is required for create_standing_offer"),
        };
        let mut collection = CollectionRef::new(slug);
        collection.contract = self.contract;
        FlowDescriptor::standing_offer(
          collection,
          self.payment_token.unwrap_or(default_payment_token),
          self.amount()?,
        )
      }
      FlowKind::CreateListing => FlowDescriptor::create_listing(self.asset()?, self.amount()?),
    };

    let mut descriptor = match &self.order_hash {
      Some(hash) => descriptor.with_order_hash(hash.as_str()),
      None => descriptor,
    };
    if let Some(recipient) = self.recipient {
      descriptor = descriptor.with_recipient(recipient);
    }
    if let Some(hours) = self.duration_hours {
      descriptor = descriptor.with_duration_hours(hours);
    }
    if let Some(quantity) = self.quantity {
      descriptor = descriptor.with_quantity(quantity);
    }
    Ok(descriptor)
  }

  fn asset(&self) -> Result<Asset> {
    let contract = self
      .contract
      .with_context(|| format!("flow.contract is required for {}", self.kind))?;
    let raw = self
      .token_id
      .as_deref()
      .with_context(|| format!("flow.token_id is required for {}", self.kind))?;
    let token_id = parse_u256(raw).with_context(|| format!("flow.token_id {raw:?} is not an integer"))?;
    Ok(Asset::new(contract, token_id, self.standard))
  }

  fn amount(&self) -> Result<U256> {
    let raw = self
      .amount
      .as_deref()
      .with_context(|| format!("flow.amount is required for {}", self.kind))?;
    let amount = parse_amount(raw, self.decimals)?;
    if amount.is_zero() {
      bail!("flow.amount must be positive");
    }
    Ok(amount)
  }
}

impl AppConfig {
  /// Orchestrator tuning derived from the chain and discovery sections.
  pub fn orchestrator_settings(&self) -> OrchestratorSettings {
    OrchestratorSettings {
      marketplace_operator: self.chain.operator(),
      discovery: DiscoverySettings {
        page_size: self.discovery.page_size,
        bound_offers_by_balance: self.discovery.bound_offers_by_balance,
      },
      connect_timeout: Duration::from_secs(self.chain.connect_timeout_secs),
    }
  }
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

fn default_true() -> bool {
  true
}

fn default_chain_id() -> u64 {
  8453
}

fn default_seaport() -> Address {
  SEAPORT_ADDRESS
}

fn default_payment_token() -> Address {
  BASE_WETH
}

fn default_connect_timeout() -> u64 {
  30
}

fn default_base_url() -> String {
  "https://api.opensea.io".to_string()
}

fn default_chain_slug() -> String {
  "base".to_string()
}

fn default_timeout() -> u64 {
  30
}

fn default_max_retries() -> u32 {
  3
}

fn default_max_concurrent() -> usize {
  4
}

fn default_requests_per_second() -> u32 {
  2
}

fn default_page_size() -> usize {
  DEFAULT_PAGE_SIZE
}

fn default_standard() -> AssetStandard {
  AssetStandard::Unique
}

fn default_decimals() -> u8 {
  NATIVE_DECIMALS
}
