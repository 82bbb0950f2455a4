//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated, including an incomplete `[flow]`
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    chain_id = config.chain.chain_id,
    marketplace_chain = %config.marketplace.chain,
    flow = %config.flow.kind,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig = toml::from_str(content).with_context(|| "Failed to parse config.toml")?;
  validate_config(&config)?;
  Ok(config)
}

fn validate_config(config: &AppConfig) -> Result<()> {
  // Chain
  anyhow::ensure!(!config.chain.rpc_url.trim().is_empty(), "chain.rpc_url must not be empty");
  anyhow::ensure!(config.chain.chain_id > 0, "chain.chain_id must be positive");
  anyhow::ensure!(
    !config.chain.seaport_address.is_zero(),
    "chain.seaport_address must not be the zero address"
  );
  anyhow::ensure!(
    config.chain.connect_timeout_secs > 0,
    "chain.connect_timeout_secs must be positive"
  );

  // Marketplace
  anyhow::ensure!(
    !config.marketplace.base_url.trim().is_empty(),
    "marketplace.base_url must not be empty"
  );
  anyhow::ensure!(
    !config.marketplace.chain.trim().is_empty(),
    "marketplace.chain must not be empty"
  );
  anyhow::ensure!(
    config.marketplace.requests_per_second > 0,
    "marketplace.requests_per_second must be positive"
  );
  anyhow::ensure!(
    config.marketplace.max_concurrent > 0,
    "marketplace.max_concurrent must be positive"
  );

  // Discovery
  anyhow::ensure!(
    config.discovery.page_size > 0 && config.discovery.page_size <= 200,
    "discovery.page_size must be in (0, 200], got {}",
    config.discovery.page_size
  );

  // Flow
  config
    .flow
    .to_descriptor(config.chain.payment_token)
    .context("Invalid [flow] section")?;

  Ok(())
}
