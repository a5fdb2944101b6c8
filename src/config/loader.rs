//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Largest page the ledger network serves.
const MAX_PAGE_LIMIT: usize = 500;

/// Upper bound for in-client retries (backoff doubles per attempt).
const MAX_RETRIES: u32 = 10;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    exchange = %config.exchange.name,
    account = %config.exchange.account_id,
    ledger = %config.ledger.base_url,
    page_limit = config.ledger.page_limit,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig =
    toml::from_str(content).with_context(|| "Failed to parse config.toml")?;
  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
fn validate_config(config: &AppConfig) -> Result<()> {
  anyhow::ensure!(
    !config.exchange.account_id.is_empty(),
    "exchange.account_id must not be empty"
  );

  anyhow::ensure!(
    !config.ledger.base_url.is_empty(),
    "Ledger API URL must not be empty"
  );
  anyhow::ensure!(
    config.ledger.page_limit > 0 && config.ledger.page_limit <= MAX_PAGE_LIMIT,
    "ledger.page_limit must be in (0, {MAX_PAGE_LIMIT}], got {}",
    config.ledger.page_limit
  );
  anyhow::ensure!(
    config.ledger.max_retries <= MAX_RETRIES,
    "ledger.max_retries must be at most {MAX_RETRIES}, got {}",
    config.ledger.max_retries
  );
  anyhow::ensure!(
    config.ledger.timeout_ms > 0,
    "ledger.timeout_ms must be positive"
  );

  anyhow::ensure!(
    !config.pairs.primary_asset.is_empty() && !config.pairs.stable_asset.is_empty(),
    "pairs anchors must not be empty"
  );
  anyhow::ensure!(
    config.pairs.primary_asset != config.pairs.stable_asset,
    "pairs.primary_asset and pairs.stable_asset must differ"
  );

  anyhow::ensure!(
    !config.persistence.data_dir.is_empty(),
    "persistence.data_dir must not be empty"
  );

  Ok(())
}
