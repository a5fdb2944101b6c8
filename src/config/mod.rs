//! Configuration Module - TOML-based Service Configuration
//!
//! Loads and validates configuration from `config.toml`. Ledger
//! credentials are never stored here; they come from environment
//! variables (see `adapters::api::auth`).

pub mod loader;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::domain::pair_policy::{PairPolicy, DEFAULT_PRIMARY_ASSET, DEFAULT_STABLE_ASSET};
use crate::usecases::poller::PollerConfig;

/// Top-level service configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before the poller starts.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Exchange identity.
  pub exchange: ExchangeConfig,
  /// Ledger network API and poll tuning.
  pub ledger: LedgerConfig,
  /// Tradable pair anchors.
  #[serde(default)]
  pub pairs: PairsConfig,
  /// Persistence configuration.
  #[serde(default)]
  pub persistence: PersistenceConfig,
  /// Metrics and monitoring.
  #[serde(default)]
  pub metrics: MetricsConfig,
}

/// Exchange identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
  /// Human-readable service name.
  pub name: String,
  /// The exchange's own ledger account; snapshots to other accounts
  /// are ignored.
  pub account_id: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
}

/// Ledger network configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
  /// REST API base URL.
  pub base_url: String,
  /// Request timeout (milliseconds).
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,
  /// Snapshots per page.
  #[serde(default = "default_page_limit")]
  pub page_limit: usize,
  /// Backoff after a failed fetch or failed snapshot (milliseconds).
  #[serde(default = "default_delay_ms")]
  pub retry_delay_ms: u64,
  /// Pause after a short page (milliseconds).
  #[serde(default = "default_delay_ms")]
  pub idle_delay_ms: u64,
  /// In-client retries on 429 / 5xx before the poller sees a failure.
  #[serde(default)]
  pub max_retries: u32,
}

impl LedgerConfig {
  /// Poll loop tuning derived from this section.
  pub fn poller(&self) -> PollerConfig {
    PollerConfig {
      page_limit: self.page_limit,
      retry_delay: Duration::from_millis(self.retry_delay_ms),
      idle_delay: Duration::from_millis(self.idle_delay_ms),
    }
  }
}

/// Anchor assets for the pair policy.
#[derive(Debug, Clone, Deserialize)]
pub struct PairsConfig {
  /// Primary settlement asset.
  #[serde(default = "default_primary_asset")]
  pub primary_asset: String,
  /// Stable-value asset.
  #[serde(default = "default_stable_asset")]
  pub stable_asset: String,
}

impl PairsConfig {
  /// Build the pair policy.
  pub fn policy(&self) -> PairPolicy {
    PairPolicy::new(self.primary_asset.clone(), self.stable_asset.clone())
  }
}

impl Default for PairsConfig {
  fn default() -> Self {
    Self {
      primary_asset: default_primary_asset(),
      stable_asset: default_stable_asset(),
    }
  }
}

/// Persistence configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
  /// Directory for checkpoint, order, and refund files.
  #[serde(default = "default_data_dir")]
  pub data_dir: String,
  /// Where to start when no checkpoint has been persisted yet.
  #[serde(default = "default_initial_checkpoint")]
  pub initial_checkpoint: DateTime<Utc>,
}

impl Default for PersistenceConfig {
  fn default() -> Self {
    Self {
      data_dir: default_data_dir(),
      initial_checkpoint: default_initial_checkpoint(),
    }
  }
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Enable Prometheus metrics export.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Metrics server bind address.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
  /// Health check endpoint port.
  #[serde(default = "default_health_port")]
  pub health_port: u16,
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      bind_address: default_metrics_addr(),
      health_port: default_health_port(),
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

fn default_timeout_ms() -> u64 {
  10_000
}

fn default_page_limit() -> usize {
  500
}

fn default_delay_ms() -> u64 {
  1_000
}

fn default_primary_asset() -> String {
  DEFAULT_PRIMARY_ASSET.to_string()
}

fn default_stable_asset() -> String {
  DEFAULT_STABLE_ASSET.to_string()
}

fn default_data_dir() -> String {
  "data".to_string()
}

fn default_initial_checkpoint() -> DateTime<Utc> {
  DateTime::<Utc>::default()
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}

fn default_health_port() -> u16 {
  8080
}
