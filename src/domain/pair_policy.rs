//! Pair Policy - Tradable Quote/Base Combinations
//!
//! Only anchor assets may act as the quote side of a market. The
//! exchange lists two anchors: a primary settlement asset and a
//! stable-value asset. The primary/stable cross is rejected because the
//! inverse listing (stable quote, primary base) already covers it.

use serde::{Deserialize, Serialize};

use super::snapshot::AssetId;

/// Primary settlement asset used when no override is configured (BTC).
pub const DEFAULT_PRIMARY_ASSET: &str = "c6d0c728-2624-429b-8e0d-d9d19b6592fa";

/// Stable-value asset used when no override is configured (USDT).
pub const DEFAULT_STABLE_ASSET: &str = "815b0b1a-2764-3736-8faa-42d694fa620a";

/// Static rule set deciding which (quote, base) pairs are tradable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairPolicy {
    /// Primary settlement anchor.
    primary: AssetId,
    /// Stable-value anchor.
    stable: AssetId,
}

impl PairPolicy {
    /// Build a policy from the two anchor asset ids.
    pub fn new(primary: impl Into<AssetId>, stable: impl Into<AssetId>) -> Self {
        Self {
            primary: primary.into(),
            stable: stable.into(),
        }
    }

    /// Primary settlement anchor.
    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// Stable-value anchor.
    pub fn stable(&self) -> &str {
        &self.stable
    }

    /// Whether `asset` may serve as a quote asset.
    pub fn is_anchor(&self, asset: &str) -> bool {
        asset == self.primary || asset == self.stable
    }

    /// Whether (quote, base) is a tradable market.
    pub fn is_valid_pair(&self, quote: &str, base: &str) -> bool {
        if !self.is_anchor(quote) {
            return false;
        }
        !(quote == self.primary && base == self.stable)
    }
}

impl Default for PairPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_PRIMARY_ASSET, DEFAULT_STABLE_ASSET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XIN: &str = "c94ac88f-4671-3976-b60a-09064f1811e8";

    #[test]
    fn test_anchor_quotes_accepted() {
        let policy = PairPolicy::default();
        assert!(policy.is_valid_pair(DEFAULT_PRIMARY_ASSET, XIN));
        assert!(policy.is_valid_pair(DEFAULT_STABLE_ASSET, XIN));
        assert!(policy.is_valid_pair(DEFAULT_STABLE_ASSET, DEFAULT_PRIMARY_ASSET));
    }

    #[test]
    fn test_non_anchor_quote_rejected() {
        let policy = PairPolicy::default();
        assert!(!policy.is_valid_pair(XIN, DEFAULT_PRIMARY_ASSET));
        assert!(!policy.is_valid_pair(XIN, DEFAULT_STABLE_ASSET));
    }

    #[test]
    fn test_primary_stable_cross_rejected() {
        let policy = PairPolicy::default();
        assert!(!policy.is_valid_pair(DEFAULT_PRIMARY_ASSET, DEFAULT_STABLE_ASSET));
    }

    #[test]
    fn test_custom_anchors() {
        let policy = PairPolicy::new("p", "s");
        assert!(policy.is_anchor("p"));
        assert!(!policy.is_anchor(DEFAULT_PRIMARY_ASSET));
        assert!(policy.is_valid_pair("s", "p"));
        assert!(!policy.is_valid_pair("p", "s"));
    }
}
