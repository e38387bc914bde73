//! Configuration structures for auction orchestration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Auction orchestration configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct AuctionConfig {
    /// Auction budget in milliseconds when the request carries no `tmax`.
    #[serde(default = "default_timeout")]
    #[validate(range(min = 1))]
    pub timeout_ms: u64,

    /// Upper bound applied to a caller supplied `tmax`.
    #[serde(default = "default_max_timeout")]
    #[validate(range(min = 1))]
    pub max_timeout_ms: u64,

    /// Safety margin kept back from the global budget when deriving bidder
    /// deadlines, so results can still be assembled before the caller gives up.
    #[serde(default = "default_timeout_margin")]
    pub timeout_margin_ms: u64,

    /// Reject bids priced below their impression floor.
    #[serde(default = "default_true")]
    pub enforce_floors: bool,

    /// Currency assumed for bids and floors that do not name one.
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3))]
    pub default_currency: String,

    /// Attach hook traces and extra diagnostics to every response.
    #[serde(default)]
    pub debug: bool,
}

fn default_timeout() -> u64 {
    2000
}

fn default_max_timeout() -> u64 {
    3000
}

fn default_timeout_margin() -> u64 {
    50
}

fn default_true() -> bool {
    true
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for AuctionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout(),
            max_timeout_ms: default_max_timeout(),
            timeout_margin_ms: default_timeout_margin(),
            enforce_floors: true,
            default_currency: default_currency(),
            debug: false,
        }
    }
}

impl AuctionConfig {
    /// Resolve the auction budget for a request that may carry its own `tmax`.
    #[must_use]
    pub fn resolve_budget(&self, tmax: Option<u64>) -> Duration {
        let millis = match tmax {
            Some(tmax) if tmax > 0 => tmax.min(self.max_timeout_ms),
            _ => self.timeout_ms.min(self.max_timeout_ms),
        };
        Duration::from_millis(millis)
    }

    #[must_use]
    pub fn timeout_margin(&self) -> Duration {
        Duration::from_millis(self.timeout_margin_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_defaults_without_tmax() {
        let config = AuctionConfig::default();
        assert_eq!(config.resolve_budget(None), Duration::from_millis(2000));
        assert_eq!(config.resolve_budget(Some(0)), Duration::from_millis(2000));
    }

    #[test]
    fn budget_caps_caller_tmax() {
        let config = AuctionConfig::default();
        assert_eq!(config.resolve_budget(Some(500)), Duration::from_millis(500));
        assert_eq!(config.resolve_budget(Some(10_000)), Duration::from_millis(3000));
    }

    #[test]
    fn rejects_bad_currency_code() {
        let config = AuctionConfig {
            default_currency: "DOLLARS".to_string(),
            ..AuctionConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
