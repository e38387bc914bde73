use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use validator::Validate;

use crate::settings::Settings;

use super::{Bidder, BidderConfig};

/// Static facts about a registered bidder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidderInfo {
    pub name: String,
    pub enabled: bool,
    pub endpoint: String,
    pub timeout: Duration,
}

impl BidderInfo {
    #[must_use]
    pub fn from_config(name: &str, config: &BidderConfig) -> Self {
        Self {
            name: name.to_string(),
            enabled: config.enabled,
            endpoint: config.endpoint.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }
}

#[derive(Clone)]
struct RegisteredBidder {
    info: BidderInfo,
    bidder: Arc<dyn Bidder>,
}

/// Builder for one adapter: returns the adapter when its configuration is usable.
pub type BidderBuilder = fn(&str, &BidderConfig) -> Option<Arc<dyn Bidder>>;

/// Returns the list of all known adapters and their builder functions.
fn bidder_builders() -> &'static [(&'static str, BidderBuilder)] {
    &[(super::lifestreet::BIDDER_NAME, super::lifestreet::build)]
}

/// In-memory registry of bidders keyed by name.
///
/// Cheap to clone and shared across concurrent auctions; adapters hold no
/// per-call state.
#[derive(Clone, Default)]
pub struct BidderCatalog {
    bidders: Arc<BTreeMap<String, RegisteredBidder>>,
}

impl BidderCatalog {
    /// Build a catalog from the provided settings.
    ///
    /// Bidders without configuration, with invalid configuration, or whose
    /// builder declines are left out with a warning.
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        let mut bidders = BTreeMap::new();

        for (name, builder) in bidder_builders() {
            let Some(config) = settings.bidder_config(name) else {
                log::debug!("Bidder '{}' has no configuration, skipping", name);
                continue;
            };
            if let Err(e) = config.validate() {
                log::warn!("Bidder '{}' configuration is invalid: {}", name, e);
                continue;
            }
            match builder(name, config) {
                Some(bidder) => {
                    log::info!("Registering bidder: {}", name);
                    bidders.insert(
                        (*name).to_string(),
                        RegisteredBidder {
                            info: BidderInfo::from_config(name, config),
                            bidder,
                        },
                    );
                }
                None => log::warn!("Bidder '{}' could not be built, skipping", name),
            }
        }

        for name in settings.bidders.keys() {
            if !bidders.contains_key(name) {
                log::warn!("Bidder '{}' is configured but has no adapter", name);
            }
        }

        Self {
            bidders: Arc::new(bidders),
        }
    }

    /// Build a catalog from explicit entries. Mostly useful for embedding and tests.
    #[must_use]
    pub fn from_entries(entries: Vec<(BidderInfo, Arc<dyn Bidder>)>) -> Self {
        let bidders = entries
            .into_iter()
            .map(|(info, bidder)| (info.name.clone(), RegisteredBidder { info, bidder }))
            .collect();
        Self {
            bidders: Arc::new(bidders),
        }
    }

    #[must_use]
    pub fn bidder(&self, name: &str) -> Option<Arc<dyn Bidder>> {
        self.bidders.get(name).map(|entry| Arc::clone(&entry.bidder))
    }

    #[must_use]
    pub fn info(&self, name: &str) -> Option<&BidderInfo> {
        self.bidders.get(name).map(|entry| &entry.info)
    }

    /// True when the bidder is registered and enabled.
    #[must_use]
    pub fn is_active(&self, name: &str) -> bool {
        self.info(name).is_some_and(|info| info.enabled)
    }

    /// Registered bidder names in stable order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bidders.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bidders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bidders.is_empty()
    }
}
