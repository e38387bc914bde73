use std::collections::BTreeMap;

use config::{Config, Environment, File, FileFormat};
use error_stack::{Report, ResultExt};
use serde::Deserialize;
use validator::Validate;

use crate::auction::AuctionConfig;
use crate::bidder::BidderConfig;
use crate::error::AuctionServerError;
use crate::hooks::HooksConfig;

/// Environment variable prefix for overrides, e.g. `BIDSTREAM__AUCTION__TIMEOUT_MS`.
pub const ENVIRONMENT_PREFIX: &str = "BIDSTREAM";

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Settings {
    #[serde(default)]
    #[validate(nested)]
    pub auction: AuctionConfig,
    /// Per-bidder host configuration keyed by bidder name.
    #[serde(default)]
    pub bidders: BTreeMap<String, BidderConfig>,
    #[serde(default)]
    pub hooks: HooksConfig,
}

impl Settings {
    /// Load the settings embedded at build time, with environment overrides.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the embedded TOML or the overrides are invalid.
    pub fn new() -> Result<Self, Report<AuctionServerError>> {
        let toml_str = include_str!("../../../bidstream.toml");
        Self::from_toml(toml_str)
    }

    /// Parse and validate settings from a TOML string, layering environment overrides on top.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the TOML cannot be parsed, required
    /// fields are missing, or validation fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, Report<AuctionServerError>> {
        let environment = Environment::default()
            .prefix(ENVIRONMENT_PREFIX)
            .separator("__");

        let toml = File::from_str(toml_str, FileFormat::Toml);
        let config = Config::builder()
            .add_source(toml)
            .add_source(environment)
            .build()
            .change_context(AuctionServerError::Configuration {
                message: "Failed to build configuration".to_string(),
            })?;

        let settings: Self =
            config
                .try_deserialize()
                .change_context(AuctionServerError::Configuration {
                    message: "Failed to deserialize configuration".to_string(),
                })?;

        settings
            .validate()
            .change_context(AuctionServerError::Configuration {
                message: "Settings validation failed".to_string(),
            })?;

        Ok(settings)
    }

    /// Host configuration for one bidder, if present.
    #[must_use]
    pub fn bidder_config(&self, name: &str) -> Option<&BidderConfig> {
        self.bidders.get(name)
    }
}
