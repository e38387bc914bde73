//! Core of the bidstream real-time auction server.
//!
//! This crate holds everything between a parsed auction request and the
//! response body: bidder adapters, the scatter-gather orchestrator, the staged
//! hook pipeline and the consent signal readers. Transport, request parsing
//! and account resolution belong to the embedding platform.
//!
//! # Modules
//!
//! - [`auction`]: Orchestrator, deadlines, bid validation and the pipeline driver
//! - [`bidder`]: Bidder adapter contract, registry and adapters
//! - [`error`]: Terminal error types and their HTTP mapping
//! - [`hooks`]: Hook stages, execution plans and traces
//! - [`http_client`]: Transport seam used to reach bidder endpoints
//! - [`logging`]: Logger setup
//! - [`openrtb`]: `OpenRTB` request and response model
//! - [`privacy`]: GPP section decoding into canonical consent signals
//! - [`settings`]: Configuration management and validation
//! - [`test_support`]: Testing utilities and mocks

pub mod auction;
pub mod bidder;
pub mod error;
pub mod hooks;
pub mod http_client;
pub mod logging;
pub mod openrtb;
pub mod privacy;
pub mod settings;
