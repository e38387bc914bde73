//! Terminal error types for the auction server.
//!
//! Per-bidder and per-impression failures never use these types: they are
//! recorded as [`crate::bidder::BidderError`] values and travel inside a
//! [`crate::bidder::BidderResult`]. The variants here describe the few faults
//! that leave no usable partial result and must be surfaced to the caller.

use derive_more::{Display, Error};
use error_stack::Report;
use http::StatusCode;

/// Orchestration-level failures surfaced to the external caller.
#[derive(Debug, Display, Error)]
pub enum AuctionServerError {
    /// The incoming request could not be turned into an auction.
    #[display("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// The account is unknown or not allowed to run auctions.
    #[display("Unauthorized account: {message}")]
    UnauthorizedAccount { message: String },

    /// The account has been blocklisted by the host.
    #[display("Blocklisted account: {message}")]
    BlocklistedAccount { message: String },

    /// The app has been blocklisted by the host.
    #[display("Blocklisted app: {message}")]
    BlocklistedApp { message: String },

    /// Account level configuration is unusable.
    #[display("Invalid account configuration: {message}")]
    InvalidAccountConfig { message: String },

    /// Host configuration could not be loaded or validated.
    #[display("Configuration error: {message}")]
    Configuration { message: String },

    /// The auction itself could not run.
    #[display("Auction error: {message}")]
    Auction { message: String },
}

/// Maps an error onto the externally visible outcome of a request.
pub trait IntoHttpResponse {
    /// HTTP status the caller should receive.
    fn status_code(&self) -> StatusCode;

    /// Message body the caller should receive, prefixed by outcome class.
    fn user_message(&self) -> String;
}

impl IntoHttpResponse for AuctionServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest { .. } | Self::InvalidAccountConfig { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::UnauthorizedAccount { .. } => StatusCode::UNAUTHORIZED,
            Self::BlocklistedAccount { .. } | Self::BlocklistedApp { .. } => StatusCode::FORBIDDEN,
            Self::Configuration { .. } | Self::Auction { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::InvalidRequest { message } => format!("Invalid request format: {message}"),
            Self::UnauthorizedAccount { message } => message.clone(),
            Self::BlocklistedAccount { message } | Self::BlocklistedApp { message } => {
                format!("Blocklisted: {message}")
            }
            Self::InvalidAccountConfig { message } => {
                format!("Invalid account configuration: {message}")
            }
            Self::Configuration { message } | Self::Auction { message } => {
                format!("Critical error while running the auction: {message}")
            }
        }
    }
}

/// Status and body a router sends back for a terminal failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ErrorResponse {
    /// Build the response for the current context of `report`.
    #[must_use]
    pub fn from_report(report: &Report<AuctionServerError>) -> Self {
        let error = report.current_context();
        if error.status_code().is_server_error() {
            log::error!("Critical error while running the auction: {report:?}");
        } else {
            log::info!("{}", error.user_message());
        }

        Self {
            status: error.status_code(),
            body: error.user_message(),
        }
    }
}
