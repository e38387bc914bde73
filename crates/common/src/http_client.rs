//! Transport seam used by the orchestrator to reach bidder endpoints.
//!
//! The concrete client (connection pooling, TLS, proxies) belongs to the
//! embedding platform. The orchestrator only needs a way to send one
//! [`BidderRequest`] and learn how it ended.

use std::time::Duration;

use async_trait::async_trait;
use derive_more::{Display, Error};

use crate::bidder::{BidderRequest, HttpResponse};

/// Transport-level failure: the request never produced an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum TransportError {
    /// The client gave up before a response arrived.
    #[display("request timed out")]
    Timeout,
    /// Connection, DNS or TLS failure.
    #[display("connection failed: {message}")]
    Connection { message: String },
}

/// Asynchronous HTTP client shared by every auction.
///
/// Implementations must be cheap to call concurrently; the orchestrator keeps
/// one client behind an `Arc` for the life of the process.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Send `request`, giving up after `timeout`.
    ///
    /// The orchestrator enforces its own absolute deadline on top of this, so
    /// `timeout` is an upper bound hint for the client's socket settings.
    async fn send(
        &self,
        request: &BidderRequest,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError>;
}
