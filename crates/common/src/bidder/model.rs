//! Wire-level contract between the framework and bidder adapters.

use std::collections::BTreeSet;

use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use serde::{Deserialize, Serialize};

use crate::openrtb::{Bid, BidRequest};

/// One outbound call an adapter wants the framework to make.
///
/// `payload` is the correlation data for the call: the framework never looks
/// inside it and hands it back untouched in [`BidderCall`], so `make_bids` can
/// recover its context without a side table.
#[derive(Debug, Clone, PartialEq)]
pub struct BidderRequest {
    pub method: Method,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub payload: BidRequest,
    /// Impressions covered by this call; used to scope synthesized errors.
    pub imp_ids: BTreeSet<String>,
}

impl BidderRequest {
    /// Build a JSON POST carrying `payload` as its body.
    ///
    /// # Errors
    ///
    /// Returns the serializer error when `payload` cannot be encoded.
    pub fn post_json(uri: impl Into<String>, payload: BidRequest) -> serde_json::Result<Self> {
        let body = serde_json::to_vec(&payload)?;
        let imp_ids = payload.imp.iter().map(|imp| imp.id.clone()).collect();
        Ok(Self {
            method: Method::POST,
            uri: uri.into(),
            headers: json_headers(),
            body: Bytes::from(body),
            payload,
            imp_ids,
        })
    }
}

/// Default headers for an `OpenRTB` JSON call.
#[must_use]
pub fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        http::header::CONTENT_TYPE,
        HeaderValue::from_static("application/json;charset=utf-8"),
    );
    headers.insert(http::header::ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert("x-openrtb-version", HeaderValue::from_static("2.5"));
    headers
}

/// Raw transport response from a bidder endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    #[must_use]
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK, body)
    }
}

/// A completed call: the original request paired with what came back.
#[derive(Debug, Clone, PartialEq)]
pub struct BidderCall {
    pub request: BidderRequest,
    pub response: HttpResponse,
}

/// Media type a bid was made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Banner,
    Video,
    Native,
    Audio,
}

/// A bid extracted by an adapter, before it is tagged with its bidder.
#[derive(Debug, Clone, PartialEq)]
pub struct BidderBid {
    pub bid: Bid,
    pub bid_type: MediaType,
    pub bid_currency: String,
    /// Seat reported by the partner, when different from the bidder itself.
    pub seat: Option<String>,
}

impl BidderBid {
    pub fn new(bid: Bid, bid_type: MediaType, bid_currency: impl Into<String>) -> Self {
        Self {
            bid,
            bid_type,
            bid_currency: bid_currency.into(),
            seat: None,
        }
    }

    #[must_use]
    pub fn with_seat(mut self, seat: impl Into<String>) -> Self {
        self.seat = Some(seat.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openrtb::Imp;

    #[test]
    fn post_json_records_covered_impressions() {
        let payload = BidRequest {
            id: "req".into(),
            imp: vec![
                Imp {
                    id: "1".into(),
                    ..Imp::default()
                },
                Imp {
                    id: "2".into(),
                    ..Imp::default()
                },
            ],
            ..BidRequest::default()
        };

        let request = BidderRequest::post_json("https://bidder.example/rtb", payload.clone())
            .expect("should encode payload");

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.payload, payload);
        assert_eq!(
            request.imp_ids.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["1", "2"]
        );
        let decoded: BidRequest =
            serde_json::from_slice(&request.body).expect("body should be the payload");
        assert_eq!(decoded, payload);
        assert_eq!(
            request.headers.get(http::header::CONTENT_TYPE),
            Some(&HeaderValue::from_static("application/json;charset=utf-8"))
        );
    }
}
