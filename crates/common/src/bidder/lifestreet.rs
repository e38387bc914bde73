//! Lifestreet bidder adapter.
//!
//! Sends one `OpenRTB` request per impression. Each impression must carry a
//! `slot_tag` of the form `<publisher>.<slot>` in `imp.ext.bidder`; banner
//! impressions are flattened to the size of their first format. At most one
//! bid is taken from each response.

use std::sync::Arc;

use serde::Deserialize;

use crate::openrtb::{BidRequest, BidResponse, Imp};

use super::{
    Bidder, BidderBid, BidderCall, BidderConfig, BidderError, BidderRequest, BidderResult,
    MediaType,
};

pub const BIDDER_NAME: &str = "lifestreet";

const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Deserialize)]
struct ExtPrebid<T> {
    bidder: T,
}

#[derive(Debug, Default, Deserialize)]
struct ExtImpLifestreet {
    #[serde(default)]
    slot_tag: Option<String>,
}

pub struct LifestreetBidder {
    endpoint_url: String,
}

impl LifestreetBidder {
    /// Create the adapter for `endpoint_url`.
    ///
    /// # Errors
    ///
    /// Returns the parse error when `endpoint_url` is not an absolute URL.
    pub fn new(endpoint_url: &str) -> Result<Self, url::ParseError> {
        let url = url::Url::parse(endpoint_url)?;
        Ok(Self {
            endpoint_url: url.to_string(),
        })
    }

    fn create_request(
        &self,
        imp: &Imp,
        request: &BidRequest,
    ) -> Result<BidderRequest, BidderError> {
        validate_imp(imp)?;
        let slot_tag = parse_slot_tag(imp)?;

        let mut outgoing_imp = imp.clone();
        outgoing_imp.tagid = Some(slot_tag);
        if let Some(banner) = outgoing_imp.banner.as_mut() {
            let formats = std::mem::take(&mut banner.format);
            if let Some(first) = formats.first() {
                banner.w = Some(first.w);
                banner.h = Some(first.h);
            }
        }

        let outgoing = BidRequest {
            imp: vec![outgoing_imp],
            ..request.clone()
        };

        BidderRequest::post_json(self.endpoint_url.clone(), outgoing).map_err(|e| {
            BidderError::bad_input(format!("Failed to encode request body: {e}")).with_imp_id(&imp.id)
        })
    }
}

fn validate_imp(imp: &Imp) -> Result<(), BidderError> {
    if imp.banner.is_none() && imp.video.is_none() {
        return Err(BidderError::bad_input(format!(
            "Invalid MediaType. Lifestreet supports only Banner and Video. Ignoring ImpID={}",
            imp.id
        ))
        .with_imp_id(&imp.id));
    }
    Ok(())
}

fn parse_slot_tag(imp: &Imp) -> Result<String, BidderError> {
    let ext = imp.ext.clone().unwrap_or_default();
    let ext: ExtPrebid<ExtImpLifestreet> = serde_json::from_value(ext)
        .map_err(|e| BidderError::bad_input(e.to_string()).with_imp_id(&imp.id))?;

    let slot_tag = ext.bidder.slot_tag.unwrap_or_default();
    if slot_tag.is_empty() {
        return Err(BidderError::bad_input("Missing slot_tag param").with_imp_id(&imp.id));
    }
    if slot_tag_parts(&slot_tag) != 2 {
        return Err(
            BidderError::bad_input(format!("Invalid slot_tag param '{slot_tag}'"))
                .with_imp_id(&imp.id),
        );
    }
    Ok(slot_tag)
}

/// Number of `.`-separated parts, ignoring trailing empty parts.
fn slot_tag_parts(slot_tag: &str) -> usize {
    let parts: Vec<&str> = slot_tag.split('.').collect();
    parts.len() - parts.iter().rev().take_while(|part| part.is_empty()).count()
}

/// Video when the bid's impression asks for video, banner otherwise.
///
/// Banner is also the answer for bids naming an impression that is not in the
/// request; the response is ambiguous there and banner is this adapter's default.
fn bid_type(imp_id: &str, imps: &[Imp]) -> MediaType {
    let is_video = imps
        .iter()
        .any(|imp| imp.id == imp_id && imp.video.is_some());
    if is_video {
        MediaType::Video
    } else {
        MediaType::Banner
    }
}

impl Bidder for LifestreetBidder {
    fn make_http_requests(&self, request: &BidRequest) -> BidderResult<BidderRequest> {
        let mut result = BidderResult::empty();
        for imp in &request.imp {
            match self.create_request(imp, request) {
                Ok(http_request) => result.values.push(http_request),
                Err(error) => result.push_error(error),
            }
        }
        result
    }

    fn make_bids(&self, call: &BidderCall, _request: &BidRequest) -> BidderResult<BidderBid> {
        let response: BidResponse = match serde_json::from_slice(&call.response.body) {
            Ok(response) => response,
            Err(e) => {
                return BidderResult::with_error(
                    BidderError::bad_server_response(format!(
                        "Failed to decode: {e}"
                    ))
                    .with_imp_ids(call.request.imp_ids.iter().cloned()),
                )
            }
        };

        let currency = response
            .cur
            .clone()
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
        let imps = &call.request.payload.imp;

        let bids = response
            .seatbid
            .into_iter()
            .flat_map(|seatbid| seatbid.bid)
            // one bid per request/response
            .take(1)
            .map(|bid| {
                let bid_type = bid_type(&bid.impid, imps);
                BidderBid::new(bid, bid_type, currency.clone())
            })
            .collect();

        BidderResult::with_values(bids)
    }
}

/// Build the adapter from host configuration.
#[must_use]
pub fn build(name: &str, config: &BidderConfig) -> Option<Arc<dyn Bidder>> {
    match LifestreetBidder::new(&config.endpoint) {
        Ok(bidder) => Some(Arc::new(bidder)),
        Err(e) => {
            log::warn!("Bidder '{}' disabled: invalid endpoint: {}", name, e);
            None
        }
    }
}
