//! Post-hoc checks applied to every bid an adapter returns.

use crate::bidder::{BidderBid, BidderError, BidderResult};
use crate::openrtb::BidRequest;

use super::config::AuctionConfig;

/// Split `bids` into the ones that may join the auction and errors for the rest.
///
/// A bid must name itself and its impression and carry a finite positive
/// price. When floors are enforced, a bid priced under its impression's floor
/// in the same currency is rejected; floors in another currency are not
/// converted and do not apply.
#[must_use]
pub fn validate_bids(
    bids: Vec<BidderBid>,
    request: &BidRequest,
    config: &AuctionConfig,
) -> BidderResult<BidderBid> {
    let starting_count = bids.len();
    let mut result = BidderResult::empty();

    for bid in bids {
        match validate_bid(&bid, request, config) {
            Ok(()) => result.values.push(bid),
            Err(error) => result.push_error(error),
        }
    }

    if result.values.len() != starting_count {
        log::info!(
            "Filtered bids by validation: {} -> {}",
            starting_count,
            result.values.len()
        );
    }
    result
}

fn validate_bid(
    bidder_bid: &BidderBid,
    request: &BidRequest,
    config: &AuctionConfig,
) -> Result<(), BidderError> {
    let bid = &bidder_bid.bid;

    if bid.id.is_empty() {
        return Err(
            BidderError::invalid_bid("Bid missing required field 'id'").with_imp_ids(
                Some(bid.impid.clone()).filter(|impid| !impid.is_empty()),
            ),
        );
    }
    if bid.impid.is_empty() {
        return Err(BidderError::invalid_bid(format!(
            "Bid \"{}\" missing required field 'impid'",
            bid.id
        )));
    }
    if !bid.price.is_finite() || bid.price <= 0.0 {
        return Err(BidderError::invalid_bid(format!(
            "Bid \"{}\" does not contain a positive 'price'",
            bid.id
        ))
        .with_imp_id(&bid.impid));
    }

    if config.enforce_floors {
        check_floor(bidder_bid, request, config)?;
    }
    Ok(())
}

fn check_floor(
    bidder_bid: &BidderBid,
    request: &BidRequest,
    config: &AuctionConfig,
) -> Result<(), BidderError> {
    let bid = &bidder_bid.bid;
    let Some(imp) = request.imp_by_id(&bid.impid) else {
        return Ok(());
    };
    let Some(floor) = imp.bidfloor.filter(|floor| *floor > 0.0) else {
        return Ok(());
    };

    let floor_currency = imp
        .bidfloorcur
        .as_deref()
        .unwrap_or(&config.default_currency);
    if !floor_currency.eq_ignore_ascii_case(&bidder_bid.bid_currency) {
        log::debug!(
            "Skipping floor for bid '{}': floor in {} but bid in {}",
            bid.id,
            floor_currency,
            bidder_bid.bid_currency
        );
        return Ok(());
    }

    if bid.price < floor {
        log::info!(
            "Dropping bid '{}' below floor price for imp '{}'",
            bid.id,
            bid.impid
        );
        return Err(BidderError::rejected_ipf(
            format!(
                "Bid with id '{}' was rejected by floor enforcement: price {} is below the floor {}",
                bid.id, bid.price, floor
            ),
            &bid.impid,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bidder::{BidderErrorKind, MediaType};
    use crate::openrtb::{Bid, Imp};

    fn bid(id: &str, impid: &str, price: f64) -> BidderBid {
        BidderBid::new(
            Bid {
                id: id.into(),
                impid: impid.into(),
                price,
                ..Bid::default()
            },
            MediaType::Banner,
            "USD",
        )
    }

    fn request_with_floor(floor: Option<f64>, currency: Option<&str>) -> BidRequest {
        BidRequest {
            id: "req".into(),
            imp: vec![Imp {
                id: "imp-1".into(),
                bidfloor: floor,
                bidfloorcur: currency.map(str::to_string),
                ..Imp::default()
            }],
            ..BidRequest::default()
        }
    }

    #[test]
    fn rejects_incomplete_or_unpriced_bids() {
        let request = request_with_floor(None, None);
        let bids = vec![
            bid("", "imp-1", 1.0),
            bid("b2", "", 1.0),
            bid("b3", "imp-1", 0.0),
            bid("b4", "imp-1", f64::NAN),
            bid("b5", "imp-1", -2.0),
            bid("ok", "imp-1", 1.0),
        ];

        let result = validate_bids(bids, &request, &AuctionConfig::default());

        assert_eq!(result.values.len(), 1);
        assert_eq!(result.values[0].bid.id, "ok");
        assert_eq!(result.errors.len(), 5);
        assert!(result
            .errors
            .iter()
            .all(|error| error.kind == BidderErrorKind::InvalidBid));
        assert!(result.errors[0].imp_ids.contains("imp-1"));
        assert_eq!(
            result.errors[1].message,
            "Bid \"b2\" missing required field 'impid'"
        );
    }

    #[test]
    fn bids_on_unknown_impressions_pass() {
        let request = request_with_floor(Some(5.0), None);
        let result = validate_bids(
            vec![bid("b1", "unknown", 1.0)],
            &request,
            &AuctionConfig::default(),
        );
        assert_eq!(result.values.len(), 1);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn floor_rejection_carries_the_impression() {
        let request = request_with_floor(Some(2.0), None);
        let result = validate_bids(
            vec![bid("low", "imp-1", 1.5), bid("high", "imp-1", 2.0)],
            &request,
            &AuctionConfig::default(),
        );

        assert_eq!(result.values.len(), 1);
        assert_eq!(result.values[0].bid.id, "high");
        let error = &result.errors[0];
        assert_eq!(error.kind, BidderErrorKind::RejectedIpf);
        assert_eq!(
            error.imp_ids.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["imp-1"]
        );
    }

    #[test]
    fn floors_only_apply_when_enforced_and_in_the_same_currency() {
        let config = AuctionConfig {
            enforce_floors: false,
            ..AuctionConfig::default()
        };
        let request = request_with_floor(Some(2.0), None);
        let result = validate_bids(vec![bid("low", "imp-1", 1.0)], &request, &config);
        assert!(result.errors.is_empty());

        let request = request_with_floor(Some(2.0), Some("EUR"));
        let result = validate_bids(
            vec![bid("low", "imp-1", 1.0)],
            &request,
            &AuctionConfig::default(),
        );
        assert!(result.errors.is_empty());
    }

    #[test]
    fn decoded_bid_missing_fields_fails_alone() {
        let response: crate::openrtb::BidResponse = serde_json::from_str(
            r#"{"id":"r","seatbid":[{"bid":[
                {"impid":"imp-1","price":1.0},
                {"id":"no-price","impid":"imp-1"},
                {"id":"ok","impid":"imp-1","price":1.0}
            ]}]}"#,
        )
        .expect("lenient decode");
        let bids = response
            .seatbid
            .into_iter()
            .flat_map(|seatbid| seatbid.bid)
            .map(|bid| BidderBid::new(bid, MediaType::Banner, "USD"))
            .collect();

        let result = validate_bids(bids, &request_with_floor(None, None), &AuctionConfig::default());

        assert_eq!(result.values.len(), 1);
        assert_eq!(result.values[0].bid.id, "ok");
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors[0].message, "Bid missing required field 'id'");
        assert_eq!(
            result.errors[1].message,
            "Bid \"no-price\" does not contain a positive 'price'"
        );
    }
}
