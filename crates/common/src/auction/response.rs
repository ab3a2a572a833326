//! Response assembly: RTB answers become ad units next to the CPM subset.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::adapter::AdapterKey;
use crate::bidding::DemandResponse;
use crate::constants::EMPTY_AUCTION_TOKEN;
use crate::schema::AuctionRequest;
use crate::segment::Segment;

use super::ad_unit::{AdUnit, AdUnitExtra, AdUnitsMap, BidType, DemandExt};
use super::orchestrator::AuctionResult;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentResponse {
    pub id: String,
    pub uid: String,
}

impl From<&Segment> for SegmentResponse {
    fn from(segment: &Segment) -> Self {
        Self {
            id: segment.string_id(),
            uid: segment.uid.clone(),
        }
    }
}

/// Body returned to the SDK.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionResponse {
    #[serde(rename = "auction_configuration_id")]
    pub config_id: i64,
    #[serde(rename = "auction_configuration_uid")]
    pub config_uid: String,
    pub external_win_notifications: bool,
    /// CPM units and cleared bids, highest price first.
    pub ad_units: Vec<AdUnit>,
    pub no_bids: Vec<AdUnit>,
    pub segment: SegmentResponse,
    pub token: String,
    #[serde(rename = "auction_pricefloor")]
    pub price_floor: f64,
    pub auction_timeout: u32,
    pub auction_id: String,
}

/// Ad unit an RTB response belongs to.
///
/// Amazon answers are matched on `slot_uuid`; every other adapter takes the
/// first RTB unit of its bucket.
#[must_use]
pub fn select_ad_unit<'a>(
    response: &DemandResponse,
    ad_units: &'a AdUnitsMap,
) -> Option<&'a AdUnit> {
    let candidates = ad_units.all(response.demand_id, BidType::Rtb);
    if response.demand_id == AdapterKey::Amazon {
        let slot_uuid = response.slot_uuid.as_deref()?;
        candidates
            .iter()
            .find(|unit| unit.extra.slot_uuid.as_deref() == Some(slot_uuid))
    } else {
        candidates.first()
    }
}

/// Creative data the SDK needs to render a bid. Empty for non-bids.
#[must_use]
pub fn demand_ext(response: &DemandResponse) -> Option<DemandExt> {
    let bid = response.bid.as_ref().filter(|_| response.is_bid())?;
    Some(match response.demand_id {
        AdapterKey::Amazon => DemandExt::Amazon,
        AdapterKey::MobileFuse => DemandExt::MobileFuse {
            signaldata: bid.signaldata.clone(),
        },
        AdapterKey::VkAds => DemandExt::VkAds {
            bid_id: bid.id.clone(),
        },
        _ => DemandExt::Payload {
            payload: bid.payload.clone(),
        },
    })
}

const CUSTOM_PARAMETERS: &str = "custom_parameters";

/// Bidmachine renders with the client-side mediator it runs under.
fn mediator_parameters(demand_id: AdapterKey, mediator: Option<&str>) -> Option<Value> {
    let mediator = mediator.filter(|m| !m.is_empty())?;
    (demand_id == AdapterKey::Bidmachine).then(|| json!({ "mediator": mediator }))
}

/// CPM units get the mediator parameters over their stored extra.
fn with_mediator(demand_id: AdapterKey, mut extra: AdUnitExtra, mediator: Option<&str>) -> AdUnitExtra {
    if let Some(parameters) = mediator_parameters(demand_id, mediator) {
        extra.other.insert(CUSTOM_PARAMETERS.to_string(), parameters);
    }
    extra
}

/// RTB response as an ad unit priced at the bid. `None` when no unit matches.
///
/// The unit's stored extra is laid over the bid's creative data and the
/// mediator parameters.
#[must_use]
pub fn convert(
    response: &DemandResponse,
    ad_units: &AdUnitsMap,
    mediator: Option<&str>,
) -> Option<AdUnit> {
    let unit = select_ad_unit(response, ad_units)?;
    let mut base = demand_ext(response)
        .map(DemandExt::into_map)
        .unwrap_or_default();
    if let Some(parameters) = mediator_parameters(response.demand_id, mediator) {
        base.insert(CUSTOM_PARAMETERS.to_string(), parameters);
    }

    Some(AdUnit {
        demand_id: response.demand_id,
        uid: unit.uid.clone(),
        label: unit.label.clone(),
        bid_type: BidType::Rtb,
        price_floor: Some(response.price()),
        timeout: unit.timeout,
        extra: unit.extra.over(base),
    })
}

/// Folds an auction result into the SDK response.
///
/// Bids strictly above the effective floor join the CPM units; every other
/// RTB answer is reported in `no_bids`. Answers without a matching ad unit
/// are left out of the body.
#[must_use]
pub fn build_response(request: &AuctionRequest, result: &AuctionResult) -> AuctionResponse {
    let mediator = request.mediator();
    let mediator = mediator.as_deref();
    let ad_units_map = AdUnitsMap::new(&result.ad_units);

    let mut ad_units: Vec<AdUnit> = result
        .cpm_ad_units
        .iter()
        .cloned()
        .map(|mut unit| {
            unit.extra = with_mediator(unit.demand_id, unit.extra, mediator);
            unit
        })
        .collect();
    let mut no_bids = Vec::new();

    for response in &result.bidding_result.bids {
        let Some(unit) = convert(response, &ad_units_map, mediator) else {
            log::debug!(
                "Ad unit not found for {} response (slot: {:?})",
                response.demand_id,
                response.slot_uuid
            );
            continue;
        };
        if response.is_bid() && response.price() > result.price_floor {
            ad_units.push(unit);
        } else {
            no_bids.push(unit);
        }
    }

    ad_units.sort_by(|a, b| b.effective_price_floor().total_cmp(&a.effective_price_floor()));

    AuctionResponse {
        config_id: result.config.id,
        config_uid: result.config.uid.clone(),
        external_win_notifications: result.config.external_win_notifications,
        ad_units,
        no_bids,
        segment: SegmentResponse::from(&result.segment),
        token: EMPTY_AUCTION_TOKEN.to_string(),
        price_floor: result.price_floor,
        auction_timeout: result.auction_timeout,
        auction_id: request.imp.auction_id.clone(),
    }
}

impl AuctionResponse {
    /// JSON body, for transports that do not serialize themselves.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auction::config::AuctionConfig;
    use crate::auction::orchestrator::Stat;
    use crate::bidding::{BidDemandResponse, BiddingAuctionResult};

    fn unit(demand_id: AdapterKey, uid: &str, bid_type: BidType, floor: Option<f64>) -> AdUnit {
        AdUnit {
            demand_id,
            uid: uid.to_string(),
            label: format!("{demand_id}-{uid}"),
            bid_type,
            price_floor: floor,
            timeout: Some(6_000),
            extra: AdUnitExtra::default(),
        }
    }

    fn bid(demand_id: AdapterKey, price: f64) -> DemandResponse {
        DemandResponse::bid(
            demand_id,
            BidDemandResponse {
                id: "bid-id".to_string(),
                price,
                payload: "payload".to_string(),
                signaldata: "signal".to_string(),
                ..Default::default()
            },
        )
    }

    fn result(ad_units: Vec<AdUnit>, bids: Vec<DemandResponse>, floor: f64) -> AuctionResult {
        AuctionResult {
            segment: Segment::zero(),
            config: AuctionConfig {
                id: 10,
                uid: "100".to_string(),
                ad_unit_ids: vec![1],
                ..Default::default()
            },
            cpm_ad_units: ad_units.iter().filter(|u| u.is_cpm()).cloned().collect(),
            ad_units,
            bidding_result: BiddingAuctionResult {
                bids,
                round_number: 0,
            },
            price_floor: floor,
            auction_timeout: 30_000,
            stat: Stat::default(),
        }
    }

    fn request() -> AuctionRequest {
        let mut request = AuctionRequest::default();
        request.imp.auction_id = "auction-1".to_string();
        request
    }

    #[test]
    fn rtb_bid_sorts_ahead_of_cpm_units() {
        let result = result(
            vec![
                unit(AdapterKey::Gam, "1", BidType::Cpm, Some(0.1)),
                unit(AdapterKey::DtExchange, "2", BidType::Cpm, Some(0.01)),
                unit(AdapterKey::Bidmachine, "3", BidType::Rtb, None),
            ],
            vec![bid(AdapterKey::Bidmachine, 0.5)],
            0.01,
        );

        let response = build_response(&request(), &result);
        let order: Vec<(AdapterKey, f64)> = response
            .ad_units
            .iter()
            .map(|u| (u.demand_id, u.effective_price_floor()))
            .collect();
        assert_eq!(
            order,
            vec![
                (AdapterKey::Bidmachine, 0.5),
                (AdapterKey::Gam, 0.1),
                (AdapterKey::DtExchange, 0.01),
            ]
        );
        assert!(response.no_bids.is_empty());
        assert_eq!(response.ad_units[0].bid_type, BidType::Rtb);
        assert_eq!(response.ad_units[0].extra.payload.as_deref(), Some("payload"));
        assert_eq!(response.token, "{}");
        assert_eq!(response.auction_id, "auction-1");
        assert_eq!(response.auction_timeout, 30_000);
    }

    #[test]
    fn bids_at_floor_and_failures_go_to_no_bids() {
        let result = result(
            vec![
                unit(AdapterKey::Bidmachine, "1", BidType::Rtb, None),
                unit(AdapterKey::Mintegral, "2", BidType::Rtb, None),
                unit(AdapterKey::Meta, "3", BidType::Rtb, None),
            ],
            vec![
                bid(AdapterKey::Bidmachine, 0.2),
                DemandResponse::timeout(AdapterKey::Mintegral),
                DemandResponse::error(AdapterKey::Meta, "boom"),
                bid(AdapterKey::Moloco, 5.0),
            ],
            0.2,
        );

        let response = build_response(&request(), &result);
        assert!(response.ad_units.is_empty());
        let no_bids: Vec<AdapterKey> = response.no_bids.iter().map(|u| u.demand_id).collect();
        assert_eq!(
            no_bids,
            vec![AdapterKey::Bidmachine, AdapterKey::Mintegral, AdapterKey::Meta]
        );
        assert_eq!(response.no_bids[1].price_floor, Some(0.0));
        assert_eq!(response.no_bids[1].extra.payload, None);
    }

    #[test]
    fn amazon_matches_on_slot_uuid() {
        let mut slot_a = unit(AdapterKey::Amazon, "1", BidType::Rtb, None);
        slot_a.extra.slot_uuid = Some("slot-a".to_string());
        let mut slot_b = unit(AdapterKey::Amazon, "2", BidType::Rtb, None);
        slot_b.extra.slot_uuid = Some("slot-b".to_string());
        let bare = unit(AdapterKey::Amazon, "3", BidType::Rtb, None);
        let map = AdUnitsMap::new(&[slot_a, slot_b, bare]);

        let answer = bid(AdapterKey::Amazon, 1.0).with_slot_uuid("slot-b");
        let selected = select_ad_unit(&answer, &map).expect("should select unit");
        assert_eq!(selected.uid, "2");

        let converted = convert(&answer, &map, None).expect("should convert");
        assert_eq!(converted.extra.payload, None);
        assert_eq!(converted.extra.slot_uuid.as_deref(), Some("slot-b"));

        assert!(select_ad_unit(&bid(AdapterKey::Amazon, 1.0), &map).is_none());
        assert!(select_ad_unit(&bid(AdapterKey::Amazon, 1.0).with_slot_uuid("x"), &map).is_none());
    }

    #[test]
    fn demand_ext_per_adapter_and_unit_extra_wins() {
        assert_eq!(
            demand_ext(&bid(AdapterKey::MobileFuse, 1.0)),
            Some(DemandExt::MobileFuse {
                signaldata: "signal".to_string()
            })
        );
        assert_eq!(
            demand_ext(&bid(AdapterKey::VkAds, 1.0)),
            Some(DemandExt::VkAds {
                bid_id: "bid-id".to_string()
            })
        );
        assert_eq!(demand_ext(&DemandResponse::no_bid(AdapterKey::Meta)), None);

        let mut meta = unit(AdapterKey::Meta, "1", BidType::Rtb, None);
        meta.extra.payload = Some("unit-payload".to_string());
        meta.extra.placement_id = Some("p-1".to_string());
        let map = AdUnitsMap::new(&[meta]);

        let converted = convert(&bid(AdapterKey::Meta, 1.0), &map, None).expect("should convert");
        assert_eq!(converted.extra.payload.as_deref(), Some("unit-payload"));
        assert_eq!(converted.extra.placement_id.as_deref(), Some("p-1"));
        assert_eq!(converted.price_floor, Some(1.0));
        assert_eq!(converted.timeout, Some(6_000));
    }

    #[test]
    fn bidmachine_carries_mediator() {
        let map = AdUnitsMap::new(&[unit(AdapterKey::Bidmachine, "1", BidType::Rtb, None)]);
        let converted =
            convert(&bid(AdapterKey::Bidmachine, 1.0), &map, Some("max")).expect("should convert");
        assert_eq!(
            converted.extra.other["custom_parameters"],
            json!({"mediator": "max"})
        );

        let map = AdUnitsMap::new(&[unit(AdapterKey::Meta, "1", BidType::Rtb, None)]);
        let converted =
            convert(&bid(AdapterKey::Meta, 1.0), &map, Some("max")).expect("should convert");
        assert!(!converted.extra.other.contains_key("custom_parameters"));
    }

    #[test]
    fn rtb_unit_extra_wins_over_mediator() {
        let mut bidmachine = unit(AdapterKey::Bidmachine, "1", BidType::Rtb, None);
        bidmachine
            .extra
            .other
            .insert("custom_parameters".to_string(), json!({"unit": "keep"}));
        let map = AdUnitsMap::new(&[bidmachine.clone()]);

        let converted =
            convert(&bid(AdapterKey::Bidmachine, 1.0), &map, Some("max")).expect("should convert");
        assert_eq!(
            converted.extra.other["custom_parameters"],
            json!({"unit": "keep"})
        );
        assert_eq!(converted.extra.payload.as_deref(), Some("payload"));

        // CPM units take the mediator over their own value.
        bidmachine.bid_type = BidType::Cpm;
        bidmachine.price_floor = Some(0.5);
        let result = result(vec![bidmachine], Vec::new(), 0.1);
        let mut request = request();
        request.ext = r#"{"mediator":"max"}"#.to_string();

        let response = build_response(&request, &result);
        assert_eq!(
            response.ad_units[0].extra.other["custom_parameters"],
            json!({"mediator": "max"})
        );
    }

    #[test]
    fn response_uses_wire_names() {
        let mut result = result(Vec::new(), Vec::new(), 0.3);
        result.segment.id = 4;
        result.segment.uid = "seg".to_string();
        let response = build_response(&request(), &result);

        let value = response.to_value();
        assert_eq!(value["auction_configuration_id"], 10);
        assert_eq!(value["auction_configuration_uid"], "100");
        assert_eq!(value["auction_pricefloor"], 0.3);
        assert_eq!(value["segment"], json!({"id": "4", "uid": "seg"}));
        assert_eq!(value["no_bids"], json!([]));
    }
}
