//! Minimal subset of OpenRTB 2.x shared by every bidder.
//!
//! [`BidRequest::base`] builds the per-auction request each adapter then
//! specialises with its own impression and extension data.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::ad::DeviceType;
use crate::geo::GeoData;
use crate::schema::AuctionRequest;

/// Added to the floor so a bid at exactly the floor never clears it.
pub const MIN_BID_FLOOR_INCREMENT: f64 = 0.000_001;

/// First-price auction.
const AUCTION_TYPE_FIRST_PRICE: u8 = 1;

/// `adcom1` location type: IP-derived.
const LOCATION_TYPE_IP: u8 = 2;

/// Placeholder seller id; adapters overwrite it from their own config.
const DEFAULT_PUBLISHER_ID: &str = "SELLER_ID";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BidRequest {
    /// Unique ID of the bid request.
    pub id: String,
    pub imp: Vec<Imp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<App>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<Device>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regs: Option<Regs>,
    pub at: u8,
    pub tmax: i64,
    pub test: u8,
    #[serde(default, flatten)]
    pub extra: HashMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Imp {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub bidfloor: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tagid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instl: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,
    #[serde(default, flatten)]
    pub extra: HashMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Publisher {
    pub id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct App {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bundle: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ver: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<Publisher>,
    #[serde(default, flatten)]
    pub extra: HashMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Device {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ua: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub make: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub model: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub os: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub osv: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hwv: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub language: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ifa: String,
    pub w: i64,
    pub h: i64,
    pub ppi: i64,
    pub pxratio: f64,
    pub js: u8,
    pub devicetype: u8,
    pub connectiontype: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo: Option<Geo>,
    #[serde(default, flatten)]
    pub extra: HashMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Geo {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub geo_type: Option<u8>,
    pub lat: f64,
    pub lon: f64,
    pub accuracy: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, flatten)]
    pub extra: HashMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, flatten)]
    pub extra: HashMap<String, Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Regs {
    pub coppa: u8,
    pub gdpr: u8,
}

impl BidRequest {
    /// Per-auction request shared by all bidders.
    #[must_use]
    pub fn base(
        request: &AuctionRequest,
        geo: &GeoData,
        app_id: i64,
        price_floor: f64,
        tmax_ms: i64,
    ) -> Self {
        let regs = request.regulations();
        Self {
            id: Uuid::new_v4().to_string(),
            imp: vec![Imp {
                bidfloor: price_floor + MIN_BID_FLOOR_INCREMENT,
                ..Default::default()
            }],
            app: Some(App {
                id: app_id.to_string(),
                bundle: request.app.bundle.clone(),
                ver: request.app.version.clone(),
                publisher: Some(Publisher {
                    id: DEFAULT_PUBLISHER_ID.to_string(),
                }),
                extra: HashMap::new(),
            }),
            device: Some(build_device(request, geo)),
            user: None,
            regs: Some(Regs {
                coppa: u8::from(regs.coppa),
                gdpr: u8::from(regs.gdpr),
            }),
            at: AUCTION_TYPE_FIRST_PRICE,
            tmax: tmax_ms,
            test: u8::from(request.test),
            extra: HashMap::new(),
        }
    }
}

fn build_device(request: &AuctionRequest, geo: &GeoData) -> Device {
    let device = &request.device;
    let non_empty = |value: &str| (!value.is_empty()).then(|| value.to_string());
    Device {
        ua: device.ua.clone(),
        ip: geo.ip.clone(),
        make: device.make.clone(),
        model: device.model.clone(),
        os: device.os.clone(),
        osv: device.osv.clone(),
        hwv: device.hwv.clone(),
        language: device.language.clone(),
        ifa: request.user.idfa.clone(),
        w: device.w,
        h: device.h,
        ppi: device.ppi,
        pxratio: device.pxratio,
        js: device.js.map_or(0, |js| u8::from(js != 0)),
        devicetype: adcom_device_type(device.device_type),
        connectiontype: adcom_connection_type(&device.connection_type),
        geo: Some(Geo {
            geo_type: Some(LOCATION_TYPE_IP),
            lat: geo.lat,
            lon: geo.lon,
            accuracy: geo.accuracy,
            country: non_empty(&geo.country_code3),
            city: non_empty(&geo.city_name),
            zip: non_empty(&geo.zip_code),
            region: non_empty(&geo.region_code),
            extra: HashMap::new(),
        }),
        extra: HashMap::new(),
    }
}

/// `adcom1` device type code.
fn adcom_device_type(device_type: DeviceType) -> u8 {
    match device_type {
        DeviceType::Phone => 4,
        DeviceType::Tablet => 5,
        DeviceType::Unknown => 1,
    }
}

/// `adcom1` connection type code.
fn adcom_connection_type(connection_type: &str) -> u8 {
    match connection_type {
        "ETHERNET" => 1,
        "WIFI" => 2,
        "CELLULAR" | "CELLULAR_UNKNOWN" => 3,
        "CELLULAR_2_G" => 4,
        "CELLULAR_3_G" => 5,
        "CELLULAR_4_G" => 6,
        "CELLULAR_5_G" => 7,
        _ => 0,
    }
}

/// Minimal subset of OpenRTB 2.x bid response.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BidResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub seatbid: Vec<SeatBid>,
    #[serde(default, flatten)]
    pub extra: HashMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SeatBid {
    #[serde(default)]
    pub bid: Vec<Bid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat: Option<String>,
    #[serde(default, flatten)]
    pub extra: HashMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Bid {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub impid: String,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nurl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub burl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lurl: Option<String>,
    #[serde(default, flatten)]
    pub extra: HashMap<String, Value>,
}

impl BidResponse {
    /// Highest priced bid across all seats, with its seat.
    #[must_use]
    pub fn best_bid(&self) -> Option<(&Bid, Option<&str>)> {
        self.seatbid
            .iter()
            .flat_map(|seat| seat.bid.iter().map(move |bid| (bid, seat.seat.as_deref())))
            .max_by(|(a, _), (b, _)| a.price.total_cmp(&b.price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Regulations;
    use serde_json::json;

    #[test]
    fn base_request_carries_floor_regs_and_tmax() {
        let mut request = AuctionRequest {
            regulations: Some(Regulations {
                coppa: true,
                gdpr: false,
            }),
            test: true,
            ..Default::default()
        };
        request.app.bundle = "com.example.game".to_string();
        request.device.device_type = DeviceType::Tablet;
        request.device.connection_type = "WIFI".to_string();
        let geo = GeoData {
            ip: "203.0.113.7".to_string(),
            country_code3: "USA".to_string(),
            ..Default::default()
        };

        let base = BidRequest::base(&request, &geo, 42, 0.5, 800);

        assert!(Uuid::parse_str(&base.id).is_ok());
        assert_eq!(base.at, 1);
        assert_eq!(base.tmax, 800);
        assert_eq!(base.test, 1);
        assert_eq!(base.imp.len(), 1);
        assert!(base.imp[0].bidfloor > 0.5);
        assert_eq!(base.regs, Some(Regs { coppa: 1, gdpr: 0 }));

        let app = base.app.as_ref().expect("should have app");
        assert_eq!(app.id, "42");
        assert_eq!(app.bundle, "com.example.game");

        let device = base.device.as_ref().expect("should have device");
        assert_eq!(device.ip, "203.0.113.7");
        assert_eq!(device.devicetype, 5);
        assert_eq!(device.connectiontype, 2);
        let geo = device.geo.as_ref().expect("should have geo");
        assert_eq!(geo.country.as_deref(), Some("USA"));
        assert_eq!(geo.city, None);
    }

    #[test]
    fn base_requests_get_unique_ids() {
        let request = AuctionRequest::default();
        let a = BidRequest::base(&request, &GeoData::default(), 1, 0.0, 100);
        let b = BidRequest::base(&request, &GeoData::default(), 1, 0.0, 100);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn best_bid_picks_highest_price() {
        let response: BidResponse = serde_json::from_value(json!({
            "id": "r-1",
            "seatbid": [
                {"seat": "a", "bid": [{"id": "b-1", "impid": "1", "price": 0.4}]},
                {"seat": "b", "bid": [{"id": "b-2", "impid": "1", "price": 1.2, "adm": "<ad/>"}]}
            ]
        }))
        .expect("should deserialize");

        let (bid, seat) = response.best_bid().expect("should have bid");
        assert_eq!(bid.id, "b-2");
        assert_eq!(seat, Some("b"));
        assert!(BidResponse::default().best_bid().is_none());
    }
}
