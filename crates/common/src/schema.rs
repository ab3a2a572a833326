//! Auction request contract, as bound from the SDK body.
//!
//! The request is normalised by the transport before it reaches the core:
//! `ad_type` comes from the path and `sdk_version` from the
//! `X-Bidon-Version` header. Everything else is the JSON body.

use std::collections::{BTreeMap, HashMap};

use error_stack::Report;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

use crate::ad::{AdFormat, AdType, DeviceType, Os};
use crate::adapter::AdapterKey;
use crate::error::BidonError;

static SDK_VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^v?(\d+)\.(\d+)(?:\.(\d+))?(?:[-+][0-9A-Za-z.\-+]*)?$")
        .expect("SDK version pattern should compile")
});

/// Semantic version of the calling SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SdkVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl SdkVersion {
    /// Parses the `X-Bidon-Version` header value.
    ///
    /// # Errors
    ///
    /// Returns [`BidonError::InvalidSdkVersion`] for empty or malformed values.
    pub fn parse(value: &str) -> Result<Self, Report<BidonError>> {
        let caps = SDK_VERSION_RE
            .captures(value.trim())
            .ok_or_else(|| Report::new(BidonError::InvalidSdkVersion))?;

        let number = |idx: usize| -> Result<u64, Report<BidonError>> {
            match caps.get(idx) {
                Some(m) => m
                    .as_str()
                    .parse::<u64>()
                    .map_err(|_| Report::new(BidonError::InvalidSdkVersion)),
                None => Ok(0),
            }
        };

        Ok(Self {
            major: number(1)?,
            minor: number(2)?,
            patch: number(3)?,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Geo {
    pub lat: f64,
    pub lon: f64,
    pub accuracy: f64,
    pub lastfix: i64,
    pub country: String,
    pub city: String,
    pub zip: String,
    pub utcoffset: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Device {
    pub geo: Option<Geo>,
    pub ua: String,
    pub make: String,
    pub model: String,
    pub os: String,
    pub osv: String,
    pub hwv: String,
    pub h: i64,
    pub w: i64,
    pub ppi: i64,
    pub pxratio: f64,
    pub js: Option<i64>,
    pub language: String,
    pub carrier: String,
    pub mccmnc: String,
    pub connection_type: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
}

impl Device {
    #[must_use]
    pub fn os_family(&self) -> Os {
        Os::parse(&self.os)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    pub id: String,
    pub launch_ts: i64,
    pub launch_monotonic_ts: i64,
    pub start_ts: i64,
    pub start_monotonic_ts: i64,
    pub ts: i64,
    pub monotonic_ts: i64,
    pub ram_used: i64,
    pub ram_size: i64,
    pub storage_free: i64,
    pub storage_used: i64,
    pub battery: f64,
    pub cpu_usage: Option<f64>,
}

impl Session {
    #[must_use]
    pub fn uptime(&self) -> i64 {
        self.monotonic_ts - self.start_monotonic_ts
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct App {
    pub bundle: String,
    pub key: String,
    pub framework: String,
    pub version: String,
    pub framework_version: String,
    pub plugin_version: String,
    pub skadn: Option<Vec<String>>,
    pub sdk_version: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub idfa: String,
    pub tracking_authorization_status: String,
    pub idfv: String,
    pub idg: String,
    pub consent: Option<Value>,
    pub coppa: Option<bool>,
    pub app_set_id: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Regulations {
    pub coppa: bool,
    pub gdpr: bool,
}

/// Segment assignment echoed by the SDK, plus its targeting extension.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentContext {
    pub id: String,
    pub uid: String,
    pub ext: String,
}

/// Installed adapter as reported by the SDK.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterInfo {
    pub version: String,
    pub sdk_version: String,
}

/// Ad already cached on the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdCacheObject {
    pub demand_id: String,
    #[serde(default)]
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannerAdObject {
    pub format: AdFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyAdObject {}

/// The impression being auctioned (`imp` in the body).
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AdObject {
    #[validate(length(min = 1))]
    pub auction_id: String,
    pub auction_key: String,
    pub auction_configuration_id: i64,
    pub auction_configuration_uid: String,
    #[serde(rename = "auction_pricefloor")]
    #[validate(range(min = 0.0))]
    pub price_floor: f64,
    pub orientation: String,
    /// Per-adapter client data (bid tokens and their timing), keyed by adapter.
    pub demands: HashMap<String, Map<String, Value>>,
    pub banner: Option<BannerAdObject>,
    pub interstitial: Option<EmptyAdObject>,
    pub rewarded: Option<EmptyAdObject>,
}

impl AdObject {
    /// Banner format, when this is a banner impression.
    #[must_use]
    pub fn format(&self) -> Option<AdFormat> {
        self.banner.map(|banner| banner.format)
    }

    #[must_use]
    pub fn demand(&self, key: AdapterKey) -> Option<&Map<String, Value>> {
        self.demands.get(key.as_str())
    }

    /// Non-empty bid token supplied by the SDK for `key`.
    #[must_use]
    pub fn token(&self, key: AdapterKey) -> Option<&str> {
        self.demand(key)
            .and_then(|demand| demand.get("token"))
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
    }
}

/// Single auction request shape shared by every ad type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AuctionRequest {
    #[serde(skip)]
    pub ad_type: AdType,
    #[serde(skip)]
    pub sdk_version: String,
    #[serde(default)]
    pub device: Device,
    #[serde(default)]
    pub session: Session,
    #[serde(default)]
    pub app: App,
    #[serde(default)]
    pub user: User,
    #[serde(default)]
    pub geo: Option<Geo>,
    #[serde(default, rename = "regs")]
    pub regulations: Option<Regulations>,
    #[serde(default)]
    pub ext: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub segment: SegmentContext,
    #[serde(default)]
    pub adapters: BTreeMap<String, AdapterInfo>,
    #[validate(nested)]
    pub imp: AdObject,
    #[serde(default)]
    pub ad_cache: Vec<AdCacheObject>,
    #[serde(default)]
    pub test: bool,
    #[serde(default)]
    pub tmax: i64,
}

impl AuctionRequest {
    /// Installed adapters the server knows about, in key order.
    #[must_use]
    pub fn adapter_keys(&self) -> Vec<AdapterKey> {
        self.adapters
            .keys()
            .filter_map(|key| key.parse::<AdapterKey>().ok())
            .collect()
    }

    #[must_use]
    pub fn format(&self) -> Option<AdFormat> {
        self.imp.format()
    }

    #[must_use]
    pub fn regulations(&self) -> Regulations {
        self.regulations.unwrap_or_default()
    }

    #[must_use]
    pub fn is_coppa(&self) -> bool {
        self.regulations().coppa
    }

    /// The `ext` string decoded as a JSON object. Malformed input yields an empty map.
    #[must_use]
    pub fn ext_data(&self) -> Map<String, Value> {
        if self.ext.is_empty() {
            return Map::new();
        }
        match serde_json::from_str::<Value>(&self.ext) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Client-side mediator wrapping this SDK (`max`, `level_play`, ...).
    #[must_use]
    pub fn mediator(&self) -> Option<String> {
        self.ext_data()
            .get("mediator")
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Winning price of the mediator's previous auction, when it is a finite number.
    #[must_use]
    pub fn previous_auction_price(&self) -> Option<f64> {
        self.ext_data()
            .get("previous_auction_price")
            .and_then(Value::as_f64)
            .filter(|price| price.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request_with_ext(ext: &str) -> AuctionRequest {
        AuctionRequest {
            ext: ext.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn parses_sdk_versions() {
        let version = SdkVersion::parse("0.7.2").expect("should parse");
        assert_eq!(
            version,
            SdkVersion {
                major: 0,
                minor: 7,
                patch: 2
            }
        );
        let version = SdkVersion::parse("v1.2-beta.1").expect("should parse");
        assert_eq!((version.major, version.minor, version.patch), (1, 2, 0));
        assert!(
            SdkVersion::parse("0.5.0").expect("should parse")
                < SdkVersion::parse("0.10.0").expect("should parse")
        );
    }

    #[test]
    fn rejects_missing_or_malformed_sdk_versions() {
        for value in ["", "latest", "1", "1.x.0"] {
            let err = SdkVersion::parse(value).expect_err("should reject");
            assert_eq!(*err.current_context(), BidonError::InvalidSdkVersion);
        }
    }

    #[test]
    fn mediator_is_read_from_ext_string() {
        assert_eq!(request_with_ext("").mediator(), None);
        assert_eq!(request_with_ext("{}").mediator(), None);
        assert_eq!(
            request_with_ext(r#"{"mediator":"max","other":"value"}"#).mediator(),
            Some("max".to_string())
        );
        assert_eq!(request_with_ext(r#"{"mediator":123}"#).mediator(), None);
        assert_eq!(request_with_ext("not json").mediator(), None);
    }

    #[test]
    fn previous_auction_price_requires_number() {
        assert_eq!(request_with_ext("").previous_auction_price(), None);
        assert_eq!(
            request_with_ext(r#"{"previous_auction_price":0.25}"#).previous_auction_price(),
            Some(0.25)
        );
        assert_eq!(
            request_with_ext(r#"{"previous_auction_price":-0.1}"#).previous_auction_price(),
            Some(-0.1)
        );
        assert_eq!(
            request_with_ext(r#"{"previous_auction_price":"0.25"}"#).previous_auction_price(),
            None
        );
    }

    #[test]
    fn deserializes_body_and_keeps_known_adapters() {
        let body = json!({
            "device": {"os": "android", "type": "PHONE"},
            "app": {"bundle": "com.example", "key": "app-key"},
            "regs": {"coppa": true},
            "adapters": {
                "bidmachine": {"version": "1.0", "sdk_version": "2.0"},
                "admob": {"version": "1.0", "sdk_version": "2.0"},
                "someone_else": {"version": "1.0"}
            },
            "imp": {
                "auction_id": "auction-1",
                "auction_pricefloor": 0.01,
                "banner": {"format": "ADAPTIVE"},
                "demands": {"bidmachine": {"token": "t-1"}, "meta": {"token": ""}}
            },
            "ad_cache": [{"demand_id": "admob", "price": 0.5}],
            "tmax": 1500
        });

        let request: AuctionRequest = serde_json::from_value(body).expect("should deserialize");
        assert_eq!(
            request.adapter_keys(),
            vec![AdapterKey::Admob, AdapterKey::Bidmachine]
        );
        assert!(request.is_coppa());
        assert_eq!(request.format(), Some(AdFormat::Adaptive));
        assert_eq!(request.device.device_type, DeviceType::Phone);
        assert_eq!(request.device.os_family(), Os::Android);
        assert_eq!(request.imp.token(AdapterKey::Bidmachine), Some("t-1"));
        assert_eq!(request.imp.token(AdapterKey::Meta), None);
        assert_eq!(request.imp.token(AdapterKey::Amazon), None);
        assert_eq!(request.ad_cache.len(), 1);
        assert_eq!(request.tmax, 1500);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn validation_rejects_missing_auction_id_and_negative_floor() {
        let mut request = AuctionRequest::default();
        assert!(request.validate().is_err());

        request.imp.auction_id = "auction-1".to_string();
        request.imp.price_floor = -1.0;
        assert!(request.validate().is_err());

        request.imp.price_floor = 0.0;
        assert!(request.validate().is_ok());
    }
}
