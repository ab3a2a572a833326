//! Analytics events emitted for each auction.
//!
//! Events are flat JSON objects: nested maps are joined into keys with `__`
//! before the payload is handed to the [`engine::LoggerEngine`].

pub mod engine;
pub mod logger;

use std::collections::BTreeMap;

use derive_more::Display;
use error_stack::{Report, ResultExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::BidonError;
use crate::geo::GeoData;
use crate::schema::AuctionRequest;

pub use engine::{ChannelEngine, LoggerEngine};
pub use logger::{EventLogger, LogMessage};

const KEY_SEPARATOR: &str = "__";

/// Logical destination of an event.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    #[display("ad_events")]
    AdEvents,
    #[display("config")]
    Config,
    #[display("show")]
    Show,
    #[display("click")]
    Click,
    #[display("reward")]
    Reward,
    #[display("win")]
    Win,
    #[display("loss")]
    Loss,
}

/// Named `[start, end]` Unix-millisecond pairs.
pub type TimingMap = BTreeMap<String, [i64; 2]>;

pub trait Event: Send + Sync {
    fn topic(&self) -> Topic;

    /// Flat payload, ready to be serialized.
    ///
    /// # Errors
    ///
    /// Returns [`BidonError::Event`] when the event cannot be represented as JSON.
    fn payload(&self) -> Result<Map<String, Value>, Report<BidonError>>;

    /// Events that must be produced together with this one.
    fn children(&self) -> Vec<&dyn Event> {
        Vec::new()
    }
}

/// Current time as fractional Unix seconds.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn event_timestamp() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1e6
}

/// Joins nested objects into a single level, `a: {b: 1}` becoming `a__b: 1`.
#[must_use]
pub fn flatten_payload(source: Map<String, Value>) -> Map<String, Value> {
    let mut flat = Map::new();
    flatten_into(&mut flat, source, "");
    flat
}

fn flatten_into(flat: &mut Map<String, Value>, source: Map<String, Value>, prefix: &str) {
    for (key, value) in source {
        let key = if prefix.is_empty() {
            key
        } else {
            format!("{prefix}{KEY_SEPARATOR}{key}")
        };
        match value {
            Value::Object(nested) => flatten_into(flat, nested, &key),
            value => {
                flat.insert(key, value);
            }
        }
    }
}

/// Parses the SDK's opaque `ext` string. Empty means an empty object.
///
/// # Errors
///
/// Returns [`BidonError::Event`] when `ext` is not a JSON object.
pub fn parse_ext(ext: &str) -> Result<Map<String, Value>, Report<BidonError>> {
    if ext.is_empty() {
        return Ok(Map::new());
    }
    serde_json::from_str(ext).change_context(BidonError::Event {
        message: "unmarshal ext".to_string(),
    })
}

/// Row in the `ad_events` topic.
///
/// Request and geo columns are shared by every event of an auction; the
/// event-specific columns are filled by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdEvent {
    pub timestamp: f64,
    pub event_type: String,
    pub ad_type: String,
    pub ad_format: String,
    pub auction_id: String,
    pub auction_configuration_id: i64,
    pub auction_configuration_uid: i64,
    pub status: String,
    pub round_id: String,
    pub round_number: i32,
    #[serde(rename = "impid")]
    pub imp_id: String,
    pub demand_id: String,
    pub bidding: bool,
    pub ad_unit_uid: i64,
    pub ad_unit_label: String,
    pub ecpm: f64,
    pub price_floor: f64,
    pub raw_request: String,
    pub raw_response: String,
    pub error: String,
    pub timing_map: TimingMap,
    pub manufacturer: String,
    pub model: String,
    pub os: String,
    pub os_version: String,
    pub connection_type: String,
    pub device_type: String,
    pub session_id: String,
    pub session_uptime: i64,
    pub bundle: String,
    pub framework: String,
    pub framework_version: String,
    pub plugin_version: String,
    pub package_version: String,
    pub sdk_version: String,
    pub idfa: String,
    pub idg: String,
    pub idfv: String,
    pub tracking_authorization_status: String,
    pub coppa: bool,
    pub gdpr: bool,
    pub country_code: String,
    pub city: String,
    pub ip: String,
    pub country_id: i64,
    pub segment_id: String,
    pub segment_uid: i64,
    pub ext: String,
    #[serde(skip)]
    pub children: Vec<AdEvent>,
}

impl AdEvent {
    /// Event carrying the request and geo columns.
    #[must_use]
    pub fn from_request(request: &AuctionRequest, geo: &GeoData) -> Self {
        let regulations = request.regulations();
        Self {
            timestamp: event_timestamp(),
            manufacturer: request.device.make.clone(),
            model: request.device.model.clone(),
            os: request.device.os.clone(),
            os_version: request.device.osv.clone(),
            connection_type: request.device.connection_type.clone(),
            device_type: request.device.device_type.to_string(),
            session_id: request.session.id.clone(),
            session_uptime: request.session.uptime(),
            bundle: request.app.bundle.clone(),
            framework: request.app.framework.clone(),
            framework_version: request.app.framework_version.clone(),
            plugin_version: request.app.plugin_version.clone(),
            package_version: request.app.version.clone(),
            sdk_version: request.app.sdk_version.clone(),
            idfa: request.user.idfa.clone(),
            idg: request.user.idg.clone(),
            idfv: request.user.idfv.clone(),
            tracking_authorization_status: request.user.tracking_authorization_status.clone(),
            coppa: regulations.coppa,
            gdpr: regulations.gdpr,
            country_code: geo.country_code.clone(),
            city: geo.city_name.clone(),
            ip: geo.ip.clone(),
            country_id: geo.country_id,
            segment_id: request.segment.id.clone(),
            segment_uid: request.segment.uid.parse().unwrap_or_default(),
            ext: request.ext.clone(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_child(mut self, child: AdEvent) -> Self {
        self.children.push(child);
        self
    }
}

impl Event for AdEvent {
    fn topic(&self) -> Topic {
        Topic::AdEvents
    }

    fn payload(&self) -> Result<Map<String, Value>, Report<BidonError>> {
        let value = serde_json::to_value(self).change_context(BidonError::Event {
            message: format!("marshal {} event", self.event_type),
        })?;
        let Value::Object(mut payload) = value else {
            return Err(Report::new(BidonError::Event {
                message: format!("{} event is not an object", self.event_type),
            }));
        };
        payload.insert("ext".to_string(), Value::Object(parse_ext(&self.ext)?));
        Ok(flatten_payload(payload))
    }

    fn children(&self) -> Vec<&dyn Event> {
        self.children.iter().map(|child| child as &dyn Event).collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn flattens_nested_objects() {
        let Value::Object(source) = json!({
            "a": 1,
            "geo": {"country": "US", "loc": {"lat": 1.5}},
            "list": [{"x": 1}],
        }) else {
            unreachable!()
        };

        let flat = flatten_payload(source);
        assert_eq!(flat["a"], 1);
        assert_eq!(flat["geo__country"], "US");
        assert_eq!(flat["geo__loc__lat"], 1.5);
        assert_eq!(flat["list"], json!([{"x": 1}]));
        assert!(!flat.contains_key("geo"));
    }

    #[test]
    fn payload_inlines_ext_and_keeps_timing_pairs() {
        let mut event = AdEvent {
            event_type: "bid_request".to_string(),
            ext: r#"{"mediation_mode":"max","nested":{"a":"b"}}"#.to_string(),
            ..Default::default()
        };
        event
            .timing_map
            .insert("bid".to_string(), [1_000, 1_200]);

        let payload = event.payload().expect("should build payload");
        assert_eq!(payload["event_type"], "bid_request");
        assert_eq!(payload["ext__mediation_mode"], "max");
        assert_eq!(payload["ext__nested__a"], "b");
        assert_eq!(payload["timing_map__bid"], json!([1_000, 1_200]));
        assert!(!payload.contains_key("children"));
    }

    #[test]
    fn invalid_ext_fails_payload() {
        let event = AdEvent {
            ext: "not json".to_string(),
            ..Default::default()
        };
        let report = event.payload().expect_err("should fail");
        assert!(matches!(
            report.current_context(),
            BidonError::Event { .. }
        ));
    }

    #[test]
    fn timestamps_are_fractional_seconds() {
        let ts = event_timestamp();
        assert!(ts > 1_600_000_000.0);
        assert!(ts < 10_000_000_000.0);
        assert_eq!(Topic::AdEvents.to_string(), "ad_events");
    }
}
