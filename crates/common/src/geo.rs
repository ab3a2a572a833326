//! Geographic data supplied by the external geocoder.
//!
//! Lookup itself happens outside the core. The auction only reads the
//! resolved country for segment matching and copies location fields into
//! bid requests and events.

use serde::{Deserialize, Serialize};

/// Location resolved from the client IP.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoData {
    /// Client IP address as seen by the edge
    pub ip: String,
    /// Two-letter country code (e.g., "US", "GB")
    pub country_code: String,
    /// Three-letter country code (e.g., "USA")
    pub country_code3: String,
    /// Internal country identifier
    pub country_id: i64,
    pub city_name: String,
    pub region_name: String,
    pub region_code: String,
    pub zip_code: String,
    pub lat: f64,
    pub lon: f64,
    /// Accuracy radius in kilometres
    pub accuracy: i64,
    pub unknown_country: bool,
}

impl GeoData {
    /// True when the geocoder produced nothing for this request.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Country used for segment matching. Empty when unknown.
    #[must_use]
    pub fn country(&self) -> &str {
        if self.unknown_country {
            ""
        } else {
            &self.country_code
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_geo_is_empty() {
        assert!(GeoData::default().is_empty());
        let geo = GeoData {
            country_code: "US".to_string(),
            ..Default::default()
        };
        assert!(!geo.is_empty());
        assert_eq!(geo.country(), "US");
    }

    #[test]
    fn unknown_country_hides_code() {
        let geo = GeoData {
            country_code: "ZZ".to_string(),
            unknown_country: true,
            ..Default::default()
        };
        assert_eq!(geo.country(), "");
    }
}
