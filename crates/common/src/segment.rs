//! Segment matching.
//!
//! Apps define ordered segments, each a conjunction of filters. A request
//! falls into the first segment whose filters all match, or into the zero
//! segment when none does.

use async_trait::async_trait;
use error_stack::Report;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::BidonError;

/// Filter dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Country,
    CustomString,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(rename = "type")]
    pub kind: FilterKind,
    #[serde(default)]
    pub name: String,
    pub operator: String,
    #[serde(default)]
    pub values: Vec<String>,
}

impl Filter {
    fn matches(&self, params: &SegmentParams) -> bool {
        match self.kind {
            FilterKind::Country => self.match_country(&params.country),
            FilterKind::CustomString => self.match_custom_string(&params.ext),
            FilterKind::Unknown => false,
        }
    }

    fn match_country(&self, country: &str) -> bool {
        let listed = self.values.iter().any(|value| value == country);
        match self.operator.as_str() {
            "IN" => listed,
            "NOT IN" => !listed,
            _ => false,
        }
    }

    fn match_custom_string(&self, ext: &str) -> bool {
        let Some(expected) = self.values.first() else {
            return false;
        };
        let Ok(attributes) = custom_attributes(ext) else {
            return false;
        };
        let equal = attributes
            .get(&self.name)
            .and_then(Value::as_str)
            .is_some_and(|actual| actual == expected);

        match self.operator.as_str() {
            "==" => equal,
            "!=" => !equal,
            _ => false,
        }
    }
}

fn custom_attributes(ext: &str) -> Result<Map<String, Value>, serde_json::Error> {
    #[derive(Deserialize)]
    struct SegmentExt {
        #[serde(default)]
        custom_attributes: Option<Map<String, Value>>,
    }

    serde_json::from_str::<SegmentExt>(ext).map(|parsed| parsed.custom_attributes.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub id: i64,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub filters: Vec<Filter>,
}

impl Segment {
    /// The "no segment" value.
    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }

    /// Decimal id, or empty for the zero segment.
    #[must_use]
    pub fn string_id(&self) -> String {
        if self.id == 0 {
            String::new()
        } else {
            self.id.to_string()
        }
    }

    fn matches(&self, params: &SegmentParams) -> bool {
        !self.filters.is_empty() && self.filters.iter().all(|filter| filter.matches(params))
    }
}

/// Inputs to segment matching.
#[derive(Debug, Clone, Default)]
pub struct SegmentParams {
    pub app_id: i64,
    pub country: String,
    /// Raw segment extension JSON from the request.
    pub ext: String,
}

/// Cached, app-scoped segment store.
#[async_trait]
pub trait SegmentFetcher: Send + Sync {
    /// Segments of `app_id` in evaluation order.
    async fn fetch_cached(&self, app_id: i64) -> Result<Vec<Segment>, Report<BidonError>>;
}

pub struct SegmentMatcher<F> {
    fetcher: F,
}

impl<F: SegmentFetcher> SegmentMatcher<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    /// First matching segment, or the zero segment. Store errors are not fatal.
    pub async fn match_segment(&self, params: &SegmentParams) -> Segment {
        let segments = match self.fetcher.fetch_cached(params.app_id).await {
            Ok(segments) => segments,
            Err(e) => {
                log::warn!("Segment fetch failed for app {}: {:?}", params.app_id, e);
                return Segment::zero();
            }
        };

        segments
            .into_iter()
            .find(|segment| segment.matches(params))
            .unwrap_or_else(Segment::zero)
    }
}
