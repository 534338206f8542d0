//! Feature and feature-collection response models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Link;

/// A single geospatial feature record.
///
/// `geometry` is GeoJSON already reprojected to the requested output CRS;
/// `properties` is the record's open-ended attribute map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub geometry: serde_json::Value,
    pub properties: serde_json::Value,

    /// Per-item links, populated only on single-feature responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<Link>>,
}

/// The paginated response envelope for a feature query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub collection_type: String,

    /// Features in database return order.
    pub features: Vec<Feature>,

    /// Total number of features satisfying the predicate.
    #[serde(rename = "numberMatched")]
    pub number_matched: i64,

    /// Number of features in this page.
    #[serde(rename = "numberReturned")]
    pub number_returned: i64,

    pub links: Vec<Link>,

    /// Assembly time.
    #[serde(rename = "timeStamp")]
    pub time_stamp: DateTime<Utc>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>, number_matched: i64, links: Vec<Link>) -> Self {
        let number_returned = features.len() as i64;
        Self {
            collection_type: "FeatureCollection".to_string(),
            features,
            number_matched,
            number_returned,
            links,
            time_stamp: Utc::now(),
        }
    }
}
