//! Collection metadata model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata describing one feature collection.
///
/// Invariant: `storage_crs` is always a member of `supported_crs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub id: Uuid,
    pub title: Option<String>,
    pub description: Option<String>,

    /// Column/property key used for temporal filtering, if the collection
    /// has one.
    #[serde(rename = "datetimeKey")]
    pub datetime_key: Option<String>,

    /// CRS codes this collection supports.
    #[serde(rename = "crs")]
    pub supported_crs: Vec<String>,

    /// CRS the geometries are stored in.
    #[serde(rename = "storageCrs")]
    pub storage_crs: String,

    /// Spatial extent as `[minx, miny, maxx, maxy]`, when known.
    pub bbox: Option<Vec<f64>>,

    /// Temporal extent as `[start, end]` instants, when known.
    pub temporal: Option<Vec<String>>,

    #[serde(rename = "type")]
    pub collection_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::DEFAULT_SERVER_CRS;

    #[test]
    fn test_wire_casing() {
        let collection = Collection {
            id: Uuid::new_v4(),
            title: Some("Weather stations".to_string()),
            description: None,
            datetime_key: Some("observationDateTime".to_string()),
            supported_crs: vec![DEFAULT_SERVER_CRS.to_string()],
            storage_crs: DEFAULT_SERVER_CRS.to_string(),
            bbox: None,
            temporal: None,
            collection_type: Some("feature".to_string()),
        };

        let json = serde_json::to_value(&collection).unwrap();
        assert_eq!(json["datetimeKey"], "observationDateTime");
        assert_eq!(json["crs"][0], DEFAULT_SERVER_CRS);
        assert_eq!(json["storageCrs"], DEFAULT_SERVER_CRS);
        assert_eq!(json["type"], "feature");
    }
}
