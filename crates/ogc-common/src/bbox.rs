//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box in some CRS.
///
/// For geographic CRS (EPSG:4326 / CRS84), coordinates are in degrees.
/// For projected CRS, coordinates are in the projection's linear unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Parse an OGC `bbox` parameter string: "minx,miny,maxx,maxy"
    pub fn from_param(s: &str) -> Result<Self, BboxParseError> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        Ok(Self {
            min_x: parts[0]
                .parse()
                .map_err(|_| BboxParseError::InvalidNumber(parts[0].to_string()))?,
            min_y: parts[1]
                .parse()
                .map_err(|_| BboxParseError::InvalidNumber(parts[1].to_string()))?,
            max_x: parts[2]
                .parse()
                .map_err(|_| BboxParseError::InvalidNumber(parts[2].to_string()))?,
            max_y: parts[3]
                .parse()
                .map_err(|_| BboxParseError::InvalidNumber(parts[3].to_string()))?,
        })
    }

    /// The four bounds in `minx,miny,maxx,maxy` order.
    pub fn ordered(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid bbox format: {0}. Expected 'minx,miny,maxx,maxy'")]
    InvalidFormat(String),

    #[error("Invalid number in bbox: {0}")]
    InvalidNumber(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bbox_param() {
        let bbox = BoundingBox::from_param("68.7,6.5,97.4,35.5").unwrap();
        assert_eq!(bbox.min_x, 68.7);
        assert_eq!(bbox.min_y, 6.5);
        assert_eq!(bbox.max_x, 97.4);
        assert_eq!(bbox.max_y, 35.5);
    }

    #[test]
    fn test_parse_bbox_wrong_arity() {
        assert!(BoundingBox::from_param("1.0,2.0,3.0").is_err());
        assert!(BoundingBox::from_param("1.0,2.0,3.0,4.0,5.0").is_err());
    }

    #[test]
    fn test_parse_bbox_bad_number() {
        assert!(BoundingBox::from_param("a,2.0,3.0,4.0").is_err());
    }

    #[test]
    fn test_ordered() {
        let bbox = BoundingBox::new(0.0, 1.0, 2.0, 3.0);
        assert_eq!(bbox.ordered(), [0.0, 1.0, 2.0, 3.0]);
    }
}
