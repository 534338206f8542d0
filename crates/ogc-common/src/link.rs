//! Hypermedia link types for response envelopes.

use serde::{Deserialize, Serialize};

/// Media type for GeoJSON responses.
pub const GEO_JSON: &str = "application/geo+json";

/// Media type for plain JSON responses.
pub const JSON: &str = "application/json";

/// A link entry: `{href, rel, type}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    pub rel: String,
    #[serde(rename = "type")]
    pub media_type: String,
}

impl Link {
    pub fn new(href: impl Into<String>, rel: impl Into<String>, media_type: &str) -> Self {
        Self {
            href: href.into(),
            rel: rel.into(),
            media_type: media_type.to_string(),
        }
    }

    pub fn self_link(href: impl Into<String>, media_type: &str) -> Self {
        Self::new(href, "self", media_type)
    }

    pub fn alternate(href: impl Into<String>, media_type: &str) -> Self {
        Self::new(href, "alternate", media_type)
    }

    pub fn next(href: impl Into<String>, media_type: &str) -> Self {
        Self::new(href, "next", media_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_serialization() {
        let link = Link::self_link("http://localhost/collections/abc/items", GEO_JSON);
        let json = serde_json::to_value(&link).unwrap();
        assert_eq!(json["rel"], "self");
        assert_eq!(json["type"], "application/geo+json");
        assert_eq!(json["href"], "http://localhost/collections/abc/items");
    }
}
