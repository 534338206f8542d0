//! Request query-parameter model and paging.

use ogc_common::{OgcError, OgcResult};

/// Query keys with engine-defined meaning. Anything else is a candidate
/// property filter.
pub const RESERVED_KEYS: [&str; 6] = ["limit", "bbox", "datetime", "offset", "bbox-crs", "crs"];

/// Hard cap on the page size.
pub const MAX_LIMIT: i64 = 10_000;

/// Page size applied when the request does not specify one.
pub const DEFAULT_LIMIT: i64 = 10;

/// Offset applied when the request does not specify one.
pub const DEFAULT_OFFSET: i64 = 1;

/// An ordered map of request query parameters.
///
/// Insertion order is preserved: when several non-reserved keys are present,
/// only the first one becomes the property filter, so "first" has to be
/// well-defined.
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Value of the first occurrence of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Pairs whose key is not reserved, in request order.
    pub fn non_reserved(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs
            .iter()
            .filter(|(k, _)| !RESERVED_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Validated paging values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Paging {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: DEFAULT_OFFSET,
        }
    }
}

impl Paging {
    /// Parse `limit` and `offset`, applying defaults and the hard cap.
    pub fn from_params(params: &QueryParams) -> OgcResult<Self> {
        let limit = match params.get("limit") {
            Some(raw) => {
                let parsed: i64 = raw
                    .parse()
                    .map_err(|_| OgcError::BadRequest("Invalid limit parameter".to_string()))?;
                if parsed < 1 {
                    return Err(OgcError::BadRequest("Invalid limit parameter".to_string()));
                }
                parsed.min(MAX_LIMIT)
            }
            None => DEFAULT_LIMIT,
        };

        let offset = match params.get("offset") {
            Some(raw) => {
                let parsed: i64 = raw
                    .parse()
                    .map_err(|_| OgcError::BadRequest("Invalid offset parameter".to_string()))?;
                if parsed < 0 {
                    return Err(OgcError::BadRequest("Invalid offset parameter".to_string()));
                }
                parsed
            }
            None => DEFAULT_OFFSET,
        };

        Ok(Self { limit, offset })
    }

    /// Offset of the following page. Saturates so an extreme offset cannot
    /// wrap into a negative next link.
    pub fn next_offset(&self) -> i64 {
        self.offset.saturating_add(self.limit)
    }

    /// Whether a further page exists given the total match count.
    pub fn has_next(&self, number_matched: i64) -> bool {
        number_matched > self.next_offset()
    }
}
