//! Property-filter validation.
//!
//! Any non-reserved query key is a candidate property filter. Only the first
//! such key (request order) is used — a deliberate single-filter constraint
//! carried over from the upstream behavior, not an oversight to fix.

use std::collections::HashSet;

use ogc_common::{OgcError, OgcResult};
use sqlx::PgPool;
use uuid::Uuid;

use crate::params::QueryParams;
use crate::registry;

/// The first non-reserved key/value pair, if any.
pub fn candidate_filter(params: &QueryParams) -> Option<(&str, &str)> {
    params.non_reserved().next()
}

/// Validate the candidate property filter against the keys actually present
/// in the collection's records.
///
/// Succeeds trivially (and issues no database call) when every query key is
/// reserved. Otherwise the filter key must be one of the collection's
/// distinct `properties` keys, or the request fails before any feature query
/// runs.
pub async fn validate_property_filter(
    pool: &PgPool,
    collection_id: Uuid,
    params: &QueryParams,
) -> OgcResult<Option<(String, String)>> {
    let Some((key, value)) = candidate_filter(params) else {
        return Ok(None);
    };

    let known_keys = registry::distinct_property_keys(pool, collection_id).await?;
    tracing::debug!("properties keys: {:?}", known_keys);

    check_filter(&known_keys, key, value).map(Some)
}

/// Accept the filter only if its key is among the collection's known
/// property keys. Pure, so the rejection branch is testable without a
/// database.
fn check_filter(known: &HashSet<String>, key: &str, value: &str) -> OgcResult<(String, String)> {
    if known.contains(key) {
        Ok((key.to_string(), value.to_string()))
    } else {
        Err(OgcError::InvalidFilterParameter(
            "Query parameter is invalid".to_string(),
        ))
    }
}
