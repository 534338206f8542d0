//! Feature query and CRS validation engine.
//!
//! Turns an untrusted map of request parameters (collection id, bbox, time
//! range, CRS, property filters, paging) into safe parameterized queries and
//! assembles the paginated GeoJSON response envelope. HTTP routing, auth and
//! document serving live outside this crate; they hand in a collection id
//! and query parameters and receive the envelope or a typed error.

pub mod config;
pub mod filter;
pub mod params;
pub mod query;
pub mod registry;
pub mod store;

pub use config::EngineConfig;
pub use params::{Paging, QueryParams, DEFAULT_LIMIT, DEFAULT_OFFSET, MAX_LIMIT, RESERVED_KEYS};
pub use query::{BboxFilter, FeatureQuerySpec, SqlStatement, SqlValue, TemporalPredicate};
pub use registry::{parse_collection_id, CollectionProbe};
pub use store::FeatureStore;
