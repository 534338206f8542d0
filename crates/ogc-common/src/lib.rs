//! Common types shared across the OGC features engine.

pub mod bbox;
pub mod collection;
pub mod crs;
pub mod error;
pub mod feature;
pub mod link;
pub mod time;

pub use bbox::BoundingBox;
pub use collection::Collection;
pub use crs::{DEFAULT_SERVER_CRS, DEFAULT_SERVER_SRID};
pub use error::{OgcError, OgcResult};
pub use feature::{Feature, FeatureCollection};
pub use link::Link;
pub use time::TemporalFilter;
