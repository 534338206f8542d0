//! Coordinate Reference System constants.
//!
//! CRS codes are OGC URIs (e.g. `http://www.opengis.net/def/crs/OGC/1.3/CRS84`);
//! the database maps each code a collection supports to a numeric SRID.

/// The default server CRS, always supported by every collection.
pub const DEFAULT_SERVER_CRS: &str = "http://www.opengis.net/def/crs/OGC/1.3/CRS84";

/// SRID of the default server CRS.
pub const DEFAULT_SERVER_SRID: i32 = 4326;
