//! Immutable feature query specification and SQL rendering.
//!
//! A [`FeatureQuerySpec`] is built once per request and rendered into two
//! parameterized statements, count and select, that share an identical WHERE
//! predicate. Every user-controlled value is bound as a parameter; the only
//! interpolated identifier is the table name, which is the UUID-validated
//! collection id, and the SRIDs, which come from the CRS registry as
//! integers.

use chrono::{DateTime, FixedOffset, Utc};
use ogc_common::{BoundingBox, TemporalFilter};
use uuid::Uuid;

use crate::params::Paging;

/// A value bound into a rendered statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Float(f64),
    Int(i32),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl From<DateTime<FixedOffset>> for SqlValue {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        SqlValue::Timestamp(dt.with_timezone(&Utc))
    }
}

/// A rendered SQL statement plus its bound parameters, in `$n` order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Spatial filter: the request bbox, the SRID its coordinates are in, and
/// the SRID the collection stores geometries in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BboxFilter {
    pub bbox: BoundingBox,
    pub bbox_srid: i32,
    pub storage_srid: i32,
}

/// Temporal filter bound to the collection's datetime key.
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalPredicate {
    pub key: String,
    pub filter: TemporalFilter,
}

/// Immutable query specification for one feature request.
#[derive(Debug, Clone)]
pub struct FeatureQuerySpec {
    collection_id: Uuid,
    output_srid: i32,
    bbox: Option<BboxFilter>,
    temporal: Option<TemporalPredicate>,
    property: Option<(String, String)>,
    paging: Paging,
}

impl FeatureQuerySpec {
    pub fn new(collection_id: Uuid, output_srid: i32) -> Self {
        Self {
            collection_id,
            output_srid,
            bbox: None,
            temporal: None,
            property: None,
            paging: Paging::default(),
        }
    }

    pub fn with_bbox(mut self, bbox: BboxFilter) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn with_temporal(mut self, temporal: TemporalPredicate) -> Self {
        self.temporal = Some(temporal);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.property = Some((key.into(), value.into()));
        self
    }

    pub fn with_paging(mut self, paging: Paging) -> Self {
        self.paging = paging;
        self
    }

    pub fn paging(&self) -> Paging {
        self.paging
    }

    /// Render the count statement. No LIMIT/OFFSET here: the count always
    /// covers the whole predicate.
    pub fn render_count(&self) -> SqlStatement {
        let (predicate, params) = self.render_predicate();
        let sql = format!(
            "SELECT COUNT(id) AS count FROM \"{}\"{}",
            self.collection_id, predicate
        );
        SqlStatement { sql, params }
    }

    /// Render the data-select statement. Geometry is reprojected to the
    /// output SRID and serialized as GeoJSON with 9 significant decimal
    /// digits.
    pub fn render_select(&self) -> SqlStatement {
        let (predicate, params) = self.render_predicate();
        let sql = format!(
            "SELECT id, itemtype AS type, \
             CAST(ST_AsGeoJSON(ST_Transform(geom, {output_srid}), 9, 0) AS json) AS geometry, \
             properties FROM \"{table}\"{predicate} LIMIT {limit} OFFSET {offset}",
            output_srid = self.output_srid,
            table = self.collection_id,
            predicate = predicate,
            limit = self.paging.limit,
            offset = self.paging.offset,
        );
        SqlStatement { sql, params }
    }

    /// Render the shared WHERE predicate. Placeholder numbering starts at $1
    /// in both statements, so the predicate text is identical between count
    /// and select.
    fn render_predicate(&self) -> (String, Vec<SqlValue>) {
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<SqlValue> = Vec::new();

        if let Some(spatial) = &self.bbox {
            let [min_x, min_y, max_x, max_y] = spatial.bbox.ordered();
            let base = params.len();
            // The envelope is transformed into the storage SRID; the stored
            // geometry is never reprojected for filtering.
            clauses.push(format!(
                "ST_Intersects(geom, ST_Transform(ST_MakeEnvelope(${}, ${}, ${}, ${}, ${}), ${}))",
                base + 1,
                base + 2,
                base + 3,
                base + 4,
                base + 5,
                base + 6,
            ));
            params.push(SqlValue::Float(min_x));
            params.push(SqlValue::Float(min_y));
            params.push(SqlValue::Float(max_x));
            params.push(SqlValue::Float(max_y));
            params.push(SqlValue::Int(spatial.bbox_srid));
            params.push(SqlValue::Int(spatial.storage_srid));
        }

        if let Some(temporal) = &self.temporal {
            match &temporal.filter {
                TemporalFilter::Instant(at) => {
                    clauses.push(temporal_clause(&mut params, &temporal.key, "=", *at));
                }
                TemporalFilter::Before(end) => {
                    clauses.push(temporal_clause(&mut params, &temporal.key, "<=", *end));
                }
                TemporalFilter::After(start) => {
                    clauses.push(temporal_clause(&mut params, &temporal.key, ">=", *start));
                }
                TemporalFilter::Range(start, end) => {
                    clauses.push(temporal_clause(&mut params, &temporal.key, ">=", *start));
                    clauses.push(temporal_clause(&mut params, &temporal.key, "<=", *end));
                }
            }
        }

        if let Some((key, value)) = &self.property {
            let base = params.len();
            clauses.push(format!("properties->>${} = ${}", base + 1, base + 2));
            params.push(SqlValue::Text(key.clone()));
            params.push(SqlValue::Text(value.clone()));
        }

        if clauses.is_empty() {
            (String::new(), params)
        } else {
            (format!(" WHERE {}", clauses.join(" AND ")), params)
        }
    }
}

fn temporal_clause(
    params: &mut Vec<SqlValue>,
    key: &str,
    op: &str,
    at: DateTime<FixedOffset>,
) -> String {
    let base = params.len();
    let clause = format!(
        "(properties->>${})::timestamptz {} ${}",
        base + 1,
        op,
        base + 2
    );
    params.push(SqlValue::Text(key.to_string()));
    params.push(at.into());
    clause
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::QueryParams;

    fn spec() -> FeatureQuerySpec {
        let id = Uuid::parse_str("3c2f1b52-7c69-44f2-9a8f-8f9c5f1f2d3e").unwrap();
        FeatureQuerySpec::new(id, 4326)
    }

    fn predicate_of(stmt: &SqlStatement) -> &str {
        match stmt.sql.find(" WHERE ") {
            Some(at) => {
                let rest = &stmt.sql[at..];
                rest.find(" LIMIT ").map_or(rest, |end| &rest[..end])
            }
            None => "",
        }
    }

    #[test]
    fn test_count_and_select_share_predicate() {
        let spec = spec()
            .with_bbox(BboxFilter {
                bbox: BoundingBox::new(68.7, 6.5, 97.4, 35.5),
                bbox_srid: 4326,
                storage_srid: 4326,
            })
            .with_temporal(TemporalPredicate {
                key: "observationDateTime".to_string(),
                filter: TemporalFilter::parse("2020-01-01T00:00:00Z/2021-01-01T00:00:00Z")
                    .unwrap(),
            })
            .with_property("name", "station-1");

        let count = spec.render_count();
        let select = spec.render_select();

        assert_eq!(predicate_of(&count), predicate_of(&select));
        assert_eq!(count.params, select.params);
    }

    #[test]
    fn test_no_filters_no_where() {
        let count = spec().render_count();
        assert!(!count.sql.contains("WHERE"));
        assert!(count.params.is_empty());
    }

    #[test]
    fn test_paging_only_on_select() {
        let params = QueryParams::from_pairs([("limit", "25"), ("offset", "50")]);
        let spec = spec().with_paging(Paging::from_params(&params).unwrap());

        let count = spec.render_count();
        let select = spec.render_select();

        assert!(!count.sql.contains("LIMIT"));
        assert!(!count.sql.contains("OFFSET"));
        assert!(select.sql.ends_with("LIMIT 25 OFFSET 50"));
    }

    #[test]
    fn test_bbox_transforms_into_storage_srid() {
        let spec = spec().with_bbox(BboxFilter {
            bbox: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
            bbox_srid: 3857,
            storage_srid: 4326,
        });
        let select = spec.render_select();

        assert!(select
            .sql
            .contains("ST_Intersects(geom, ST_Transform(ST_MakeEnvelope($1, $2, $3, $4, $5), $6))"));
        assert_eq!(select.params[4], SqlValue::Int(3857));
        assert_eq!(select.params[5], SqlValue::Int(4326));
    }

    #[test]
    fn test_geometry_output_projection() {
        let id = Uuid::new_v4();
        let spec = FeatureQuerySpec::new(id, 3857);
        let select = spec.render_select();
        assert!(select
            .sql
            .contains("CAST(ST_AsGeoJSON(ST_Transform(geom, 3857), 9, 0) AS json)"));
    }

    #[test]
    fn test_property_value_is_bound_not_inlined() {
        let spec = spec().with_property("name", "x' OR '1'='1");
        let select = spec.render_select();

        assert!(!select.sql.contains("OR '1'='1"));
        assert!(select.sql.contains("properties->>$1 = $2"));
        assert_eq!(
            select.params,
            vec![
                SqlValue::Text("name".to_string()),
                SqlValue::Text("x' OR '1'='1".to_string()),
            ]
        );
    }

    #[test]
    fn test_temporal_variants() {
        let key = "observationDateTime";

        let instant = spec().with_temporal(TemporalPredicate {
            key: key.to_string(),
            filter: TemporalFilter::parse("2020-01-01T00:00:00Z").unwrap(),
        });
        assert!(instant
            .render_count()
            .sql
            .contains("(properties->>$1)::timestamptz = $2"));

        let before = spec().with_temporal(TemporalPredicate {
            key: key.to_string(),
            filter: TemporalFilter::parse("../2020-01-01T00:00:00Z").unwrap(),
        });
        assert!(before
            .render_count()
            .sql
            .contains("(properties->>$1)::timestamptz <= $2"));

        let after = spec().with_temporal(TemporalPredicate {
            key: key.to_string(),
            filter: TemporalFilter::parse("2020-01-01T00:00:00Z/..").unwrap(),
        });
        assert!(after
            .render_count()
            .sql
            .contains("(properties->>$1)::timestamptz >= $2"));

        let range = spec().with_temporal(TemporalPredicate {
            key: key.to_string(),
            filter: TemporalFilter::parse("2020-01-01T00:00:00Z/2021-01-01T00:00:00Z").unwrap(),
        });
        let sql = range.render_count().sql;
        assert!(sql.contains("(properties->>$1)::timestamptz >= $2"));
        assert!(sql.contains("(properties->>$3)::timestamptz <= $4"));
    }

    #[test]
    fn test_placeholder_numbering_is_continuous() {
        let spec = spec()
            .with_bbox(BboxFilter {
                bbox: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
                bbox_srid: 4326,
                storage_srid: 4326,
            })
            .with_property("name", "station-1");

        let count = spec.render_count();
        // bbox takes $1..$6, property $7..$8
        assert!(count.sql.contains("properties->>$7 = $8"));
        assert_eq!(count.params.len(), 8);
    }
}
