//! Query executor and result assembler over a PostgreSQL pool.
//!
//! Each request runs as a strictly sequential pipeline: CRS lookup, property
//! filter validation, datetime parsing, query-spec construction, execution.
//! Any stage failure short-circuits the rest. Per-request state is never
//! shared; the pool is the only shared resource.

use std::collections::HashMap;
use std::future::Future;

use ogc_common::{
    BoundingBox, Collection, Feature, FeatureCollection, Link, OgcError, OgcResult,
    TemporalFilter, DEFAULT_SERVER_CRS,
};
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::filter;
use crate::params::{Paging, QueryParams};
use crate::query::{BboxFilter, FeatureQuerySpec, SqlStatement, SqlValue, TemporalPredicate};
use crate::registry::{self, opaque_db_error, parse_collection_id};

/// Connection pool plus the query operations of the engine.
pub struct FeatureStore {
    pool: PgPool,
    config: EngineConfig,
}

impl FeatureStore {
    /// Create a new store by connecting to the configured database.
    pub async fn connect(config: EngineConfig) -> OgcResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .map_err(|e| {
                tracing::error!("Database connection failed: {}", e);
                OgcError::InternalError
            })?;

        Ok(Self { pool, config })
    }

    /// Create a store over an existing pool.
    pub fn with_pool(pool: PgPool, config: EngineConfig) -> Self {
        Self { pool, config }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run a database-bound stage under the configured deadline. An elapsed
    /// deadline is collapsed to the opaque internal error, like any other
    /// database fault.
    async fn with_deadline<T, F>(&self, operation: &str, fut: F) -> OgcResult<T>
    where
        F: Future<Output = OgcResult<T>>,
    {
        match tokio::time::timeout(self.config.query_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!("Deadline exceeded during {}", operation);
                Err(OgcError::InternalError)
            }
        }
    }

    /// Query a page of features from a collection.
    ///
    /// Pipeline: CRS validation, property-filter validation, existence probe,
    /// datetime parsing, spec construction, count + select over one acquired
    /// connection, envelope assembly.
    pub async fn get_features(
        &self,
        collection_id: &str,
        params: &QueryParams,
    ) -> OgcResult<FeatureCollection> {
        tracing::info!("get_features for collection {}", collection_id);
        let id = parse_collection_id(collection_id)?;

        let crs = self
            .with_deadline(
                "crs validation",
                registry::resolve_request_crs(&self.pool, id, params),
            )
            .await?;

        let property = self
            .with_deadline(
                "property filter validation",
                filter::validate_property_filter(&self.pool, id, params),
            )
            .await?;

        // The datetime value is validated whenever present; the filter is
        // only applied when the collection has a datetime key to filter on.
        let parsed_datetime = match params.get("datetime") {
            Some(raw) => Some(TemporalFilter::parse(raw)?),
            None => None,
        };

        let probe = self
            .with_deadline("collection probe", registry::probe_collection(&self.pool, id))
            .await?;

        let temporal = match (&probe.datetime_key, parsed_datetime) {
            (Some(key), Some(filter)) => Some(TemporalPredicate {
                key: key.clone(),
                filter,
            }),
            _ => None,
        };

        let paging = Paging::from_params(params)?;
        let output_srid = srid_for(&crs, params.get("crs"))?;

        let bbox = match params.get("bbox") {
            Some(raw) => {
                let bbox = BoundingBox::from_param(raw)
                    .map_err(|e| OgcError::BadRequest(e.to_string()))?;
                let storage_srid = self
                    .with_deadline("storage srid lookup", registry::storage_srid(&self.pool, id))
                    .await?;
                Some(BboxFilter {
                    bbox,
                    bbox_srid: srid_for(&crs, params.get("bbox-crs"))?,
                    storage_srid,
                })
            }
            None => None,
        };

        let mut spec = FeatureQuerySpec::new(id, output_srid).with_paging(paging);
        if let Some(bbox) = bbox {
            spec = spec.with_bbox(bbox);
        }
        if let Some(temporal) = temporal {
            spec = spec.with_temporal(temporal);
        }
        if let Some((key, value)) = property {
            spec = spec.with_property(key, value);
        }

        let count_stmt = spec.render_count();
        let select_stmt = spec.render_select();
        tracing::debug!("count query: {}", count_stmt.sql);
        tracing::debug!("select query: {}", select_stmt.sql);

        // Count and select run over the same connection so both see, as far
        // as possible, the same state under concurrent writes.
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| opaque_db_error("connection acquire", e))?;

        let number_matched: i64 = self
            .with_deadline("count query", async {
                let row = bind_params(&count_stmt)
                    .fetch_one(&mut *conn)
                    .await
                    .map_err(|e| opaque_db_error("count query", e))?;
                row.try_get("count")
                    .map_err(|e| opaque_db_error("count query", e))
            })
            .await?;
        tracing::debug!("numberMatched: {}", number_matched);

        let rows = self
            .with_deadline("select query", async {
                bind_params(&select_stmt)
                    .fetch_all(&mut *conn)
                    .await
                    .map_err(|e| opaque_db_error("select query", e))
            })
            .await?;

        if rows.is_empty() {
            return Err(OgcError::NotFound("Features not found".to_string()));
        }

        let features = rows
            .into_iter()
            .map(row_to_feature)
            .collect::<OgcResult<Vec<_>>>()?;

        let links = feature_links(&self.config.base_url, collection_id, paging, number_matched);
        Ok(FeatureCollection::new(features, number_matched, links))
    }

    /// Fetch a single feature by id, reprojected to the requested CRS.
    pub async fn get_feature(
        &self,
        collection_id: &str,
        feature_id: &str,
        params: &QueryParams,
    ) -> OgcResult<Feature> {
        tracing::info!(
            "get_feature {} from collection {}",
            feature_id,
            collection_id
        );
        let id = parse_collection_id(collection_id)?;
        let fid = Uuid::parse_str(feature_id)
            .map_err(|_| OgcError::NotFound("Feature not found".to_string()))?;

        let crs = self
            .with_deadline(
                "crs validation",
                registry::resolve_request_crs(&self.pool, id, params),
            )
            .await?;
        self.with_deadline("collection probe", registry::probe_collection(&self.pool, id))
            .await?;

        let output_srid = srid_for(&crs, params.get("crs"))?;
        let sql = format!(
            "SELECT id, itemtype AS type, \
             CAST(ST_AsGeoJSON(ST_Transform(geom, {output_srid}), 9, 0) AS json) AS geometry, \
             properties FROM \"{table}\" WHERE id = $1",
            output_srid = output_srid,
            table = id,
        );

        let row = self
            .with_deadline("feature select", async {
                sqlx::query(&sql)
                    .bind(fid)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| opaque_db_error("feature select", e))
            })
            .await?
            .ok_or_else(|| OgcError::NotFound("Feature not found".to_string()))?;

        let mut feature = row_to_feature(row)?;
        feature.links = Some(item_links(&self.config.base_url, collection_id, feature_id));
        Ok(feature)
    }

    /// Fetch metadata for one collection.
    pub async fn get_collection(&self, collection_id: &str) -> OgcResult<Collection> {
        tracing::info!("get_collection {}", collection_id);
        let id = parse_collection_id(collection_id)?;

        let row = self
            .with_deadline("collection select", async {
                sqlx::query_as::<_, CollectionRow>(&collection_sql(
                    " HAVING collections_details.id = $1",
                ))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| opaque_db_error("collection select", e))
            })
            .await?;

        match row {
            Some(row) => Ok(row.into()),
            None => Err(OgcError::CollectionNotFound),
        }
    }

    /// Fetch metadata for all collections.
    pub async fn list_collections(&self) -> OgcResult<Vec<Collection>> {
        tracing::info!("list_collections");
        let rows = self
            .with_deadline("collections select", async {
                sqlx::query_as::<_, CollectionRow>(&collection_sql(""))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|e| opaque_db_error("collections select", e))
            })
            .await?;

        if rows.is_empty() {
            tracing::error!("Collections table is empty!");
            return Err(OgcError::InternalError);
        }

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Resolve a referenced CRS code (or the server default) against the
/// validated mapping. A miss here means the pipeline skipped validation,
/// which is an internal fault, not a caller error.
fn srid_for(crs: &HashMap<String, i32>, code: Option<&str>) -> OgcResult<i32> {
    let code = code.unwrap_or(DEFAULT_SERVER_CRS);
    crs.get(code).copied().ok_or_else(|| {
        tracing::error!("CRS {} missing from validated mapping", code);
        OgcError::InternalError
    })
}

/// Bind a rendered statement's parameters in `$n` order.
fn bind_params(stmt: &SqlStatement) -> sqlx::query::Query<'_, sqlx::Postgres, PgArguments> {
    let mut query = sqlx::query(stmt.sql.as_str());
    for value in &stmt.params {
        query = match value {
            SqlValue::Float(v) => query.bind(*v),
            SqlValue::Int(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.clone()),
            SqlValue::Timestamp(v) => query.bind(*v),
        };
    }
    query
}

/// Typed mapping from a feature row to the response model.
fn row_to_feature(row: sqlx::postgres::PgRow) -> OgcResult<Feature> {
    let id: Uuid = row
        .try_get("id")
        .map_err(|e| opaque_db_error("feature row", e))?;
    let item_type: Option<String> = row
        .try_get("type")
        .map_err(|e| opaque_db_error("feature row", e))?;
    let geometry: sqlx::types::Json<serde_json::Value> = row
        .try_get("geometry")
        .map_err(|e| opaque_db_error("feature row", e))?;
    let properties: sqlx::types::Json<serde_json::Value> = row
        .try_get("properties")
        .map_err(|e| opaque_db_error("feature row", e))?;

    Ok(Feature {
        id,
        item_type,
        geometry: geometry.0,
        properties: properties.0,
        links: None,
    })
}

/// Links for a feature-collection page: self + alternate, plus next while
/// more pages remain.
fn feature_links(
    base_url: &str,
    collection_id: &str,
    paging: Paging,
    number_matched: i64,
) -> Vec<Link> {
    let items_url = format!("{}/collections/{}/items", base_url, collection_id);
    let mut links = vec![
        Link::self_link(&items_url, ogc_common::link::GEO_JSON),
        Link::alternate(&items_url, ogc_common::link::GEO_JSON),
    ];

    if paging.has_next(number_matched) {
        links.push(Link::next(
            format!(
                "{}?offset={}&limit={}",
                items_url,
                paging.next_offset(),
                paging.limit
            ),
            ogc_common::link::GEO_JSON,
        ));
    }

    links
}

/// Links for a single-feature response: self + owning collection.
fn item_links(base_url: &str, collection_id: &str, feature_id: &str) -> Vec<Link> {
    vec![
        Link::self_link(
            format!(
                "{}/collections/{}/items/{}",
                base_url, collection_id, feature_id
            ),
            ogc_common::link::GEO_JSON,
        ),
        Link::new(
            format!("{}/collections/{}", base_url, collection_id),
            "collection",
            ogc_common::link::JSON,
        ),
    ]
}

/// Collection metadata statement; the supported CRS codes are aggregated
/// from the registry join.
fn collection_sql(having: &str) -> String {
    format!(
        "SELECT collections_details.id, title, description, datetime_key, \
         array_agg(crs_to_srid.crs) AS crs, collections_details.crs AS storage_crs, \
         bbox, temporal, type \
         FROM collections_details \
         JOIN collection_supported_crs \
         ON collections_details.id = collection_supported_crs.collection_id \
         JOIN crs_to_srid ON crs_to_srid.id = collection_supported_crs.crs_id \
         GROUP BY collections_details.id{}",
        having
    )
}

/// Row type for collection metadata queries.
#[derive(FromRow)]
struct CollectionRow {
    id: Uuid,
    title: Option<String>,
    description: Option<String>,
    datetime_key: Option<String>,
    crs: Vec<String>,
    storage_crs: String,
    bbox: Option<Vec<f64>>,
    temporal: Option<Vec<String>>,
    #[sqlx(rename = "type")]
    collection_type: Option<String>,
}

impl From<CollectionRow> for Collection {
    fn from(row: CollectionRow) -> Self {
        Collection {
            id: row.id,
            title: row.title,
            description: row.description,
            datetime_key: row.datetime_key,
            supported_crs: row.crs,
            storage_crs: row.storage_crs,
            bbox: row.bbox,
            temporal: row.temporal,
            collection_type: row.collection_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn lazy_store(query_timeout: Duration) -> FeatureStore {
        let config = EngineConfig {
            query_timeout,
            ..EngineConfig::default()
        };
        let pool = PgPool::connect_lazy(&config.database_url).unwrap();
        FeatureStore::with_pool(pool, config)
    }

    #[test]
    fn test_deadline_passes_through_ready_results() {
        tokio_test::block_on(async {
            let store = lazy_store(Duration::from_millis(50));
            let ok: OgcResult<i32> = store.with_deadline("ready", async { Ok(7) }).await;
            assert_eq!(ok.unwrap(), 7);

            let err: OgcResult<i32> = store
                .with_deadline("ready", async { Err(OgcError::CollectionNotFound) })
                .await;
            assert_eq!(err.unwrap_err(), OgcError::CollectionNotFound);
        });
    }

    #[test]
    fn test_elapsed_deadline_is_opaque_internal_error() {
        tokio_test::block_on(async {
            let store = lazy_store(Duration::from_millis(10));
            let result: OgcResult<()> = store
                .with_deadline("stalled", std::future::pending())
                .await;
            assert_eq!(result.unwrap_err(), OgcError::InternalError);
        });
    }

    #[test]
    fn test_next_link_present_when_more_pages() {
        let paging = Paging {
            limit: 10,
            offset: 1,
        };
        let links = feature_links("http://localhost:8080", "abc", paging, 20);

        assert_eq!(links.len(), 3);
        let next = links.iter().find(|l| l.rel == "next").unwrap();
        assert!(next.href.ends_with("/collections/abc/items?offset=11&limit=10"));
    }

    #[test]
    fn test_next_link_absent_on_last_page() {
        let paging = Paging {
            limit: 10,
            offset: 1,
        };
        let links = feature_links("http://localhost:8080", "abc", paging, 11);

        assert!(links.iter().all(|l| l.rel != "next"));
        assert!(links.iter().any(|l| l.rel == "self"));
        assert!(links.iter().any(|l| l.rel == "alternate"));
    }

    #[test]
    fn test_item_links() {
        let links = item_links("http://localhost:8080", "abc", "def");
        let this = links.iter().find(|l| l.rel == "self").unwrap();
        assert_eq!(this.href, "http://localhost:8080/collections/abc/items/def");
        let parent = links.iter().find(|l| l.rel == "collection").unwrap();
        assert_eq!(parent.href, "http://localhost:8080/collections/abc");
        assert_eq!(parent.media_type, "application/json");
    }

    #[test]
    fn test_srid_for_uses_default_code() {
        let crs = HashMap::from([(DEFAULT_SERVER_CRS.to_string(), 4326)]);
        assert_eq!(srid_for(&crs, None).unwrap(), 4326);
        assert!(srid_for(&crs, Some("http://www.opengis.net/def/crs/EPSG/0/3857")).is_err());
    }
}
