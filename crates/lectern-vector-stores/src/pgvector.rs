//! PostgreSQL with pgvector extension implementation.

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, info};

use lectern_core::error::{ErrorCode, LecternError, LecternResult};
use lectern_core::traits::{
    DistanceMetric, StorageStats, TableInfo, VectorRecord, VectorSearchResult, VectorStore,
    VectorStoreConfig,
};

use pgvector::Vector;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};

/// Connection settings read from the provider-specific part of the config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgConnection {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl PgConnection {
    /// Read `host`, `port`, `database`, `user` and `password`, with local defaults.
    pub fn from_config(config: &serde_json::Value) -> Self {
        let text = |key: &str, default: &str| {
            config
                .get(key)
                .and_then(|v| v.as_str())
                .unwrap_or(default)
                .to_string()
        };
        let port = config
            .get("port")
            .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
            .and_then(|p| u16::try_from(p).ok())
            .unwrap_or(5432);

        Self {
            host: text("host", "localhost"),
            port,
            database: text("database", "ragdb"),
            user: text("user", "raguser"),
            password: text("password", "ragpass"),
        }
    }

    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
fn validate_table_name(name: &str) -> LecternResult<()> {
    let valid = !name.is_empty()
        && name.len() <= 63
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(LecternError::Configuration(format!(
            "invalid table name '{name}': use letters, digits and underscores"
        )))
    }
}

fn db_error(context: &str, err: sqlx::Error) -> LecternError {
    LecternError::VectorStore {
        message: format!("{context}: {err}"),
        code: ErrorCode::VecOperationFailed,
        source: Some(Box::new(err)),
    }
}

fn payload_map(value: serde_json::Value) -> HashMap<String, serde_json::Value> {
    match value {
        serde_json::Value::Object(map) => map.into_iter().collect(),
        _ => HashMap::new(),
    }
}

/// PostgreSQL with pgvector vector store implementation.
pub struct PgVectorStore {
    pool: PgPool,
    config: VectorStoreConfig,
}

impl PgVectorStore {
    /// Connect and enable the pgvector extension.
    ///
    /// `url` in the provider config wins over the individual connection fields.
    pub async fn new(config: VectorStoreConfig) -> LecternResult<Self> {
        validate_table_name(&config.collection_name)?;

        let url = match config.config.get("url").and_then(|v| v.as_str()) {
            Some(url) => url.to_string(),
            None => PgConnection::from_config(&config.config).url(),
        };

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .map_err(|e| LecternError::VectorStore {
                message: format!("Failed to connect to PostgreSQL: {e}"),
                code: ErrorCode::VecConnectionFailed,
                source: Some(Box::new(e)),
            })?;

        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&pool)
            .await
            .map_err(|e| db_error("Failed to enable pgvector", e))?;

        info!(table = %config.collection_name, "Connected to PostgreSQL");
        Ok(Self { pool, config })
    }

    fn distance_operator(metric: DistanceMetric) -> &'static str {
        match metric {
            DistanceMetric::Cosine => "<=>",
            DistanceMetric::Euclidean => "<->",
            DistanceMetric::DotProduct => "<#>",
        }
    }

    fn index_method(metric: DistanceMetric) -> &'static str {
        match metric {
            DistanceMetric::Cosine => "vector_cosine_ops",
            DistanceMetric::Euclidean => "vector_l2_ops",
            DistanceMetric::DotProduct => "vector_ip_ops",
        }
    }

    /// Convert a pgvector distance into a similarity where higher is closer.
    fn similarity(metric: DistanceMetric, distance: f64) -> f32 {
        let score = match metric {
            DistanceMetric::Cosine => 1.0 - distance,
            // <#> returns the negated inner product
            DistanceMetric::DotProduct => -distance,
            DistanceMetric::Euclidean => 1.0 / (1.0 + distance),
        };
        score as f32
    }

    fn row_to_record(row: &sqlx::postgres::PgRow) -> VectorRecord {
        let vector: Vector = row.get("vector");
        let payload: serde_json::Value = row.get("payload");
        VectorRecord {
            id: row.get("id"),
            vector: vector.to_vec(),
            payload: payload_map(payload),
        }
    }
}

#[async_trait]
impl VectorStore for PgVectorStore {
    async fn create_collection(
        &self,
        dimension: usize,
        distance: DistanceMetric,
    ) -> LecternResult<()> {
        let name = self.collection_name();
        let ops = Self::index_method(distance);

        let create_table = format!(
            r#"
            CREATE TABLE IF NOT EXISTS "{name}" (
                id TEXT PRIMARY KEY,
                vector vector({dimension}),
                payload JSONB DEFAULT '{{}}'::jsonb
            )
            "#
        );

        sqlx::query(&create_table)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to create table", e))?;

        // HNSW index for efficient similarity search
        let create_index = format!(
            r#"
            CREATE INDEX IF NOT EXISTS "{name}_vector_idx"
            ON "{name}" USING hnsw (vector {ops})
            WITH (m = 16, ef_construction = 64)
            "#
        );

        sqlx::query(&create_index)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to create index", e))?;

        debug!(table = name, dimension, "Collection ready");
        Ok(())
    }

    async fn insert(&self, records: Vec<VectorRecord>) -> LecternResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let query = format!(
            r#"
            INSERT INTO "{}" (id, vector, payload)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET
                vector = EXCLUDED.vector,
                payload = EXCLUDED.payload
            "#,
            self.collection_name()
        );

        // One transaction per document so a failed chunk leaves no partial index.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        let count = records.len();
        for record in records {
            let vector = Vector::from(record.vector);
            let payload = serde_json::to_value(&record.payload)?;

            sqlx::query(&query)
                .bind(&record.id)
                .bind(&vector)
                .bind(&payload)
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error("Failed to insert vector", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit vectors", e))?;

        debug!(table = self.collection_name(), count, "Inserted vectors");
        Ok(())
    }

    async fn search(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> LecternResult<Vec<VectorSearchResult>> {
        let metric = self.config.distance;
        let query = format!(
            r#"
            SELECT id, payload, (vector {} $1)::float8 AS distance
            FROM "{}"
            ORDER BY distance
            LIMIT $2
            "#,
            Self::distance_operator(metric),
            self.collection_name()
        );

        let rows = sqlx::query(&query)
            .bind(Vector::from(query_vector.to_vec()))
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to search", e))?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let distance: f64 = row.get("distance");
                let payload: serde_json::Value = row.get("payload");
                VectorSearchResult {
                    id: row.get("id"),
                    score: Self::similarity(metric, distance),
                    payload: payload_map(payload),
                }
            })
            .collect())
    }

    async fn get(&self, id: &str) -> LecternResult<Option<VectorRecord>> {
        let query = format!(
            r#"SELECT id, vector, payload FROM "{}" WHERE id = $1"#,
            self.collection_name()
        );

        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to get vector", e))?;

        Ok(row.as_ref().map(Self::row_to_record))
    }

    async fn delete(&self, id: &str) -> LecternResult<()> {
        let query = format!(r#"DELETE FROM "{}" WHERE id = $1"#, self.collection_name());

        sqlx::query(&query)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to delete vector", e))?;

        Ok(())
    }

    async fn count(&self) -> LecternResult<u64> {
        let query = format!(r#"SELECT COUNT(*) AS count FROM "{}""#, self.collection_name());

        let row = sqlx::query(&query)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to get count", e))?;

        let count: i64 = row.get("count");
        Ok(count as u64)
    }

    async fn clear(&self) -> LecternResult<u64> {
        let query = format!(r#"DELETE FROM "{}""#, self.collection_name());

        let result = sqlx::query(&query)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to clear table", e))?;

        Ok(result.rows_affected())
    }

    async fn stats(&self) -> LecternResult<StorageStats> {
        let size: i64 = sqlx::query("SELECT pg_database_size(current_database()) AS size")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to read database size", e))?
            .get("size");

        let rows = sqlx::query(
            r#"
            SELECT
                t.tablename AS name,
                pg_size_pretty(pg_total_relation_size(format('%I.%I', t.schemaname, t.tablename))) AS size,
                COALESCE(
                    array_agg(
                        i.indexname || ' (' ||
                        pg_size_pretty(pg_relation_size(format('%I.%I', i.schemaname, i.indexname))) || ')'
                        ORDER BY i.indexname
                    ) FILTER (WHERE i.indexname IS NOT NULL),
                    '{}'
                ) AS indexes
            FROM pg_tables t
            LEFT JOIN pg_indexes i
                ON i.schemaname = t.schemaname AND i.tablename = t.tablename
            WHERE t.schemaname = 'public'
            GROUP BY t.schemaname, t.tablename
            ORDER BY t.tablename
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list tables", e))?;

        let tables = rows
            .into_iter()
            .map(|row| TableInfo {
                name: row.get("name"),
                size: row.get("size"),
                indexes: row.get("indexes"),
            })
            .collect();

        Ok(StorageStats {
            backend: "pgvector".to_string(),
            vector_count: self.count().await?,
            size_bytes: Some(size.max(0) as u64),
            tables,
        })
    }

    fn collection_name(&self) -> &str {
        &self.config.collection_name
    }
}
