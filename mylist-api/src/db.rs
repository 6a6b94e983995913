//! Database Connection Pool Module
//!
//! PostgreSQL connection pooling with deadpool-postgres, plus the Postgres
//! implementations of [`MembershipStore`] and [`ContentLookup`].
//!
//! The membership table is keyed for keyset pagination: a unique index on
//! `(user_id, content_id)` enforces one membership per pair, and an index on
//! `(user_id, added_at DESC, id DESC)` serves `query_page` without sorting.

use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolError, RecyclingMethod, Runtime};
use mylist_core::{
    ContentId, ContentLookup, ContentMetadata, ContentType, EntityIdType, EpisodeId,
    EpisodeMetadata, LookupError, MembershipRecord, MyListResult, NewMembership, RecordId,
    Snapshot, StorageError, Timestamp, UserId, Visibility,
};
use mylist_storage::{MembershipStore, PageQuery};
use std::time::Duration;
use tokio_postgres::{NoTls, Row};
use uuid::Uuid;

use crate::constants::{DEFAULT_DB_POOL_SIZE, DEFAULT_DB_TIMEOUT_SECS, UNIQUE_VIOLATION};
use crate::error::{ApiError, ApiResult};

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Wait and connect timeout
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "mylist".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: DEFAULT_DB_POOL_SIZE,
            timeout: Duration::from_secs(DEFAULT_DB_TIMEOUT_SECS),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from `MYLIST_DB_*` variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("MYLIST_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("MYLIST_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("MYLIST_DB_NAME").unwrap_or_else(|_| "mylist".to_string()),
            user: std::env::var("MYLIST_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("MYLIST_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("MYLIST_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_DB_POOL_SIZE),
            timeout: Duration::from_secs(
                std::env::var("MYLIST_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DB_TIMEOUT_SECS),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());
        cfg.connect_timeout = Some(self.timeout);

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_config = deadpool_postgres::PoolConfig::new(self.max_size);
        pool_config.timeouts.wait = Some(self.timeout);
        cfg.pool = Some(pool_config);

        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))
    }
}

// ============================================================================
// ERROR MAPPING
// ============================================================================

fn pool_error(err: PoolError) -> StorageError {
    tracing::error!("Connection pool error: {:?}", err);
    match err {
        PoolError::Timeout(_) => StorageError::Timeout {
            operation: "acquire connection".to_string(),
        },
        other => StorageError::Backend {
            reason: other.to_string(),
        },
    }
}

fn query_error(err: tokio_postgres::Error) -> StorageError {
    tracing::error!("Database error: {:?}", err);
    StorageError::Backend {
        reason: err.to_string(),
    }
}

fn is_unique_violation(err: &tokio_postgres::Error) -> bool {
    err.code()
        .map(|state| state.code() == UNIQUE_VIOLATION)
        .unwrap_or(false)
}

fn column<'a, T>(row: &'a Row, name: &str) -> Result<T, StorageError>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get(name).map_err(|e| StorageError::Backend {
        reason: format!("column {}: {}", name, e),
    })
}

// ============================================================================
// MEMBERSHIP STORE
// ============================================================================

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS mylist_items (
    id           UUID PRIMARY KEY,
    user_id      UUID NOT NULL,
    content_id   UUID NOT NULL,
    content_type TEXT NOT NULL CHECK (content_type IN ('movie', 'show')),
    episode_id   UUID,
    added_at     TIMESTAMPTZ NOT NULL,
    snapshot     JSONB NOT NULL,
    visibility   TEXT NOT NULL DEFAULT 'available'
);
CREATE UNIQUE INDEX IF NOT EXISTS mylist_items_user_content_idx
    ON mylist_items (user_id, content_id);
CREATE INDEX IF NOT EXISTS mylist_items_user_order_idx
    ON mylist_items (user_id, added_at DESC, id DESC);
"#;

const SELECT_COLUMNS: &str =
    "id, user_id, content_id, content_type, episode_id, added_at, snapshot, visibility";

/// Membership store backed by the `mylist_items` table.
#[derive(Clone)]
pub struct PgMembershipStore {
    pool: Pool,
}

impl PgMembershipStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create the table and its indexes if they do not exist.
    pub async fn ensure_schema(&self) -> MyListResult<()> {
        let conn = self.pool.get().await.map_err(pool_error)?;
        conn.batch_execute(SCHEMA).await.map_err(query_error)?;
        tracing::info!("mylist_items schema ready");
        Ok(())
    }

    async fn conn(&self) -> Result<deadpool_postgres::Object, StorageError> {
        self.pool.get().await.map_err(pool_error)
    }

    fn record_from_row(row: &Row) -> Result<MembershipRecord, StorageError> {
        let content_type: String = column(row, "content_type")?;
        let content_type = content_type
            .parse::<ContentType>()
            .map_err(|e| StorageError::Backend {
                reason: e.to_string(),
            })?;
        let visibility: String = column(row, "visibility")?;
        let visibility = visibility
            .parse::<Visibility>()
            .map_err(|reason| StorageError::Backend { reason })?;
        let snapshot: serde_json::Value = column(row, "snapshot")?;
        let snapshot: Snapshot =
            serde_json::from_value(snapshot).map_err(|e| StorageError::Backend {
                reason: format!("snapshot: {}", e),
            })?;

        Ok(MembershipRecord {
            id: RecordId::new(column::<Uuid>(row, "id")?),
            user_id: UserId::new(column::<Uuid>(row, "user_id")?),
            content_id: ContentId::new(column::<Uuid>(row, "content_id")?),
            content_type,
            episode_id: column::<Option<Uuid>>(row, "episode_id")?.map(EpisodeId::new),
            added_at: column::<Timestamp>(row, "added_at")?,
            snapshot,
            visibility,
        })
    }
}

#[async_trait]
impl MembershipStore for PgMembershipStore {
    async fn insert(&self, membership: NewMembership) -> MyListResult<MembershipRecord> {
        let record = membership.into_record();
        let snapshot = serde_json::to_value(&record.snapshot).map_err(|e| {
            StorageError::Backend {
                reason: format!("snapshot: {}", e),
            }
        })?;
        let conn = self.conn().await?;

        let result = conn
            .execute(
                "INSERT INTO mylist_items \
                 (id, user_id, content_id, content_type, episode_id, added_at, snapshot, visibility) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                &[
                    &record.id.as_uuid(),
                    &record.user_id.as_uuid(),
                    &record.content_id.as_uuid(),
                    &record.content_type.as_str(),
                    &record.episode_id.map(|e| e.as_uuid()),
                    &record.added_at,
                    &snapshot,
                    &record.visibility.as_str(),
                ],
            )
            .await;

        match result {
            Ok(_) => Ok(record),
            Err(e) if is_unique_violation(&e) => Err(StorageError::Duplicate {
                user_id: record.user_id,
                content_id: record.content_id,
            }
            .into()),
            Err(e) => Err(query_error(e).into()),
        }
    }

    async fn delete_by_user_and_content(
        &self,
        user_id: UserId,
        content_id: ContentId,
    ) -> MyListResult<bool> {
        let conn = self.conn().await?;
        let deleted = conn
            .execute(
                "DELETE FROM mylist_items WHERE user_id = $1 AND content_id = $2",
                &[&user_id.as_uuid(), &content_id.as_uuid()],
            )
            .await
            .map_err(query_error)?;
        Ok(deleted > 0)
    }

    async fn find_by_user_and_content(
        &self,
        user_id: UserId,
        content_id: ContentId,
    ) -> MyListResult<Option<MembershipRecord>> {
        let conn = self.conn().await?;
        let sql = format!(
            "SELECT {} FROM mylist_items WHERE user_id = $1 AND content_id = $2",
            SELECT_COLUMNS
        );
        let row = conn
            .query_opt(sql.as_str(), &[&user_id.as_uuid(), &content_id.as_uuid()])
            .await
            .map_err(query_error)?;
        Ok(row.as_ref().map(Self::record_from_row).transpose()?)
    }

    async fn query_page(&self, query: &PageQuery) -> MyListResult<Vec<MembershipRecord>> {
        let conn = self.conn().await?;
        let sql = format!(
            "SELECT {} FROM mylist_items \
             WHERE user_id = $1 \
               AND ($2::text IS NULL OR content_type = $2) \
               AND ($3::timestamptz IS NULL OR (added_at, id) < ($3, $4::uuid)) \
             ORDER BY added_at DESC, id DESC \
             LIMIT $5",
            SELECT_COLUMNS
        );
        let content_type = query.content_type.map(|t| t.as_str());
        let after_at = query.after.map(|key| key.added_at);
        let after_id = query.after.map(|key| key.record_id.as_uuid());
        let limit = query.fetch_size() as i64;

        let rows = conn
            .query(
                sql.as_str(),
                &[
                    &query.user_id.as_uuid(),
                    &content_type,
                    &after_at,
                    &after_id,
                    &limit,
                ],
            )
            .await
            .map_err(query_error)?;

        Ok(rows
            .iter()
            .map(Self::record_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn count(
        &self,
        user_id: UserId,
        content_type: Option<ContentType>,
    ) -> MyListResult<u64> {
        let conn = self.conn().await?;
        let row = conn
            .query_one(
                "SELECT COUNT(*) FROM mylist_items \
                 WHERE user_id = $1 AND ($2::text IS NULL OR content_type = $2)",
                &[&user_id.as_uuid(), &content_type.map(|t| t.as_str())],
            )
            .await
            .map_err(query_error)?;
        let count: i64 = row.try_get(0).map_err(query_error)?;
        Ok(count.max(0) as u64)
    }

    async fn health_check(&self) -> MyListResult<()> {
        let conn = self.conn().await?;
        conn.query_one("SELECT 1", &[]).await.map_err(query_error)?;
        Ok(())
    }
}

// ============================================================================
// CONTENT LOOKUP
// ============================================================================

/// Content lookup over the `users`, `movies`, `shows` and `episodes` tables.
#[derive(Clone)]
pub struct PgContentLookup {
    pool: Pool,
}

fn lookup_error(err: impl std::fmt::Display) -> LookupError {
    tracing::error!(error = %err, "Content lookup query failed");
    LookupError::Backend {
        reason: err.to_string(),
    }
}

impl PgContentLookup {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn find_titled(
        &self,
        table: &'static str,
        id: ContentId,
    ) -> Result<Option<ContentMetadata>, LookupError> {
        let conn = self.pool.get().await.map_err(lookup_error)?;
        let sql = format!(
            "SELECT title, poster_url, genres, description FROM {} WHERE id = $1",
            table
        );
        let row = conn
            .query_opt(sql.as_str(), &[&id.as_uuid()])
            .await
            .map_err(lookup_error)?;

        row.map(|row| {
            Ok(ContentMetadata {
                title: row.try_get("title").map_err(lookup_error)?,
                poster_url: row.try_get("poster_url").map_err(lookup_error)?,
                genres: row
                    .try_get::<_, Option<Vec<String>>>("genres")
                    .map_err(lookup_error)?
                    .unwrap_or_default(),
                description: row.try_get("description").map_err(lookup_error)?,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl ContentLookup for PgContentLookup {
    async fn user_exists(&self, user_id: UserId) -> Result<bool, LookupError> {
        let conn = self.pool.get().await.map_err(lookup_error)?;
        let row = conn
            .query_one(
                "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)",
                &[&user_id.as_uuid()],
            )
            .await
            .map_err(lookup_error)?;
        row.try_get(0).map_err(lookup_error)
    }

    async fn find_movie(&self, id: ContentId) -> Result<Option<ContentMetadata>, LookupError> {
        self.find_titled("movies", id).await
    }

    async fn find_show(&self, id: ContentId) -> Result<Option<ContentMetadata>, LookupError> {
        self.find_titled("shows", id).await
    }

    async fn find_episode(&self, id: EpisodeId) -> Result<Option<EpisodeMetadata>, LookupError> {
        let conn = self.pool.get().await.map_err(lookup_error)?;
        let row = conn
            .query_opt(
                "SELECT show_id, title, season, episode_number FROM episodes WHERE id = $1",
                &[&id.as_uuid()],
            )
            .await
            .map_err(lookup_error)?;

        row.map(|row| {
            let season: Option<i32> = row.try_get("season").map_err(lookup_error)?;
            let number: Option<i32> = row.try_get("episode_number").map_err(lookup_error)?;
            Ok(EpisodeMetadata {
                show_id: ContentId::new(row.try_get("show_id").map_err(lookup_error)?),
                title: row.try_get("title").map_err(lookup_error)?,
                season: season.and_then(|s| u32::try_from(s).ok()),
                number: number.and_then(|n| u32::try_from(n).ok()),
            })
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_config_default() {
        let config = DbConfig::default();
        assert_eq!(config.port, 5432);
        assert_eq!(config.dbname, "mylist");
        assert_eq!(config.max_size, DEFAULT_DB_POOL_SIZE);
    }

    #[test]
    fn test_schema_declares_indexes() {
        assert!(SCHEMA.contains("UNIQUE INDEX IF NOT EXISTS mylist_items_user_content_idx"));
        assert!(SCHEMA.contains("(user_id, added_at DESC, id DESC)"));
    }
}
