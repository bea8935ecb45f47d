//! Continuation store facade and its sqlx backends.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{PgPool, SqlitePool};
use tracing::debug;

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::snapshot::{ContinuationToken, SuspendSnapshot};

static SQLITE_MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations/sqlite");
static POSTGRES_MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations/postgres");

// SQLite has no advisory migration lock; concurrent invocations opening the
// same database must not race schema setup.
static SQLITE_SETUP_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

/// Backend interface for snapshot rows.
#[async_trait]
trait ContinuationBackend: Send + Sync {
    async fn insert(
        &self,
        token: &str,
        snapshot: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Fetch the snapshot payload for `token` if it has not expired by `now`.
    async fn fetch_unexpired(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, StoreError>;

    async fn close(&self);
}

/// Durable, expiring storage of suspend snapshots addressed by opaque tokens.
///
/// One invocation owns one store connection: open it with [`connect`],
/// release it with [`close`] on every exit path.
///
/// [`connect`]: ContinuationStore::connect
/// [`close`]: ContinuationStore::close
pub struct ContinuationStore {
    backend: Box<dyn ContinuationBackend>,
}

impl ContinuationStore {
    /// Connect to the store named by the configuration URL. The URL scheme
    /// selects the backend: `sqlite:` or `postgres:`.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let backend: Box<dyn ContinuationBackend> = if config.url.starts_with("sqlite") {
            Box::new(SqliteContinuations::connect(config).await?)
        } else {
            Box::new(PostgresContinuations::connect(config).await?)
        };

        debug!(url = %config.url, "continuation store connected");
        Ok(Self { backend })
    }

    /// Persist a snapshot, auto-expiring after `ttl`. Returns the freshly
    /// generated token addressing it. Safe under concurrent calls from
    /// unrelated runs.
    pub async fn put(
        &self,
        snapshot: &SuspendSnapshot,
        ttl: Duration,
    ) -> Result<ContinuationToken, StoreError> {
        let token = ContinuationToken::generate();
        let payload = serde_json::to_string(snapshot)?;
        let created_at = Utc::now();
        let expires_at = created_at + chrono::Duration::seconds(ttl.as_secs() as i64);

        self.backend
            .insert(token.as_str(), &payload, created_at, expires_at)
            .await?;

        debug!(token = %token, ttl_secs = ttl.as_secs(), "snapshot stored");
        Ok(token)
    }

    /// Look up the snapshot for `token`. Returns `Ok(None)` for unknown or
    /// expired tokens.
    pub async fn get(
        &self,
        token: &ContinuationToken,
    ) -> Result<Option<SuspendSnapshot>, StoreError> {
        match self
            .backend
            .fetch_unexpired(token.as_str(), Utc::now())
            .await?
        {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    /// Release the underlying connection. Called exactly once per
    /// invocation, on every exit path.
    pub async fn close(&self) {
        self.backend.close().await;
        debug!("continuation store closed");
    }
}

/// SQLite-backed continuations, for local development and tests.
struct SqliteContinuations {
    pool: SqlitePool,
}

impl SqliteContinuations {
    async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|e| StoreError::Connect {
                url: config.url.clone(),
                details: e.to_string(),
            })?;

        let _guard = SQLITE_SETUP_LOCK.lock().await;
        SQLITE_MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend {
                operation: "migrate",
                details: e.to_string(),
            })?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl ContinuationBackend for SqliteContinuations {
    async fn insert(
        &self,
        token: &str,
        snapshot: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO continuations (token, snapshot, created_at, expires_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(token)
        .bind(snapshot)
        .bind(created_at)
        .bind(expires_at.timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend {
            operation: "put",
            details: e.to_string(),
        })?;

        Ok(())
    }

    async fn fetch_unexpired(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, StoreError> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT snapshot FROM continuations
            WHERE token = ? AND expires_at > ?
            "#,
        )
        .bind(token)
        .bind(now.timestamp())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Backend {
            operation: "get",
            details: e.to_string(),
        })?;

        Ok(row.map(|r| r.0))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// PostgreSQL-backed continuations, the deployed store endpoint.
struct PostgresContinuations {
    pool: PgPool,
}

impl PostgresContinuations {
    async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|e| StoreError::Connect {
                url: config.url.clone(),
                details: e.to_string(),
            })?;

        POSTGRES_MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend {
                operation: "migrate",
                details: e.to_string(),
            })?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl ContinuationBackend for PostgresContinuations {
    async fn insert(
        &self,
        token: &str,
        snapshot: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO continuations (token, snapshot, created_at, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(token)
        .bind(snapshot)
        .bind(created_at)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend {
            operation: "put",
            details: e.to_string(),
        })?;

        Ok(())
    }

    async fn fetch_unexpired(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, StoreError> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT snapshot FROM continuations
            WHERE token = $1 AND expires_at > $2
            "#,
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Backend {
            operation: "get",
            details: e.to_string(),
        })?;

        Ok(row.map(|r| r.0))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
