use async_trait::async_trait;
use snip_core::{DeleteIntent, LinkRecord, LinkStore, Result, ShortCode, StoreError};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::collections::HashMap;

/// Postgres implementation of the store contract.
///
/// `original_url` carries a unique constraint; a violation on insert is
/// classified as [`StoreError::Conflict`] so the write path can resolve
/// it to the pre-existing code. Soft delete is a plain `is_deleted`
/// column: tombstoned rows stay in the table and keep their code
/// reserved.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS links (
    short_code   TEXT PRIMARY KEY,
    original_url TEXT NOT NULL UNIQUE,
    owner_id     TEXT NOT NULL DEFAULT '',
    is_deleted   BOOLEAN NOT NULL DEFAULT FALSE
)
"#;

impl PostgresStore {
    /// Creates a store from an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a new connection pool and bootstraps the table.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StoreError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StoreError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StoreError::InvalidData(message),
        _ => StoreError::Query(message),
    }
}

fn record_from_row(row: &sqlx::postgres::PgRow) -> Result<LinkRecord> {
    let short_code: String = row.try_get("short_code").map_err(map_sqlx_error)?;
    let original_url: String = row.try_get("original_url").map_err(map_sqlx_error)?;
    let owner_id: String = row.try_get("owner_id").map_err(map_sqlx_error)?;
    let is_deleted: bool = row.try_get("is_deleted").map_err(map_sqlx_error)?;

    Ok(LinkRecord {
        short_code: ShortCode::new_unchecked(short_code),
        original_url,
        owner_id,
        is_deleted,
    })
}

#[async_trait]
impl LinkStore for PostgresStore {
    async fn insert(&self, record: &LinkRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO links (short_code, original_url, owner_id)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(record.short_code.as_str())
        .bind(&record.original_url)
        .bind(&record.owner_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(StoreError::Conflict(record.original_url.clone()))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn insert_batch(&self, records: &[LinkRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        for record in records {
            let result = sqlx::query(
                r#"
                INSERT INTO links (short_code, original_url, owner_id)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(record.short_code.as_str())
            .bind(&record.original_url)
            .bind(&record.owner_id)
            .execute(&mut *tx)
            .await;

            match result {
                Ok(_) => {}
                Err(err) if is_unique_violation(&err) => {
                    return Err(StoreError::Conflict(record.original_url.clone()));
                }
                Err(err) => return Err(map_sqlx_error(err)),
            }
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn lookup_by_original(&self, original_url: &str) -> Result<ShortCode> {
        let row = sqlx::query(
            r#"
            SELECT short_code
            FROM links
            WHERE original_url = $1
            LIMIT 1
            "#,
        )
        .bind(original_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Err(StoreError::NotFound);
        };

        let short_code: String = row.try_get("short_code").map_err(map_sqlx_error)?;
        Ok(ShortCode::new_unchecked(short_code))
    }

    async fn lookup_by_owner(&self, owner_id: &str) -> Result<Vec<LinkRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT short_code, original_url, owner_id, is_deleted
            FROM links
            WHERE owner_id = $1
              AND is_deleted = FALSE
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(record_from_row).collect()
    }

    async fn batch_tombstone(&self, intents: &[DeleteIntent]) -> Result<()> {
        if intents.is_empty() {
            return Ok(());
        }

        // One UPDATE per owner group; the code list binds as a Postgres
        // array for `= ANY`.
        let mut by_owner: HashMap<&str, Vec<String>> = HashMap::new();
        for intent in intents {
            by_owner
                .entry(intent.owner_id.as_str())
                .or_default()
                .push(intent.short_code.as_str().to_owned());
        }

        for (owner_id, codes) in by_owner {
            sqlx::query(
                r#"
                UPDATE links
                SET is_deleted = TRUE
                WHERE owner_id = $1
                  AND short_code = ANY($2)
                "#,
            )
            .bind(owner_id)
            .bind(&codes)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        }

        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<LinkRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT short_code, original_url, owner_id, is_deleted
            FROM links
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(record_from_row).collect()
    }
}
