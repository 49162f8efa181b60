use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::infrastructure::traits::RemoteStore;
use crate::models::EntityKind;

/// SQLite implementation of the remote store for local development and
/// tests. Rows are stored as JSON documents per collection.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn new_in_memory() -> AppResult<Self> {
        // A single long-lived connection: each in-memory connection is its
        // own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to connect to in-memory SQLite: {}", e))
            })?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    pub async fn connect(url: &str) -> AppResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(url)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to {}: {}", url, e)))?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    pub async fn initialize(&self) -> AppResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                scope TEXT,
                data TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("Failed to create records table: {}", e)))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_records_scope ON records(collection, scope)")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to create scope index: {}", e)))?;

        info!("SQLite store initialised");
        Ok(())
    }

    fn scope_of(kind: EntityKind, row: &Value) -> Option<String> {
        kind.scope_column()
            .and_then(|column| row.get(column))
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    async fn fetch_row(&self, kind: EntityKind, id: Uuid) -> AppResult<Option<Value>> {
        let row = sqlx::query("SELECT data FROM records WHERE collection = ? AND id = ?")
            .bind(kind.table())
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let data: String = row.try_get("data")?;
                Ok(Some(serde_json::from_str(&data)?))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl RemoteStore for SqliteStore {
    #[instrument(skip(self))]
    async fn get(&self, kind: EntityKind, id: Uuid) -> AppResult<Value> {
        self.fetch_row(kind, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {} not found", kind, id)))
    }

    #[instrument(skip(self))]
    async fn list(&self, kind: EntityKind, scope: &str) -> AppResult<Vec<Value>> {
        let order = kind.list_order();
        // Column names come from EntityKind, never from input.
        let order_clause = format!(
            "ORDER BY json_extract(data, '$.{}') IS NULL, json_extract(data, '$.{}') {}, rowid",
            order.column,
            order.column,
            if order.descending { "DESC" } else { "ASC" }
        );

        let rows = match kind.scope_column() {
            Some(_) => {
                let sql = format!(
                    "SELECT data FROM records WHERE collection = ? AND scope = ? {}",
                    order_clause
                );
                sqlx::query(&sql)
                    .bind(kind.table())
                    .bind(scope)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!("SELECT data FROM records WHERE collection = ? {}", order_clause);
                sqlx::query(&sql)
                    .bind(kind.table())
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        let mut values = Vec::with_capacity(rows.len());
        for row in rows {
            let data: String = row.try_get("data")?;
            values.push(serde_json::from_str(&data)?);
        }
        debug!("listed {} rows of {}", values.len(), kind);
        Ok(values)
    }

    #[instrument(skip(self, row))]
    async fn create(&self, kind: EntityKind, row: Value) -> AppResult<Value> {
        let id = row
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::Validation(format!("{} row has no id", kind)))?
            .to_string();
        if kind.scope_column().is_some() && Self::scope_of(kind, &row).is_none() {
            return Err(AppError::Validation(format!(
                "{} row has no {}",
                kind,
                kind.scope_column().unwrap_or_default()
            )));
        }

        let result = sqlx::query(
            "INSERT INTO records (collection, id, scope, data) VALUES (?, ?, ?, ?)",
        )
        .bind(kind.table())
        .bind(&id)
        .bind(Self::scope_of(kind, &row))
        .bind(serde_json::to_string(&row)?)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(row),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(
                AppError::Validation(format!("{} {} already exists", kind, id)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, changes))]
    async fn update(&self, kind: EntityKind, id: Uuid, changes: Value) -> AppResult<Value> {
        let changes = match changes {
            Value::Object(map) => map,
            _ => {
                return Err(AppError::Validation(format!(
                    "update of {} {} needs an object of changes",
                    kind, id
                )))
            }
        };

        let mut row = self
            .fetch_row(kind, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {} not found", kind, id)))?;

        if let Value::Object(fields) = &mut row {
            for (column, value) in changes {
                fields.insert(column, value);
            }
            if fields.contains_key("updated_at") {
                fields.insert("updated_at".to_string(), serde_json::to_value(Utc::now())?);
            }
        }

        sqlx::query("UPDATE records SET scope = ?, data = ? WHERE collection = ? AND id = ?")
            .bind(Self::scope_of(kind, &row))
            .bind(serde_json::to_string(&row)?)
            .bind(kind.table())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(row)
    }

    #[instrument(skip(self))]
    async fn delete(&self, kind: EntityKind, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM records WHERE collection = ? AND id = ?")
            .bind(kind.table())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        debug!("deleted {} rows of {}", result.rows_affected(), kind);
        Ok(())
    }
}
