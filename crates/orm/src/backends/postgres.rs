//! PostgreSQL backend over sqlx
//!
//! Pools are created lazily so that building an engine never opens a
//! connection; offline operations on an unreachable database still work.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use crate::backends::core::{Database, DatabaseConnection};
use crate::error::{OrmError, OrmResult};

pub struct PostgresDatabase {
    pool: PgPool,
}

impl PostgresDatabase {
    pub fn new(url: &str) -> OrmResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(url)
            .map_err(|e| OrmError::database(format!("failed to configure pool: {}", e)))?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Database for PostgresDatabase {
    async fn connect(&self) -> OrmResult<Box<dyn DatabaseConnection>> {
        let connection = self
            .pool
            .acquire()
            .await
            .map_err(|e| OrmError::database(format!("failed to acquire connection: {}", e)))?;
        Ok(Box::new(PostgresConnection { connection }))
    }
}

pub struct PostgresConnection {
    connection: sqlx::pool::PoolConnection<sqlx::Postgres>,
}

#[async_trait]
impl DatabaseConnection for PostgresConnection {
    async fn execute(&mut self, sql: &str) -> OrmResult<u64> {
        let result = sqlx::query(sql)
            .execute(&mut *self.connection)
            .await
            .map_err(|e| OrmError::database(format!("failed to execute {:?}: {}", sql, e)))?;
        Ok(result.rows_affected())
    }

    async fn fetch_scalar(&mut self, sql: &str) -> OrmResult<Option<String>> {
        let row = sqlx::query(sql)
            .fetch_optional(&mut *self.connection)
            .await
            .map_err(|e| OrmError::database(format!("failed to query {:?}: {}", sql, e)))?;
        match row {
            Some(row) => Ok(Some(row.try_get::<String, _>(0)?)),
            None => Ok(None),
        }
    }

    async fn table_exists(&mut self, table: &str) -> OrmResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_name = $1)",
        )
        .bind(table)
        .fetch_one(&mut *self.connection)
        .await?;
        Ok(exists)
    }

    async fn table_names(&mut self) -> OrmResult<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' \
             ORDER BY table_name",
        )
        .fetch_all(&mut *self.connection)
        .await?;
        Ok(names)
    }

    async fn table_columns(&mut self, table: &str) -> OrmResult<Vec<String>> {
        let columns: Vec<String> = sqlx::query_scalar(
            "SELECT column_name FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = $1 \
             ORDER BY ordinal_position",
        )
        .bind(table)
        .fetch_all(&mut *self.connection)
        .await?;
        Ok(columns)
    }

    async fn begin(&mut self) -> OrmResult<()> {
        self.execute("BEGIN").await.map(|_| ())
    }

    async fn commit(&mut self) -> OrmResult<()> {
        self.execute("COMMIT").await.map(|_| ())
    }

    async fn rollback(&mut self) -> OrmResult<()> {
        self.execute("ROLLBACK").await.map(|_| ())
    }
}
