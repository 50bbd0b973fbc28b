//! Core backend traits
//!
//! Abstract over the concrete database driver: statement execution, scalar
//! fetches, transaction control, and the schema introspection the bulk
//! operations and the migration autogenerator rely on.

use async_trait::async_trait;

use crate::error::OrmResult;

/// A database a mosaic engine can hand out connections to.
///
/// Constructing a `Database` must never open a network connection; only
/// `connect` does.
#[async_trait]
pub trait Database: Send + Sync {
    /// Open a connection. One connection serves one logical unit of work
    /// and is released when dropped.
    async fn connect(&self) -> OrmResult<Box<dyn DatabaseConnection>>;
}

/// A live database connection.
#[async_trait]
pub trait DatabaseConnection: Send {
    /// Execute a statement and return the affected row count.
    async fn execute(&mut self, sql: &str) -> OrmResult<u64>;

    /// Execute a query and return the first column of the first row, if any.
    async fn fetch_scalar(&mut self, sql: &str) -> OrmResult<Option<String>>;

    /// Whether a table exists in the connected database.
    async fn table_exists(&mut self, table: &str) -> OrmResult<bool>;

    /// Names of every user table in the connected database.
    async fn table_names(&mut self) -> OrmResult<Vec<String>>;

    /// Column names of a table, empty if the table does not exist.
    async fn table_columns(&mut self, table: &str) -> OrmResult<Vec<String>>;

    async fn begin(&mut self) -> OrmResult<()>;

    async fn commit(&mut self) -> OrmResult<()>;

    async fn rollback(&mut self) -> OrmResult<()>;
}
