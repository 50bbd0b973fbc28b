//! Version storage
//!
//! Where the currently-applied revision of each component is recorded. The
//! migration engine depends on the strategy trait; the stock implementation
//! is a single shared table keyed by a fixed-width digest of the component
//! name, so arbitrarily long component names never widen the key column.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::backends::DatabaseConnection;
use crate::error::OrmResult;

/// Storage backend for per-component version records.
#[async_trait]
pub trait VersionStore: Send + Sync {
    /// Create the storage if it does not exist yet (checked, not
    /// unconditional).
    async fn ensure_storage(&self, conn: &mut dyn DatabaseConnection) -> OrmResult<()>;

    /// The component's current revision id, if any.
    async fn current(
        &self,
        conn: &mut dyn DatabaseConnection,
        component: &str,
    ) -> OrmResult<Option<String>>;

    /// Record a version transition. `old == new` writes nothing; a `None`
    /// new version deletes the record; a `None` old version inserts it;
    /// anything else updates in place.
    async fn transition(
        &self,
        conn: &mut dyn DatabaseConnection,
        component: &str,
        old: Option<&str>,
        new: Option<&str>,
    ) -> OrmResult<()>;

    /// The statement a transition would execute, for offline rendering.
    /// `None` when the transition writes nothing.
    fn transition_sql(&self, component: &str, old: Option<&str>, new: Option<&str>)
        -> Option<String>;
}

/// The shared version table: one row per component,
/// `(component_id, version_num)`.
#[derive(Debug, Clone)]
pub struct SharedVersionTable {
    table: String,
}

impl SharedVersionTable {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Fixed-width storage identity for a component name. Never reversed;
    /// the component name itself always comes from the caller.
    pub fn component_id(component: &str) -> String {
        hex::encode(Sha256::digest(component.as_bytes()))
    }

    fn create_sql(&self) -> String {
        format!(
            "CREATE TABLE {} (\n    \
                component_id VARCHAR(64) NOT NULL,\n    \
                version_num VARCHAR(32) NOT NULL\n\
            );",
            self.table
        )
    }
}

#[async_trait]
impl VersionStore for SharedVersionTable {
    async fn ensure_storage(&self, conn: &mut dyn DatabaseConnection) -> OrmResult<()> {
        if !conn.table_exists(&self.table).await? {
            conn.execute(&self.create_sql()).await?;
        }
        Ok(())
    }

    async fn current(
        &self,
        conn: &mut dyn DatabaseConnection,
        component: &str,
    ) -> OrmResult<Option<String>> {
        let sql = format!(
            "SELECT version_num FROM {} WHERE component_id = '{}'",
            self.table,
            Self::component_id(component)
        );
        conn.fetch_scalar(&sql).await
    }

    async fn transition(
        &self,
        conn: &mut dyn DatabaseConnection,
        component: &str,
        old: Option<&str>,
        new: Option<&str>,
    ) -> OrmResult<()> {
        if let Some(sql) = self.transition_sql(component, old, new) {
            conn.execute(&sql).await?;
        }
        Ok(())
    }

    fn transition_sql(
        &self,
        component: &str,
        old: Option<&str>,
        new: Option<&str>,
    ) -> Option<String> {
        if old == new {
            return None;
        }
        let component_id = Self::component_id(component);
        Some(match (old, new) {
            (_, None) => format!(
                "DELETE FROM {} WHERE component_id = '{}'",
                self.table, component_id
            ),
            (None, Some(new)) => format!(
                "INSERT INTO {} (component_id, version_num) VALUES ('{}', '{}')",
                self.table, component_id, new
            ),
            (Some(_), Some(new)) => format!(
                "UPDATE {} SET version_num = '{}' WHERE component_id = '{}'",
                self.table, new, component_id
            ),
        })
    }
}
