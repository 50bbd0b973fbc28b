//! Schema diffing for revision autogeneration
//!
//! Compares a component's target metadata against the live database and
//! produces the changes a new revision should carry. Live tables are only
//! attributed to the component when they carry its table-name prefix, so
//! one component's diff never drops another component's tables.

use crate::backends::DatabaseConnection;
use crate::error::OrmResult;
use crate::schema::{ColumnDef, TableDef};

/// One schema-level difference between metadata and the live database.
#[derive(Debug, Clone)]
pub enum SchemaChange {
    CreateTable(TableDef),
    DropTable(String),
    AddColumn { table: String, column: ColumnDef },
    DropColumn { table: String, column: String },
}

impl SchemaChange {
    pub fn up_sql(&self) -> String {
        match self {
            SchemaChange::CreateTable(table) => table.create_sql(),
            SchemaChange::DropTable(name) => format!("DROP TABLE {};", name),
            SchemaChange::AddColumn { table, column } => format!(
                "ALTER TABLE {} ADD COLUMN {} {};",
                table, column.name, column.sql_type
            ),
            SchemaChange::DropColumn { table, column } => {
                format!("ALTER TABLE {} DROP COLUMN {};", table, column)
            }
        }
    }

    pub fn down_sql(&self) -> String {
        match self {
            SchemaChange::CreateTable(table) => table.drop_sql(),
            // The live definition is gone once dropped; recreation needs a
            // hand-written statement.
            SchemaChange::DropTable(name) => {
                format!("-- cannot automatically recreate dropped table {}", name)
            }
            SchemaChange::AddColumn { table, column } => {
                format!("ALTER TABLE {} DROP COLUMN {};", table, column.name)
            }
            SchemaChange::DropColumn { table, column } => format!(
                "-- cannot automatically restore dropped column {}.{}",
                table, column
            ),
        }
    }
}

/// Diff the component's metadata tables against the live database.
pub async fn diff_tables(
    conn: &mut dyn DatabaseConnection,
    tables: &[TableDef],
    component_prefix: &str,
) -> OrmResult<Vec<SchemaChange>> {
    let live_names = conn.table_names().await?;
    let mut changes = Vec::new();

    for table in tables {
        if !live_names.contains(&table.name) {
            changes.push(SchemaChange::CreateTable(table.clone()));
            continue;
        }

        let live_columns = conn.table_columns(&table.name).await?;
        for column in &table.columns {
            if !live_columns.contains(&column.name) {
                changes.push(SchemaChange::AddColumn {
                    table: table.name.clone(),
                    column: column.clone(),
                });
            }
        }
        for live_column in &live_columns {
            if !table.columns.iter().any(|c| c.name == *live_column) {
                changes.push(SchemaChange::DropColumn {
                    table: table.name.clone(),
                    column: live_column.clone(),
                });
            }
        }
    }

    let prefix = format!("{}_", component_prefix);
    for live_name in &live_names {
        let owned = live_name.starts_with(&prefix) || live_name == component_prefix;
        if owned && !tables.iter().any(|t| t.name == *live_name) {
            changes.push(SchemaChange::DropTable(live_name.clone()));
        }
    }

    Ok(changes)
}

/// Render the forward statements, creation order.
pub fn render_up(changes: &[SchemaChange]) -> String {
    changes
        .iter()
        .map(|change| change.up_sql())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the reverse statements, inverse order.
pub fn render_down(changes: &[SchemaChange]) -> String {
    changes
        .iter()
        .rev()
        .map(|change| change.down_sql())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{Database, MemoryDatabase};
    use crate::schema::ModelIdent;

    fn table(name: &str, columns: &[&str]) -> TableDef {
        TableDef {
            name: name.to_string(),
            columns: columns
                .iter()
                .map(|c| ColumnDef::new(*c, "TEXT"))
                .collect(),
            constraints: Vec::new(),
            foreign_keys: Vec::new(),
            owner: ModelIdent {
                component: Some("app".to_string()),
                module_path: "app.models".to_string(),
                class_name: "Entry".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn missing_table_diffs_to_create() {
        let database = MemoryDatabase::new();
        let mut conn = database.connect().await.unwrap();

        let tables = vec![table("app_entry", &["id", "name"])];
        let changes = diff_tables(conn.as_mut(), &tables, "app").await.unwrap();

        assert_eq!(changes.len(), 1);
        assert!(matches!(changes[0], SchemaChange::CreateTable(_)));
        assert!(render_up(&changes).contains("CREATE TABLE app_entry"));
        assert!(render_down(&changes).contains("DROP TABLE app_entry"));
    }

    #[tokio::test]
    async fn column_differences_diff_to_alters() {
        let database = MemoryDatabase::new();
        let mut conn = database.connect().await.unwrap();
        conn.execute("CREATE TABLE app_entry (id TEXT, stale TEXT)")
            .await
            .unwrap();

        let tables = vec![table("app_entry", &["id", "name"])];
        let changes = diff_tables(conn.as_mut(), &tables, "app").await.unwrap();

        let up = render_up(&changes);
        assert!(up.contains("ALTER TABLE app_entry ADD COLUMN name TEXT;"));
        assert!(up.contains("ALTER TABLE app_entry DROP COLUMN stale;"));
    }

    #[tokio::test]
    async fn stray_component_tables_diff_to_drop_but_foreign_tables_do_not() {
        let database = MemoryDatabase::new();
        let mut conn = database.connect().await.unwrap();
        conn.execute("CREATE TABLE app_old (id TEXT)").await.unwrap();
        conn.execute("CREATE TABLE other_thing (id TEXT)").await.unwrap();

        let changes = diff_tables(conn.as_mut(), &[], "app").await.unwrap();

        assert_eq!(changes.len(), 1);
        assert!(matches!(&changes[0], SchemaChange::DropTable(name) if name == "app_old"));
    }

    #[tokio::test]
    async fn up_to_date_schema_diffs_empty() {
        let database = MemoryDatabase::new();
        let mut conn = database.connect().await.unwrap();
        conn.execute("CREATE TABLE app_entry (id TEXT, name TEXT)")
            .await
            .unwrap();

        let tables = vec![table("app_entry", &["id", "name"])];
        let changes = diff_tables(conn.as_mut(), &tables, "app").await.unwrap();
        assert!(changes.is_empty());
    }
}
