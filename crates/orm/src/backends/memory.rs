//! In-memory backend
//!
//! A lightweight engine (URL scheme `memory://`) that understands the
//! statement shapes this crate generates: CREATE/DROP/ALTER TABLE, DELETE,
//! and the version-table INSERT/UPDATE/DELETE/SELECT. It backs the testing
//! redirect and the integration tests; it is not a general SQL engine.
//!
//! Every `MemoryDatabase` owns an isolated store, so two engines never see
//! each other's tables. Transactions are accepted and applied immediately.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::backends::core::{Database, DatabaseConnection};
use crate::error::{OrmError, OrmResult};

#[derive(Debug, Default)]
struct MemTable {
    name: String,
    columns: Vec<String>,
    rows: Vec<HashMap<String, String>>,
}

#[derive(Debug, Default)]
struct MemoryStore {
    tables: Vec<MemTable>,
}

#[derive(Clone, Default)]
pub struct MemoryDatabase {
    store: Arc<Mutex<MemoryStore>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn connect(&self) -> OrmResult<Box<dyn DatabaseConnection>> {
        Ok(Box::new(MemoryConnection {
            store: Arc::clone(&self.store),
        }))
    }
}

struct MemoryConnection {
    store: Arc<Mutex<MemoryStore>>,
}

#[async_trait]
impl DatabaseConnection for MemoryConnection {
    async fn execute(&mut self, sql: &str) -> OrmResult<u64> {
        self.store
            .lock()
            .expect("memory store lock poisoned")
            .apply(sql)
    }

    async fn fetch_scalar(&mut self, sql: &str) -> OrmResult<Option<String>> {
        self.store
            .lock()
            .expect("memory store lock poisoned")
            .query_scalar(sql)
    }

    async fn table_exists(&mut self, table: &str) -> OrmResult<bool> {
        Ok(self
            .store
            .lock()
            .expect("memory store lock poisoned")
            .table(table)
            .is_some())
    }

    async fn table_names(&mut self) -> OrmResult<Vec<String>> {
        Ok(self
            .store
            .lock()
            .expect("memory store lock poisoned")
            .tables
            .iter()
            .map(|t| t.name.clone())
            .collect())
    }

    async fn table_columns(&mut self, table: &str) -> OrmResult<Vec<String>> {
        Ok(self
            .store
            .lock()
            .expect("memory store lock poisoned")
            .table(table)
            .map(|t| t.columns.clone())
            .unwrap_or_default())
    }

    async fn begin(&mut self) -> OrmResult<()> {
        Ok(())
    }

    async fn commit(&mut self) -> OrmResult<()> {
        Ok(())
    }

    async fn rollback(&mut self) -> OrmResult<()> {
        Ok(())
    }
}

impl MemoryStore {
    fn table(&self, name: &str) -> Option<&MemTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    fn table_mut(&mut self, name: &str) -> OrmResult<&mut MemTable> {
        self.tables
            .iter_mut()
            .find(|t| t.name == name)
            .ok_or_else(|| OrmError::database(format!("no such table: {}", name)))
    }

    fn apply(&mut self, sql: &str) -> OrmResult<u64> {
        let statement = normalize(sql);
        let upper = statement.to_ascii_uppercase();

        if upper.starts_with("CREATE TABLE") {
            self.create_table(&statement)
        } else if upper.starts_with("DROP TABLE") {
            self.drop_table(&statement)
        } else if upper.starts_with("DELETE FROM") {
            self.delete(&statement)
        } else if upper.starts_with("INSERT INTO") {
            self.insert(&statement)
        } else if upper.starts_with("UPDATE") {
            self.update(&statement)
        } else if upper.starts_with("ALTER TABLE") {
            self.alter_table(&statement)
        } else if matches!(upper.as_str(), "BEGIN" | "COMMIT" | "ROLLBACK") {
            Ok(0)
        } else {
            Err(OrmError::database(format!(
                "memory engine cannot execute {:?}",
                statement
            )))
        }
    }

    fn create_table(&mut self, statement: &str) -> OrmResult<u64> {
        let rest = &statement["CREATE TABLE".len()..];
        let open = rest
            .find('(')
            .ok_or_else(|| OrmError::database("CREATE TABLE without column list"))?;
        let name = rest[..open].trim().to_string();
        let close = rest
            .rfind(')')
            .ok_or_else(|| OrmError::database("CREATE TABLE without closing paren"))?;
        let body = &rest[open + 1..close];

        if self.table(&name).is_some() {
            return Err(OrmError::database(format!("table {} already exists", name)));
        }

        let mut columns = Vec::new();
        for entry in split_top_level(body) {
            let entry = entry.trim();
            let first = entry.split_whitespace().next().unwrap_or_default();
            let keyword = first.to_ascii_uppercase();
            if matches!(
                keyword.as_str(),
                "PRIMARY" | "FOREIGN" | "UNIQUE" | "CONSTRAINT" | "CHECK"
            ) {
                continue;
            }
            if !first.is_empty() {
                columns.push(first.to_string());
            }
        }

        self.tables.push(MemTable {
            name,
            columns,
            rows: Vec::new(),
        });
        Ok(0)
    }

    fn drop_table(&mut self, statement: &str) -> OrmResult<u64> {
        let name = statement["DROP TABLE".len()..]
            .trim()
            .trim_start_matches("IF EXISTS")
            .trim()
            .to_string();
        let position = self.tables.iter().position(|t| t.name == name);
        match position {
            Some(position) => {
                self.tables.remove(position);
                Ok(0)
            }
            None if statement.to_ascii_uppercase().contains("IF EXISTS") => Ok(0),
            None => Err(OrmError::database(format!("no such table: {}", name))),
        }
    }

    fn delete(&mut self, statement: &str) -> OrmResult<u64> {
        let rest = statement["DELETE FROM".len()..].trim();
        let (name, condition) = split_where(rest);
        let table = self.table_mut(name.trim())?;
        let before = table.rows.len();
        match condition {
            Some((column, value)) => table.rows.retain(|row| row.get(&column) != Some(&value)),
            None => table.rows.clear(),
        }
        Ok((before - table.rows.len()) as u64)
    }

    fn insert(&mut self, statement: &str) -> OrmResult<u64> {
        let rest = statement["INSERT INTO".len()..].trim();
        let open = rest
            .find('(')
            .ok_or_else(|| OrmError::database("INSERT without column list"))?;
        let name = rest[..open].trim().to_string();
        let close = rest[open..]
            .find(')')
            .map(|i| open + i)
            .ok_or_else(|| OrmError::database("INSERT without closing paren"))?;
        let columns: Vec<String> = rest[open + 1..close]
            .split(',')
            .map(|c| c.trim().to_string())
            .collect();

        let values_at = rest
            .to_ascii_uppercase()
            .find("VALUES")
            .ok_or_else(|| OrmError::database("INSERT without VALUES"))?;
        let values_part = rest[values_at + "VALUES".len()..].trim();
        let values_body = values_part
            .strip_prefix('(')
            .and_then(|v| v.strip_suffix(')'))
            .ok_or_else(|| OrmError::database("malformed VALUES list"))?;
        let values: Vec<String> = split_top_level(values_body)
            .into_iter()
            .map(|v| unquote(v.trim()))
            .collect();

        if columns.len() != values.len() {
            return Err(OrmError::database("INSERT column/value count mismatch"));
        }

        let table = self.table_mut(&name)?;
        table
            .rows
            .push(columns.into_iter().zip(values).collect::<HashMap<_, _>>());
        Ok(1)
    }

    fn update(&mut self, statement: &str) -> OrmResult<u64> {
        let rest = statement["UPDATE".len()..].trim();
        let set_at = rest
            .to_ascii_uppercase()
            .find(" SET ")
            .ok_or_else(|| OrmError::database("UPDATE without SET"))?;
        let name = rest[..set_at].trim().to_string();
        let (assignments, condition) = split_where(&rest[set_at + " SET ".len()..]);

        let mut updates = Vec::new();
        for assignment in split_top_level(&assignments) {
            let (column, value) = parse_equality(assignment.trim())?;
            updates.push((column, value));
        }

        let table = self.table_mut(&name)?;
        let mut affected = 0;
        for row in &mut table.rows {
            let matches = match &condition {
                Some((column, value)) => row.get(column) == Some(value),
                None => true,
            };
            if matches {
                for (column, value) in &updates {
                    row.insert(column.clone(), value.clone());
                }
                affected += 1;
            }
        }
        Ok(affected)
    }

    fn alter_table(&mut self, statement: &str) -> OrmResult<u64> {
        let rest = statement["ALTER TABLE".len()..].trim();
        let upper = rest.to_ascii_uppercase();

        if let Some(at) = upper.find(" ADD COLUMN ") {
            let name = rest[..at].trim().to_string();
            let column = rest[at + " ADD COLUMN ".len()..]
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_string();
            let table = self.table_mut(&name)?;
            if !table.columns.contains(&column) {
                table.columns.push(column);
            }
            return Ok(0);
        }

        if let Some(at) = upper.find(" DROP COLUMN ") {
            let name = rest[..at].trim().to_string();
            let column = rest[at + " DROP COLUMN ".len()..]
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_string();
            let table = self.table_mut(&name)?;
            table.columns.retain(|c| *c != column);
            for row in &mut table.rows {
                row.remove(&column);
            }
            return Ok(0);
        }

        Err(OrmError::database(format!(
            "memory engine cannot execute {:?}",
            statement
        )))
    }

    fn query_scalar(&self, sql: &str) -> OrmResult<Option<String>> {
        let statement = normalize(sql);
        let upper = statement.to_ascii_uppercase();
        if !upper.starts_with("SELECT") {
            return Err(OrmError::database(format!(
                "memory engine cannot query {:?}",
                statement
            )));
        }

        let from_at = upper
            .find(" FROM ")
            .ok_or_else(|| OrmError::database("SELECT without FROM"))?;
        let column = statement["SELECT".len()..from_at].trim().to_string();
        let (name, condition) = split_where(statement[from_at + " FROM ".len()..].trim());

        let table = match self.table(name.trim()) {
            Some(table) => table,
            None => return Err(OrmError::database(format!("no such table: {}", name.trim()))),
        };

        for row in &table.rows {
            let matches = match &condition {
                Some((where_column, value)) => row.get(where_column) == Some(value),
                None => true,
            };
            if matches {
                return Ok(row.get(&column).cloned());
            }
        }
        Ok(None)
    }
}

/// Collapse whitespace and drop the trailing semicolon.
fn normalize(sql: &str) -> String {
    sql.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(';')
        .to_string()
}

/// Split on commas that are not nested inside parentheses or quotes.
fn split_top_level(body: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_quote = false;
    let mut current = String::new();

    for ch in body.chars() {
        match ch {
            '\'' => {
                in_quote = !in_quote;
                current.push(ch);
            }
            '(' if !in_quote => {
                depth += 1;
                current.push(ch);
            }
            ')' if !in_quote => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 && !in_quote => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current);
    }
    parts
}

/// Split `rest` into the part before WHERE and the single equality
/// condition after it, if present.
fn split_where(rest: &str) -> (String, Option<(String, String)>) {
    let upper = rest.to_ascii_uppercase();
    match upper.find(" WHERE ") {
        Some(at) => {
            let head = rest[..at].trim().to_string();
            let condition = parse_equality(rest[at + " WHERE ".len()..].trim()).ok();
            (head, condition)
        }
        None => (rest.trim().to_string(), None),
    }
}

fn parse_equality(text: &str) -> OrmResult<(String, String)> {
    let eq = text
        .find('=')
        .ok_or_else(|| OrmError::database(format!("expected equality in {:?}", text)))?;
    let column = text[..eq].trim().to_string();
    let value = unquote(text[eq + 1..].trim());
    Ok((column, value))
}

fn unquote(text: &str) -> String {
    text.strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .unwrap_or(text)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn connection() -> Box<dyn DatabaseConnection> {
        MemoryDatabase::new().connect().await.unwrap()
    }

    #[tokio::test]
    async fn create_insert_delete_round() {
        let mut conn = connection().await;
        conn.execute("CREATE TABLE app_entry (\n    id SERIAL PRIMARY KEY,\n    name VARCHAR(64),\n    UNIQUE (name)\n);")
            .await
            .unwrap();

        assert!(conn.table_exists("app_entry").await.unwrap());
        assert_eq!(
            conn.table_columns("app_entry").await.unwrap(),
            vec!["id", "name"]
        );

        conn.execute("INSERT INTO app_entry (id, name) VALUES ('1', 'first')")
            .await
            .unwrap();
        let name = conn
            .fetch_scalar("SELECT name FROM app_entry WHERE id = '1'")
            .await
            .unwrap();
        assert_eq!(name.as_deref(), Some("first"));

        let removed = conn.execute("DELETE FROM app_entry;").await.unwrap();
        assert_eq!(removed, 1);
        assert!(conn.table_exists("app_entry").await.unwrap());
    }

    #[tokio::test]
    async fn update_and_scalar_queries() {
        let mut conn = connection().await;
        conn.execute("CREATE TABLE versions (component_id VARCHAR(64), version_num VARCHAR(32))")
            .await
            .unwrap();
        conn.execute("INSERT INTO versions (component_id, version_num) VALUES ('abc', 'rev1')")
            .await
            .unwrap();
        conn.execute("UPDATE versions SET version_num = 'rev2' WHERE component_id = 'abc'")
            .await
            .unwrap();

        let version = conn
            .fetch_scalar("SELECT version_num FROM versions WHERE component_id = 'abc'")
            .await
            .unwrap();
        assert_eq!(version.as_deref(), Some("rev2"));

        let missing = conn
            .fetch_scalar("SELECT version_num FROM versions WHERE component_id = 'zzz'")
            .await
            .unwrap();
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn alter_table_add_and_drop_column() {
        let mut conn = connection().await;
        conn.execute("CREATE TABLE t (id INTEGER)").await.unwrap();
        conn.execute("ALTER TABLE t ADD COLUMN note TEXT").await.unwrap();
        assert_eq!(conn.table_columns("t").await.unwrap(), vec!["id", "note"]);
        conn.execute("ALTER TABLE t DROP COLUMN note").await.unwrap();
        assert_eq!(conn.table_columns("t").await.unwrap(), vec!["id"]);
    }

    #[tokio::test]
    async fn stores_are_isolated_per_database() {
        let first = MemoryDatabase::new();
        let second = MemoryDatabase::new();

        let mut conn = first.connect().await.unwrap();
        conn.execute("CREATE TABLE only_here (id INTEGER)").await.unwrap();

        let mut other = second.connect().await.unwrap();
        assert!(!other.table_exists("only_here").await.unwrap());
    }

    #[tokio::test]
    async fn dropping_a_missing_table_is_an_error() {
        let mut conn = connection().await;
        assert!(conn.execute("DROP TABLE ghost;").await.is_err());
    }
}
