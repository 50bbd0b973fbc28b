//! Metadata collections
//!
//! A `MetadataCollection` holds the table definitions for one component (or
//! one standalone model). Table names are unique within a collection and
//! insertion order is preserved; dependency-safe orderings are derived from
//! the foreign-key graph.

use std::collections::HashMap;

use crate::error::{OrmError, OrmResult};
use crate::schema::table::TableDef;

/// Ordered, name-deduplicated set of table definitions.
#[derive(Debug, Default)]
pub struct MetadataCollection {
    tables: Vec<TableDef>,
    index: HashMap<String, usize>,
}

impl MetadataCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a table definition.
    ///
    /// Re-inserting the same model's table is a no-op (idempotent
    /// re-registration); two different models deriving the same table name
    /// is a schema error.
    pub fn insert(&mut self, table: TableDef) -> OrmResult<()> {
        if let Some(&position) = self.index.get(&table.name) {
            if self.tables[position].owner == table.owner {
                return Ok(());
            }
            return Err(OrmError::schema(format!(
                "table {:?} is already defined by {}",
                table.name,
                self.tables[position].owner.full_path()
            )));
        }

        self.index.insert(table.name.clone(), self.tables.len());
        self.tables.push(table);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&TableDef> {
        self.index.get(name).map(|&position| &self.tables[position])
    }

    /// Tables in insertion order.
    pub fn tables(&self) -> impl Iterator<Item = &TableDef> {
        self.tables.iter()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Tables in dependency order: a table sorts after every table it
    /// references by foreign key, so creating in this order is safe and
    /// dropping in the reverse order is safe. Ties keep insertion order.
    pub fn sorted_tables(&self) -> Vec<TableDef> {
        sort_by_dependency(self.tables.clone())
    }
}

/// Topologically sort tables by their foreign-key references. References to
/// tables outside the set are ignored; ties keep the incoming order.
pub(crate) fn sort_by_dependency(tables: Vec<TableDef>) -> Vec<TableDef> {
    let known: HashMap<String, ()> = tables
        .iter()
        .map(|table| (table.name.clone(), ()))
        .collect();

    let mut remaining = tables;
    let mut placed: HashMap<String, ()> = HashMap::new();
    let mut ordered = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let mut progressed = false;

        let mut deferred = Vec::new();
        for table in remaining {
            let ready = table.foreign_keys.iter().all(|fk| {
                fk.references_table == table.name
                    || !known.contains_key(&fk.references_table)
                    || placed.contains_key(&fk.references_table)
            });
            if ready {
                placed.insert(table.name.clone(), ());
                ordered.push(table);
                progressed = true;
            } else {
                deferred.push(table);
            }
        }
        remaining = deferred;

        if !progressed {
            // Foreign-key cycle; fall back to incoming order for the rest.
            ordered.extend(remaining);
            break;
        }
    }

    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::table::{ColumnDef, ForeignKeyDef, ModelIdent};

    fn table(name: &str, class_name: &str, references: &[&str]) -> TableDef {
        TableDef {
            name: name.to_string(),
            columns: vec![ColumnDef::new("id", "SERIAL PRIMARY KEY")],
            constraints: Vec::new(),
            foreign_keys: references
                .iter()
                .map(|target| ForeignKeyDef {
                    column: format!("{}_id", target),
                    references_table: target.to_string(),
                    references_column: "id".to_string(),
                })
                .collect(),
            owner: ModelIdent {
                component: Some("app".to_string()),
                module_path: "app.models".to_string(),
                class_name: class_name.to_string(),
            },
        }
    }

    #[test]
    fn duplicate_name_from_another_model_is_an_error() {
        let mut collection = MetadataCollection::new();
        collection.insert(table("app_entry", "Entry", &[])).unwrap();

        let result = collection.insert(table("app_entry", "OtherEntry", &[]));
        assert!(matches!(result, Err(OrmError::Schema(_))));
    }

    #[test]
    fn reinsert_of_same_model_is_idempotent() {
        let mut collection = MetadataCollection::new();
        collection.insert(table("app_entry", "Entry", &[])).unwrap();
        collection.insert(table("app_entry", "Entry", &[])).unwrap();
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn sorted_tables_respects_foreign_keys() {
        let mut collection = MetadataCollection::new();
        // Inserted dependents-first to force reordering.
        collection
            .insert(table("app_line", "Line", &["app_invoice"]))
            .unwrap();
        collection
            .insert(table("app_invoice", "Invoice", &["app_customer"]))
            .unwrap();
        collection.insert(table("app_customer", "Customer", &[])).unwrap();

        let names: Vec<_> = collection
            .sorted_tables()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["app_customer", "app_invoice", "app_line"]);
    }

    #[test]
    fn foreign_keys_outside_the_collection_are_ignored() {
        let mut collection = MetadataCollection::new();
        collection
            .insert(table("app_ref", "Ref", &["elsewhere_table"]))
            .unwrap();
        let names: Vec<_> = collection
            .sorted_tables()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["app_ref"]);
    }
}
