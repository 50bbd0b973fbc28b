//! Table and model definitions
//!
//! `ModelDef` is the fluent builder applications use to declare a persisted
//! record type; registration turns it into a `TableDef` inside the owning
//! component's metadata collection.

/// A single column definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub sql_type: String,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
        }
    }

    fn render(&self) -> String {
        format!("{} {}", self.name, self.sql_type)
    }
}

/// A foreign-key reference to another table.
///
/// Tracked structurally (not as an opaque constraint string) because the
/// dependency graph drives create/drop ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyDef {
    pub column: String,
    pub references_table: String,
    pub references_column: String,
}

/// Identity of the model that owns a table: the component (if any), the
/// defining module path, and the type name. Used by the scope filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelIdent {
    pub component: Option<String>,
    pub module_path: String,
    pub class_name: String,
}

impl ModelIdent {
    /// Fully-qualified dotted path, `module.ClassName`.
    pub fn full_path(&self) -> String {
        format!("{}.{}", self.module_path, self.class_name)
    }

    /// Short form `component:ClassName`; absent for standalone models.
    pub fn short_name(&self) -> Option<String> {
        self.component
            .as_ref()
            .map(|component| format!("{}:{}", component, self.class_name))
    }
}

/// A table definition held by a metadata collection.
#[derive(Debug, Clone)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub constraints: Vec<String>,
    pub foreign_keys: Vec<ForeignKeyDef>,
    pub owner: ModelIdent,
}

impl TableDef {
    /// Build the CREATE TABLE statement.
    pub fn create_sql(&self) -> String {
        let mut parts: Vec<String> = self.columns.iter().map(ColumnDef::render).collect();
        parts.extend(self.constraints.iter().cloned());
        parts.extend(self.foreign_keys.iter().map(|fk| {
            format!(
                "FOREIGN KEY ({}) REFERENCES {} ({})",
                fk.column, fk.references_table, fk.references_column
            )
        }));

        format!("CREATE TABLE {} (\n    {}\n);", self.name, parts.join(",\n    "))
    }

    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE {};", self.name)
    }

    pub fn delete_sql(&self) -> String {
        format!("DELETE FROM {};", self.name)
    }
}

/// Fluent model declaration.
///
/// ```
/// use mosaic_orm::schema::ModelDef;
///
/// let invoice = ModelDef::new("Invoice", "app.billing.models")
///     .id("id")
///     .string("number", Some(64))
///     .integer("customer_id")
///     .foreign_key("customer_id", "app_customer", "id");
/// ```
#[derive(Debug, Clone)]
pub struct ModelDef {
    pub(crate) class_name: String,
    pub(crate) module_path: String,
    pub(crate) abstract_base: bool,
    pub(crate) columns: Vec<ColumnDef>,
    pub(crate) constraints: Vec<String>,
    pub(crate) foreign_keys: Vec<ForeignKeyDef>,
}

impl ModelDef {
    pub fn new(class_name: impl Into<String>, module_path: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            module_path: module_path.into(),
            abstract_base: false,
            columns: Vec::new(),
            constraints: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Mark this definition as the abstract root base. Abstract bases seed
    /// shared defaults only and are never registered as tables.
    pub fn abstract_base(mut self) -> Self {
        self.abstract_base = true;
        self
    }

    pub fn column(mut self, name: &str, sql_type: &str) -> Self {
        self.columns.push(ColumnDef::new(name, sql_type));
        self
    }

    /// Auto-increment integer primary key.
    pub fn id(self, name: &str) -> Self {
        self.column(name, "SERIAL PRIMARY KEY")
    }

    pub fn string(self, name: &str, length: Option<u32>) -> Self {
        let sql_type = match length {
            Some(len) => format!("VARCHAR({})", len),
            None => "TEXT".to_string(),
        };
        self.column(name, &sql_type)
    }

    pub fn integer(self, name: &str) -> Self {
        self.column(name, "INTEGER")
    }

    pub fn boolean(self, name: &str) -> Self {
        self.column(name, "BOOLEAN")
    }

    pub fn timestamps(self) -> Self {
        self.column("created_at", "TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP")
            .column("updated_at", "TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP")
    }

    pub fn unique(mut self, columns: &[&str]) -> Self {
        self.constraints
            .push(format!("UNIQUE ({})", columns.join(", ")));
        self
    }

    pub fn foreign_key(
        mut self,
        column: &str,
        references_table: &str,
        references_column: &str,
    ) -> Self {
        self.foreign_keys.push(ForeignKeyDef {
            column: column.to_string(),
            references_table: references_table.to_string(),
            references_column: references_column.to_string(),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_sql_renders_columns_constraints_and_foreign_keys() {
        let table = TableDef {
            name: "app_post".to_string(),
            columns: vec![
                ColumnDef::new("id", "SERIAL PRIMARY KEY"),
                ColumnDef::new("title", "VARCHAR(255)"),
                ColumnDef::new("author_id", "INTEGER"),
            ],
            constraints: vec!["UNIQUE (title)".to_string()],
            foreign_keys: vec![ForeignKeyDef {
                column: "author_id".to_string(),
                references_table: "app_author".to_string(),
                references_column: "id".to_string(),
            }],
            owner: ModelIdent {
                component: Some("app".to_string()),
                module_path: "app.models".to_string(),
                class_name: "Post".to_string(),
            },
        };

        let sql = table.create_sql();
        assert!(sql.contains("CREATE TABLE app_post"));
        assert!(sql.contains("id SERIAL PRIMARY KEY"));
        assert!(sql.contains("UNIQUE (title)"));
        assert!(sql.contains("FOREIGN KEY (author_id) REFERENCES app_author (id)"));

        assert_eq!(table.drop_sql(), "DROP TABLE app_post;");
        assert_eq!(table.delete_sql(), "DELETE FROM app_post;");
    }

    #[test]
    fn model_ident_name_forms() {
        let ident = ModelIdent {
            component: Some("app.billing".to_string()),
            module_path: "app.billing.models".to_string(),
            class_name: "Invoice".to_string(),
        };
        assert_eq!(ident.full_path(), "app.billing.models.Invoice");
        assert_eq!(ident.short_name().unwrap(), "app.billing:Invoice");

        let standalone = ModelIdent {
            component: None,
            module_path: "scratch.models".to_string(),
            class_name: "Note".to_string(),
        };
        assert_eq!(standalone.short_name(), None);
    }
}
