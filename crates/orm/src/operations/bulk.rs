//! Bulk schema operations
//!
//! `init` creates missing tables, `clear` drops existing ones (dependents
//! first), `flush` deletes every row while keeping the tables. All three
//! iterate the registry's dependency-ordered table list, honor the scope
//! filter, and support dry-run, echo, and offline modes.

use tracing::info;

use crate::engine::EngineManager;
use crate::error::{OrmError, OrmResult};
use crate::schema::{included, validate_names, SchemaRegistry, TableDef};

/// Flags shared by every bulk operation.
#[derive(Debug, Clone)]
pub struct OpOptions {
    /// Scope tokens; empty means every table.
    pub names: Vec<String>,
    /// Render each statement to stdout.
    pub echo: bool,
    /// Apply changes. `false` computes without touching the database.
    pub commit: bool,
    /// Never open a connection; implies `commit = false, echo = true`.
    pub offline: bool,
    /// Emit a one-line progress record per table.
    pub verbose: bool,
}

impl Default for OpOptions {
    fn default() -> Self {
        Self {
            names: Vec::new(),
            echo: false,
            commit: true,
            offline: false,
            verbose: false,
        }
    }
}

impl OpOptions {
    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

/// One table the operation acted on (or rendered for).
#[derive(Debug, Clone)]
pub struct TableAction {
    pub table: String,
    pub action: &'static str,
    pub sql: String,
    /// Whether the statement was executed against the live database.
    pub applied: bool,
}

/// What a bulk operation did.
#[derive(Debug, Clone)]
pub struct OpSummary {
    pub operation: &'static str,
    pub actions: Vec<TableAction>,
}

#[derive(Clone, Copy)]
enum BulkKind {
    Init,
    Clear,
    Flush,
}

impl BulkKind {
    fn operation(self) -> &'static str {
        match self {
            BulkKind::Init => "init",
            BulkKind::Clear => "clear",
            BulkKind::Flush => "flush",
        }
    }

    fn action(self) -> &'static str {
        match self {
            BulkKind::Init => "create",
            BulkKind::Clear => "drop",
            BulkKind::Flush => "flush",
        }
    }

    fn statement(self, table: &TableDef) -> String {
        match self {
            BulkKind::Init => table.create_sql(),
            BulkKind::Clear => table.drop_sql(),
            BulkKind::Flush => table.delete_sql(),
        }
    }

    /// Whether the live existence probe says this table needs no work.
    fn skip(self, exists: bool) -> bool {
        match self {
            BulkKind::Init => exists,
            BulkKind::Clear | BulkKind::Flush => !exists,
        }
    }

    /// clear and flush process dependents before their dependencies.
    fn reversed(self) -> bool {
        !matches!(self, BulkKind::Init)
    }
}

/// Create every in-scope table that does not already exist.
pub async fn init(
    engines: &EngineManager,
    registry: &SchemaRegistry,
    options: &OpOptions,
) -> OrmResult<OpSummary> {
    op(BulkKind::Init, engines, registry, options).await
}

/// Drop every in-scope table that exists, dependents first.
pub async fn clear(
    engines: &EngineManager,
    registry: &SchemaRegistry,
    options: &OpOptions,
) -> OrmResult<OpSummary> {
    op(BulkKind::Clear, engines, registry, options).await
}

/// Delete all rows from every in-scope table that exists, without dropping.
pub async fn flush(
    engines: &EngineManager,
    registry: &SchemaRegistry,
    options: &OpOptions,
) -> OrmResult<OpSummary> {
    op(BulkKind::Flush, engines, registry, options).await
}

async fn op(
    kind: BulkKind,
    engines: &EngineManager,
    registry: &SchemaRegistry,
    options: &OpOptions,
) -> OrmResult<OpSummary> {
    // Offline preparation cannot commit to the database and should always
    // echo output.
    let commit = options.commit && !options.offline;
    let echo = options.echo || options.offline;

    let mut tables = registry.sorted_tables();
    validate_names(&tables, &options.names)?;
    if kind.reversed() {
        tables.reverse();
    }

    let engine = engines.default_engine()?;

    if options.verbose {
        info!(
            operation = kind.operation(),
            database = %engine.url().obfuscated(),
            "starting bulk operation"
        );
    }

    let mut connection = if options.offline {
        None
    } else {
        Some(engine.connect().await?)
    };

    let mut actions = Vec::new();

    for table in tables {
        if !included(&table, &options.names) {
            continue;
        }

        if let Some(conn) = connection.as_mut() {
            let exists = conn.table_exists(&table.name).await.map_err(|e| {
                OrmError::database(format!("existence probe failed for {}: {}", table.name, e))
            })?;
            if kind.skip(exists) {
                continue;
            }
        }

        let sql = kind.statement(&table);

        if options.verbose {
            info!(table = %table.name, action = kind.action(), "processing table");
        }

        if echo {
            println!("{}", sql);
        }

        let mut applied = false;
        if commit {
            if let Some(conn) = connection.as_mut() {
                conn.execute(&sql).await.map_err(|e| {
                    OrmError::database(format!(
                        "{} failed for table {}: {}",
                        kind.action(),
                        table.name,
                        e
                    ))
                })?;
                applied = true;
            }
        }

        actions.push(TableAction {
            table: table.name.clone(),
            action: kind.action(),
            sql,
            applied,
        });
    }

    Ok(OpSummary {
        operation: kind.operation(),
        actions,
    })
}
