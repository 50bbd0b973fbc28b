//! The migration engine
//!
//! Drives revision generation and application for one component at a time
//! against the shared version store. Online operations talk to the live
//! database; offline operations render the statements they would have
//! executed and never open a connection.

use tracing::{info, warn};
use uuid::Uuid;

use crate::backends::DatabaseConnection;
use crate::engine::EngineManager;
use crate::error::{OrmError, OrmResult};
use crate::migrations::definitions::{
    HistoryEntry, HistoryRange, MigrationConfig, Revision, RevisionSpec,
};
use crate::migrations::diff::{diff_tables, render_down, render_up};
use crate::migrations::script::ScriptDirectory;
use crate::migrations::version_store::{SharedVersionTable, VersionStore};
use crate::schema::SchemaRegistry;

/// Current-revision report marker for one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentStatus {
    Current(String),
    Unversioned,
    /// The component's script directory is entirely absent.
    NotFound,
    /// The status probe failed; the batch continues with other components.
    Failed(String),
}

impl std::fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentStatus::Current(id) => f.write_str(id),
            ComponentStatus::Unversioned => f.write_str("unversioned"),
            ComponentStatus::NotFound => f.write_str("(not found)"),
            ComponentStatus::Failed(message) => write!(f, "error: {}", message),
        }
    }
}

/// Outcome of an upgrade or downgrade.
#[derive(Debug, Clone)]
pub struct MigrationReport {
    pub component: String,
    /// Revision ids walked, in application order.
    pub applied: Vec<String>,
    /// The version recorded (or that would be recorded) once done.
    pub final_version: Option<String>,
    /// Rendered statements; populated in offline mode.
    pub sql: Vec<String>,
}

impl MigrationReport {
    pub fn rendered(&self) -> String {
        self.sql.join("\n")
    }
}

/// Per-component migration operations over an explicit context.
pub struct MigrationEngine<'a> {
    engines: &'a EngineManager,
    registry: &'a SchemaRegistry,
    config: MigrationConfig,
    store: Box<dyn VersionStore>,
}

impl<'a> MigrationEngine<'a> {
    pub fn new(engines: &'a EngineManager, registry: &'a SchemaRegistry) -> Self {
        Self::with_config(engines, registry, MigrationConfig::default())
    }

    pub fn with_config(
        engines: &'a EngineManager,
        registry: &'a SchemaRegistry,
        config: MigrationConfig,
    ) -> Self {
        let store = Box::new(SharedVersionTable::new(config.version_table.clone()));
        Self {
            engines,
            registry,
            config,
            store,
        }
    }

    /// Swap the version storage strategy.
    pub fn with_store(mut self, store: Box<dyn VersionStore>) -> Self {
        self.store = store;
        self
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    fn script(&self, component: &str) -> ScriptDirectory {
        ScriptDirectory::for_component(&self.config, component)
    }

    fn require_component(&self, component: &str) -> OrmResult<()> {
        if self.engines.settings().is_component(component) {
            Ok(())
        } else {
            Err(OrmError::Scope(component.to_string()))
        }
    }

    /// Generate a new revision for a component.
    ///
    /// With `auto`, the component's live version must equal the script head;
    /// otherwise the operation fails before anything is written, filesystem
    /// included. The script directory is created on first use.
    pub async fn revision(
        &self,
        component: &str,
        message: Option<&str>,
        auto: bool,
    ) -> OrmResult<Revision> {
        self.require_component(component)?;

        let script = self.script(component);
        let revisions = script.load()?;
        let head = script.head_id(&revisions)?;

        let (up_sql, down_sql) = if auto {
            let engine = self.engines.default_engine()?;
            let mut conn = engine.connect().await?;
            self.store.ensure_storage(conn.as_mut()).await?;
            let current = self.store.current(conn.as_mut(), component).await?;

            if current.as_deref() != head.as_deref() {
                return Err(OrmError::precondition(format!(
                    "component {} is not up to date (current: {}, head: {})",
                    component,
                    current.as_deref().unwrap_or("<base>"),
                    head.as_deref().unwrap_or("<base>"),
                )));
            }

            let tables = self.registry.component_tables(component);
            let changes =
                diff_tables(conn.as_mut(), &tables, &table_prefix(component)).await?;
            (render_up(&changes), render_down(&changes))
        } else {
            (String::new(), String::new())
        };

        let id = revision_id();
        let revision = script.create_revision(
            &id,
            head.as_deref(),
            message.unwrap_or("No message"),
            &up_sql,
            &down_sql,
        )?;

        info!(
            component = component,
            revision = %revision.id,
            path = %revision.path.display(),
            "generated revision"
        );
        Ok(revision)
    }

    /// Upgrade the component to a later version.
    ///
    /// Online accepts a bare target (`head` or a revision id) applied
    /// against the tracked current version. A `from:to` range is only valid
    /// offline, where it bounds the rendered script.
    pub async fn upgrade(
        &self,
        component: &str,
        revision: &str,
        offline: bool,
    ) -> OrmResult<MigrationReport> {
        self.require_component(component)?;

        let spec = RevisionSpec::parse(revision);
        let script = self.script(component);
        let revisions = script.load()?;

        if offline {
            let (start, target) = match &spec {
                RevisionSpec::Range { from, to } => {
                    (script.resolve(&revisions, from)?, script.resolve(&revisions, to)?)
                }
                RevisionSpec::Target(to) => (None, script.resolve(&revisions, to)?),
            };
            let steps = script.upgrade_path(&revisions, start.as_deref(), target.as_deref())?;
            return Ok(self.render_steps(component, steps, start, Direction::Up));
        }

        let target = match &spec {
            RevisionSpec::Target(to) => script.resolve(&revisions, to)?,
            RevisionSpec::Range { .. } => {
                return Err(OrmError::precondition(
                    "range revision not allowed during online operation",
                ))
            }
        };

        let engine = self.engines.default_engine()?;
        let mut conn = engine.connect().await?;
        self.store.ensure_storage(conn.as_mut()).await?;
        let current = self.store.current(conn.as_mut(), component).await?;

        let steps = script.upgrade_path(&revisions, current.as_deref(), target.as_deref())?;

        let mut previous = current.clone();
        let mut applied = Vec::new();
        for step in &steps {
            self.apply_step(
                conn.as_mut(),
                component,
                &step.up_sql,
                previous.as_deref(),
                Some(step.id.as_str()),
            )
            .await?;
            info!(component = component, revision = %step.id, "applied upgrade step");
            applied.push(step.id.clone());
            previous = Some(step.id.clone());
        }

        Ok(MigrationReport {
            component: component.to_string(),
            applied,
            final_version: previous,
            sql: Vec::new(),
        })
    }

    /// Downgrade the component to an earlier version.
    ///
    /// A `from:to` range is required in both modes: offline there is no
    /// live current to start from, and online a bare target would leave the
    /// true starting point ambiguous.
    pub async fn downgrade(
        &self,
        component: &str,
        revision: &str,
        offline: bool,
    ) -> OrmResult<MigrationReport> {
        self.require_component(component)?;

        let (from, to) = match RevisionSpec::parse(revision) {
            RevisionSpec::Range { from, to } => (from, to),
            RevisionSpec::Target(_) if offline => {
                return Err(OrmError::precondition(
                    "downgrade with --offline requires <fromrev>:<torev>",
                ))
            }
            RevisionSpec::Target(_) => {
                return Err(OrmError::precondition(
                    "online downgrade requires an explicit <fromrev>:<torev> range",
                ))
            }
        };

        let script = self.script(component);
        let revisions = script.load()?;

        let from_id = script.resolve(&revisions, &from)?.ok_or_else(|| {
            OrmError::precondition("downgrade range cannot start at base")
        })?;
        let to_id = script.resolve(&revisions, &to)?;
        let steps = script.downgrade_path(&revisions, &from_id, to_id.as_deref())?;

        if offline {
            return Ok(self.render_steps(component, steps, Some(from_id), Direction::Down));
        }

        let engine = self.engines.default_engine()?;
        let mut conn = engine.connect().await?;
        self.store.ensure_storage(conn.as_mut()).await?;
        let current = self.store.current(conn.as_mut(), component).await?;

        if current.as_deref() != Some(from_id.as_str()) {
            return Err(OrmError::precondition(format!(
                "component {} is at {}, not at range start {}",
                component,
                current.as_deref().unwrap_or("<base>"),
                from_id,
            )));
        }

        let mut applied = Vec::new();
        for step in &steps {
            self.apply_step(
                conn.as_mut(),
                component,
                &step.down_sql,
                Some(step.id.as_str()),
                step.parent.as_deref(),
            )
            .await?;
            info!(component = component, revision = %step.id, "reverted revision");
            applied.push(step.id.clone());
        }

        Ok(MigrationReport {
            component: component.to_string(),
            applied,
            final_version: to_id,
            sql: Vec::new(),
        })
    }

    /// Report the current revision of each selected component.
    ///
    /// Components whose script directory is missing report a not-found
    /// marker; a probe failure for one component is reported and the batch
    /// continues with the rest.
    pub async fn status(
        &self,
        names: Option<&[String]>,
    ) -> OrmResult<Vec<(String, ComponentStatus)>> {
        let components = &self.engines.settings().components;

        if let Some(names) = names {
            for name in names {
                if !components.iter().any(|c| c == name) {
                    return Err(OrmError::Scope(name.clone()));
                }
            }
        }

        let mut report = Vec::new();
        for component in components {
            if let Some(names) = names {
                if !names.iter().any(|name| name == component) {
                    continue;
                }
            }

            let script = self.script(component);
            if !script.exists() {
                report.push((component.clone(), ComponentStatus::NotFound));
                continue;
            }

            let status = match self.current_version(component).await {
                Ok(Some(id)) => ComponentStatus::Current(id),
                Ok(None) => ComponentStatus::Unversioned,
                Err(error) => {
                    warn!(component = %component, error = %error, "status probe failed");
                    ComponentStatus::Failed(error.to_string())
                }
            };
            report.push((component.clone(), status));
        }

        Ok(report)
    }

    /// Revisions of a component oldest-first, optionally bounded by a
    /// `[start]:[end]` range, each annotated with head-ness.
    pub fn history(&self, component: &str, range: Option<&str>) -> OrmResult<Vec<HistoryEntry>> {
        self.require_component(component)?;

        let range = match range {
            Some(range) => HistoryRange::parse(range)?,
            None => HistoryRange::full(),
        };

        let script = self.script(component);
        let revisions = script.load()?;

        let base = match &range.base {
            Some(token) => script.resolve(&revisions, token)?,
            None => None,
        };
        let head = match &range.head {
            Some(token) => script.resolve(&revisions, token)?,
            None => None,
        };

        let head_id = script.head_id(&revisions)?;
        let entries = script
            .walk(&revisions, base.as_deref(), head.as_deref())?
            .into_iter()
            .map(|revision| {
                let is_head = Some(revision.id.as_str()) == head_id.as_deref();
                HistoryEntry { revision, is_head }
            })
            .collect();
        Ok(entries)
    }

    async fn current_version(&self, component: &str) -> OrmResult<Option<String>> {
        let engine = self.engines.default_engine()?;
        let mut conn = engine.connect().await?;
        self.store.ensure_storage(conn.as_mut()).await?;
        self.store.current(conn.as_mut(), component).await
    }

    /// Apply one revision step and its version transition in a transaction.
    async fn apply_step(
        &self,
        conn: &mut dyn DatabaseConnection,
        component: &str,
        sql: &str,
        old: Option<&str>,
        new: Option<&str>,
    ) -> OrmResult<()> {
        conn.begin().await?;

        for statement in split_statements(sql) {
            if let Err(error) = conn.execute(&statement).await {
                let _ = conn.rollback().await;
                return Err(OrmError::migration(format!(
                    "component {}: step {} failed: {}",
                    component,
                    new.or(old).unwrap_or("<base>"),
                    error
                )));
            }
        }

        if let Err(error) = self.store.transition(conn, component, old, new).await {
            let _ = conn.rollback().await;
            return Err(error);
        }

        conn.commit().await
    }

    /// Render an offline run: each step's statements plus the version-table
    /// maintenance the online path would perform.
    fn render_steps(
        &self,
        component: &str,
        steps: Vec<Revision>,
        start: Option<String>,
        direction: Direction,
    ) -> MigrationReport {
        let mut sql = Vec::new();
        let mut applied = Vec::new();
        let mut previous = start;
        let mut final_version = previous.clone();

        for step in &steps {
            let (body, old, new) = match direction {
                Direction::Up => (&step.up_sql, previous.as_deref(), Some(step.id.as_str())),
                Direction::Down => (&step.down_sql, Some(step.id.as_str()), step.parent.as_deref()),
            };

            sql.push(format!(
                "-- {}: {} -> {}",
                component,
                old.unwrap_or("<base>"),
                new.unwrap_or("<base>"),
            ));
            if !body.is_empty() {
                sql.push(body.clone());
            }
            if let Some(transition) = self.store.transition_sql(component, old, new) {
                sql.push(format!("{};", transition));
            }

            applied.push(step.id.clone());
            final_version = new.map(str::to_string);
            previous = new.map(str::to_string);
        }

        let report = MigrationReport {
            component: component.to_string(),
            applied,
            final_version,
            sql,
        };
        println!("{}", report.rendered());
        report
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Up,
    Down,
}

/// Allocate an opaque revision identifier.
fn revision_id() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

/// Naive statement splitter for revision scripts: semicolon-separated,
/// comment-only fragments dropped.
fn split_statements(sql: &str) -> Vec<String> {
    sql.split(';')
        .map(|fragment| {
            fragment
                .lines()
                .filter(|line| !line.trim().starts_with("--"))
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string()
        })
        .filter(|statement| !statement.is_empty())
        .collect()
}

fn table_prefix(component: &str) -> String {
    component.replace('.', "_").to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revision_ids_are_short_and_unique() {
        let first = revision_id();
        let second = revision_id();
        assert_eq!(first.len(), 12);
        assert_ne!(first, second);
    }

    #[test]
    fn statement_splitting_drops_comment_fragments() {
        let sql = "-- cannot automatically recreate dropped table x\nCREATE TABLE a (id INTEGER);\nDROP TABLE b;";
        let statements = split_statements(sql);
        assert_eq!(statements, vec!["CREATE TABLE a (id INTEGER)", "DROP TABLE b"]);
    }

    #[test]
    fn component_prefixes_flatten_dots() {
        assert_eq!(table_prefix("app.billing"), "app_billing");
    }
}
