//! Script directories
//!
//! One directory per component under the configured scripts root, one SQL
//! file per revision. Files carry the revision id, the parent link, and the
//! up/down sections; the chain structure is rebuilt from the parent links
//! on load.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::{OrmError, OrmResult};
use crate::migrations::definitions::{MigrationConfig, Revision, BASE_REVISION, HEAD_REVISION};

/// A component's migration script directory.
#[derive(Debug, Clone)]
pub struct ScriptDirectory {
    component: String,
    dir: PathBuf,
}

impl ScriptDirectory {
    pub fn for_component(config: &MigrationConfig, component: &str) -> Self {
        Self {
            component: component.to_string(),
            dir: config.scripts_root.join(component),
        }
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether the directory exists at all. A missing directory means the
    /// component has never been migrated.
    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }

    pub fn ensure(&self) -> OrmResult<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// Load every revision script. A missing directory loads as empty.
    pub fn load(&self) -> OrmResult<Vec<Revision>> {
        if !self.exists() {
            return Ok(Vec::new());
        }

        let mut revisions = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "sql") {
                revisions.push(self.parse_file(&path)?);
            }
        }
        revisions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(revisions)
    }

    /// The head of the chain: the revision no other revision names as its
    /// parent. Empty chain has no head.
    pub fn head_id(&self, revisions: &[Revision]) -> OrmResult<Option<String>> {
        let mut heads = revisions
            .iter()
            .filter(|rev| !revisions.iter().any(|r| r.parent.as_deref() == Some(&rev.id)))
            .map(|rev| rev.id.clone());

        let head = heads.next();
        if heads.next().is_some() {
            return Err(OrmError::migration(format!(
                "component {} has multiple heads",
                self.component
            )));
        }
        if head.is_none() && !revisions.is_empty() {
            return Err(OrmError::migration(format!(
                "component {} has a revision cycle",
                self.component
            )));
        }
        Ok(head)
    }

    /// Resolve a revision token: `head`, `base`, a full id, or a unique
    /// id prefix. `None` means the base (empty) state.
    pub fn resolve(&self, revisions: &[Revision], token: &str) -> OrmResult<Option<String>> {
        match token {
            BASE_REVISION => Ok(None),
            HEAD_REVISION => self.head_id(revisions),
            _ => {
                let mut matches = revisions.iter().filter(|rev| rev.id.starts_with(token));
                match (matches.next(), matches.next()) {
                    (Some(rev), None) => Ok(Some(rev.id.clone())),
                    (Some(_), Some(_)) => Err(OrmError::migration(format!(
                        "revision token {:?} is ambiguous for component {}",
                        token, self.component
                    ))),
                    (None, _) => Err(OrmError::migration(format!(
                        "unknown revision {:?} for component {}",
                        token, self.component
                    ))),
                }
            }
        }
    }

    /// Revisions to apply to move forward from `current` (exclusive) to
    /// `target` (inclusive), oldest first.
    pub fn upgrade_path(
        &self,
        revisions: &[Revision],
        current: Option<&str>,
        target: Option<&str>,
    ) -> OrmResult<Vec<Revision>> {
        let target = match target {
            Some(target) => target,
            None => return Ok(Vec::new()),
        };
        if current == Some(target) {
            return Ok(Vec::new());
        }

        let mut path = Vec::new();
        let mut cursor = Some(target.to_string());
        while let Some(id) = cursor {
            let revision = self.revision(revisions, &id)?;
            path.push(revision.clone());
            cursor = revision.parent.clone();
            if cursor.as_deref() == current {
                path.reverse();
                return Ok(path);
            }
        }

        match current {
            None => {
                path.reverse();
                Ok(path)
            }
            Some(current) => Err(OrmError::migration(format!(
                "revision {} is not an ancestor of {} in component {}",
                current, target, self.component
            ))),
        }
    }

    /// Revisions to un-apply to move backward from `from` (inclusive) down
    /// to `to` (exclusive; `None` for base), newest first.
    pub fn downgrade_path(
        &self,
        revisions: &[Revision],
        from: &str,
        to: Option<&str>,
    ) -> OrmResult<Vec<Revision>> {
        if Some(from) == to {
            return Ok(Vec::new());
        }

        let mut path = Vec::new();
        let mut cursor = Some(from.to_string());
        while let Some(id) = cursor {
            let revision = self.revision(revisions, &id)?;
            cursor = revision.parent.clone();
            path.push(revision.clone());
            if cursor.as_deref() == to {
                return Ok(path);
            }
        }

        match to {
            None => Ok(path),
            Some(to) => Err(OrmError::migration(format!(
                "revision {} is not an ancestor of {} in component {}",
                to, from, self.component
            ))),
        }
    }

    /// Chain segment between the bounds, oldest first. `None` bounds widen
    /// to the full chain.
    pub fn walk(
        &self,
        revisions: &[Revision],
        base: Option<&str>,
        head: Option<&str>,
    ) -> OrmResult<Vec<Revision>> {
        let start = match head {
            Some(id) => Some(id.to_string()),
            None => self.head_id(revisions)?,
        };

        let mut collected = Vec::new();
        let mut cursor = start;
        while let Some(id) = cursor {
            let revision = self.revision(revisions, &id)?;
            collected.push(revision.clone());
            if base == Some(id.as_str()) {
                break;
            }
            cursor = revision.parent.clone();
        }

        collected.reverse();
        Ok(collected)
    }

    fn revision<'a>(&self, revisions: &'a [Revision], id: &str) -> OrmResult<&'a Revision> {
        revisions.iter().find(|rev| rev.id == id).ok_or_else(|| {
            OrmError::migration(format!(
                "unknown revision {:?} for component {}",
                id, self.component
            ))
        })
    }

    /// Write a new revision script and return the parsed revision.
    pub fn create_revision(
        &self,
        id: &str,
        parent: Option<&str>,
        message: &str,
        up_sql: &str,
        down_sql: &str,
    ) -> OrmResult<Revision> {
        self.ensure()?;

        let created_at = Utc::now();
        let filename = format!("{}_{}.sql", id, slug(message));
        let path = self.dir.join(filename);

        let content = format!(
            "-- Revision: {}\n\
             -- Parent: {}\n\
             -- Message: {}\n\
             -- Created: {}\n\
             \n\
             -- Up migration\n\
             {}\n\
             \n\
             -- Down migration\n\
             {}\n",
            id,
            parent.unwrap_or("(base)"),
            message,
            created_at.to_rfc3339(),
            up_sql,
            down_sql,
        );
        fs::write(&path, content)?;

        Ok(Revision {
            id: id.to_string(),
            parent: parent.map(str::to_string),
            message: message.to_string(),
            created_at,
            path,
            up_sql: up_sql.trim().to_string(),
            down_sql: down_sql.trim().to_string(),
        })
    }

    fn parse_file(&self, path: &Path) -> OrmResult<Revision> {
        let content = fs::read_to_string(path)?;

        let mut id = None;
        let mut parent = None;
        let mut message = String::new();
        let mut created_at = None;

        let mut up_sql = Vec::new();
        let mut down_sql = Vec::new();
        let mut section = "";

        for line in content.lines() {
            let trimmed = line.trim();
            let lower = trimmed.to_ascii_lowercase();

            if let Some(value) = trimmed.strip_prefix("-- Revision:") {
                id = Some(value.trim().to_string());
            } else if let Some(value) = trimmed.strip_prefix("-- Parent:") {
                let value = value.trim();
                if value != "(base)" {
                    parent = Some(value.to_string());
                }
            } else if let Some(value) = trimmed.strip_prefix("-- Message:") {
                message = value.trim().to_string();
            } else if let Some(value) = trimmed.strip_prefix("-- Created:") {
                created_at = chrono::DateTime::parse_from_rfc3339(value.trim())
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc));
            } else if lower.starts_with("-- up") {
                section = "up";
            } else if lower.starts_with("-- down") {
                section = "down";
            } else if trimmed.is_empty() || trimmed.starts_with("--") {
                continue;
            } else {
                match section {
                    "up" => up_sql.push(line),
                    "down" => down_sql.push(line),
                    _ => {}
                }
            }
        }

        let id = id.ok_or_else(|| {
            OrmError::format(format!(
                "revision script {} is missing its Revision header",
                path.display()
            ))
        })?;

        Ok(Revision {
            id,
            parent,
            message,
            created_at: created_at.unwrap_or_else(Utc::now),
            path: path.to_path_buf(),
            up_sql: up_sql.join("\n").trim().to_string(),
            down_sql: down_sql.join("\n").trim().to_string(),
        })
    }
}

fn slug(message: &str) -> String {
    let mut slug = String::with_capacity(message.len());
    for ch in message.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let trimmed = slug.trim_matches('_');
    if trimmed.is_empty() {
        "no_message".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(root: &TempDir) -> MigrationConfig {
        MigrationConfig {
            scripts_root: root.path().to_path_buf(),
            ..MigrationConfig::default()
        }
    }

    fn chain(script: &ScriptDirectory, n: usize) -> Vec<Revision> {
        let mut parent: Option<String> = None;
        for i in 0..n {
            let id = format!("rev{:02}aaaaaaaa", i);
            script
                .create_revision(
                    &id,
                    parent.as_deref(),
                    &format!("step {}", i),
                    &format!("CREATE TABLE t{} (id INTEGER);", i),
                    &format!("DROP TABLE t{};", i),
                )
                .unwrap();
            parent = Some(id);
        }
        script.load().unwrap()
    }

    #[test]
    fn writes_and_parses_revision_scripts() {
        let root = TempDir::new().unwrap();
        let script = ScriptDirectory::for_component(&config(&root), "app.billing");

        script
            .create_revision(
                "abc123def456",
                None,
                "create invoices",
                "CREATE TABLE app_billing_invoice (id INTEGER);",
                "DROP TABLE app_billing_invoice;",
            )
            .unwrap();

        let revisions = script.load().unwrap();
        assert_eq!(revisions.len(), 1);
        let revision = &revisions[0];
        assert_eq!(revision.id, "abc123def456");
        assert!(revision.is_root());
        assert_eq!(revision.message, "create invoices");
        assert!(revision.up_sql.contains("CREATE TABLE app_billing_invoice"));
        assert!(revision.down_sql.contains("DROP TABLE app_billing_invoice"));
        assert!(revision
            .path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .contains("create_invoices"));
    }

    #[test]
    fn missing_directory_loads_empty() {
        let root = TempDir::new().unwrap();
        let script = ScriptDirectory::for_component(&config(&root), "never.migrated");
        assert!(!script.exists());
        assert!(script.load().unwrap().is_empty());
    }

    #[test]
    fn head_follows_parent_links() {
        let root = TempDir::new().unwrap();
        let script = ScriptDirectory::for_component(&config(&root), "app");
        let revisions = chain(&script, 3);

        assert_eq!(
            script.head_id(&revisions).unwrap().as_deref(),
            Some("rev02aaaaaaaa")
        );
    }

    #[test]
    fn resolve_handles_aliases_and_prefixes() {
        let root = TempDir::new().unwrap();
        let script = ScriptDirectory::for_component(&config(&root), "app");
        let revisions = chain(&script, 3);

        assert_eq!(script.resolve(&revisions, "base").unwrap(), None);
        assert_eq!(
            script.resolve(&revisions, "head").unwrap().as_deref(),
            Some("rev02aaaaaaaa")
        );
        assert_eq!(
            script.resolve(&revisions, "rev01").unwrap().as_deref(),
            Some("rev01aaaaaaaa")
        );
        assert!(script.resolve(&revisions, "rev").is_err());
        assert!(script.resolve(&revisions, "zzz").is_err());
    }

    #[test]
    fn upgrade_path_walks_forward_from_current() {
        let root = TempDir::new().unwrap();
        let script = ScriptDirectory::for_component(&config(&root), "app");
        let revisions = chain(&script, 3);

        let path = script
            .upgrade_path(&revisions, None, Some("rev02aaaaaaaa"))
            .unwrap();
        let ids: Vec<_> = path.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["rev00aaaaaaaa", "rev01aaaaaaaa", "rev02aaaaaaaa"]);

        let path = script
            .upgrade_path(&revisions, Some("rev00aaaaaaaa"), Some("rev02aaaaaaaa"))
            .unwrap();
        let ids: Vec<_> = path.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["rev01aaaaaaaa", "rev02aaaaaaaa"]);

        assert!(script
            .upgrade_path(&revisions, Some("rev02aaaaaaaa"), Some("rev00aaaaaaaa"))
            .is_err());
    }

    #[test]
    fn downgrade_path_walks_backward_to_the_bound() {
        let root = TempDir::new().unwrap();
        let script = ScriptDirectory::for_component(&config(&root), "app");
        let revisions = chain(&script, 3);

        let path = script
            .downgrade_path(&revisions, "rev02aaaaaaaa", Some("rev00aaaaaaaa"))
            .unwrap();
        let ids: Vec<_> = path.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["rev02aaaaaaaa", "rev01aaaaaaaa"]);

        let path = script
            .downgrade_path(&revisions, "rev02aaaaaaaa", None)
            .unwrap();
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn walk_yields_oldest_first() {
        let root = TempDir::new().unwrap();
        let script = ScriptDirectory::for_component(&config(&root), "app");
        let revisions = chain(&script, 3);

        let walked = script.walk(&revisions, None, None).unwrap();
        let ids: Vec<_> = walked.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["rev00aaaaaaaa", "rev01aaaaaaaa", "rev02aaaaaaaa"]);
    }
}
