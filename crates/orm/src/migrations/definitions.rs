//! Migration definitions: revisions, revision specs, and configuration.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{OrmError, OrmResult};

/// Alias for the newest revision of a chain.
pub const HEAD_REVISION: &str = "head";

/// Alias for the empty state before the first revision.
pub const BASE_REVISION: &str = "base";

/// One immutable node in a component's migration history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Revision {
    /// Opaque identifier (12 hex characters).
    pub id: String,
    /// Parent identifier; `None` for the root revision.
    pub parent: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
    /// Location of the script file.
    pub path: PathBuf,
    pub up_sql: String,
    pub down_sql: String,
}

impl Revision {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// A revision entry annotated for history listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub revision: Revision,
    pub is_head: bool,
}

impl HistoryEntry {
    /// One-line log form: `parent -> id (head), message`.
    pub fn log_line(&self) -> String {
        format!(
            "{} -> {}{}, {}",
            self.revision.parent.as_deref().unwrap_or("<base>"),
            self.revision.id,
            if self.is_head { " (head)" } else { "" },
            self.revision.message
        )
    }
}

/// A caller-supplied revision target: a single token, or a `from:to` range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionSpec {
    Target(String),
    Range { from: String, to: String },
}

impl RevisionSpec {
    pub fn parse(spec: &str) -> Self {
        match spec.split_once(':') {
            Some((from, to)) => RevisionSpec::Range {
                from: from.trim().to_string(),
                to: to.trim().to_string(),
            },
            None => RevisionSpec::Target(spec.trim().to_string()),
        }
    }
}

/// A history range `[start]:[end]`; either side may be empty, the
/// separator may not be omitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRange {
    pub base: Option<String>,
    pub head: Option<String>,
}

impl HistoryRange {
    pub fn parse(range: &str) -> OrmResult<Self> {
        let (base, head) = range.trim().split_once(':').ok_or_else(|| {
            OrmError::format("history range requires [start]:[end], [start]:, or :[end]")
        })?;
        let bound = |token: &str| {
            let token = token.trim();
            if token.is_empty() {
                None
            } else {
                Some(token.to_string())
            }
        };
        Ok(Self {
            base: bound(base),
            head: bound(head),
        })
    }

    pub fn full() -> Self {
        Self {
            base: None,
            head: None,
        }
    }
}

/// Configuration for the migration system.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Root directory holding one script directory per component.
    pub scripts_root: PathBuf,
    /// Name of the shared version-tracking table.
    pub version_table: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            scripts_root: PathBuf::from("migrations"),
            version_table: "mosaic_versions".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_parses_targets_and_ranges() {
        assert_eq!(
            RevisionSpec::parse("head"),
            RevisionSpec::Target("head".to_string())
        );
        assert_eq!(
            RevisionSpec::parse("abc123:def456"),
            RevisionSpec::Range {
                from: "abc123".to_string(),
                to: "def456".to_string()
            }
        );
        assert_eq!(
            RevisionSpec::parse("abc123:base"),
            RevisionSpec::Range {
                from: "abc123".to_string(),
                to: "base".to_string()
            }
        );
    }

    #[test]
    fn history_range_requires_the_separator() {
        assert!(HistoryRange::parse("abc123").is_err());

        let range = HistoryRange::parse("abc123:").unwrap();
        assert_eq!(range.base.as_deref(), Some("abc123"));
        assert_eq!(range.head, None);

        let range = HistoryRange::parse(":def456").unwrap();
        assert_eq!(range.base, None);
        assert_eq!(range.head.as_deref(), Some("def456"));
    }
}
