//! Table-scope filtering for bulk operations
//!
//! Callers may restrict an operation to a set of names; a table is in scope
//! when any token names its component, its model's full dotted path, or the
//! short `component:ClassName` form.

use crate::error::{OrmError, OrmResult};
use crate::schema::table::TableDef;

/// Determine whether the table is included by reference in the names.
///
/// An empty list includes every table.
pub fn included(table: &TableDef, names: &[String]) -> bool {
    if names.is_empty() {
        return true;
    }

    let owner = &table.owner;

    if let Some(component) = &owner.component {
        if names.iter().any(|name| name == component) {
            return true;
        }
    }

    let full_path = owner.full_path();
    if names.iter().any(|name| *name == full_path) {
        return true;
    }

    if let Some(short) = owner.short_name() {
        if names.iter().any(|name| *name == short) {
            return true;
        }
    }

    false
}

/// Reject scope tokens that match nothing before any database work begins.
pub fn validate_names(tables: &[TableDef], names: &[String]) -> OrmResult<()> {
    for name in names {
        let known = tables.iter().any(|table| {
            table.owner.component.as_deref() == Some(name.as_str())
                || table.owner.full_path() == *name
                || table.owner.short_name().as_deref() == Some(name.as_str())
        });
        if !known {
            return Err(OrmError::Scope(name.clone()));
        }
    }
    Ok(())
}
