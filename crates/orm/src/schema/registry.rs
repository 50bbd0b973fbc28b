//! Schema registry
//!
//! Partitions model definitions into per-component metadata collections and
//! class registries at registration time. Every model declared in a
//! registered component shares that component's collection by reference
//! (nested sub-packages included); every model declared outside one gets a
//! private collection of its own.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use mosaic_core::Settings;

use crate::component::{strip_models, ComponentResolver};
use crate::error::OrmResult;
use crate::schema::metadata::MetadataCollection;
use crate::schema::table::{ModelDef, ModelIdent, TableDef};

/// Reflective lookup from type name to the model's identity, scoped like
/// the metadata collection it sits next to.
pub type ClassRegistry = HashMap<String, ModelIdent>;

/// The shared metadata/class-registry pair for one scope.
#[derive(Debug, Clone, Default)]
pub struct ComponentEntry {
    pub metadata: Arc<Mutex<MetadataCollection>>,
    pub classes: Arc<Mutex<ClassRegistry>>,
}

impl ComponentEntry {
    fn new() -> Self {
        Self::default()
    }
}

/// The outcome of registering one model.
#[derive(Debug, Clone)]
pub struct RegisteredModel {
    pub table_name: String,
    pub ident: ModelIdent,
    /// The collection this model's table lives in, shared by reference with
    /// every other model of the same component.
    pub metadata: Arc<Mutex<MetadataCollection>>,
    pub classes: Arc<Mutex<ClassRegistry>>,
}

/// Keyed arena of component entries plus the private entries of standalone
/// models. One registry per application context.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    resolver: ComponentResolver,
    entries: Vec<(String, ComponentEntry)>,
    standalone: Vec<ComponentEntry>,
}

impl SchemaRegistry {
    pub fn new<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            resolver: ComponentResolver::new(components),
            entries: Vec::new(),
            standalone: Vec::new(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.components.iter().cloned())
    }

    pub fn resolver(&self) -> &ComponentResolver {
        &self.resolver
    }

    /// Register a model definition.
    ///
    /// Returns `None` for the abstract root base, which only seeds shared
    /// defaults and owns no table.
    pub fn register(&mut self, def: ModelDef) -> OrmResult<Option<RegisteredModel>> {
        if def.abstract_base {
            return Ok(None);
        }

        let component = self.resolver.resolve(&def.module_path).map(str::to_string);
        let table_name = derive_table_name(component.as_deref(), &def.module_path, &def.class_name);

        let entry = match &component {
            Some(name) => self.entry_for(name).clone(),
            None => {
                let entry = ComponentEntry::new();
                self.standalone.push(entry.clone());
                entry
            }
        };

        let ident = ModelIdent {
            component,
            module_path: def.module_path,
            class_name: def.class_name,
        };

        let table = TableDef {
            name: table_name.clone(),
            columns: def.columns,
            constraints: def.constraints,
            foreign_keys: def.foreign_keys,
            owner: ident.clone(),
        };

        entry
            .metadata
            .lock()
            .expect("metadata collection lock poisoned")
            .insert(table)?;
        entry
            .classes
            .lock()
            .expect("class registry lock poisoned")
            .insert(ident.class_name.clone(), ident.clone());

        Ok(Some(RegisteredModel {
            table_name,
            ident,
            metadata: entry.metadata,
            classes: entry.classes,
        }))
    }

    fn entry_for(&mut self, component: &str) -> &ComponentEntry {
        if let Some(position) = self.entries.iter().position(|(name, _)| name == component) {
            return &self.entries[position].1;
        }
        self.entries
            .push((component.to_string(), ComponentEntry::new()));
        &self.entries.last().expect("entry just pushed").1
    }

    /// The shared entry for a registered component, if any model of that
    /// component has been registered.
    pub fn component_entry(&self, component: &str) -> Option<&ComponentEntry> {
        self.entries
            .iter()
            .find(|(name, _)| name == component)
            .map(|(_, entry)| entry)
    }

    /// All table definitions of one component in dependency order.
    pub fn component_tables(&self, component: &str) -> Vec<TableDef> {
        self.component_entry(component)
            .map(|entry| {
                entry
                    .metadata
                    .lock()
                    .expect("metadata collection lock poisoned")
                    .sorted_tables()
            })
            .unwrap_or_default()
    }

    /// The global view: the union of every collection's tables in
    /// dependency order, so cross-component foreign keys still create and
    /// drop safely. Components come in registration order, then standalone
    /// models. Used by operations that don't restrict scope.
    pub fn sorted_tables(&self) -> Vec<TableDef> {
        let mut tables = Vec::new();
        for (_, entry) in &self.entries {
            tables.extend(
                entry
                    .metadata
                    .lock()
                    .expect("metadata collection lock poisoned")
                    .tables()
                    .cloned(),
            );
        }
        for entry in &self.standalone {
            tables.extend(
                entry
                    .metadata
                    .lock()
                    .expect("metadata collection lock poisoned")
                    .tables()
                    .cloned(),
            );
        }
        super::metadata::sort_by_dependency(tables)
    }

    /// Look up a model by type name within one component.
    pub fn lookup_class(&self, component: &str, class_name: &str) -> Option<ModelIdent> {
        self.component_entry(component).and_then(|entry| {
            entry
                .classes
                .lock()
                .expect("class registry lock poisoned")
                .get(class_name)
                .cloned()
        })
    }
}

/// Derive the table name for a model.
///
/// The component name (or, for standalone models, the defining module path
/// with its `models` segments removed) is joined with the type name;
/// CamelCase boundaries and dots become underscores, runs of separators
/// collapse, and the result is lower-case. Derivation is deterministic, so
/// re-registering the same model reproduces the same name.
fn derive_table_name(component: Option<&str>, module_path: &str, class_name: &str) -> String {
    let prefix = match component {
        Some(name) => name.to_string(),
        None => strip_models(module_path),
    };

    let raw = if prefix.is_empty() {
        class_name.to_string()
    } else {
        format!("{}.{}", prefix, class_name)
    };

    let mut name = String::with_capacity(raw.len() + 4);
    for ch in raw.chars() {
        if ch.is_ascii_uppercase() {
            name.push('_');
            name.push(ch.to_ascii_lowercase());
        } else if ch == '.' {
            name.push('_');
        } else {
            name.push(ch.to_ascii_lowercase());
        }
    }

    let mut collapsed = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch == '_' && collapsed.ends_with('_') {
            continue;
        }
        collapsed.push(ch);
    }
    collapsed.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new(["app", "app.billing"])
    }

    #[test]
    fn models_in_one_component_share_the_collection_by_identity() {
        let mut registry = registry();
        let invoice = registry
            .register(ModelDef::new("Invoice", "app.billing.models").id("id"))
            .unwrap()
            .unwrap();
        let receipt = registry
            .register(ModelDef::new("Receipt", "app.billing.reports.models").id("id"))
            .unwrap()
            .unwrap();

        assert!(Arc::ptr_eq(&invoice.metadata, &receipt.metadata));
        assert!(Arc::ptr_eq(&invoice.classes, &receipt.classes));
        assert_eq!(invoice.metadata.lock().unwrap().len(), 2);
    }

    #[test]
    fn standalone_models_are_isolated_from_each_other() {
        let mut registry = registry();
        let note = registry
            .register(ModelDef::new("Note", "scratch.models").id("id"))
            .unwrap()
            .unwrap();
        let draft = registry
            .register(ModelDef::new("Draft", "scratch.models").id("id"))
            .unwrap()
            .unwrap();

        assert!(note.ident.component.is_none());
        assert!(!Arc::ptr_eq(&note.metadata, &draft.metadata));
        assert_eq!(note.metadata.lock().unwrap().len(), 1);
    }

    #[test]
    fn table_names_follow_component_and_class() {
        let mut registry = registry();
        let invoice = registry
            .register(ModelDef::new("Invoice", "app.billing.models").id("id"))
            .unwrap()
            .unwrap();
        assert_eq!(invoice.table_name, "app_billing_invoice");

        let profile = registry
            .register(ModelDef::new("UserProfile", "app.models").id("id"))
            .unwrap()
            .unwrap();
        assert_eq!(profile.table_name, "app_user_profile");

        let note = registry
            .register(ModelDef::new("Note", "scratch.models").id("id"))
            .unwrap()
            .unwrap();
        assert_eq!(note.table_name, "scratch_note");
    }

    #[test]
    fn reregistration_does_not_duplicate_the_table() {
        let mut registry = registry();
        for _ in 0..2 {
            registry
                .register(ModelDef::new("Invoice", "app.billing.models").id("id"))
                .unwrap();
        }
        assert_eq!(registry.component_tables("app.billing").len(), 1);
    }

    #[test]
    fn abstract_base_is_skipped() {
        let mut registry = registry();
        let result = registry
            .register(ModelDef::new("Model", "app.models").abstract_base())
            .unwrap();
        assert!(result.is_none());
        assert!(registry.sorted_tables().is_empty());
    }

    #[test]
    fn class_registry_lookup_finds_component_models() {
        let mut registry = registry();
        registry
            .register(ModelDef::new("Invoice", "app.billing.models").id("id"))
            .unwrap();

        let ident = registry.lookup_class("app.billing", "Invoice").unwrap();
        assert_eq!(ident.full_path(), "app.billing.models.Invoice");
        assert!(registry.lookup_class("app", "Invoice").is_none());
    }

    #[test]
    fn global_view_covers_components_and_standalone_models() {
        let mut registry = registry();
        registry
            .register(ModelDef::new("Invoice", "app.billing.models").id("id"))
            .unwrap();
        registry
            .register(ModelDef::new("Note", "scratch.models").id("id"))
            .unwrap();

        let names: Vec<_> = registry.sorted_tables().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["app_billing_invoice", "scratch_note"]);
    }
}
