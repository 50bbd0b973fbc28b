//! Component resolution
//!
//! Maps the module path that defines a model to the registered component
//! that owns it. Components are dotted names (`app`, `app.billing`); a model
//! belongs to a component whether it is declared in the component package
//! directly or nested in a sub-package.

/// Resolves defining module paths against the configured component list.
#[derive(Debug, Clone, Default)]
pub struct ComponentResolver {
    components: Vec<String>,
}

impl ComponentResolver {
    pub fn new<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            components: components.into_iter().map(Into::into).collect(),
        }
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Resolve a module path to the owning component name.
    ///
    /// The longest registered component that is a dotted-segment prefix of
    /// the path wins, so with `app` and `app.billing` both registered, a
    /// model in `app.billing.models` resolves to `app.billing`. When nothing
    /// matches and the path carries a `models` segment, resolution is
    /// retried with every `models` segment removed, so an un-registered
    /// `app.sub.models.models` is treated as `app.sub`.
    pub fn resolve(&self, module_path: &str) -> Option<&str> {
        if let Some(name) = self.longest_prefix(module_path) {
            return Some(name);
        }

        if module_path.split('.').any(|segment| segment == "models") {
            return self.longest_prefix(&strip_models(module_path));
        }

        None
    }

    fn longest_prefix(&self, module_path: &str) -> Option<&str> {
        let mut segments: Vec<&str> = module_path.split('.').collect();
        while !segments.is_empty() {
            let candidate = segments.join(".");
            if let Some(name) = self.components.iter().find(|c| **c == candidate) {
                return Some(name);
            }
            segments.pop();
        }
        None
    }
}

/// Remove every `models` segment from a dotted module path.
pub(crate) fn strip_models(module_path: &str) -> String {
    module_path
        .split('.')
        .filter(|segment| *segment != "models" && !segment.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> ComponentResolver {
        ComponentResolver::new(["app", "app.billing", "audit"])
    }

    #[test]
    fn resolves_direct_module() {
        assert_eq!(resolver().resolve("app.billing.models"), Some("app.billing"));
    }

    #[test]
    fn resolves_nested_subpackage() {
        assert_eq!(
            resolver().resolve("app.billing.reports.models"),
            Some("app.billing")
        );
    }

    #[test]
    fn prefers_longest_match() {
        // `app` is a prefix of `app.billing`; the more specific one wins.
        assert_eq!(resolver().resolve("app.billing"), Some("app.billing"));
        assert_eq!(resolver().resolve("app.invoices"), Some("app"));
    }

    #[test]
    fn exact_component_name_resolves_to_itself() {
        assert_eq!(resolver().resolve("audit"), Some("audit"));
    }

    #[test]
    fn falls_back_by_stripping_models_segments() {
        let resolver = ComponentResolver::new(["app.sub"]);
        assert_eq!(resolver.resolve("app.sub.models.models"), Some("app.sub"));
    }

    #[test]
    fn unregistered_path_resolves_to_none() {
        assert_eq!(resolver().resolve("scratch.models"), None);
        assert_eq!(resolver().resolve("elsewhere"), None);
    }

    #[test]
    fn strips_every_models_segment() {
        assert_eq!(strip_models("a.models.b.models"), "a.b");
        assert_eq!(strip_models("models"), "");
    }
}
