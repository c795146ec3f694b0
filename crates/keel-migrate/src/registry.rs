//! Static migration catalogs, one per label.

use std::collections::BTreeMap;

use keel_store::Label;

use crate::migration::Migration;
use crate::migrator::Migrator;
use crate::version::SchemaVersion;

/// Ordered migration catalogs keyed by label.
///
/// Registration order is execution order. A label with nothing registered
/// has an empty catalog.
pub struct Registry {
    catalogs: BTreeMap<Label, Vec<Box<dyn Migration>>>,
    supported: SchemaVersion,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            catalogs: BTreeMap::new(),
            supported: SchemaVersion::SUPPORTED,
        }
    }

    /// Append a migration to `label`'s catalog.
    pub fn register(mut self, label: Label, migration: impl Migration + 'static) -> Self {
        self.push(label, Box::new(migration));
        self
    }

    /// Append an already boxed migration to `label`'s catalog.
    pub fn push(&mut self, label: Label, migration: Box<dyn Migration>) -> &mut Self {
        self.catalogs.entry(label).or_default().push(migration);
        self
    }

    /// Schema version written by migrators from this registry.
    pub fn schema_version(mut self, supported: SchemaVersion) -> Self {
        self.supported = supported;
        self
    }

    /// The catalog for `label`.
    pub fn catalog(&self, label: Label) -> &[Box<dyn Migration>] {
        self.catalogs.get(&label).map(Vec::as_slice).unwrap_or(&[])
    }

    /// A migrator over `label`'s catalog.
    pub fn migrator(&self, label: Label) -> Migrator<'_> {
        Migrator::new(label, self.catalog(label)).with_schema_version(self.supported)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (label, catalog) in &self.catalogs {
            let names: Vec<_> = catalog.iter().map(|m| m.name()).collect();
            map.entry(label, &names);
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::MigrationFn;

    fn noop(name: &str) -> MigrationFn {
        MigrationFn::new(name, |_, _| Ok(()))
    }

    #[test]
    fn test_catalogs_are_per_label() {
        let registry = Registry::new()
            .register(Label::Chain, noop("one"))
            .register(Label::TxPool, noop("pool"))
            .register(Label::Chain, noop("two"));

        let chain: Vec<_> = registry.migrator(Label::Chain).names().map(String::from).collect();
        assert_eq!(chain, vec!["one", "two"]);
        assert_eq!(registry.catalog(Label::TxPool).len(), 1);
        assert!(registry.catalog(Label::Sentry).is_empty());
    }
}
