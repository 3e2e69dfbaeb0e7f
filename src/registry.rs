//! A directory of live virtual tables, keyed by name.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::table::VirtualTable;

/// Maps table name to the live `VirtualTable` behind it.
///
/// `VirtualTable` is itself a cheap `Arc`-backed handle (see `table.rs`), so the registry is a
/// directory, not a lifetime owner: removing an entry here only drops the registry's own clone.
#[derive(Default)]
pub struct Registry {
    tables: RwLock<HashMap<String, VirtualTable>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            tables: RwLock::new(HashMap::new()),
        }
    }

    pub fn add(&self, name: String, table: VirtualTable) {
        self.tables.write().insert(name, table);
    }

    pub fn get(&self, name: &str) -> Option<VirtualTable> {
        self.tables.read().get(name).cloned()
    }

    pub fn remove(&self, name: &str) -> Option<VirtualTable> {
        self.tables.write().remove(name)
    }

    /// Atomically moves the entry at `old` to `new` under a single writer-lock hold, so no reader
    /// ever observes a state where neither name is bound.
    pub fn rename(&self, old: &str, new: &str) -> bool {
        let mut tables = self.tables.write();
        let Some(table) = tables.remove(old) else {
            return false;
        };
        tables.insert(new.to_string(), table);
        true
    }

    pub fn len(&self) -> usize {
        self.tables.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::SystemClock, schema::Schema};
    use std::sync::Arc;

    fn table(name: &str) -> VirtualTable {
        VirtualTable::for_test(name, Schema::new(Vec::new()), Arc::new(SystemClock))
    }

    #[test]
    fn add_get_remove_round_trip() {
        let registry = Registry::new();
        registry.add("readings".to_string(), table("readings"));
        assert!(registry.get("readings").is_some());
        assert!(registry.get("missing").is_none());
        assert!(registry.remove("readings").is_some());
        assert!(registry.get("readings").is_none());
    }

    #[test]
    fn rename_moves_the_entry_atomically() {
        let registry = Registry::new();
        registry.add("old_name".to_string(), table("old_name"));
        assert!(registry.rename("old_name", "new_name"));
        assert!(registry.get("old_name").is_none());
        assert!(registry.get("new_name").is_some());
        assert!(!registry.rename("does_not_exist", "whatever"));
    }
}
