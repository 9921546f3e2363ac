//! The side-effect log: an append-only sequence of reversible mutations on the
//! user-owned store, truncated to a checkpoint on backtrack.
//!
//! Every mutation of the [`Store`] goes through a [`LogEntry`] whose `apply`
//! closure runs at append time and whose `undo` closure exactly reverses it.
//! Truncating the log to a prior length undoes the removed entries in reverse
//! order, so the store at any log length is a well-defined state. Mutable
//! access to the store is only ever handed to entry closures; there is no
//! other mutation path.

use std::fmt;
use std::sync::Arc;

use im::HashMap;

use crate::value::Value;

/// User-owned state guarded by the log, a persistent key/value store.
///
/// The typical use is a symbol table maintained by `collect` actions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Store {
    entries: HashMap<String, Value>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes a key. During a parse, mutable access to the store only exists
    /// inside log entry closures; direct writes are for seeding a store
    /// before the parse starts.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(key.into(), value)
    }

    /// Removes a key. Same access rule as [`insert`](Store::insert).
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }
}

/// A mutation closure over the store.
pub type EffectFn = Arc<dyn Fn(&mut Store) + Send + Sync>;

/// One reversible mutation: `apply` runs when the entry is appended, `undo`
/// runs if the log is truncated past it. Entries are never mutated after
/// append.
#[derive(Clone)]
pub struct LogEntry {
    apply: EffectFn,
    undo: EffectFn,
}

impl LogEntry {
    pub fn new(
        apply: impl Fn(&mut Store) + Send + Sync + 'static,
        undo: impl Fn(&mut Store) + Send + Sync + 'static,
    ) -> Self {
        Self {
            apply: Arc::new(apply),
            undo: Arc::new(undo),
        }
    }
}

impl fmt::Debug for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LogEntry")
    }
}

/// The append-only log plus the store it guards.
#[derive(Debug, Default)]
pub struct SideEffectLog {
    store: Store,
    entries: Vec<LogEntry>,
}

impl SideEffectLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the log over a pre-seeded store.
    pub fn with_store(store: Store) -> Self {
        Self {
            store,
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Applies an entry to the store and appends it.
    pub fn apply(&mut self, entry: LogEntry) {
        (entry.apply)(&mut self.store);
        self.entries.push(entry);
    }

    /// Logs a plain store write, capturing the prior binding for undo.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        let prior = self.store.get(&key).cloned();
        let write_key = key.clone();
        let entry = LogEntry::new(
            move |store| {
                store.insert(write_key.clone(), value.clone());
            },
            move |store| match &prior {
                Some(old) => {
                    store.insert(key.clone(), old.clone());
                }
                None => {
                    store.remove(&key);
                }
            },
        );
        self.apply(entry);
    }

    /// Rolls the store back to the state it had when the log was `len`
    /// entries long, undoing removed entries in reverse order.
    pub fn truncate(&mut self, len: usize) {
        while self.entries.len() > len {
            if let Some(entry) = self.entries.pop() {
                (entry.undo)(&mut self.store);
            }
        }
    }

    /// Moves the store out, consuming the log.
    pub fn into_store(self) -> Store {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_restores_prior_bindings() {
        let mut log = SideEffectLog::new();
        log.set("x", Value::Number(1.0));
        let checkpoint = log.len();
        log.set("x", Value::Number(2.0));
        log.set("y", Value::Bool(true));
        assert_eq!(log.store().get("x"), Some(&Value::Number(2.0)));

        log.truncate(checkpoint);
        assert_eq!(log.store().get("x"), Some(&Value::Number(1.0)));
        assert_eq!(log.store().get("y"), None);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn truncate_to_zero_empties_the_store() {
        let mut log = SideEffectLog::new();
        log.set("a", Value::Nil);
        log.set("b", Value::Nil);
        log.truncate(0);
        assert!(log.store().is_empty());
    }

    #[test]
    fn custom_entries_pair_apply_with_undo() {
        let mut log = SideEffectLog::new();
        log.apply(LogEntry::new(
            |store| {
                store.insert("count", Value::Number(1.0));
            },
            |store| {
                store.remove("count");
            },
        ));
        assert!(log.store().contains("count"));
        log.truncate(0);
        assert!(!log.store().contains("count"));
    }
}
