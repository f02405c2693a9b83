//! Point-in-time view of a parameter set, as consumed by the serializers.

use std::collections::btree_map;
use std::collections::BTreeMap;

use crate::core::value::{Value, ValueType};

/// One serialized parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEntry {
    pub name: String,
    pub value: Value,
    pub documentation: String,
    /// Participates in the fingerprint.
    pub hash: bool,
}

impl SnapshotEntry {
    pub fn value_type(&self) -> ValueType {
        self.value.value_type()
    }
}

/// Parameters ordered by the byte order of their UTF-8 names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    entries: BTreeMap<String, SnapshotEntry>,
}

impl Snapshot {
    pub fn new() -> Self {
        Snapshot {
            entries: BTreeMap::new(),
        }
    }

    /// Build a snapshot from plain values; every entry participates in
    /// the fingerprint.
    pub fn from_values<K, V>(values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let mut snapshot = Snapshot::new();
        for (name, value) in values {
            snapshot.insert(SnapshotEntry {
                name: name.into(),
                value: value.into(),
                documentation: String::new(),
                hash: true,
            });
        }
        snapshot
    }

    pub fn insert(&mut self, entry: SnapshotEntry) {
        self.entries.insert(entry.name.clone(), entry);
    }

    pub fn get(&self, name: &str) -> Option<&SnapshotEntry> {
        self.entries.get(name)
    }

    /// Entries in canonical order.
    pub fn entries(&self) -> btree_map::Values<'_, String, SnapshotEntry> {
        self.entries.values()
    }

    /// Entries included in the canonical encoding.
    pub fn hashed(&self, everything: bool) -> impl Iterator<Item = &SnapshotEntry> {
        self.entries.values().filter(move |e| everything || e.hash)
    }

    /// Plain name -> value view.
    pub fn values(&self) -> BTreeMap<String, Value> {
        self.entries
            .iter()
            .map(|(name, entry)| (name.clone(), entry.value.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
