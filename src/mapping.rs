//! Opaque id -> label mapping table
//!
//! The table is immutable once built. `MappingStore` holds the current version
//! behind an `ArcSwap` so readers take a cheap snapshot while the single writer
//! swaps in a whole new table. There is no field-level merge: a label missing
//! from the newest payload is gone.

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::feed::wire;

/// Immutable id -> label table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    entries: BTreeMap<String, String>,
}

/// Result of checking a set of ids against a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingValidation {
    pub all_present: bool,
    /// Unresolved ids, de-duplicated, in request order
    pub missing: Vec<String>,
}

impl MappingTable {
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }

    pub fn from_payload(payload: &str) -> Self {
        Self::new(wire::parse_mappings(payload))
    }

    pub fn resolve(&self, id: &str) -> Option<&str> {
        self.entries.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn validate_required(&self, ids: &[&str]) -> MappingValidation {
        let mut missing: Vec<String> = Vec::new();
        for id in ids {
            if !self.contains(id) && !missing.iter().any(|m| m == id) {
                missing.push(id.to_string());
            }
        }

        MappingValidation {
            all_present: missing.is_empty(),
            missing,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Re-encode in wire format
    pub fn encode(&self) -> String {
        wire::encode_mappings(&self.entries)
    }

    /// What changed going from `self` to `newer`
    pub fn diff(&self, newer: &MappingTable) -> MappingDiff {
        let mut diff = MappingDiff::default();

        for (id, label) in &newer.entries {
            match self.entries.get(id) {
                None => diff.added.push((id.clone(), label.clone())),
                Some(old) if old != label => {
                    diff.changed.push((id.clone(), old.clone(), label.clone()))
                }
                Some(_) => {}
            }
        }

        for (id, label) in &self.entries {
            if !newer.entries.contains_key(id) {
                diff.removed.push((id.clone(), label.clone()));
            }
        }

        diff
    }
}

/// Key-level differences between two table versions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingDiff {
    /// (id, label)
    pub added: Vec<(String, String)>,
    /// (id, old label, new label)
    pub changed: Vec<(String, String, String)>,
    /// (id, last label)
    pub removed: Vec<(String, String)>,
}

impl MappingDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }

    fn log(&self) {
        if !self.added.is_empty() {
            let items: Vec<String> = self.added.iter().map(|(id, l)| format!("{id}:{l}")).collect();
            info!(count = items.len(), "[MAPPING ADDED] {}", items.join(", "));
        }
        if !self.changed.is_empty() {
            let items: Vec<String> = self
                .changed
                .iter()
                .map(|(id, old, new)| format!("{id}:{old} -> {new}"))
                .collect();
            info!(count = items.len(), "[MAPPING CHANGED] {}", items.join(", "));
        }
        if !self.removed.is_empty() {
            let items: Vec<String> = self.removed.iter().map(|(id, l)| format!("{id}:{l}")).collect();
            info!(count = items.len(), "[MAPPING REMOVED] {}", items.join(", "));
        }
    }
}

/// Outcome of [`MappingStore::replace`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingUpdate {
    /// Incoming table was empty; the current table was kept
    IgnoredEmpty,
    Replaced { version: u64, diff: MappingDiff },
}

/// Holder of the current mapping table. Only `replace` mutates it.
pub struct MappingStore {
    current: ArcSwap<MappingTable>,
    version: AtomicU64,
    last_updated: ArcSwap<Option<DateTime<Utc>>>,
}

impl Default for MappingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MappingStore {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::new(Arc::new(MappingTable::default())),
            version: AtomicU64::new(0),
            last_updated: ArcSwap::new(Arc::new(None)),
        }
    }

    /// Swap in `table` wholesale unless it is empty
    pub fn replace(&self, table: MappingTable) -> MappingUpdate {
        if table.is_empty() {
            warn!(
                current_size = self.current.load().len(),
                "Received empty mappings, keeping current table"
            );
            return MappingUpdate::IgnoredEmpty;
        }

        let previous = self.current.load_full();
        let diff = previous.diff(&table);
        diff.log();

        let size = table.len();
        self.current.store(Arc::new(table));
        self.last_updated.store(Arc::new(Some(Utc::now())));
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;

        debug!(version, size, unchanged = diff.is_empty(), "Mappings updated");

        MappingUpdate::Replaced { version, diff }
    }

    /// Decode a mapping payload and [`replace`](Self::replace) with it
    pub fn replace_from_payload(&self, payload: &str) -> MappingUpdate {
        self.replace(MappingTable::from_payload(payload))
    }

    /// Consistent view of the current table for one cycle
    pub fn snapshot(&self) -> Arc<MappingTable> {
        self.current.load_full()
    }

    /// Number of accepted replacements so far
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        **self.last_updated.load()
    }

    /// Number of ids in the current table
    pub fn entry_count(&self) -> usize {
        self.current.load().len()
    }
}
