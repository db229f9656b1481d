// SPDX-License-Identifier: AGPL-3.0-or-later

//! Module aggregator (C7, spec §4.8): deduplicates decoded modules by
//! uuid across captures and reports whether a batch introduced anything
//! new so the pipeline knows when to trigger optimization.

use dashmap::DashMap;

use crate::model::ModuleInfo;

/// Append-only captured-module set, shared behind an `Arc` between the
/// capture/decode loop (writer) and a spawned optimizer task (reader) so a
/// long-running GA campaign never blocks new captures from landing (§5).
/// Cleared only on a new `start`.
#[derive(Default)]
pub struct ModuleAggregator {
    by_uuid: DashMap<u64, ModuleInfo>,
}

impl ModuleAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds every uuid in `batch` not already present. Returns `true` iff
    /// at least one new uuid was added (the `dataCaptured` trigger).
    pub fn ingest(&self, batch: Vec<ModuleInfo>) -> bool {
        let mut added = false;
        for module in batch {
            if let dashmap::mapref::entry::Entry::Vacant(e) = self.by_uuid.entry(module.uuid) {
                e.insert(module);
                added = true;
            }
        }
        added
    }

    /// A read-only snapshot for the optimizer; safe to call while another
    /// task is concurrently `ingest`ing.
    pub fn snapshot(&self) -> Vec<ModuleInfo> {
        self.by_uuid.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn clear(&self) {
        self.by_uuid.clear();
    }

    pub fn len(&self) -> usize {
        self.by_uuid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_uuid.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(uuid: u64) -> ModuleInfo {
        ModuleInfo { name: "x".into(), config_id: 1, uuid, quality: 1, parts: vec![] }
    }

    #[test]
    fn only_new_uuids_trigger_data_captured() {
        let agg = ModuleAggregator::new();
        assert!(agg.ingest(vec![module(1), module(2)]));
        assert_eq!(agg.len(), 2);
        assert!(!agg.ingest(vec![module(1), module(2)]));
        assert!(agg.ingest(vec![module(2), module(3)]));
        assert_eq!(agg.len(), 3);
    }

    #[test]
    fn clear_resets_on_new_start() {
        let agg = ModuleAggregator::new();
        agg.ingest(vec![module(1)]);
        agg.clear();
        assert!(agg.is_empty());
    }
}
