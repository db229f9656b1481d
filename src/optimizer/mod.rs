// SPDX-License-Identifier: AGPL-3.0-or-later

//! Module combination optimizer: pre-filter (C8), GA engine (C9), and
//! ranker/deduper (C10).

pub mod ga;
pub mod prefilter;
pub mod rank;

use std::collections::{BTreeMap, HashMap};

use crate::model::{AttrName, ModuleInfo};

/// A canonicalized, unordered 4-subset of distinct module uuids drawn from
/// a working pool (§4.10's chromosome). Always kept sorted ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Chromosome {
    pub uuids: [u64; 4],
}

impl Chromosome {
    pub fn new(mut uuids: [u64; 4]) -> Self {
        uuids.sort_unstable();
        Self { uuids }
    }

    pub fn is_valid(&self) -> bool {
        let mut sorted = self.uuids;
        sorted.sort_unstable();
        sorted.windows(2).all(|w| w[0] != w[1])
    }

    pub fn contains(&self, uuid: u64) -> bool {
        self.uuids.contains(&uuid)
    }
}

/// Fast by-uuid lookup over a borrowed working pool, shared by the GA and
/// the ranker so neither clones `ModuleInfo` per candidate.
pub struct PoolIndex<'a> {
    pool: &'a [ModuleInfo],
    by_uuid: HashMap<u64, &'a ModuleInfo>,
}

impl<'a> PoolIndex<'a> {
    pub fn new(pool: &'a [ModuleInfo]) -> Self {
        let by_uuid = pool.iter().map(|m| (m.uuid, m)).collect();
        Self { pool, by_uuid }
    }

    pub fn get(&self, uuid: u64) -> &'a ModuleInfo {
        self.by_uuid.get(&uuid).copied().unwrap_or_else(|| {
            // Only reachable if a chromosome references a uuid outside the
            // pool it was drawn from, which callers in this crate never do.
            self.pool.first().expect("working pool is non-empty")
        })
    }

    pub fn uuids(&self) -> impl Iterator<Item = u64> + '_ {
        self.pool.iter().map(|m| m.uuid)
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Sums part values across the chromosome's four modules (§8 algebraic
    /// law: `breakdown[a] = Σ part.value where part.name = a`).
    pub fn breakdown(&self, chromosome: &Chromosome) -> BTreeMap<AttrName, u32> {
        let mut map = BTreeMap::new();
        for &uuid in &chromosome.uuids {
            for part in &self.get(uuid).parts {
                *map.entry(part.attr_name).or_insert(0u32) += u32::from(part.value);
            }
        }
        map
    }
}
