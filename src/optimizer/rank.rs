// SPDX-License-Identifier: AGPL-3.0-or-later

//! Ranker/deduper (C10, spec §4.11): scores each GA candidate against the
//! fixed power tables, deduplicates by attribute-level signature, and
//! sorts in one of two modes.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use super::{Chromosome, PoolIndex};
use crate::{
    decode::tables::{level_power, total_attr_power},
    model::{AttrName, ModuleInfo, ModuleSolution, level},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    /// Plain descending score.
    Score,
    /// Lexicographic `(c6,c5,c4,c3,c2,c1, Σ_top4 lvl, score, fitness)` over
    /// the top-4 of the caller's prioritized attrs, not every attr in the
    /// breakdown.
    PriorityOrder,
}

/// `level_power` summed per attribute plus `total_attr_power` of the sum
/// (§4.11).
pub fn score_breakdown(breakdown: &BTreeMap<AttrName, u32>) -> u32 {
    let per_attr: u32 =
        breakdown.iter().map(|(&name, &value)| level_power(name, level(value))).sum();
    let total: u32 = breakdown.values().sum();
    per_attr + total_attr_power(total)
}

/// Builds scored `ModuleSolution`s from the GA's final chromosomes,
/// dropping any that no longer resolve to 4 distinct uuids (defensive;
/// the GA never produces these).
pub fn build_solutions(pool: &[ModuleInfo], chromosomes: &[(Chromosome, f64)]) -> Vec<ModuleSolution> {
    let index = PoolIndex::new(pool);
    let mut out = Vec::with_capacity(chromosomes.len());
    for &(chromo, fitness) in chromosomes {
        let modules = [
            index.get(chromo.uuids[0]).clone(),
            index.get(chromo.uuids[1]).clone(),
            index.get(chromo.uuids[2]).clone(),
            index.get(chromo.uuids[3]).clone(),
        ];
        if let Some(mut solution) = ModuleSolution::new(modules) {
            solution.score = score_breakdown(&solution.attr_breakdown);
            solution.optimization_score = fitness;
            out.push(solution);
        }
    }
    out
}

/// Keeps the first solution seen for each attribute-level signature
/// (§4.11 dedup).
pub fn dedup_by_signature(mut solutions: Vec<ModuleSolution>) -> Vec<ModuleSolution> {
    let mut seen = HashSet::new();
    solutions.retain(|s| seen.insert(s.attr_level_signature()));
    solutions
}

/// Levels of the top-4 `prioritized` attrs for one solution, chosen by
/// `(level desc, user-declared index asc)` (§4.11). Attrs the solution
/// doesn't carry contribute level 0. Stable sort on level alone preserves
/// `prioritized`'s declared order among ties, which is the index tie-break.
fn top4_priority_levels(breakdown: &BTreeMap<AttrName, u32>, prioritized: &[AttrName]) -> Vec<u8> {
    let mut levels: Vec<u8> =
        prioritized.iter().map(|attr| level(breakdown.get(attr).copied().unwrap_or(0))).collect();
    levels.sort_by(|a, b| b.cmp(a));
    levels.truncate(4);
    levels
}

fn level_counts(levels: &[u8]) -> [u32; 6] {
    let mut counts = [0u32; 6];
    for &lvl in levels {
        if lvl > 0 {
            counts[(lvl - 1) as usize] += 1;
        }
    }
    counts
}

fn level_sum(levels: &[u8]) -> u32 {
    levels.iter().map(|&lvl| u32::from(lvl)).sum()
}

fn priority_cmp(a: &ModuleSolution, b: &ModuleSolution, prioritized: &[AttrName]) -> Ordering {
    let la = top4_priority_levels(&a.attr_breakdown, prioritized);
    let lb = top4_priority_levels(&b.attr_breakdown, prioritized);
    let ca = level_counts(&la);
    let cb = level_counts(&lb);
    for lvl in (0..6).rev() {
        match cb[lvl].cmp(&ca[lvl]) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    match level_sum(&lb).cmp(&level_sum(&la)) {
        Ordering::Equal => {},
        other => return other,
    }
    match b.score.cmp(&a.score) {
        Ordering::Equal => {},
        other => return other,
    }
    b.optimization_score.total_cmp(&a.optimization_score)
}

/// Builds, dedups, sorts, and truncates the final ranked solution list
/// returned by `resultsReady`. `prioritized_attrs` is the caller's
/// declared-order attribute list (`Selection::prioritized_attrs`); it only
/// affects `PriorityOrder` mode.
pub fn rank(
    pool: &[ModuleInfo],
    chromosomes: &[(Chromosome, f64)],
    mode: SortMode,
    prioritized_attrs: &[AttrName],
    top_n: usize,
) -> Vec<ModuleSolution> {
    let solutions = build_solutions(pool, chromosomes);
    let mut deduped = dedup_by_signature(solutions);
    match mode {
        SortMode::Score => deduped.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| b.optimization_score.total_cmp(&a.optimization_score))
                .then_with(|| a.canonical_uuids().cmp(&b.canonical_uuids()))
        }),
        SortMode::PriorityOrder => deduped.sort_by(|a, b| priority_cmp(a, b, prioritized_attrs)),
    }
    deduped.truncate(top_n);
    deduped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModulePart;

    fn module(uuid: u64, parts: &[(AttrName, u8)]) -> ModuleInfo {
        ModuleInfo {
            name: format!("m{uuid}"),
            config_id: 5_500_000,
            uuid,
            quality: 3,
            parts: parts
                .iter()
                .map(|&(name, value)| ModulePart { attr_id: 1110, attr_name: name, value })
                .collect(),
        }
    }

    fn pool() -> Vec<ModuleInfo> {
        use AttrName::*;
        vec![
            module(1, &[(StrengthBoost, 9)]),
            module(2, &[(StrengthBoost, 9)]),
            module(3, &[(StrengthBoost, 1)]),
            module(4, &[(StrengthBoost, 1)]),
            module(5, &[(AgilityBoost, 5)]),
            module(6, &[(AgilityBoost, 5)]),
            module(7, &[(AgilityBoost, 1)]),
            module(8, &[(AgilityBoost, 1)]),
        ]
    }

    #[test]
    fn dedup_keeps_first_occurrence_with_same_signature() {
        let p = pool();
        // Both chromosomes produce the same attr-level signature (one attr
        // at level 3 from modules with value 9 + 1 = 10... use identical
        // combos instead for an exact duplicate signature).
        let chromosomes = vec![
            (Chromosome::new([1, 2, 3, 4]), 10.0),
            (Chromosome::new([5, 6, 7, 8]), 10.0),
        ];
        let solutions = build_solutions(&p, &chromosomes);
        let deduped = dedup_by_signature(solutions);
        // StrengthBoost totals to 20 (level 6) for the first, AgilityBoost
        // totals to 12 (level 4) for the second: distinct signatures survive.
        assert_eq!(deduped.len(), 2);
    }

    #[test]
    fn score_mode_sorts_descending_by_score() {
        let p = pool();
        let chromosomes = vec![
            (Chromosome::new([1, 2, 3, 4]), 1.0),
            (Chromosome::new([3, 4, 7, 8]), 2.0),
        ];
        let ranked = rank(&p, &chromosomes, SortMode::Score, &[], 10);
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn top_n_truncates() {
        let p = pool();
        let chromosomes: Vec<(Chromosome, f64)> = vec![
            (Chromosome::new([1, 2, 3, 4]), 1.0),
            (Chromosome::new([5, 6, 7, 8]), 2.0),
        ];
        let ranked = rank(&p, &chromosomes, SortMode::Score, &[], 1);
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn priority_order_prefers_more_high_level_attrs() {
        let p = pool();
        let chromosomes = vec![
            (Chromosome::new([1, 2, 3, 4]), 1.0), // StrengthBoost total 20 -> level 6
            (Chromosome::new([5, 6, 7, 8]), 1.0), // AgilityBoost total 12 -> level 4
        ];
        let prioritized = [AttrName::StrengthBoost, AttrName::AgilityBoost];
        let ranked = rank(&p, &chromosomes, SortMode::PriorityOrder, &prioritized, 10);
        assert_eq!(ranked[0].canonical_uuids(), [1, 2, 3, 4]);
    }

    #[test]
    fn priority_order_ignores_non_prioritized_high_level_attrs() {
        // Module 9 carries a high-level attr that isn't in `prioritized`; it
        // must not outrank a solution that is actually strong on the
        // attrs the caller cares about.
        let mut p = pool();
        p.push(module(9, &[(AttrName::IntellectBoost, 20)]));
        p.push(module(10, &[(AttrName::IntellectBoost, 20)]));
        p.push(module(11, &[(AttrName::IntellectBoost, 20)]));
        p.push(module(12, &[(AttrName::IntellectBoost, 20)]));
        let chromosomes = vec![
            (Chromosome::new([1, 2, 3, 4]), 1.0), // StrengthBoost total 20 -> level 6
            (Chromosome::new([9, 10, 11, 12]), 1.0), // IntellectBoost total 80, not prioritized
        ];
        let prioritized = [AttrName::StrengthBoost];
        let ranked = rank(&p, &chromosomes, SortMode::PriorityOrder, &prioritized, 10);
        assert_eq!(ranked[0].canonical_uuids(), [1, 2, 3, 4]);
    }
}
