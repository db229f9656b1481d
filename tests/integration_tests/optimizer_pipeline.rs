// SPDX-License-Identifier: AGPL-3.0-or-later

//! End-to-end: pre-filter -> GA -> ranker over a synthetic pool, covering
//! spec.md's S5 (deterministic seeds) and S6 (priority ordering) worked
//! examples run through the full optimizer chain rather than one stage.

use modscope::{
    model::{AttrName, ModuleCategory, ModuleInfo, ModulePart},
    optimizer::{
        ga::{self, GaParams},
        prefilter,
        rank::{self, SortMode},
    },
};

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

fn synthetic_pool() -> Vec<ModuleInfo> {
    use AttrName::*;
    vec![
        module(1, &[(StrengthBoost, 8), (SpecialAttack, 4)]),
        module(2, &[(StrengthBoost, 10), (EliteStrike, 6)]),
        module(3, &[(AgilityBoost, 7), (SpecialAttack, 9)]),
        module(4, &[(IntellectBoost, 5), (CastFocus, 3)]),
        module(5, &[(Resistance, 9), (Armor, 8)]),
        module(6, &[(HealingBoost, 4), (HealingEnhance, 6)]),
        module(7, &[(StrengthBoost, 3), (AttackSpd, 9)]),
        module(8, &[(SpecialAttack, 10), (EliteStrike, 10)]),
        module(9, &[(Armor, 5), (Resistance, 2)]),
        module(10, &[(AccuracyBoost, 4), (EvasionBoost, 4)]),
        module(11, &[(MovementSpeed, 6), (CriticalRate, 7)]),
        module(12, &[(CriticalDamage, 8), (Penetration, 5)]),
    ]
}

fn small_params() -> GaParams {
    GaParams {
        population_size: 20,
        generations: 8,
        tournament_size: 3,
        crossover_rate: 0.8,
        mutation_rate: 0.2,
        elitism_rate: 0.1,
        local_search_rate: 0.3,
        num_campaigns: 2,
    }
}

#[test]
fn full_chain_produces_ranked_solutions_with_four_distinct_modules() {
    let pool = synthetic_pool();
    let prioritized = vec![AttrName::SpecialAttack, AttrName::EliteStrike];
    let working = prefilter::prefilter(&pool, &prioritized).expect("synthetic pool is sufficient");

    let params = small_params();
    let chromosomes =
        ga::run_campaigns_with_seeds(&working, ModuleCategory::Attack, &prioritized, &params, &[1, 2]);
    assert!(!chromosomes.is_empty());

    let solutions = rank::rank(&working, &chromosomes, SortMode::Score, &prioritized, 5);
    assert!(!solutions.is_empty());
    for solution in &solutions {
        let uuids = solution.canonical_uuids();
        let mut sorted = uuids;
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 4, "every solution must have four distinct modules");
    }
}

#[test]
fn s5_same_seed_reproduces_the_same_top_solution() {
    let pool = synthetic_pool();
    let prioritized: Vec<AttrName> = vec![];
    let working = prefilter::prefilter(&pool, &prioritized).expect("synthetic pool is sufficient");
    let params = small_params();

    let run = |seed: u64| {
        let chromosomes =
            ga::run_campaigns_with_seeds(&working, ModuleCategory::Attack, &prioritized, &params, &[seed]);
        rank::rank(&working, &chromosomes, SortMode::Score, &prioritized, 1)
    };

    let first = run(42);
    let second = run(42);
    assert_eq!(first.len(), second.len());
    assert_eq!(first[0].canonical_uuids(), second[0].canonical_uuids());
    assert_eq!(first[0].score, second[0].score);
    assert_eq!(first[0].optimization_score, second[0].optimization_score);
}

#[test]
fn s6_priority_order_mode_sorts_by_level_counts_first() {
    let pool = synthetic_pool();
    let prioritized = vec![AttrName::SpecialAttack, AttrName::EliteStrike];
    let working = prefilter::prefilter(&pool, &prioritized).expect("synthetic pool is sufficient");
    let params = small_params();

    let chromosomes = ga::run_campaigns_with_seeds(
        &working,
        ModuleCategory::Attack,
        &prioritized,
        &params,
        &[7, 11, 13],
    );
    let solutions = rank::rank(&working, &chromosomes, SortMode::PriorityOrder, &prioritized, 10);
    assert!(!solutions.is_empty());

    // Only the top-4 of `prioritized` (level desc, declared-index asc)
    // count toward the level tuple; everything else in the breakdown is
    // ignored, even if it's a higher level.
    fn level_counts(sol: &modscope::model::ModuleSolution, prioritized: &[AttrName]) -> [u32; 6] {
        let mut levels: Vec<u8> = prioritized
            .iter()
            .map(|attr| modscope::model::level(sol.attr_breakdown.get(attr).copied().unwrap_or(0)))
            .collect();
        levels.sort_by(|a, b| b.cmp(a));
        levels.truncate(4);

        let mut counts = [0u32; 6];
        for lvl in levels {
            if lvl > 0 {
                counts[(lvl - 1) as usize] += 1;
            }
        }
        counts
    }

    let first_counts = level_counts(&solutions[0], &prioritized);
    for solution in &solutions[1..] {
        let other_counts = level_counts(solution, &prioritized);
        // Lexicographic comparison from level 6 down to level 1: the first
        // solution's tuple must be >= every other's (spec.md S6).
        let cmp = first_counts.iter().rev().cmp(other_counts.iter().rev());
        assert_ne!(cmp, std::cmp::Ordering::Less);
    }
}
