// SPDX-License-Identifier: AGPL-3.0-or-later

//! GA engine (C9, spec §4.10): tournament selection, two-point-style
//! crossover, mutation, hill-climbing local search, and multi-campaign
//! parallelism.

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng, rngs::StdRng};
use rayon::prelude::*;
use tracing::warn;

use super::{Chromosome, PoolIndex};
use crate::{
    cfg::config::GaConfig,
    model::{AttrName, ModuleCategory, ModuleInfo, level},
};

#[derive(Debug, Clone)]
pub struct GaParams {
    pub population_size: usize,
    pub generations: usize,
    pub tournament_size: usize,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    pub elitism_rate: f64,
    pub local_search_rate: f64,
    pub num_campaigns: usize,
}

impl GaParams {
    pub fn from_config(cfg: &GaConfig) -> Self {
        Self {
            population_size: cfg.population_size,
            generations: cfg.generations,
            tournament_size: cfg.tournament_size,
            crossover_rate: cfg.crossover_rate,
            mutation_rate: cfg.mutation_rate,
            elitism_rate: cfg.elitism_rate,
            local_search_rate: cfg.local_search_rate,
            num_campaigns: cfg.num_campaigns.unwrap_or_else(default_num_campaigns),
        }
    }
}

fn default_num_campaigns() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1).saturating_sub(1).max(1)
}

/// Attributes excluded from the physical/magic conflict penalty verbatim
/// per spec.md's Open Questions: `Special Attack`/`Elite Strike` are
/// Attack-preferred but are not counted as physical.
const PHYSICAL: [AttrName; 3] =
    [AttrName::StrengthBoost, AttrName::AgilityBoost, AttrName::AttackSpd];
const MAGIC: [AttrName; 2] = [AttrName::IntellectBoost, AttrName::CastFocus];

/// Fitness function (§4.10), maximized during the GA, never returned to
/// the user.
pub fn fitness(
    breakdown: &BTreeMap<AttrName, u32>,
    category: ModuleCategory,
    prioritized: &[AttrName],
) -> f64 {
    let get = |a: AttrName| breakdown.get(&a).copied().unwrap_or(0);
    let mut score = 0.0f64;

    if !prioritized.is_empty() {
        let level_bonus = |lvl: u8| -> f64 {
            match lvl {
                6 => 5000.0,
                5 => 2000.0,
                4 => 500.0,
                3 => 100.0,
                2 => 50.0,
                1 => 10.0,
                _ => 0.0,
            }
        };
        for &a in prioritized {
            score += level_bonus(level(get(a)));
        }
        let present = prioritized.iter().filter(|&&a| get(a) > 0).count() as f64;
        score += 100.0 * present;

        let others: u32 =
            breakdown.iter().filter(|(k, _)| !prioritized.contains(k)).map(|(_, v)| *v).sum();
        score -= 5.0 * others as f64;
    }

    for &v in breakdown.values() {
        score += threshold_bonus(v);
    }

    for &a in category.preferred_attrs() {
        score += 5.0 * get(a) as f64;
    }

    let physical: u32 = PHYSICAL.iter().map(|&a| get(a)).sum();
    let magic: u32 = MAGIC.iter().map(|&a| get(a)).sum();
    score -= 10.0 * physical.min(magic) as f64;

    let total: u32 = breakdown.values().sum();
    score += 0.1 * total as f64;

    score.max(0.0)
}

fn threshold_bonus(v: u32) -> f64 {
    if v >= 20 {
        1000.0 + 20.0 * (v as f64 - 20.0)
    } else if v >= 16 {
        500.0 + 15.0 * (v as f64 - 16.0)
    } else if v >= 12 {
        100.0 + 5.0 * (v as f64 - 12.0)
    } else {
        0.0
    }
}

fn comb4(n: usize) -> usize {
    if n < 4 {
        return 0;
    }
    let n = n as u128;
    (((n * (n - 1) * (n - 2) * (n - 3)) / 24).min(usize::MAX as u128)) as usize
}

fn init_population(pool: &PoolIndex, rng: &mut StdRng, target: usize) -> Vec<Chromosome> {
    let uuids: Vec<u64> = pool.uuids().collect();
    if uuids.len() < 4 {
        return Vec::new();
    }
    let cap = target.min(comb4(uuids.len()));
    let max_attempts = cap.saturating_mul(50).max(1000);

    let mut seen = std::collections::HashSet::new();
    let mut population = Vec::new();
    let mut attempts = 0;
    while population.len() < cap && attempts < max_attempts {
        attempts += 1;
        let mut idxs: Vec<usize> = (0..uuids.len()).collect();
        for i in 0..4 {
            let j = rng.random_range(i..idxs.len());
            idxs.swap(i, j);
        }
        let chromo = Chromosome::new([
            uuids[idxs[0]],
            uuids[idxs[1]],
            uuids[idxs[2]],
            uuids[idxs[3]],
        ]);
        if seen.insert(chromo.uuids) {
            population.push(chromo);
        }
    }
    population
}

fn tournament_select(
    scored: &[(Chromosome, f64)],
    rng: &mut StdRng,
    tournament_size: usize,
) -> Chromosome {
    let mut best: Option<(Chromosome, f64)> = None;
    for _ in 0..tournament_size.max(1) {
        let idx = rng.random_range(0..scored.len());
        let (chromo, fit) = scored[idx];
        match best {
            None => best = Some((chromo, fit)),
            Some((_, best_fit)) if fit > best_fit => best = Some((chromo, fit)),
            _ => {},
        }
    }
    best.map(|(c, _)| c).unwrap_or(scored[0].0)
}

fn crossover(parent_a: Chromosome, parent_b: Chromosome) -> (Chromosome, Chromosome) {
    let build = |first_two: &[u64], filler: &[u64], fallback: Chromosome| -> Chromosome {
        let mut uuids: Vec<u64> = first_two.to_vec();
        for &u in filler {
            if uuids.len() == 4 {
                break;
            }
            if !uuids.contains(&u) {
                uuids.push(u);
            }
        }
        if uuids.len() == 4 {
            Chromosome::new([uuids[0], uuids[1], uuids[2], uuids[3]])
        } else {
            fallback
        }
    };

    let child_a = build(&parent_a.uuids[0..2], &parent_b.uuids, parent_a);
    let child_b = build(&parent_b.uuids[0..2], &parent_a.uuids, parent_b);
    (child_a, child_b)
}

fn mutate(chromo: Chromosome, pool: &PoolIndex, rng: &mut StdRng) -> Chromosome {
    let candidates: Vec<u64> = pool.uuids().filter(|&u| !chromo.contains(u)).collect();
    if candidates.is_empty() {
        return chromo;
    }
    let pos = rng.random_range(0..4);
    let pick = candidates[rng.random_range(0..candidates.len())];
    let mut uuids = chromo.uuids;
    uuids[pos] = pick;
    Chromosome::new(uuids)
}

/// First-improvement-over-positions, best-improvement-over-candidates hill
/// climb (§4.10).
fn hill_climb(
    mut chromo: Chromosome,
    mut fit: f64,
    pool: &PoolIndex,
    category: ModuleCategory,
    prioritized: &[AttrName],
) -> (Chromosome, f64) {
    loop {
        let mut improved = false;
        for pos in 0..4 {
            let mut best_gain = 0.0f64;
            let mut best: Option<(u64, f64)> = None;
            for cand in pool.uuids() {
                if chromo.contains(cand) {
                    continue;
                }
                let mut trial = chromo.uuids;
                trial[pos] = cand;
                let trial_chromo = Chromosome::new(trial);
                let trial_fit = fitness(&pool.breakdown(&trial_chromo), category, prioritized);
                let gain = trial_fit - fit;
                if gain > best_gain {
                    best_gain = gain;
                    best = Some((cand, trial_fit));
                }
            }
            if let Some((cand, new_fit)) = best {
                let mut uuids = chromo.uuids;
                uuids[pos] = cand;
                chromo = Chromosome::new(uuids);
                fit = new_fit;
                improved = true;
                break;
            }
        }
        if !improved {
            break;
        }
    }
    (chromo, fit)
}

/// Runs one independent campaign to completion and returns its final,
/// fitness-sorted population.
pub fn run_campaign(
    pool: &[ModuleInfo],
    category: ModuleCategory,
    prioritized: &[AttrName],
    params: &GaParams,
    seed: u64,
) -> Vec<(Chromosome, f64)> {
    let index = PoolIndex::new(pool);
    let mut rng = StdRng::seed_from_u64(seed);

    let population = init_population(&index, &mut rng, params.population_size);
    if population.is_empty() {
        return Vec::new();
    }
    let mut scored: Vec<(Chromosome, f64)> = population
        .into_iter()
        .map(|c| {
            let fit = fitness(&index.breakdown(&c), category, prioritized);
            (c, fit)
        })
        .collect();
    let pop_target = scored.len();

    for _generation in 0..params.generations {
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        let elite_count = ((pop_target as f64) * params.elitism_rate).floor() as usize;
        let mut next: Vec<(Chromosome, f64)> = scored.iter().take(elite_count).copied().collect();

        while next.len() < pop_target {
            let parent_a = tournament_select(&scored, &mut rng, params.tournament_size);
            let parent_b = tournament_select(&scored, &mut rng, params.tournament_size);

            let (mut child_a, mut child_b) = if rng.random::<f64>() < params.crossover_rate {
                crossover(parent_a, parent_b)
            } else {
                (parent_a, parent_b)
            };
            if rng.random::<f64>() < params.mutation_rate {
                child_a = mutate(child_a, &index, &mut rng);
            }
            if rng.random::<f64>() < params.mutation_rate {
                child_b = mutate(child_b, &index, &mut rng);
            }

            next.push((child_a, fitness(&index.breakdown(&child_a), category, prioritized)));
            if next.len() < pop_target {
                next.push((child_b, fitness(&index.breakdown(&child_b), category, prioritized)));
            }
        }

        next.sort_by(|a, b| b.1.total_cmp(&a.1));
        let ls_count = ((pop_target as f64) * params.local_search_rate).floor() as usize;
        for slot in next.iter_mut().take(ls_count) {
            *slot = hill_climb(slot.0, slot.1, &index, category, prioritized);
        }

        scored = next;
    }

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored
}

/// Runs `params.num_campaigns` independent campaigns with the given seeds
/// and unions their final populations. On a worker panic, logs and retries
/// that campaign sequentially on the calling thread (§4.10, §7).
pub fn run_campaigns_with_seeds(
    pool: &[ModuleInfo],
    category: ModuleCategory,
    prioritized: &[AttrName],
    params: &GaParams,
    seeds: &[u64],
) -> Vec<(Chromosome, f64)> {
    let outcomes: Vec<(u64, Option<Vec<(Chromosome, f64)>>)> = seeds
        .par_iter()
        .map(|&seed| {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                run_campaign(pool, category, prioritized, params, seed)
            }));
            (seed, result.ok())
        })
        .collect();

    let mut unioned = Vec::new();
    for (seed, outcome) in outcomes {
        match outcome {
            Some(population) => unioned.extend(population),
            None => {
                warn!(seed, "GA campaign worker failed, falling back to sequential execution");
                unioned.extend(run_campaign(pool, category, prioritized, params, seed));
            },
        }
    }
    unioned
}

/// Convenience entry point that draws `params.num_campaigns` fresh seeds.
pub fn run_campaigns(
    pool: &[ModuleInfo],
    category: ModuleCategory,
    prioritized: &[AttrName],
    params: &GaParams,
) -> Vec<(Chromosome, f64)> {
    let seeds: Vec<u64> = (0..params.num_campaigns).map(|_| rand::random()).collect();
    run_campaigns_with_seeds(pool, category, prioritized, params, &seeds)
}
