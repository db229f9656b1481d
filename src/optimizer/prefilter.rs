// SPDX-License-Identifier: AGPL-3.0-or-later

//! Pre-filter (C8, spec §4.9): reduces the working pool to the union of
//! top-K by per-attribute value and top-M by total attribute value.

use thiserror::Error;

use crate::model::{AttrName, ModuleInfo};

const TOP_TOTAL: usize = 100;
const TOP_PER_ATTR: usize = 60;
const HIGH_QUALITY_THRESHOLD: u32 = 12;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PrefilterError {
    #[error("insufficient modules")]
    InsufficientModules,
}

/// Builds the GA's working pool from the full captured pool `p`.
pub fn prefilter(
    pool: &[ModuleInfo],
    prioritized_attrs: &[AttrName],
) -> Result<Vec<ModuleInfo>, PrefilterError> {
    let mut by_total: Vec<&ModuleInfo> = pool.iter().collect();
    by_total.sort_by(|a, b| b.total_value().cmp(&a.total_value()).then(a.uuid.cmp(&b.uuid)));
    let top_total = by_total.into_iter().take(TOP_TOTAL);

    let attrs_to_scan: Vec<AttrName> = if prioritized_attrs.is_empty() {
        AttrName::ALL.into_iter().filter(|&a| pool.iter().any(|m| m.value_for(a) > 0)).collect()
    } else {
        prioritized_attrs
            .iter()
            .copied()
            .filter(|&a| pool.iter().any(|m| m.value_for(a) > 0))
            .collect()
    };

    let mut working: Vec<&ModuleInfo> = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for m in top_total {
        if seen.insert(m.uuid) {
            working.push(m);
        }
    }
    for &attr in &attrs_to_scan {
        let mut by_attr: Vec<&ModuleInfo> =
            pool.iter().filter(|m| m.value_for(attr) > 0).collect();
        by_attr.sort_by(|a, b| {
            b.value_for(attr).cmp(&a.value_for(attr)).then(a.uuid.cmp(&b.uuid))
        });
        for m in by_attr.into_iter().take(TOP_PER_ATTR) {
            if seen.insert(m.uuid) {
                working.push(m);
            }
        }
    }

    if working.len() < 4 {
        return Err(PrefilterError::InsufficientModules);
    }

    let high_quality: Vec<ModuleInfo> = working
        .iter()
        .filter(|m| m.total_value() >= HIGH_QUALITY_THRESHOLD)
        .map(|&m| m.clone())
        .collect();

    if high_quality.len() >= 4 {
        Ok(high_quality)
    } else {
        Ok(working.into_iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModulePart;

    fn module(uuid: u64, attr: AttrName, value: u8) -> ModuleInfo {
        ModuleInfo {
            name: "x".into(),
            config_id: 5_500_000,
            uuid,
            quality: 3,
            parts: vec![ModulePart { attr_id: 1110, attr_name: attr, value }],
        }
    }

    #[test]
    fn too_few_modules_is_an_error() {
        let pool = vec![module(1, AttrName::StrengthBoost, 5), module(2, AttrName::StrengthBoost, 5)];
        assert_eq!(prefilter(&pool, &[]), Err(PrefilterError::InsufficientModules));
    }

    #[test]
    fn pool_of_exactly_four_passes_through() {
        let pool: Vec<ModuleInfo> =
            (1..=4).map(|i| module(i, AttrName::StrengthBoost, 9)).collect();
        let working = prefilter(&pool, &[]).expect("sufficient");
        assert_eq!(working.len(), 4);
    }

    #[test]
    fn high_quality_subset_used_when_large_enough() {
        let mut pool: Vec<ModuleInfo> =
            (1..=4).map(|i| module(i, AttrName::StrengthBoost, 20)).collect();
        pool.extend((5..=8).map(|i| module(i, AttrName::StrengthBoost, 1)));
        let working = prefilter(&pool, &[]).expect("sufficient");
        assert!(working.iter().all(|m| m.total_value() >= HIGH_QUALITY_THRESHOLD));
    }
}
