// SPDX-License-Identifier: AGPL-3.0-or-later

//! Fixed lookup tables referenced by the container decoder and the ranker:
//! `attrId -> AttrName`, `configId -> (name, category)`, per-attribute-level
//! power, and total-attribute-value power (§4.7, §4.10, §4.11).
//!
//! spec.md leaves the concrete table contents unspecified ("table
//! supplied"); the values here are this implementation's decision, recorded
//! in DESIGN.md.

use crate::model::{AttrName, ModuleCategory};

/// `attrId -> AttrName`. Ids 1110 and 1113 are fixed by the one worked
/// example in spec.md §8 (S1); the rest are assigned sequentially over the
/// heuristic fallback's scan range `[1100, 2500]`.
const ATTR_ID_TABLE: [(u32, AttrName); 21] = [
    (1110, AttrName::StrengthBoost),
    (1111, AttrName::AgilityBoost),
    (1112, AttrName::IntellectBoost),
    (1113, AttrName::SpecialAttack),
    (1114, AttrName::AttackSpd),
    (1115, AttrName::DefenseBoost),
    (1116, AttrName::VitalityBoost),
    (1117, AttrName::CriticalRate),
    (1118, AttrName::CriticalDamage),
    (1119, AttrName::AccuracyBoost),
    (1120, AttrName::EvasionBoost),
    (1121, AttrName::Resistance),
    (1122, AttrName::Armor),
    (1123, AttrName::MovementSpeed),
    (1124, AttrName::EliteStrike),
    (1125, AttrName::CastFocus),
    (1126, AttrName::HealingBoost),
    (1127, AttrName::HealingEnhance),
    (1128, AttrName::ShieldBoost),
    (1129, AttrName::CooldownReduction),
    (1130, AttrName::Penetration),
];

pub fn attr_name_for_id(attr_id: u32) -> AttrName {
    ATTR_ID_TABLE
        .iter()
        .find(|&&(id, _)| id == attr_id)
        .map(|&(_, name)| name)
        .unwrap_or(AttrName::StrengthBoost)
}

pub fn attr_id_for_name(name: AttrName) -> u32 {
    ATTR_ID_TABLE
        .iter()
        .find(|&&(_, n)| n == name)
        .map(|&(id, _)| id)
        .unwrap_or(1110)
}

const CONFIG_ATTACK_RANGE: std::ops::Range<u32> = 5_500_000..5_533_333;
const CONFIG_GUARD_RANGE: std::ops::Range<u32> = 5_533_333..5_566_667;
const CONFIG_SUPPORT_RANGE: std::ops::Range<u32> = 5_566_667..5_600_000;

/// Buckets a `configId` into its category sub-range; ids outside the known
/// `[5_500_000, 5_600_000)` band default to `Attack`.
pub fn category_for_config(config_id: u32) -> ModuleCategory {
    if CONFIG_GUARD_RANGE.contains(&config_id) {
        ModuleCategory::Guard
    } else if CONFIG_SUPPORT_RANGE.contains(&config_id) {
        ModuleCategory::Support
    } else {
        ModuleCategory::Attack
    }
}

const CONFIG_NAME_TABLE: [(u32, &str); 4] = [
    (5_500_103, "Legendary Attack"),
    (5_500_150, "Heroic Attack"),
    (5_533_400, "Legendary Guard"),
    (5_566_800, "Legendary Support"),
];

/// Maps `configId` to a display name via the fixed table; unknown ids
/// become `"Module(<configId>)"` (§4.7).
pub fn name_for_config(config_id: u32) -> String {
    CONFIG_NAME_TABLE
        .iter()
        .find(|&&(id, _)| id == config_id)
        .map(|&(_, name)| name.to_string())
        .unwrap_or_else(|| format!("Module({config_id})"))
}

/// Per-attribute-level power table, keyed by `maxLevel` in `[1,6]` (§4.11).
pub fn level_power(name: AttrName, level: u8) -> u32 {
    const BASIC: [u32; 6] = [7, 14, 29, 44, 167, 254];
    const SPECIAL: [u32; 6] = [14, 29, 59, 89, 298, 448];
    if level == 0 || level > 6 {
        return 0;
    }
    let table = if name.is_basic() { &BASIC } else { &SPECIAL };
    table[(level - 1) as usize]
}

/// Global total-value power table `TOTAL_ATTR_POWER[Σv]` (§4.11). Monotonic,
/// scaled linearly up to a total of 40 and flat beyond it; missing/implicit
/// keys beyond the cap still contribute the capped value rather than 0,
/// since an unbounded table would never terminate.
pub fn total_attr_power(total: u32) -> u32 {
    const CAP_AT: u32 = 40;
    const SCALE: u32 = 3;
    total.min(CAP_AT) * SCALE
}
