// SPDX-License-Identifier: AGPL-3.0-or-later

//! Container decoder (C6, spec §4.7): decodes a `methodId=21` payload into
//! `ModuleInfo` records via a four-tier fallback strategy, preferring any
//! structured parse over the heuristic scan.

use tracing::{debug, warn};

use super::{
    schema::{CharSerialize, InnerCharData, ModContainer, Item},
    tables,
};
use crate::model::{ModuleInfo, ModulePart};

/// Decodes one inventory-container payload. Tries, in order: (a) the
/// structured container shape, (b) the inner char-data shape directly,
/// (c) skipping a 4-byte length prefix and retrying (a), (d) a heuristic
/// byte-pattern scan. The first path that yields any modules wins.
pub fn decode_inventory(payload: &[u8], heuristic_uuid_counter: &mut u64) -> Vec<ModuleInfo> {
    if let Some(modules) = parse_structured(payload) {
        debug!(count = modules.len(), "decoded via structured container parse");
        return modules;
    }
    if let Some(modules) = parse_inner_direct(payload) {
        debug!(count = modules.len(), "decoded via inner char-data parse");
        return modules;
    }
    if looks_like_length_prefix(payload)
        && let Some(modules) = parse_structured(&payload[4..])
    {
        debug!(count = modules.len(), "decoded via length-prefix-skip retry");
        return modules;
    }

    let modules = heuristic_scan(payload, heuristic_uuid_counter);
    if modules.is_empty() {
        warn!("container decode exhausted all fallback paths, no modules found");
    } else {
        warn!(count = modules.len(), "decoded via heuristic byte-pattern scan");
    }
    modules
}

fn parse_structured(payload: &[u8]) -> Option<Vec<ModuleInfo>> {
    let parsed: CharSerialize = serde_json::from_slice(payload).ok()?;
    let mut modules = Vec::new();
    for package in parsed.item_packages.values() {
        extract_from_items(&package.items, &parsed.mod_container, &mut modules);
    }
    (!modules.is_empty()).then_some(modules)
}

fn parse_inner_direct(payload: &[u8]) -> Option<Vec<ModuleInfo>> {
    let parsed: InnerCharData = serde_json::from_slice(payload).ok()?;
    let mut modules = Vec::new();
    extract_from_items(&parsed.items, &parsed.mod_container, &mut modules);
    (!modules.is_empty()).then_some(modules)
}

fn looks_like_length_prefix(payload: &[u8]) -> bool {
    if payload.len() < 4 {
        return false;
    }
    let n = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]) as usize;
    n == payload.len() - 4 || n == payload.len()
}

/// Extraction rules (§4.7): require non-empty `modParts`, a matching
/// `modInfos` entry by item key first then by stringified uuid, pairing
/// `modParts[i]` with `initLinkNums[i]` and defaulting to `1` when short.
fn extract_from_items(
    items: &std::collections::HashMap<String, Item>,
    mod_container: &ModContainer,
    out: &mut Vec<ModuleInfo>,
) {
    for (item_key, item) in items {
        let Some(attr) = &item.mod_new_attr else { continue };
        let mod_parts = attr.mod_parts.clone().into_vec();
        if mod_parts.is_empty() {
            continue;
        }

        let uuid_key = item.uuid.to_string();
        let Some(entry) = mod_container
            .mod_infos
            .get(item_key)
            .or_else(|| mod_container.mod_infos.get(&uuid_key))
        else {
            continue;
        };
        let init_link_nums = entry.init_link_nums.clone().into_vec();

        let parts: Vec<ModulePart> = mod_parts
            .iter()
            .enumerate()
            .map(|(i, &attr_id)| ModulePart {
                attr_id,
                attr_name: tables::attr_name_for_id(attr_id),
                value: init_link_nums.get(i).copied().unwrap_or(1),
            })
            .collect();

        out.push(ModuleInfo {
            name: tables::name_for_config(item.config_id),
            config_id: item.config_id,
            uuid: item.uuid,
            quality: item.quality,
            parts,
        });
    }
}

const HEURISTIC_CONFIG_RANGE: std::ops::Range<u32> = 5_500_000..5_600_000;
const HEURISTIC_ATTR_RANGE: std::ops::RangeInclusive<u32> = 1100..=2500;
const HEURISTIC_VALUE_RANGE: std::ops::RangeInclusive<u8> = 1..=10;
const HEURISTIC_WINDOW_BYTES: usize = 64;
const HEURISTIC_MAX_PARTS: usize = 4;

/// Heuristic byte-pattern fallback (§4.7d): scans little-endian u32 values
/// for a plausible `configId`, then within a following window collects
/// plausible `(attrId, value)` pairs.
fn heuristic_scan(buf: &[u8], uuid_counter: &mut u64) -> Vec<ModuleInfo> {
    let mut modules = Vec::new();
    let mut i = 0usize;
    while i + 4 <= buf.len() {
        let Ok(config_bytes) = <[u8; 4]>::try_from(&buf[i..i + 4]) else { break };
        let config_id = u32::from_le_bytes(config_bytes);
        if !HEURISTIC_CONFIG_RANGE.contains(&config_id) {
            i += 1;
            continue;
        }

        let window_end = (i + 4 + HEURISTIC_WINDOW_BYTES).min(buf.len());
        let mut parts = Vec::new();
        let mut j = i + 4;
        while j + 5 <= window_end && parts.len() < HEURISTIC_MAX_PARTS {
            let Ok(attr_bytes) = <[u8; 4]>::try_from(&buf[j..j + 4]) else { break };
            let attr_id = u32::from_le_bytes(attr_bytes);
            let value = buf[j + 4];
            if HEURISTIC_ATTR_RANGE.contains(&attr_id) && HEURISTIC_VALUE_RANGE.contains(&value) {
                parts.push(ModulePart { attr_id, attr_name: tables::attr_name_for_id(attr_id), value });
                j += 5;
            } else {
                j += 1;
            }
        }

        if parts.is_empty() {
            i += 1;
            continue;
        }

        *uuid_counter += 1;
        // Open question in spec.md: ad hoc quality derivation, kept verbatim
        // for fallback-path parity; real captures must not rely on it.
        let quality = (config_id % 10).clamp(3, 5) as u8;
        modules.push(ModuleInfo {
            name: tables::name_for_config(config_id),
            config_id,
            uuid: *uuid_counter,
            quality,
            parts,
        });
        i = window_end;
    }
    modules
}
