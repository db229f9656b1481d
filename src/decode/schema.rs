// SPDX-License-Identifier: AGPL-3.0-or-later

//! The minimum `CharSerialize` shape (§3), expressed as `serde` structs.
//! The wire encoding used here is JSON, chosen because the container
//! payload is schema-defined and the source system's own decoder collapses
//! single-element repeated fields the way JSON map/array confusion does
//! (§9 "Scalar-or-sequence normalization").

use std::collections::HashMap;

use serde::Deserialize;

/// A field that may appear as either a bare scalar or a sequence on the
/// wire; always normalized to a non-empty sequence, never collapsed (§9).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T: Clone> {
    One(T),
    Many(Vec<T>),
}

impl<T: Clone> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(v) => vec![v],
            Self::Many(v) => v,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CharSerialize {
    #[serde(rename = "itemPackages")]
    pub item_packages: HashMap<String, Package>,
    #[serde(rename = "modContainer")]
    pub mod_container: ModContainer,
}

/// The flatter shape tried by fallback (b): a single package's contents
/// without the `itemPackages` wrapping map.
#[derive(Debug, Deserialize)]
pub struct InnerCharData {
    pub items: HashMap<String, Item>,
    #[serde(rename = "modContainer")]
    pub mod_container: ModContainer,
}

#[derive(Debug, Deserialize)]
pub struct Package {
    pub items: HashMap<String, Item>,
}

#[derive(Debug, Deserialize)]
pub struct Item {
    #[serde(rename = "configId")]
    pub config_id: u32,
    pub uuid: u64,
    pub quality: u8,
    #[serde(rename = "modNewAttr")]
    pub mod_new_attr: Option<ModNewAttr>,
}

#[derive(Debug, Deserialize)]
pub struct ModNewAttr {
    #[serde(rename = "modParts")]
    pub mod_parts: OneOrMany<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ModContainer {
    #[serde(rename = "modInfos")]
    pub mod_infos: HashMap<String, ModInfoEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ModInfoEntry {
    #[serde(rename = "initLinkNums")]
    pub init_link_nums: OneOrMany<u8>,
}
