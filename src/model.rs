// SPDX-License-Identifier: AGPL-3.0-or-later

//! Core data model shared by the capture pipeline and the optimizer:
//! network interfaces, flow identity, module inventory records, and
//! candidate equipment solutions (spec §3).

use std::{
    collections::BTreeMap,
    net::Ipv4Addr,
};

use serde::{Deserialize, Serialize};

/// Friendly classification of a [`NetworkInterface`], computed by
/// case-insensitive substring match against its name/description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterfaceClass {
    Ethernet,
    WiFi,
    Bluetooth,
    Loopback,
    HyperV,
    TunTap,
    Vpn,
    Other,
}

impl InterfaceClass {
    /// Classifies an interface from its kernel name and description using
    /// the same case-insensitive substring heuristic a desktop capture
    /// shell would use to label adapters in a picker.
    pub fn classify(name: &str, description: &str) -> Self {
        let hay = format!("{name} {description}").to_lowercase();
        let has = |needle: &str| hay.contains(needle);

        if has("loopback") || has(" lo ") || name.eq_ignore_ascii_case("lo") {
            Self::Loopback
        } else if has("hyper-v") || has("hyperv") || has("vmswitch") {
            Self::HyperV
        } else if has("tun") || has("tap") {
            Self::TunTap
        } else if has("vpn")
            || has("wireguard")
            || has("openvpn")
            || has("nordlynx")
            || has("tailscale")
        {
            Self::Vpn
        } else if has("bluetooth") {
            Self::Bluetooth
        } else if has("wi-fi") || has("wifi") || has("wlan") || has("wireless") {
            Self::WiFi
        } else if has("ethernet") || has("eth") || has("en0") {
            Self::Ethernet
        } else {
            Self::Other
        }
    }

    /// Whether this class represents a virtualized/tunneling adapter
    /// rather than a physical NIC.
    pub fn is_virtual(self) -> bool {
        matches!(self, Self::HyperV | Self::TunTap | Self::Vpn | Self::Loopback)
    }
}

/// One IPv4 address bound to an interface, with its netmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ipv4Binding {
    pub address: Ipv4Addr,
    pub netmask: Ipv4Addr,
}

/// A capture-capable network interface (spec §3 `NetworkInterface`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterface {
    /// Kernel-level device name (e.g. `eth0`, `\Device\NPF_{...}`).
    pub name: String,
    /// Human-readable description reported by the capture backend.
    pub description: String,
    pub class: InterfaceClass,
    pub ipv4: Vec<Ipv4Binding>,
    pub virtual_adapter: bool,
}

impl NetworkInterface {
    pub fn new(name: String, description: String, ipv4: Vec<Ipv4Binding>) -> Self {
        let class = InterfaceClass::classify(&name, &description);
        let virtual_adapter = class.is_virtual();
        Self { name, description, class, ipv4, virtual_adapter }
    }

    pub fn has_non_loopback_ipv4(&self) -> bool {
        self.ipv4.iter().any(|b| !b.address.is_loopback())
    }
}

/// Picks the default interface to preselect in a picker, per spec §4.1:
/// first Ethernet with a non-loopback address, else first with a
/// non-loopback address, else index 0.
pub fn default_interface(interfaces: &[NetworkInterface]) -> Option<usize> {
    if interfaces.is_empty() {
        return None;
    }
    if let Some(i) = interfaces
        .iter()
        .position(|i| i.class == InterfaceClass::Ethernet && i.has_non_loopback_ipv4())
    {
        return Some(i);
    }
    if let Some(i) = interfaces.iter().position(NetworkInterface::has_non_loopback_ipv4) {
        return Some(i);
    }
    Some(0)
}

/// Immutable 5-tuple identifying one direction of a TCP connection
/// (spec §3 `FlowKey`). Transport is always TCP so it is not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowKey {
    pub src_ip: Ipv4Addr,
    pub src_port: u16,
    pub dst_ip: Ipv4Addr,
    pub dst_port: u16,
}

/// The 21-entry fixed attribute enumeration (spec §3 `ModulePart`),
/// split into 13 basic and 8 special names. The concrete names are an
/// implementation decision (spec.md leaves the full list unspecified);
/// see DESIGN.md for the reasoning.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum AttrName {
    // Basic (13)
    StrengthBoost,
    AgilityBoost,
    IntellectBoost,
    AttackSpd,
    DefenseBoost,
    VitalityBoost,
    CriticalRate,
    CriticalDamage,
    AccuracyBoost,
    EvasionBoost,
    Resistance,
    Armor,
    MovementSpeed,
    // Special (8)
    SpecialAttack,
    EliteStrike,
    CastFocus,
    HealingBoost,
    HealingEnhance,
    ShieldBoost,
    CooldownReduction,
    Penetration,
}

impl AttrName {
    pub const ALL: [AttrName; 21] = [
        Self::StrengthBoost,
        Self::AgilityBoost,
        Self::IntellectBoost,
        Self::AttackSpd,
        Self::DefenseBoost,
        Self::VitalityBoost,
        Self::CriticalRate,
        Self::CriticalDamage,
        Self::AccuracyBoost,
        Self::EvasionBoost,
        Self::Resistance,
        Self::Armor,
        Self::MovementSpeed,
        Self::SpecialAttack,
        Self::EliteStrike,
        Self::CastFocus,
        Self::HealingBoost,
        Self::HealingEnhance,
        Self::ShieldBoost,
        Self::CooldownReduction,
        Self::Penetration,
    ];

    pub const BASIC_COUNT: usize = 13;

    pub fn is_basic(self) -> bool {
        (self as usize) < Self::BASIC_COUNT
    }

    pub fn is_special(self) -> bool {
        !self.is_basic()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::StrengthBoost => "Strength Boost",
            Self::AgilityBoost => "Agility Boost",
            Self::IntellectBoost => "Intellect Boost",
            Self::AttackSpd => "Attack SPD",
            Self::DefenseBoost => "Defense Boost",
            Self::VitalityBoost => "Vitality Boost",
            Self::CriticalRate => "Critical Rate",
            Self::CriticalDamage => "Critical Damage",
            Self::AccuracyBoost => "Accuracy Boost",
            Self::EvasionBoost => "Evasion Boost",
            Self::Resistance => "Resistance",
            Self::Armor => "Armor",
            Self::MovementSpeed => "Movement Speed",
            Self::SpecialAttack => "Special Attack",
            Self::EliteStrike => "Elite Strike",
            Self::CastFocus => "Cast Focus",
            Self::HealingBoost => "Healing Boost",
            Self::HealingEnhance => "Healing Enhance",
            Self::ShieldBoost => "Shield Boost",
            Self::CooldownReduction => "Cooldown Reduction",
            Self::Penetration => "Penetration",
        }
    }

    pub fn from_str_name(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == s)
    }
}

impl std::fmt::Display for AttrName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One attribute roll on a module (spec §3 `ModulePart`). Values are
/// small (observed 1–10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModulePart {
    pub attr_id: u32,
    pub attr_name: AttrName,
    pub value: u8,
}

/// Derived enum used to bias the optimizer toward a play style
/// (spec §3 `ModuleCategory`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleCategory {
    Attack,
    Guard,
    Support,
}

impl ModuleCategory {
    /// Attributes this category prefers, used by the GA fitness function's
    /// category bonus (spec §4.10).
    pub fn preferred_attrs(self) -> &'static [AttrName] {
        use AttrName::*;
        match self {
            Self::Attack => &[
                StrengthBoost,
                AgilityBoost,
                IntellectBoost,
                SpecialAttack,
                EliteStrike,
            ],
            Self::Guard => &[Resistance, Armor],
            Self::Support => &[HealingBoost, HealingEnhance],
        }
    }
}

/// One decoded inventory item (spec §3 `ModuleInfo`). Equality and
/// deduplication are by `uuid` alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub name: String,
    pub config_id: u32,
    pub uuid: u64,
    pub quality: u8,
    pub parts: Vec<ModulePart>,
}

impl PartialEq for ModuleInfo {
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
    }
}
impl Eq for ModuleInfo {}

impl std::hash::Hash for ModuleInfo {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.uuid.hash(state);
    }
}

impl ModuleInfo {
    pub fn total_value(&self) -> u32 {
        self.parts.iter().map(|p| u32::from(p.value)).sum()
    }

    pub fn value_for(&self, attr: AttrName) -> u32 {
        self.parts
            .iter()
            .filter(|p| p.attr_name == attr)
            .map(|p| u32::from(p.value))
            .sum()
    }
}

/// An unordered 4-subset of distinct modules (spec §3 `ModuleSolution`).
/// Canonicalized by sorting modules by ascending uuid before storing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleSolution {
    pub modules: [ModuleInfo; 4],
    pub attr_breakdown: BTreeMap<AttrName, u32>,
    pub score: u32,
    pub optimization_score: f64,
}

impl ModuleSolution {
    /// Builds a canonical solution from four distinct modules. Returns
    /// `None` if the uuids are not all distinct (invariant §3/§8-I3).
    pub fn new(mut modules: [ModuleInfo; 4]) -> Option<Self> {
        modules.sort_by_key(|m| m.uuid);
        let mut uuids: Vec<u64> = modules.iter().map(|m| m.uuid).collect();
        uuids.sort_unstable();
        uuids.dedup();
        if uuids.len() != 4 {
            return None;
        }
        let attr_breakdown = compute_breakdown(&modules);
        Some(Self { modules, attr_breakdown, score: 0, optimization_score: 0.0 })
    }

    /// Canonical signature used by §4.11's attribute-level dedup: sorted
    /// `(attrName, level(value))` pairs.
    pub fn attr_level_signature(&self) -> Vec<(AttrName, u8)> {
        let mut sig: Vec<(AttrName, u8)> = self
            .attr_breakdown
            .iter()
            .map(|(&name, &value)| (name, level(value)))
            .filter(|(_, lvl)| *lvl > 0)
            .collect();
        sig.sort_unstable();
        sig
    }

    /// The 4 distinct uuids in ascending order — the canonical chromosome
    /// identity used by the GA to dedup candidates.
    pub fn canonical_uuids(&self) -> [u64; 4] {
        [
            self.modules[0].uuid,
            self.modules[1].uuid,
            self.modules[2].uuid,
            self.modules[3].uuid,
        ]
    }
}

/// Sum of part values per attribute across the four modules
/// (spec §8 algebraic law: `breakdown[a] = Σ part.value where part.name = a`).
pub fn compute_breakdown(modules: &[ModuleInfo; 4]) -> BTreeMap<AttrName, u32> {
    let mut map = BTreeMap::new();
    for m in modules {
        for p in &m.parts {
            *map.entry(p.attr_name).or_insert(0u32) += u32::from(p.value);
        }
    }
    map
}

/// Bucketed level in `[0,6]` derived from a summed attribute value via
/// the fixed thresholds `{1,4,8,12,16,20}` (spec §4.10/§GLOSSARY).
pub fn level(value: u32) -> u8 {
    match value {
        v if v >= 20 => 6,
        v if v >= 16 => 5,
        v if v >= 12 => 4,
        v if v >= 8 => 3,
        v if v >= 4 => 2,
        v if v >= 1 => 1,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_buckets() {
        assert_eq!(level(0), 0);
        assert_eq!(level(1), 1);
        assert_eq!(level(3), 1);
        assert_eq!(level(4), 2);
        assert_eq!(level(7), 2);
        assert_eq!(level(8), 3);
        assert_eq!(level(11), 3);
        assert_eq!(level(12), 4);
        assert_eq!(level(15), 4);
        assert_eq!(level(16), 5);
        assert_eq!(level(19), 5);
        assert_eq!(level(20), 6);
        assert_eq!(level(1000), 6);
    }

    #[test]
    fn attr_name_roundtrip() {
        for a in AttrName::ALL {
            assert_eq!(AttrName::from_str_name(a.as_str()), Some(a));
        }
        assert_eq!(
            AttrName::ALL.iter().filter(|a| a.is_basic()).count(),
            AttrName::BASIC_COUNT
        );
        assert_eq!(
            AttrName::ALL.iter().filter(|a| a.is_special()).count(),
            21 - AttrName::BASIC_COUNT
        );
    }

    #[test]
    fn default_interface_prefers_ethernet_with_address() {
        let lo = NetworkInterface::new(
            "lo".into(),
            "Loopback".into(),
            vec![Ipv4Binding {
                address: Ipv4Addr::LOCALHOST,
                netmask: Ipv4Addr::new(255, 0, 0, 0),
            }],
        );
        let eth = NetworkInterface::new(
            "eth0".into(),
            "Ethernet adapter".into(),
            vec![Ipv4Binding {
                address: Ipv4Addr::new(192, 168, 1, 10),
                netmask: Ipv4Addr::new(255, 255, 255, 0),
            }],
        );
        let idx = default_interface(&[lo, eth]);
        assert_eq!(idx, Some(1));
    }

    #[test]
    fn solution_rejects_duplicate_uuid() {
        let make = |uuid: u64| ModuleInfo {
            name: "x".into(),
            config_id: 1,
            uuid,
            quality: 1,
            parts: vec![],
        };
        let modules = [make(1), make(2), make(3), make(1)];
        assert!(ModuleSolution::new(modules).is_none());
    }

    #[test]
    fn solution_canonicalizes_by_uuid() {
        let make = |uuid: u64| ModuleInfo {
            name: "x".into(),
            config_id: 1,
            uuid,
            quality: 1,
            parts: vec![],
        };
        let modules = [make(4), make(1), make(3), make(2)];
        let sol = ModuleSolution::new(modules).expect("distinct uuids");
        assert_eq!(sol.canonical_uuids(), [1, 2, 3, 4]);
    }
}
