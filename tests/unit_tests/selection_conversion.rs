// SPDX-License-Identifier: AGPL-3.0-or-later

use modscope::{
    cfg::config::SelectionConfig,
    control::Selection,
    model::{AttrName, ModuleCategory},
};

#[test]
fn from_config_parses_known_attrs_and_drops_unknown() {
    let cfg = SelectionConfig {
        category: Some("Guard".into()),
        attributes: vec!["Armor".into(), "Not A Real Attr".into()],
        prioritized_attrs: vec!["Special Attack".into()],
        priority_order_mode: true,
    };

    let selection = Selection::from_config(&cfg);
    assert_eq!(selection.category, Some(ModuleCategory::Guard));
    assert_eq!(selection.attributes, vec![AttrName::Armor]);
    assert_eq!(selection.prioritized_attrs, vec![AttrName::SpecialAttack]);
    assert!(selection.priority_order_mode);
}

#[test]
fn from_config_truncates_prioritized_attrs_to_six() {
    let cfg = SelectionConfig {
        category: None,
        attributes: vec![],
        prioritized_attrs: AttrName::ALL.iter().take(9).map(|a| a.as_str().to_string()).collect(),
        priority_order_mode: false,
    };

    let selection = Selection::from_config(&cfg);
    assert_eq!(selection.prioritized_attrs.len(), 6);
}

#[test]
fn unset_category_is_none() {
    let cfg = SelectionConfig::default();
    let selection = Selection::from_config(&cfg);
    assert_eq!(selection.category, None);
}
