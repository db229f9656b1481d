// SPDX-License-Identifier: AGPL-3.0-or-later

use clap::Parser;
use modscope::cfg::cli::Cli;

#[test]
fn defaults_when_bare() {
    let cli = Cli::parse_from(["modscope"]);
    assert_eq!(cli.config, "config.yaml");
    assert_eq!(cli.log_config, "config.logger.yaml");
    assert!(!cli.list_interfaces);
    assert!(cli.interface.is_none());
    assert!(cli.attrs.is_empty());
}

#[test]
fn repeatable_attr_flags_accumulate() {
    let cli = Cli::parse_from([
        "modscope",
        "--attr",
        "Strength Boost",
        "--attr",
        "Agility Boost",
        "--prioritized-attr",
        "Special Attack",
        "--priority-order",
        "--category",
        "Guard",
    ]);
    assert_eq!(cli.attrs, vec!["Strength Boost", "Agility Boost"]);
    assert_eq!(cli.prioritized_attrs, vec!["Special Attack"]);
    assert!(cli.priority_order);
    assert_eq!(cli.category.as_deref(), Some("Guard"));
}
