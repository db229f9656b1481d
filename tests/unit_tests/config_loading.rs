// SPDX-License-Identifier: AGPL-3.0-or-later

use modscope::cfg::config::Config;

fn test_config_path() -> String {
    std::env::var("TEST_CONFIG").unwrap_or_else(|_| "tests/config.yaml".into())
}

#[test]
fn loads_and_normalizes_fixture_config() {
    let cfg = Config::load_from_file(test_config_path()).expect("fixture config must load");

    assert_eq!(cfg.capture.bpf_filter, "tcp");
    assert_eq!(cfg.ga.population_size, 40);
    assert_eq!(cfg.ga.num_campaigns, Some(2));
    assert_eq!(cfg.runtime.top_n, 10);
    assert_eq!(cfg.selection.prioritized_attrs, vec!["Special Attack", "Elite Strike"]);
}

#[test]
fn rejects_out_of_range_rates() {
    let mut cfg = Config::load_from_file(test_config_path()).expect("fixture config must load");
    cfg.ga.mutation_rate = 1.5;
    assert!(cfg.validate_and_normalize().is_err());
}

#[test]
fn truncates_prioritized_attrs_over_six() {
    let mut cfg = Config::load_from_file(test_config_path()).expect("fixture config must load");
    cfg.selection.prioritized_attrs = vec![
        "a".into(), "b".into(), "c".into(), "d".into(), "e".into(), "f".into(), "g".into(),
    ];
    cfg.validate_and_normalize().expect("otherwise valid");
    assert_eq!(cfg.selection.prioritized_attrs.len(), 6);
}
