// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{fs, path::Path};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::model::ModuleCategory;

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// Capture-backend parameters (§4.2).
    pub capture: CaptureConfig,
    /// Default screening selection applied by `startMonitoring`/`rescreenModules`.
    pub selection: SelectionConfig,
    /// Genetic-algorithm parameter overrides (§4.10 defaults apply when absent).
    pub ga: GaConfig,
    /// Runtime knobs that spec.md fixes as constants but which are useful to
    /// override for tests (cache sizes, timeouts, debounce).
    pub runtime: RuntimeConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct CaptureConfig {
    #[serde(default, rename = "DefaultInterface")]
    /// Kernel device name to preselect; falls back to §4.1's heuristic when absent.
    pub default_interface: Option<String>,

    #[serde(default = "default_snaplen", rename = "SnapLen")]
    /// Per-frame capture length in bytes.
    pub snaplen: i32,

    #[serde(default = "default_ring_buffer_bytes", rename = "RingBufferBytes")]
    /// Kernel ring buffer size.
    pub ring_buffer_bytes: i64,

    #[serde(default = "default_bpf_filter", rename = "BpfFilter")]
    /// BPF filter program applied to the capture handle.
    pub bpf_filter: String,
}

fn default_snaplen() -> i32 {
    65_535
}
fn default_ring_buffer_bytes() -> i64 {
    10 * 1024 * 1024
}
fn default_bpf_filter() -> String {
    "tcp".to_string()
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct SelectionConfig {
    #[serde(default, rename = "Category")]
    /// `Attack`/`Guard`/`Support`/`All`; `None` behaves as `All`.
    pub category: Option<String>,

    #[serde(default, rename = "Attributes")]
    /// Attribute names to retain in `attrBreakdown` reporting; empty means all 21.
    pub attributes: Vec<String>,

    #[serde(default, rename = "PrioritizedAttrs")]
    /// At most 6 attribute names used by the priority fitness term and
    /// priority-order sort.
    pub prioritized_attrs: Vec<String>,

    #[serde(default, rename = "PriorityOrderMode")]
    pub priority_order_mode: bool,
}

impl SelectionConfig {
    pub fn category_filter(&self) -> Option<ModuleCategory> {
        match self.category.as_deref() {
            Some("Attack") => Some(ModuleCategory::Attack),
            Some("Guard") => Some(ModuleCategory::Guard),
            Some("Support") => Some(ModuleCategory::Support),
            _ => None,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GaConfig {
    #[serde(default = "default_population_size", rename = "PopulationSize")]
    pub population_size: usize,
    #[serde(default = "default_generations", rename = "Generations")]
    pub generations: usize,
    #[serde(default = "default_tournament_size", rename = "TournamentSize")]
    pub tournament_size: usize,
    #[serde(default = "default_crossover_rate", rename = "CrossoverRate")]
    pub crossover_rate: f64,
    #[serde(default = "default_mutation_rate", rename = "MutationRate")]
    pub mutation_rate: f64,
    #[serde(default = "default_elitism_rate", rename = "ElitismRate")]
    pub elitism_rate: f64,
    #[serde(default = "default_local_search_rate", rename = "LocalSearchRate")]
    pub local_search_rate: f64,
    #[serde(default, rename = "NumCampaigns")]
    /// Overrides `max(1, hardware_parallelism - 1)` when set.
    pub num_campaigns: Option<usize>,
}

fn default_population_size() -> usize {
    150
}
fn default_generations() -> usize {
    50
}
fn default_tournament_size() -> usize {
    5
}
fn default_crossover_rate() -> f64 {
    0.8
}
fn default_mutation_rate() -> f64 {
    0.1
}
fn default_elitism_rate() -> f64 {
    0.1
}
fn default_local_search_rate() -> f64 {
    0.3
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: default_population_size(),
            generations: default_generations(),
            tournament_size: default_tournament_size(),
            crossover_rate: default_crossover_rate(),
            mutation_rate: default_mutation_rate(),
            elitism_rate: default_elitism_rate(),
            local_search_rate: default_local_search_rate(),
            num_campaigns: None,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RuntimeConfig {
    #[serde(default = "default_segment_cache_max", rename = "SegmentCacheMax")]
    pub segment_cache_max: usize,
    #[serde(default = "default_segment_timeout_secs", rename = "SegmentTimeoutSecs")]
    pub segment_timeout_secs: u64,
    #[serde(default = "default_queue_cap_bytes", rename = "ReassemblyQueueCapBytes")]
    pub reassembly_queue_cap_bytes: usize,
    #[serde(default = "default_idle_timeout_secs", rename = "IdleTimeoutSecs")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_janitor_interval_secs", rename = "JanitorIntervalSecs")]
    pub janitor_interval_secs: u64,
    #[serde(default = "default_rescreen_debounce_ms", rename = "RescreenDebounceMs")]
    pub rescreen_debounce_ms: u64,
    #[serde(default = "default_top_n", rename = "TopN")]
    pub top_n: usize,
}

fn default_segment_cache_max() -> usize {
    1_000
}
fn default_segment_timeout_secs() -> u64 {
    60
}
fn default_queue_cap_bytes() -> usize {
    10 * 1024 * 1024
}
fn default_idle_timeout_secs() -> u64 {
    30
}
fn default_janitor_interval_secs() -> u64 {
    10
}
fn default_rescreen_debounce_ms() -> u64 {
    300
}
fn default_top_n() -> usize {
    40
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            segment_cache_max: default_segment_cache_max(),
            segment_timeout_secs: default_segment_timeout_secs(),
            reassembly_queue_cap_bytes: default_queue_cap_bytes(),
            idle_timeout_secs: default_idle_timeout_secs(),
            janitor_interval_secs: default_janitor_interval_secs(),
            rescreen_debounce_ms: default_rescreen_debounce_ms(),
            top_n: default_top_n(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            default_interface: None,
            snaplen: default_snaplen(),
            ring_buffer_bytes: default_ring_buffer_bytes(),
            bpf_filter: default_bpf_filter(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            selection: SelectionConfig::default(),
            ga: GaConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }
}

impl Config {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let mut cfg: Config =
            serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Validates invariants and normalizes derived fields.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        ensure!(self.capture.snaplen > 0, "SnapLen must be > 0");
        ensure!(self.capture.ring_buffer_bytes > 0, "RingBufferBytes must be > 0");
        ensure!(!self.capture.bpf_filter.trim().is_empty(), "BpfFilter must not be empty");

        if self.selection.prioritized_attrs.len() > 6 {
            self.selection.prioritized_attrs.truncate(6);
        }

        ensure!(self.ga.population_size >= 4, "PopulationSize must be >= 4");
        ensure!(self.ga.generations >= 1, "Generations must be >= 1");
        ensure!(self.ga.tournament_size >= 1, "TournamentSize must be >= 1");
        for (name, rate) in [
            ("CrossoverRate", self.ga.crossover_rate),
            ("MutationRate", self.ga.mutation_rate),
            ("ElitismRate", self.ga.elitism_rate),
            ("LocalSearchRate", self.ga.local_search_rate),
        ] {
            ensure!((0.0..=1.0).contains(&rate), "{name} must be within [0, 1]");
        }
        if let Some(n) = self.ga.num_campaigns {
            ensure!(n >= 1, "NumCampaigns must be >= 1 when set");
        }

        ensure!(self.runtime.segment_cache_max >= 1, "SegmentCacheMax must be >= 1");
        ensure!(
            self.runtime.reassembly_queue_cap_bytes >= 1,
            "ReassemblyQueueCapBytes must be >= 1"
        );
        ensure!(self.runtime.top_n >= 1, "TopN must be >= 1");

        Ok(())
    }
}
