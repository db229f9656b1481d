// SPDX-License-Identifier: AGPL-3.0-or-later

//! Command/event bus (C11): the typed control surface the pipeline
//! listens on and reports through. Commands and events are carried over
//! bounded `tokio` channels so a slow consumer applies backpressure rather
//! than growing memory unbounded.

use tokio::sync::mpsc;

use crate::{
    cfg::config::SelectionConfig,
    model::{AttrName, ModuleCategory, ModuleSolution},
};

/// Channel capacity for both the command and event queues.
const CHANNEL_CAPACITY: usize = 256;

/// A screening selection, shared by `startMonitoring` and `rescreenModules`.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub category: Option<ModuleCategory>,
    pub attributes: Vec<AttrName>,
    pub prioritized_attrs: Vec<AttrName>,
    pub priority_order_mode: bool,
}

impl Selection {
    /// Resolves the YAML-configured defaults, dropping any attribute name
    /// that doesn't match the fixed enumeration rather than failing
    /// startup over a config typo.
    pub fn from_config(cfg: &SelectionConfig) -> Self {
        Self {
            category: cfg.category_filter(),
            attributes: cfg.attributes.iter().filter_map(|s| AttrName::from_str_name(s)).collect(),
            prioritized_attrs: cfg
                .prioritized_attrs
                .iter()
                .filter_map(|s| AttrName::from_str_name(s))
                .take(6)
                .collect(),
            priority_order_mode: cfg.priority_order_mode,
        }
    }
}

/// Phase tag carried alongside every `Progress` event's rendered string so
/// a non-GUI consumer (tests, logs) can match on phase without parsing the
/// message text (supplements spec.md §4.12, which only specifies the
/// strings).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressKind {
    Identifying,
    Reassembling,
    Decoding,
    Optimizing,
    Idle,
    Error,
}

/// Commands accepted by the pipeline driver (§4.1-§4.12).
#[derive(Debug, Clone)]
pub enum Command {
    StartMonitoring { interface: String, selection: Selection },
    StopMonitoring,
    RescreenModules { selection: Selection },
    HasCapturedData,
    CheckCaptureBackend,
}

/// Events emitted by the pipeline driver back to the control surface.
#[derive(Debug, Clone)]
pub enum Event {
    /// At least one new module uuid entered the aggregate set.
    DataCaptured { module_count: usize },
    /// A human-readable status line for a long-running phase, tagged with
    /// its `ProgressKind` for match-based consumers.
    Progress { kind: ProgressKind, message: String },
    /// The optimizer finished; carries the final ranked solutions.
    ResultsReady { solutions: Vec<ModuleSolution> },
    /// Monitoring stopped, either by request or because the capture
    /// backend failed.
    MonitoringStopped { reason: String },
    /// Reply to `hasCapturedData`.
    CapturedDataStatus { has_data: bool },
    /// Reply to `checkCaptureBackend`.
    CaptureBackendStatus { available: bool },
}

/// The caller-facing half of the bus: send commands, receive events.
pub struct ControlHandle {
    pub commands: mpsc::Sender<Command>,
    pub events: mpsc::Receiver<Event>,
}

/// The pipeline-facing half of the bus: receive commands, send events.
pub struct ControlDriver {
    pub commands: mpsc::Receiver<Command>,
    pub events: mpsc::Sender<Event>,
}

/// Builds a connected pair of bus halves (§3 "typed command/event bus").
pub fn control_channel() -> (ControlHandle, ControlDriver) {
    let (cmd_tx, cmd_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (evt_tx, evt_rx) = mpsc::channel(CHANNEL_CAPACITY);
    (
        ControlHandle { commands: cmd_tx, events: evt_rx },
        ControlDriver { commands: cmd_rx, events: evt_tx },
    )
}
