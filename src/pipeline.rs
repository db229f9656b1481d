// SPDX-License-Identifier: AGPL-3.0-or-later

//! Pipeline driver (§5): owns the reassembled byte queue and the captured
//! module set, wires C2-C10 end to end, and answers the control bus.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use bytes::Bytes;
use tokio::{sync::mpsc, task, time};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    aggregator::ModuleAggregator,
    capture::{self, CapturedSegment},
    cfg::config::Config,
    control::{Command, ControlDriver, Event, ProgressKind, Selection},
    decode::decode_inventory,
    framing::{self, DrainOutcome},
    model::ModuleCategory,
    optimizer::{
        ga::{self, GaParams},
        prefilter,
        rank::{self, SortMode},
    },
    reassembly::ReassemblyState,
};

/// One active capture run: the cancellation handle, the capture thread,
/// its segment channel, the reassembler, and the heuristic decode tier's
/// synthetic-uuid counter (§4.7 tier 4), which must stay monotonic across
/// every container decoded during this run.
struct Session {
    cancel: CancellationToken,
    capture_thread: std::thread::JoinHandle<()>,
    segments: mpsc::UnboundedReceiver<CapturedSegment>,
    reassembly: ReassemblyState,
    heuristic_uuid_counter: u64,
}

/// Runs the control loop until `StopMonitoring` (or bus closure) and
/// returns. Intended to be the single long-lived task spawned by `main`.
pub async fn run(cfg: Config, mut driver: ControlDriver) -> Result<()> {
    let aggregator = Arc::new(ModuleAggregator::new());
    let mut selection = Selection::from_config(&cfg.selection);
    let mut session: Option<Session> = None;
    let mut ga_task: Option<task::JoinHandle<Vec<(crate::optimizer::Chromosome, f64)>>> = None;
    let mut last_rescreen = None::<time::Instant>;

    let mut janitor = time::interval(Duration::from_secs(cfg.runtime.janitor_interval_secs));
    janitor.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            maybe_cmd = driver.commands.recv() => {
                let Some(cmd) = maybe_cmd else {
                    info!("control bus closed, shutting down pipeline");
                    break;
                };
                handle_command(
                    cmd,
                    &cfg,
                    &mut session,
                    &mut selection,
                    &aggregator,
                    &mut ga_task,
                    &mut last_rescreen,
                    &driver.events,
                ).await;
            }

            Some(seg) = recv_segment(&mut session) => {
                process_segment(
                    &mut session,
                    seg,
                    &cfg,
                    &selection,
                    &aggregator,
                    &mut ga_task,
                    &driver.events,
                ).await;
            }

            _ = janitor.tick() => {
                if let Some(s) = session.as_mut() {
                    let segment_timeout = Duration::from_secs(cfg.runtime.segment_timeout_secs);
                    let idle_timeout = Duration::from_secs(cfg.runtime.idle_timeout_secs);
                    if s.reassembly.janitor_tick(segment_timeout, idle_timeout) {
                        let _ = driver.events.send(Event::Progress {
                            kind: ProgressKind::Idle,
                            message: "flow idle, awaiting re-identification".into(),
                        }).await;
                    }
                }
            }

            result = join_ga(&mut ga_task) => {
                if let Some(chromosomes) = result {
                    finish_optimization(&cfg, &selection, &aggregator, chromosomes, &driver.events).await;
                }
            }
        }
    }

    Ok(())
}

async fn recv_segment(session: &mut Option<Session>) -> Option<CapturedSegment> {
    match session {
        Some(s) => s.segments.recv().await,
        None => std::future::pending().await,
    }
}

async fn join_ga(
    ga_task: &mut Option<task::JoinHandle<Vec<(crate::optimizer::Chromosome, f64)>>>,
) -> Option<Vec<(crate::optimizer::Chromosome, f64)>> {
    match ga_task {
        Some(handle) => {
            let result = handle.await;
            *ga_task = None;
            match result {
                Ok(chromosomes) => Some(chromosomes),
                Err(err) => {
                    warn!(error = %err, "optimizer task failed");
                    None
                },
            }
        },
        None => std::future::pending().await,
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_command(
    cmd: Command,
    cfg: &Config,
    session: &mut Option<Session>,
    selection: &mut Selection,
    aggregator: &Arc<ModuleAggregator>,
    ga_task: &mut Option<task::JoinHandle<Vec<(crate::optimizer::Chromosome, f64)>>>,
    last_rescreen: &mut Option<time::Instant>,
    events: &mpsc::Sender<Event>,
) {
    match cmd {
        Command::StartMonitoring { interface, selection: sel } => {
            *selection = sel;
            match start_capture(cfg, &interface) {
                Ok(new_session) => {
                    aggregator.clear();
                    *session = Some(new_session);
                    let _ = events
                        .send(Event::Progress {
                            kind: ProgressKind::Identifying,
                            message: format!("monitoring {interface}"),
                        })
                        .await;
                },
                Err(err) => {
                    let _ = events
                        .send(Event::MonitoringStopped { reason: err.to_string() })
                        .await;
                },
            }
        },
        Command::StopMonitoring => {
            stop_session(session);
            let _ = events
                .send(Event::MonitoringStopped { reason: "stopped by request".into() })
                .await;
        },
        Command::RescreenModules { selection: sel } => {
            *selection = sel;
            let debounce = Duration::from_millis(cfg.runtime.rescreen_debounce_ms);
            let now = time::Instant::now();
            if last_rescreen.is_some_and(|t| now.duration_since(t) < debounce) {
                return;
            }
            *last_rescreen = Some(now);
            maybe_trigger_optimizer(cfg, selection, aggregator, ga_task, events).await;
        },
        Command::HasCapturedData => {
            let _ = events
                .send(Event::CapturedDataStatus { has_data: !aggregator.is_empty() })
                .await;
        },
        Command::CheckCaptureBackend => {
            let status = capture::interfaces::check_capture_backend();
            let _ =
                events.send(Event::CaptureBackendStatus { available: status.available }).await;
        },
    }
}

fn start_capture(cfg: &Config, interface: &str) -> Result<Session> {
    let cancel = CancellationToken::new();
    let (capture_thread, segments) = capture::spawn_capture(interface, &cfg.capture, cancel.clone())
        .context("failed to start capture")?;
    Ok(Session {
        cancel,
        capture_thread,
        segments,
        reassembly: ReassemblyState::new(
            cfg.runtime.segment_cache_max,
            cfg.runtime.reassembly_queue_cap_bytes,
        ),
        heuristic_uuid_counter: 1,
    })
}

fn stop_session(session: &mut Option<Session>) {
    if let Some(s) = session.take() {
        s.cancel.cancel();
        // The capture thread exits promptly once it observes the token;
        // we don't block the async loop waiting for it to join.
        drop(s.capture_thread);
    }
}

/// Handles one captured segment on the active session (C4-C7). On a
/// new-uuid batch, §4.8 requires more than `dataCaptured`: the capture is
/// stopped (C2/C4 cleared) and the optimizer is invoked immediately with
/// the session's stored selection, rather than waiting for an explicit
/// `RescreenModules` command.
#[allow(clippy::too_many_arguments)]
async fn process_segment(
    session: &mut Option<Session>,
    seg: CapturedSegment,
    cfg: &Config,
    selection: &Selection,
    aggregator: &Arc<ModuleAggregator>,
    ga_task: &mut Option<task::JoinHandle<Vec<(crate::optimizer::Chromosome, f64)>>>,
    events: &mpsc::Sender<Event>,
) {
    let Some(s) = session.as_mut() else { return };

    if s.reassembly.selected_flow().is_none() {
        if capture::server_id::is_server_signature(&seg.payload) {
            s.reassembly.select_flow(seg.flow, seg.seq, seg.payload.len());
            let _ = events
                .send(Event::Progress {
                    kind: ProgressKind::Identifying,
                    message: "game server identified".into(),
                })
                .await;
        }
        return;
    }
    if !s.reassembly.is_selected(seg.flow) {
        return;
    }

    s.reassembly.ingest(seg.seq, seg.payload);

    let mut containers: Vec<Bytes> = Vec::new();
    let outcome = framing::drain_outer_packets(s.reassembly.queue_mut(), &mut |payload| {
        containers.push(payload);
    });
    if outcome == DrainOutcome::ProtocolError {
        s.reassembly.reset();
        let _ = events
            .send(Event::Progress {
                kind: ProgressKind::Error,
                message: "protocol desync, flow reset".into(),
            })
            .await;
        return;
    }

    let mut any_new = false;
    for payload in containers {
        let modules = decode_inventory(&payload, &mut s.heuristic_uuid_counter);
        if !modules.is_empty() && aggregator.ingest(modules) {
            any_new = true;
        }
    }
    if any_new {
        let _ = events.send(Event::DataCaptured { module_count: aggregator.len() }).await;
        stop_session(session);
        maybe_trigger_optimizer(cfg, selection, aggregator, ga_task, events).await;
    }
}

async fn maybe_trigger_optimizer(
    cfg: &Config,
    selection: &Selection,
    aggregator: &Arc<ModuleAggregator>,
    ga_task: &mut Option<task::JoinHandle<Vec<(crate::optimizer::Chromosome, f64)>>>,
    events: &mpsc::Sender<Event>,
) {
    if ga_task.is_some() {
        let _ = events
            .send(Event::Progress {
                kind: ProgressKind::Optimizing,
                message: "optimizer already running, skipping".into(),
            })
            .await;
        return;
    }

    let pool = aggregator.snapshot();
    let filtered: Vec<_> = match selection.category {
        Some(category) => pool
            .into_iter()
            .filter(|m| crate::decode::tables::category_for_config(m.config_id) == category)
            .collect(),
        None => pool,
    };

    let working = match prefilter::prefilter(&filtered, &selection.prioritized_attrs) {
        Ok(w) => w,
        Err(err) => {
            let _ = events
                .send(Event::Progress {
                    kind: ProgressKind::Error,
                    message: format!("cannot optimize yet: {err}"),
                })
                .await;
            return;
        },
    };

    let _ = events
        .send(Event::Progress {
            kind: ProgressKind::Optimizing,
            message: "optimizing module combinations".into(),
        })
        .await;

    let params = GaParams::from_config(&cfg.ga);
    // Category bonus default: an unset selection behaves as Attack-biased
    // rather than bonus-free, an Open Question decision (see DESIGN.md).
    let category = selection.category.unwrap_or(ModuleCategory::Attack);
    let prioritized = selection.prioritized_attrs.clone();

    *ga_task =
        Some(task::spawn_blocking(move || ga::run_campaigns(&working, category, &prioritized, &params)));
}

async fn finish_optimization(
    cfg: &Config,
    selection: &Selection,
    aggregator: &Arc<ModuleAggregator>,
    chromosomes: Vec<(crate::optimizer::Chromosome, f64)>,
    events: &mpsc::Sender<Event>,
) {
    let pool = aggregator.snapshot();
    let mode =
        if selection.priority_order_mode { SortMode::PriorityOrder } else { SortMode::Score };
    let solutions =
        rank::rank(&pool, &chromosomes, mode, &selection.prioritized_attrs, cfg.runtime.top_n);
    let _ = events.send(Event::ResultsReady { solutions }).await;
}
