// SPDX-License-Identifier: AGPL-3.0-or-later

use anyhow::{Context, Result};
use clap::Parser;
use modscope::{
    capture,
    cfg::{
        cli::{Cli, resolve_config_path},
        config::Config,
        logger::init_logger,
    },
    control::{Command, Event, Selection, control_channel},
    model::{AttrName, ModuleCategory, default_interface},
    pipeline,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _logger_guard = init_logger(&cli.log_config)?;

    if cli.list_interfaces {
        for (i, iface) in capture::list_interfaces().iter().enumerate() {
            println!("{i}: {} ({:?}) - {}", iface.name, iface.class, iface.description);
        }
        return Ok(());
    }

    let cfg = resolve_config_path(&cli.config)
        .and_then(Config::load_from_file)
        .context("failed to resolve or load config")?;

    let interfaces = capture::list_interfaces();
    let interface = cli
        .interface
        .clone()
        .or_else(|| cfg.capture.default_interface.clone())
        .or_else(|| default_interface(&interfaces).map(|i| interfaces[i].name.clone()))
        .context("no capture interface available; pass --interface or set DefaultInterface")?;

    let selection = resolve_selection(&cli, &cfg);

    let (handle, driver) = control_channel();
    let pipeline_cfg = cfg.clone();
    let pipeline_task = tokio::spawn(async move {
        if let Err(err) = pipeline::run(pipeline_cfg, driver).await {
            warn!(error = %err, "pipeline exited with an error");
        }
    });

    handle
        .commands
        .send(Command::StartMonitoring { interface: interface.clone(), selection })
        .await
        .context("failed to start monitoring")?;
    info!(interface, "monitoring started");

    let mut events = handle.events;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("ctrl-c received, stopping monitoring");
                let _ = handle.commands.send(Command::StopMonitoring).await;
            }
            maybe_event = events.recv() => {
                let Some(event) = maybe_event else { break; };
                match event {
                    Event::Progress { kind, message } => info!(?kind, message, "progress"),
                    Event::DataCaptured { module_count } => info!(module_count, "data captured"),
                    Event::ResultsReady { solutions } => {
                        let json = serde_json::to_string_pretty(&solutions)
                            .context("failed to serialize results")?;
                        println!("{json}");
                    },
                    Event::MonitoringStopped { reason } => {
                        info!(reason, "monitoring stopped");
                        break;
                    },
                    Event::CapturedDataStatus { has_data } => info!(has_data, "captured data status"),
                    Event::CaptureBackendStatus { available } => {
                        info!(available, "capture backend status");
                    },
                }
            }
        }
    }

    drop(handle.commands);
    pipeline_task.abort();
    Ok(())
}

fn resolve_selection(cli: &Cli, cfg: &Config) -> Selection {
    let mut selection = Selection::from_config(&cfg.selection);

    if let Some(category) = cli.category.as_deref() {
        selection.category = match category {
            "Attack" => Some(ModuleCategory::Attack),
            "Guard" => Some(ModuleCategory::Guard),
            "Support" => Some(ModuleCategory::Support),
            _ => None,
        };
    }
    if !cli.attrs.is_empty() {
        selection.attributes = cli.attrs.iter().filter_map(|s| AttrName::from_str_name(s)).collect();
    }
    if !cli.prioritized_attrs.is_empty() {
        selection.prioritized_attrs =
            cli.prioritized_attrs.iter().filter_map(|s| AttrName::from_str_name(s)).take(6).collect();
    }
    if cli.priority_order {
        selection.priority_order_mode = true;
    }
    selection
}
