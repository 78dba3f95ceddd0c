//! sm - serialized state machine demo
//!
//! CLI entry point: runs a sequence of events through the machine, then
//! closes it and prints a summary.

use std::fs;
use std::io::IsTerminal;
use std::path::Path;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use statemachine::cli::{Cli, OutputFormat};
use statemachine::config::Config;
use statemachine::machine::{Machine, MachineEvent, MachineMetrics};
use statemachine::registry::State;

fn parse_level(level: &str) -> tracing::Level {
    match level.to_uppercase().as_str() {
        "TRACE" => tracing::Level::TRACE,
        "DEBUG" => tracing::Level::DEBUG,
        "INFO" => tracing::Level::INFO,
        "WARN" | "WARNING" => tracing::Level::WARN,
        "ERROR" => tracing::Level::ERROR,
        _ => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", level);
            tracing::Level::INFO
        }
    }
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>, log_file: Option<&Path>) -> Result<()> {
    // Priority: CLI --log-level > config file > default (INFO)
    let level = cli_log_level
        .or(config_log_level)
        .map(parse_level)
        .unwrap_or(tracing::Level::INFO);

    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    match log_file {
        Some(path) => {
            let file = fs::File::create(path).context("Failed to create log file")?;
            tracing_subscriber::fmt()
                .with_writer(file)
                .with_ansi(false)
                .with_env_filter(filter)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal())
                .with_env_filter(filter)
                .init();
        }
    }

    debug!(%level, "Logging initialized");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(
        cli.log_level.as_deref(),
        config.log_level.as_deref(),
        cli.log_file.as_deref(),
    )
    .context("Failed to setup logging")?;

    if let Some(path) = &cli.save_config {
        config.save(path).context("Failed to save configuration")?;
        info!(path = %path.display(), "Saved effective config");
    }

    let sequence = cli.sequence();
    info!(events = sequence.len(), initial = %config.machine.initial_state, "sm starting");

    // Room for every notification of this run: Started, one per event,
    // ShutdownRequested and Stopped
    let mut machine_config = config.machine.clone();
    machine_config.notify_capacity = machine_config.notify_capacity.max(sequence.len() + 3);

    let machine = Machine::new(machine_config);
    let collector = tokio::spawn(collect_trace(machine.subscribe()));
    let handle = machine.handle();
    let worker = tokio::spawn(machine.run());

    for event in sequence {
        handle
            .trigger(event)
            .await
            .context(format!("Failed to submit event {}", event))?;
    }

    let state = handle.state().await.context("Failed to read final state")?;
    let metrics = handle.metrics().await.context("Failed to read metrics")?;

    handle.close().await.context("Failed to close state machine")?;
    worker.await.context("State machine worker panicked")?;
    let trace = collector.await.context("Trace collector panicked")?;

    print_summary(&cli.format, state, &metrics, &trace)
}

/// Collect notifications until the machine reports it has stopped
async fn collect_trace(mut notifications: broadcast::Receiver<MachineEvent>) -> Vec<MachineEvent> {
    let mut trace = Vec::new();
    loop {
        match notifications.recv().await {
            Ok(notification) => {
                let stopped = matches!(notification, MachineEvent::Stopped { .. });
                trace.push(notification);
                if stopped {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!(missed, "Trace collector fell behind, summary is incomplete");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    trace
}

fn print_summary(format: &OutputFormat, state: State, metrics: &MachineMetrics, trace: &[MachineEvent]) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "final-state": state,
                "metrics": metrics,
                "trace": trace,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            for notification in trace {
                match notification {
                    MachineEvent::Transitioned { from, event, to } => {
                        println!("  {} {} -> {}", event.to_string().cyan(), from, to.to_string().green());
                    }
                    MachineEvent::Ignored { state, event } => {
                        println!("  {} {} {}", event.to_string().cyan(), state, "(no-op)".dimmed());
                    }
                    _ => {}
                }
            }
            println!("Final state: {}", state.to_string().green());
            println!(
                "Actions: {} ({} transitions, {} no-ops)",
                metrics.actions_applied, metrics.transitions, metrics.ignored
            );
        }
    }

    Ok(())
}
