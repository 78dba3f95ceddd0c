//! statemachine - a finite-state machine with serialized transitions
//!
//! Every state transition is funneled through a single worker task, so
//! concurrent callers never race on the machine's state.
//!
//! # Modules
//!
//! - [`registry`] - States, events and the transition table
//! - [`machine`] - The worker task and the handle used to drive it
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod machine;
pub mod registry;

/// Tracing target carried by every line the machine logs
pub const LOG_TARGET: &str = "state_machine";

// Re-export commonly used types
pub use config::Config;
pub use machine::{Machine, MachineConfig, MachineError, MachineEvent, MachineHandle, MachineMetrics, MachineResult};
pub use registry::{Event, Outcome, Registry, State};
