//! Message types for the machine worker
//!
//! Commands flow from handles to the worker; notifications flow from the
//! worker to subscribers.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;

use super::worker::MachineCore;
use crate::registry::{Event, State};

/// Errors from machine operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MachineError {
    /// The worker has terminated, or terminated before accepting the request
    #[error("State machine closed")]
    Closed,

    /// A deadline elapsed before the worker accepted the request
    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: &'static str, after: Duration },
}

/// Response from machine operations
pub type MachineResult<T> = Result<T, MachineError>;

/// A deferred application of one event to whatever the current state is
///
/// Consumed exactly once by the worker.
pub type Action = Box<dyn FnOnce(&mut MachineCore) + Send + 'static>;

/// Requests sent to the machine worker
pub enum MachineCommand {
    /// Run an action; `accepted` is signalled when the worker dequeues it
    Apply {
        event: Event,
        action: Action,
        accepted: oneshot::Sender<()>,
    },

    /// Read the current state
    GetState { reply: oneshot::Sender<State> },

    /// Read the worker's counters
    GetMetrics {
        reply: oneshot::Sender<MachineMetrics>,
    },

    /// Stop the worker; `ack` is signalled once the loop has exited
    Shutdown { ack: oneshot::Sender<()> },
}

impl fmt::Debug for MachineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MachineCommand::Apply { event, .. } => f.debug_struct("Apply").field("event", event).finish_non_exhaustive(),
            MachineCommand::GetState { .. } => f.write_str("GetState"),
            MachineCommand::GetMetrics { .. } => f.write_str("GetMetrics"),
            MachineCommand::Shutdown { .. } => f.write_str("Shutdown"),
        }
    }
}

/// Notifications broadcast by the worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MachineEvent {
    /// Worker loop entered
    Started { state: State },

    /// An event moved the machine to a new state
    Transitioned { from: State, event: Event, to: State },

    /// An event was handled as a no-op
    Ignored { state: State, event: Event },

    /// A shutdown request was dequeued
    ShutdownRequested,

    /// Worker loop exited; nothing is published after this
    Stopped { state: State },
}

/// Counters kept by the worker
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineMetrics {
    /// Commands dequeued, of any kind
    #[serde(rename = "commands-received")]
    pub commands_received: u64,

    /// Actions executed
    #[serde(rename = "actions-applied")]
    pub actions_applied: u64,

    /// Actions that changed the state
    pub transitions: u64,

    /// Actions handled as no-ops
    pub ignored: u64,

    /// Actions skipped because the submitter gave up before acceptance
    pub abandoned: u64,
}
