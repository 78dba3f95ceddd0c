//! Machine worker implementation
//!
//! The worker task is the only owner of the current state. Handles reach it
//! through a single-consumer queue, so actions run strictly one at a time in
//! dequeue order.

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

use super::config::MachineConfig;
use super::handle::MachineHandle;
use super::messages::{MachineCommand, MachineEvent, MachineMetrics};
use crate::LOG_TARGET;
use crate::registry::{Event, Outcome, Registry, State};

/// Capacity of the inbound queue
///
/// Submitters additionally wait for the worker's acceptance, so a single slot
/// keeps the handoff as close to a rendezvous as a bounded channel allows.
pub const INBOUND_CAPACITY: usize = 1;

/// State owned by the worker task
///
/// Actions receive `&mut MachineCore`; nothing outside the worker can reach it.
pub struct MachineCore {
    state: State,
    registry: Registry,
    metrics: MachineMetrics,
    notify_tx: broadcast::Sender<MachineEvent>,
}

impl MachineCore {
    fn new(initial: State, notify_tx: broadcast::Sender<MachineEvent>) -> Self {
        Self {
            state: initial,
            registry: Registry::new(),
            metrics: MachineMetrics::default(),
            notify_tx,
        }
    }

    /// Current state
    pub fn state(&self) -> State {
        self.state
    }

    /// Apply an event to the current state through the registry
    pub fn apply(&mut self, event: Event) -> Outcome {
        debug!(state = %self.state, %event, "MachineCore::apply: called");
        let outcome = self.registry.handle(&mut self.state, event);

        self.metrics.actions_applied += 1;
        match outcome {
            Outcome::Transitioned { from, to } => {
                self.metrics.transitions += 1;
                self.notify(MachineEvent::Transitioned { from, event, to });
            }
            Outcome::Ignored { state } => {
                self.metrics.ignored += 1;
                self.notify(MachineEvent::Ignored { state, event });
            }
        }

        outcome
    }

    fn notify(&self, event: MachineEvent) {
        // No subscribers is fine
        let _ = self.notify_tx.send(event);
    }
}

/// A state machine whose transitions are serialized through one worker task
pub struct Machine {
    config: MachineConfig,
    core: MachineCore,
    tx: mpsc::Sender<MachineCommand>,
    rx: mpsc::Receiver<MachineCommand>,
}

impl Machine {
    /// Create a new Machine with the given configuration
    ///
    /// The worker does not run until [`Machine::run`] is driven.
    pub fn new(config: MachineConfig) -> Self {
        debug!(?config, "Machine::new: called");
        let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);
        let (notify_tx, _) = broadcast::channel(config.notify_capacity.max(1));
        let core = MachineCore::new(config.initial_state, notify_tx);
        Self { config, core, tx, rx }
    }

    /// Create a Machine and start its worker on the current tokio runtime
    pub fn spawn(config: MachineConfig) -> MachineHandle {
        debug!("Machine::spawn: called");
        let machine = Self::new(config);
        let handle = machine.handle();
        tokio::spawn(machine.run());
        handle
    }

    /// Create a handle for submitting events to this machine
    pub fn handle(&self) -> MachineHandle {
        MachineHandle::new(
            self.tx.clone(),
            self.core.notify_tx.clone(),
            self.config.submit_timeout(),
            self.config.close_timeout(),
        )
    }

    /// Subscribe to notifications, including the `Started` one published by `run`
    pub fn subscribe(&self) -> broadcast::Receiver<MachineEvent> {
        self.core.notify_tx.subscribe()
    }

    /// Run the worker loop
    ///
    /// This consumes the Machine and runs until a shutdown request is
    /// dequeued or every handle has been dropped.
    pub async fn run(self) {
        let Machine { mut core, tx, mut rx, .. } = self;
        // Only handles keep the queue open
        drop(tx);

        info!(target: LOG_TARGET, state = %core.state, "state machine started");
        core.notify(MachineEvent::Started { state: core.state });

        let ack = loop {
            let Some(cmd) = rx.recv().await else {
                debug!("run: all handles dropped");
                break None;
            };
            core.metrics.commands_received += 1;

            match cmd {
                MachineCommand::Apply {
                    event,
                    action,
                    accepted,
                } => {
                    if accepted.send(()).is_err() {
                        debug!(%event, "run: submitter gave up before acceptance, skipping action");
                        core.metrics.abandoned += 1;
                        continue;
                    }
                    action(&mut core);
                }

                MachineCommand::GetState { reply } => {
                    debug!(state = %core.state, "run: GetState command");
                    let _ = reply.send(core.state);
                }

                MachineCommand::GetMetrics { reply } => {
                    debug!("run: GetMetrics command");
                    let _ = reply.send(core.metrics.clone());
                }

                MachineCommand::Shutdown { ack } => {
                    debug!("run: Shutdown command");
                    core.notify(MachineEvent::ShutdownRequested);
                    break Some(ack);
                }
            }
        };

        // Anything still queued is discarded; its submitters observe Closed
        drop(rx);

        info!(target: LOG_TARGET, state = %core.state, "state machine stopped");
        core.notify(MachineEvent::Stopped { state: core.state });

        if let Some(ack) = ack {
            let _ = ack.send(());
        }
    }
}
