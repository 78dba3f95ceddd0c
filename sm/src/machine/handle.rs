//! MachineHandle - Client interface for submitting events

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info};

use super::config::MachineConfig;
use super::messages::{Action, MachineCommand, MachineError, MachineEvent, MachineMetrics, MachineResult};
use super::worker::{Machine, MachineCore};
use crate::LOG_TARGET;
use crate::registry::{Event, State};

/// Handle for callers to drive the machine
///
/// This handle is cloneable and can be shared across tasks. Every operation
/// goes through the worker's queue; callers never touch the state directly.
#[derive(Clone)]
pub struct MachineHandle {
    /// Sender to the worker task
    tx: mpsc::Sender<MachineCommand>,

    /// Used to hand out notification receivers
    notify_tx: broadcast::Sender<MachineEvent>,

    /// Default deadline for `trigger`, unbounded when None
    submit_timeout: Option<Duration>,

    /// Default deadline for `close`, unbounded when None
    close_timeout: Option<Duration>,
}

impl MachineHandle {
    pub(crate) fn new(
        tx: mpsc::Sender<MachineCommand>,
        notify_tx: broadcast::Sender<MachineEvent>,
        submit_timeout: Option<Duration>,
        close_timeout: Option<Duration>,
    ) -> Self {
        debug!(?submit_timeout, ?close_timeout, "MachineHandle::new: called");
        Self {
            tx,
            notify_tx,
            submit_timeout,
            close_timeout,
        }
    }

    /// Create a machine in its initial state and start its worker
    pub fn spawn() -> Self {
        debug!("MachineHandle::spawn: called");
        Machine::spawn(MachineConfig::default())
    }

    /// Submit event A
    pub async fn trigger_a(&self) -> MachineResult<()> {
        self.trigger(Event::A).await
    }

    /// Submit event B
    pub async fn trigger_b(&self) -> MachineResult<()> {
        self.trigger(Event::B).await
    }

    /// Submit an event and wait until the worker accepts it
    ///
    /// Returns once the action has been dequeued, not once it has run. Uses
    /// the configured submit timeout, if any.
    pub async fn trigger(&self, event: Event) -> MachineResult<()> {
        debug!(%event, "MachineHandle::trigger: called");
        match self.submit_timeout {
            Some(timeout) => self.trigger_within(event, timeout).await,
            None => self.submit(event).await,
        }
    }

    /// Submit an event, giving up if it is not accepted within `timeout`
    ///
    /// A `Timeout` result means the action never ran. If the deadline passes
    /// while the worker is already handing the action over, acceptance wins
    /// and this returns `Ok`.
    pub async fn trigger_within(&self, event: Event, timeout: Duration) -> MachineResult<()> {
        debug!(%event, ?timeout, "MachineHandle::trigger_within: called");
        let deadline = Instant::now() + timeout;
        let timed_out = || MachineError::Timeout {
            operation: "trigger",
            after: timeout,
        };

        // A cancelled send never enqueues the command
        let mut accepted_rx = tokio::time::timeout_at(deadline, self.enqueue(event))
            .await
            .map_err(|_| timed_out())??;

        match tokio::time::timeout_at(deadline, &mut accepted_rx).await {
            Ok(accepted) => accepted.map_err(|_| MachineError::Closed),
            Err(_) => {
                // After close() the worker's send fails and it skips the action,
                // unless the acceptance already landed
                accepted_rx.close();
                match accepted_rx.try_recv() {
                    Ok(()) => {
                        debug!(%event, "MachineHandle::trigger_within: accepted at the deadline");
                        Ok(())
                    }
                    Err(_) => Err(timed_out()),
                }
            }
        }
    }

    async fn submit(&self, event: Event) -> MachineResult<()> {
        let accepted_rx = self.enqueue(event).await?;
        debug!(%event, "MachineHandle::submit: waiting for acceptance");
        accepted_rx.await.map_err(|_| MachineError::Closed)
    }

    /// Queue an apply command, returning the receiver for its acceptance
    async fn enqueue(&self, event: Event) -> MachineResult<oneshot::Receiver<()>> {
        let (accepted_tx, accepted_rx) = oneshot::channel();
        let action: Action = Box::new(move |core: &mut MachineCore| {
            core.apply(event);
        });

        self.tx
            .send(MachineCommand::Apply {
                event,
                action,
                accepted: accepted_tx,
            })
            .await
            .map_err(|_| MachineError::Closed)?;

        Ok(accepted_rx)
    }

    /// Shut the worker down and wait until its loop has exited
    ///
    /// Fails with [`MachineError::Closed`] if the machine is already closed.
    /// Uses the configured close timeout, if any.
    pub async fn close(&self) -> MachineResult<()> {
        debug!("MachineHandle::close: called");
        match self.close_timeout {
            Some(timeout) => self.close_within(timeout).await,
            None => self.shutdown().await,
        }
    }

    /// Shut the worker down, giving up if it does not acknowledge within `timeout`
    pub async fn close_within(&self, timeout: Duration) -> MachineResult<()> {
        debug!(?timeout, "MachineHandle::close_within: called");
        tokio::time::timeout(timeout, self.shutdown())
            .await
            .map_err(|_| MachineError::Timeout {
                operation: "close",
                after: timeout,
            })?
    }

    async fn shutdown(&self) -> MachineResult<()> {
        info!(target: LOG_TARGET, "trigger close");
        let (ack_tx, ack_rx) = oneshot::channel();

        self.tx
            .send(MachineCommand::Shutdown { ack: ack_tx })
            .await
            .map_err(|_| MachineError::Closed)?;

        ack_rx.await.map_err(|_| MachineError::Closed)?;
        info!(target: LOG_TARGET, "closed");
        Ok(())
    }

    /// Read the current state
    ///
    /// The read is queued behind every action accepted before it.
    pub async fn state(&self) -> MachineResult<State> {
        debug!("MachineHandle::state: called");
        let (reply_tx, reply_rx) = oneshot::channel();

        self.tx
            .send(MachineCommand::GetState { reply: reply_tx })
            .await
            .map_err(|_| MachineError::Closed)?;

        reply_rx.await.map_err(|_| MachineError::Closed)
    }

    /// Get the worker's counters
    pub async fn metrics(&self) -> MachineResult<MachineMetrics> {
        debug!("MachineHandle::metrics: called");
        let (reply_tx, reply_rx) = oneshot::channel();

        self.tx
            .send(MachineCommand::GetMetrics { reply: reply_tx })
            .await
            .map_err(|_| MachineError::Closed)?;

        reply_rx.await.map_err(|_| MachineError::Closed)
    }

    /// Subscribe to notifications published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<MachineEvent> {
        debug!("MachineHandle::subscribe: called");
        self.notify_tx.subscribe()
    }

    /// Whether the worker has stopped accepting requests
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handle_trigger_and_state() {
        let handle = MachineHandle::spawn();

        assert_eq!(handle.state().await.unwrap(), State::A);
        handle.trigger_a().await.unwrap();
        assert_eq!(handle.state().await.unwrap(), State::B);
        handle.trigger_b().await.unwrap();
        assert_eq!(handle.state().await.unwrap(), State::A);

        handle.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_calls_after_close_fail_fast() {
        let handle = MachineHandle::spawn();
        handle.close().await.unwrap();

        assert!(handle.is_closed());
        assert_eq!(handle.trigger_a().await, Err(MachineError::Closed));
        assert_eq!(handle.state().await, Err(MachineError::Closed));
        assert_eq!(handle.metrics().await, Err(MachineError::Closed));
    }

    #[tokio::test]
    async fn test_double_close_is_an_error() {
        let handle = MachineHandle::spawn();
        handle.close().await.unwrap();
        assert_eq!(handle.close().await, Err(MachineError::Closed));
    }

    #[tokio::test]
    async fn test_clone_shares_worker() {
        let handle = MachineHandle::spawn();
        let other = handle.clone();

        other.trigger_a().await.unwrap();
        assert_eq!(handle.state().await.unwrap(), State::B);

        handle.close().await.unwrap();
        assert!(other.is_closed());
        assert_eq!(other.trigger_b().await, Err(MachineError::Closed));
    }

    #[tokio::test]
    async fn test_trigger_times_out_when_worker_not_running() {
        // Worker is never started, so nothing dequeues
        let machine = Machine::new(MachineConfig::default());
        let handle = machine.handle();

        let result = handle.trigger_within(Event::A, Duration::from_millis(20)).await;
        assert_eq!(
            result,
            Err(MachineError::Timeout {
                operation: "trigger",
                after: Duration::from_millis(20)
            })
        );
    }

    #[tokio::test]
    async fn test_timed_out_trigger_never_runs() {
        let machine = Machine::new(MachineConfig::default());
        let handle = machine.handle();

        // Fills the single queue slot, then gives up waiting for acceptance
        let result = handle.trigger_within(Event::A, Duration::from_millis(20)).await;
        assert!(matches!(result, Err(MachineError::Timeout { .. })));

        tokio::spawn(machine.run());

        assert_eq!(handle.state().await.unwrap(), State::A);
        let metrics = handle.metrics().await.unwrap();
        assert_eq!(metrics.abandoned, 1);
        assert_eq!(metrics.actions_applied, 0);

        handle.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_configured_close_timeout() {
        let config = MachineConfig {
            close_timeout_ms: Some(20),
            ..Default::default()
        };
        // Never run, so shutdown is never acknowledged
        let machine = Machine::new(config);
        let handle = machine.handle();

        let result = handle.close().await;
        assert!(matches!(result, Err(MachineError::Timeout { operation: "close", .. })));
    }
}
