//! Transition table
//!
//! A two-dimensional dispatch table indexed by state and event. Handlers take
//! the machine's state as an explicit `&mut` parameter instead of holding a
//! reference back to the machine.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::state::{Event, State};
use crate::LOG_TARGET;

/// A handler applies one event to the machine's state and reports what it did
pub type Handler = fn(&mut State) -> Outcome;

/// What a handler did to the state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// The state changed
    Transitioned { from: State, to: State },

    /// The event was handled as a no-op; the state is unchanged
    Ignored { state: State },
}

impl Outcome {
    /// State the machine is in after the handler ran
    pub fn resulting_state(&self) -> State {
        match self {
            Outcome::Transitioned { to, .. } => *to,
            Outcome::Ignored { state } => *state,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Transitioned { from, to } => write!(f, "state {} -> {}", from, to),
            Outcome::Ignored { state } => write!(f, "state {} -> do nothing", state),
        }
    }
}

// === Handlers for state A ===

fn a_on_a(state: &mut State) -> Outcome {
    *state = State::B;
    Outcome::Transitioned {
        from: State::A,
        to: State::B,
    }
}

fn a_on_b(_state: &mut State) -> Outcome {
    Outcome::Ignored { state: State::A }
}

// === Handlers for state B ===

fn b_on_a(_state: &mut State) -> Outcome {
    Outcome::Ignored { state: State::B }
}

fn b_on_b(state: &mut State) -> Outcome {
    *state = State::A;
    Outcome::Transitioned {
        from: State::B,
        to: State::A,
    }
}

/// The handler set of every state, keyed by event
///
/// Built once when the machine is constructed and never mutated afterwards,
/// so the worker can read it without synchronization.
#[derive(Clone)]
pub struct Registry {
    handlers: [[Handler; Event::COUNT]; State::COUNT],
}

impl Registry {
    /// Build the registry with one handler set per state
    pub fn new() -> Self {
        debug!("Registry::new: called");
        let handlers: [[Handler; Event::COUNT]; State::COUNT] = [
            // State A: on A, on B
            [a_on_a, a_on_b],
            // State B: on A, on B
            [b_on_a, b_on_b],
        ];

        Self { handlers }
    }

    /// Look up the handler for an event in a given state
    pub fn handler(&self, state: State, event: Event) -> Handler {
        self.handlers[state.index()][event.index()]
    }

    /// Apply an event to the state and log the outcome
    ///
    /// Every invocation emits exactly one log line describing the transition
    /// or no-op taken.
    pub fn handle(&self, state: &mut State, event: Event) -> Outcome {
        debug!(%state, %event, "Registry::handle: called");
        let handler = self.handler(*state, event);
        let outcome = handler(state);
        info!(target: LOG_TARGET, %event, "{}", outcome);
        outcome
    }

    /// Predict the next state without logging
    pub fn next(&self, state: State, event: Event) -> State {
        let mut scratch = state;
        self.handler(state, event)(&mut scratch).resulting_state()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("states", &State::COUNT)
            .field("events", &Event::COUNT)
            .finish()
    }
}
