//! State and event identifiers

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A mode the machine can be in. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum State {
    #[default]
    A,
    B,
}

impl State {
    /// Every state variant, in table order
    pub const ALL: [State; 2] = [State::A, State::B];

    /// Number of state variants
    pub const COUNT: usize = Self::ALL.len();

    /// Row of this state in the dispatch table
    pub(crate) fn index(self) -> usize {
        match self {
            State::A => 0,
            State::B => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            State::A => "A",
            State::B => "B",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A trigger handled by the current state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Event {
    A,
    B,
}

impl Event {
    /// Every event in the closed event set, in table order
    pub const ALL: [Event; 2] = [Event::A, Event::B];

    /// Number of events
    pub const COUNT: usize = Self::ALL.len();

    /// Column of this event in the dispatch table
    pub(crate) fn index(self) -> usize {
        match self {
            Event::A => 0,
            Event::B => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Event::A => "A",
            Event::B => "B",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Event {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "Event::from_str: called");
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(Event::A),
            "B" => Ok(Event::B),
            other => Err(format!("Unknown event '{}', expected one of: A, B", other)),
        }
    }
}
