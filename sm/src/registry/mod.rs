//! State registry
//!
//! Holds the closed set of states and events, and for every state the
//! handler each event triggers. The table is total: every (state, event)
//! pair resolves to a handler, so no event is ever rejected at runtime.

mod state;
mod table;

pub use state::{Event, State};
pub use table::{Handler, Outcome, Registry};
