//! Serialized executor
//!
//! A single worker task owns the current state. Handles turn each event
//! into an action, queue it, and wait until the worker accepts it:
//! - **Apply:** run one event against whatever the current state is
//! - **Query:** read the state or counters, ordered behind earlier actions
//! - **Shutdown:** stop the worker and wait for it to exit

mod config;
mod handle;
mod messages;
mod worker;

pub use config::MachineConfig;
pub use handle::MachineHandle;
pub use messages::{Action, MachineCommand, MachineError, MachineEvent, MachineMetrics, MachineResult};
pub use worker::{INBOUND_CAPACITY, Machine, MachineCore};
