//! The gate session actor: one task that owns a gate's queue, selection,
//! pending mutations, scanner and badge poller, driven by [`GateCommand`]s
//! and reporting through [`GateEvent`]s.

pub mod messages;
pub mod runtime;
pub mod state;

pub use messages::{GateCommand, GateEvent, Notice, NoticeLevel, QueueSnapshot};
pub use runtime::{GateHandle, GateSession, SessionSettings};
pub use state::GateState;
