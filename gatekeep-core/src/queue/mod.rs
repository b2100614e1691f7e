//! Local, derived state for the queue a gate is currently showing.

pub mod selection;
pub mod view;

pub use selection::SelectionSet;
pub use view::{Pagination, QueueView, RequestToken};
