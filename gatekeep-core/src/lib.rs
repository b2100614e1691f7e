//! # Gatekeep Core
//!
//! Coordinator for gate check-in / check-out stations. A gate station shows
//! which attendees still need to enter an event (or session area) and which
//! are inside and still need to leave, and lets the operator move them
//! between the two by hand, in bulk, or by scanning a QR code.
//!
//! The roster itself lives behind a paginated remote API with no search
//! endpoint, and several gates may work on the same roster at once.
//!
//! ## Architecture
//!
//! - [`roster`]: the [`RosterSource`](roster::RosterSource) port, the reqwest
//!   client, an in-memory roster and full-roster search.
//! - [`queue`]: the materialized queue page and the operator's selection.
//! - [`mutation`]: the per-attendee lock table, single mutations and bulk
//!   runs.
//! - [`scan`]: the camera port and the dispatcher that owns it.
//! - [`gates`]: gate listing, creation and deletion.
//! - [`badge`]: periodic roster-size polling.
//! - [`session`]: the actor that owns one gate's state and ties the above
//!   together.
//! - [`config`]: station configuration loading.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use gatekeep_core::{
//!     roster::InMemoryRoster,
//!     scan::ChannelCamera,
//!     session::{GateCommand, GateSession, SessionSettings},
//! };
//! use gatekeep_model::{GateScope, QueueKind};
//!
//! # async fn demo() -> Result<(), gatekeep_core::error::SessionError> {
//! let scope = GateScope::area("42", "main-hall");
//! let roster = Arc::new(InMemoryRoster::demo(
//!     &scope.event_id,
//!     &"main-hall".into(),
//!     30,
//! ));
//! let (session, handle) = GateSession::new(
//!     SessionSettings::default(),
//!     roster,
//!     Arc::new(ChannelCamera::new()),
//!     scope,
//!     QueueKind::NeedsCheckIn,
//! );
//! let mut events = handle.subscribe();
//! session.spawn();
//!
//! handle.send(GateCommand::SetQuery("ada".into())).await?;
//! while let Ok(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

pub mod api;
pub mod badge;
pub mod config;
pub mod error;
pub mod gates;
pub mod mutation;
pub mod queue;
pub mod roster;
pub mod scan;
pub mod session;

pub use config::{ConfigSource, StationConfig};
pub use error::{
    ErrorKind, GateError, MutationError, RosterError, RosterResult, ScanError,
    SessionError,
};
