//! Periodic refresh of the "still to check in" badge.

use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use gatekeep_model::{GateScope, PageRequest, QueueKind};

use crate::roster::RosterSource;

/// Handle to a running badge poll. Stopping is idempotent and happens on
/// drop as well.
#[derive(Debug)]
pub struct BadgePoller {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl BadgePoller {
    /// Fetch the size of the event's check-in queue every `interval` and
    /// hand it to `on_count`. The first fetch happens immediately.
    pub fn spawn<F>(
        source: Arc<dyn RosterSource>,
        scope: GateScope,
        interval: Duration,
        on_count: F,
    ) -> Self
    where
        F: Fn(u64) + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        // Roster size is an event-wide figure.
        let scope = GateScope::event(scope.event_id);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let fetch = source.fetch_page(
                    &scope,
                    QueueKind::NeedsCheckIn,
                    PageRequest::first(1),
                );
                let result = tokio::select! {
                    _ = token.cancelled() => break,
                    result = fetch => result,
                };

                match result {
                    Ok(page) => {
                        debug!(
                            target: "gate::badge",
                            event = %scope.event_id,
                            count = page.total_count,
                            "badge refreshed"
                        );
                        on_count(page.total_count);
                    }
                    Err(err) => warn!(
                        target: "gate::badge",
                        event = %scope.event_id,
                        error = %err,
                        "badge refresh failed"
                    ),
                }
            }
            debug!(target: "gate::badge", "badge poller stopped");
        });

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for BadgePoller {
    fn drop(&mut self) {
        self.stop();
    }
}
