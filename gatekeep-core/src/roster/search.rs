use std::{collections::HashSet, sync::Arc};

use futures::{StreamExt, TryStreamExt, stream};
use tracing::debug;

use gatekeep_model::{AttendeeRecord, GateScope, Page, PageRequest, QueueKind};

use crate::error::RosterResult;

use super::RosterSource;

/// Full-roster search over a backend that can only page.
///
/// The remote service has no search endpoint, so every search reads every
/// page of the queue, filters in memory and slices the merged list back
/// into the page the caller asked for.
#[derive(Debug, Clone)]
pub struct SearchAggregator {
    source: Arc<dyn RosterSource>,
    fetch_page_size: u32,
    concurrency: usize,
}

impl SearchAggregator {
    /// `fetch_page_size` is the page size used against the backend.
    /// `concurrency` bounds how many of the remaining pages are in flight at
    /// once; `0` requests all of them together.
    pub fn new(
        source: Arc<dyn RosterSource>,
        fetch_page_size: u32,
        concurrency: usize,
    ) -> Self {
        Self {
            source,
            fetch_page_size: fetch_page_size.max(1),
            concurrency,
        }
    }

    pub async fn search(
        &self,
        scope: &GateScope,
        kind: QueueKind,
        query: &str,
        request: PageRequest,
    ) -> RosterResult<Page<AttendeeRecord>> {
        let needle = query.trim().to_lowercase();
        let first = self
            .source
            .fetch_page(scope, kind, PageRequest::first(self.fetch_page_size))
            .await?;
        let total_pages = first.total_pages.max(1);

        let remaining = (2..=total_pages).collect::<Vec<_>>();
        let limit = match self.concurrency {
            0 => remaining.len().max(1),
            n => n,
        };

        // `buffered` keeps page order, so the merged list reads the same
        // way the unfiltered roster does.
        let rest = stream::iter(remaining)
            .map(|page| {
                let request =
                    PageRequest::new(page, self.fetch_page_size);
                async move {
                    self.source.fetch_page(scope, kind, request).await
                }
            })
            .buffered(limit)
            .try_collect::<Vec<_>>()
            .await?;

        let mut seen = HashSet::new();
        let matches = std::iter::once(first)
            .chain(rest)
            .flat_map(|page| page.records)
            // The queue predicate is re-applied because the pages were
            // filtered by whichever endpoint served them, not by us.
            .filter(|record| kind.admits(record, scope))
            .filter(|record| record.matches_lowercase(&needle))
            .filter(|record| seen.insert(record.id.clone()))
            .collect::<Vec<_>>();

        debug!(
            target: "gate::search",
            event = %scope.event_id,
            queue = %kind,
            query = %needle,
            pages = total_pages,
            matches = matches.len(),
            "search aggregated"
        );

        Ok(Page::slice(matches, request))
    }
}
