
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::engine::{SearchEngine, SearchSnapshot};
use crate::listing::ListingSource;
use crate::runtime::protocol::SearchEvent;
use crate::sequencer::RequestTicket;

/// Drives a [`SearchEngine`] on a single task. Every event is applied to the
/// engine in arrival order, then the engine is flushed once.
pub(crate) struct SearchRuntime {
    session_id: String,
    engine: SearchEngine,
    source: Arc<dyn ListingSource>,
    event_tx: mpsc::UnboundedSender<SearchEvent>,
    event_rx: mpsc::UnboundedReceiver<SearchEvent>,
    snapshot_tx: watch::Sender<SearchSnapshot>,
    cancel: CancellationToken,
}

impl SearchRuntime {
    pub(crate) fn new(
        session_id: String,
        engine: SearchEngine,
        source: Arc<dyn ListingSource>,
        event_tx: mpsc::UnboundedSender<SearchEvent>,
        event_rx: mpsc::UnboundedReceiver<SearchEvent>,
        snapshot_tx: watch::Sender<SearchSnapshot>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session_id,
            engine,
            source,
            event_tx,
            event_rx,
            snapshot_tx,
            cancel,
        }
    }

    pub(crate) async fn run(mut self) {
        tracing::info!(session = %self.session_id, "search runtime started");
        self.load_categories();
        self.flush();

        loop {
            let deadline = self.engine.debounce_deadline().map(Instant::from_std);
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                event = self.event_rx.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
                _ = sleep_until(deadline) => {
                    self.engine.poll_debounce();
                    self.flush();
                }
            }
        }

        self.engine.shutdown();
        self.publish();
        tracing::info!(session = %self.session_id, "search runtime stopped");
    }

    fn handle_event(&mut self, event: SearchEvent) {
        match event {
            SearchEvent::SetQuery(raw) => self.engine.set_query(raw),
            SearchEvent::Submit => self.engine.submit(),
            SearchEvent::Retry => self.engine.retry(),
            SearchEvent::SetCategory(category) => {
                self.engine.set_category(category);
            }
            SearchEvent::SetPriceMin(price_min) => {
                self.engine.set_price_min(price_min);
            }
            SearchEvent::SetPriceMax(price_max) => {
                self.engine.set_price_max(price_max);
            }
            SearchEvent::SetPriceRange { min, max } => {
                self.engine.set_price_range(min, max);
            }
            SearchEvent::SetSupplier(supplier_id) => {
                self.engine.set_supplier(supplier_id);
            }
            SearchEvent::SetAvailability(availability) => {
                self.engine.set_availability(availability);
            }
            SearchEvent::SetSortBy(sort_by) => {
                self.engine.set_sort_by(sort_by);
            }
            SearchEvent::SetSortOrder(sort_order) => {
                self.engine.set_sort_order(sort_order);
            }
            SearchEvent::ToggleSortOrder => {
                self.engine.toggle_sort_order();
            }
            SearchEvent::SetPage(page) => {
                self.engine.set_page(page);
            }
            SearchEvent::ClearAll => {
                self.engine.clear_all();
            }
            SearchEvent::ApplyExternalIntent { patch, mode } => {
                self.engine.apply_external_intent(&patch, mode);
            }
            SearchEvent::Sync { reply } => {
                let _ = reply.send(());
                return;
            }
            SearchEvent::FetchSettled { sequence, result } => {
                if let Some(ticket) = self.engine.complete(sequence, result) {
                    self.spawn_fetch(ticket);
                }
            }
            SearchEvent::CategoriesLoaded(Ok(categories)) => {
                self.engine.set_categories(categories);
            }
            SearchEvent::CategoriesLoaded(Err(error)) => {
                tracing::warn!(
                    "search runtime {} failed to load categories: {}",
                    self.session_id,
                    error
                );
            }
        }
        self.flush();
    }

    fn flush(&mut self) {
        if let Some(ticket) = self.engine.flush() {
            self.spawn_fetch(ticket);
        }
        self.publish();
    }

    fn publish(&self) {
        let next = self.engine.snapshot();
        self.snapshot_tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    fn spawn_fetch(&self, ticket: RequestTicket) {
        let request = ticket.request(self.engine.config().page_size());
        let sequence = ticket.sequence;
        let source = self.source.clone();
        let event_tx = self.event_tx.clone();
        let cancel = self.cancel.child_token();

        tokio::spawn(async move {
            let result = tokio::select! {
                _ = cancel.cancelled() => return,
                result = source.search(&request) => result,
            };
            let _ = event_tx.send(SearchEvent::FetchSettled { sequence, result });
        });
    }

    fn load_categories(&self) {
        let source = self.source.clone();
        let event_tx = self.event_tx.clone();
        let cancel = self.cancel.child_token();

        tokio::spawn(async move {
            let result = tokio::select! {
                _ = cancel.cancelled() => return,
                result = source.categories() => result,
            };
            let _ = event_tx.send(SearchEvent::CategoriesLoaded(result));
        });
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
