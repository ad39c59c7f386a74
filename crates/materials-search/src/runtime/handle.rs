//! Search facade: the only surface collaborators touch.
//!
//! Setters never fail and never block. They enqueue a command for the
//! runtime actor and return; the effect becomes visible through
//! [`SearchHandle::snapshot`] once the actor has applied it, which
//! [`SearchHandle::sync`] waits for.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::codec::UrlQuery;
use crate::config::SearchConfig;
use crate::engine::{SearchEngine, SearchSnapshot};
use crate::error::{EngineError, EngineResult};
use crate::intent::{Availability, IntentPatch, SortBy, SortOrder};
use crate::listing::ListingSource;
use crate::location::{HistoryMode, LocationPort};
use crate::material::{Material, SupplierOption};
use crate::runtime::actor::SearchRuntime;
use crate::runtime::protocol::SearchEvent;
use crate::utils::clock::RuntimeClock;

#[derive(Clone)]
pub struct SearchHandle {
    session_id: String,
    event_tx: mpsc::UnboundedSender<SearchEvent>,
    snapshot_rx: watch::Receiver<SearchSnapshot>,
}

impl std::fmt::Debug for SearchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchHandle")
            .field("session_id", &self.session_id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl SearchHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_closed(&self) -> bool {
        self.event_tx.is_closed()
    }

    fn send(&self, event: SearchEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::warn!(
                "search runtime {} stopped; dropping command",
                self.session_id
            );
        }
    }

    /// Keystroke-level query; committed after the debounce window.
    pub fn set_query(&self, query: impl Into<String>) {
        self.send(SearchEvent::SetQuery(query.into()));
    }

    /// Commit the typed query now and search from the first page.
    pub fn submit(&self) {
        self.send(SearchEvent::Submit);
    }

    pub fn retry(&self) {
        self.send(SearchEvent::Retry);
    }

    pub fn set_category(&self, category: Option<impl Into<String>>) {
        self.send(SearchEvent::SetCategory(category.map(Into::into)));
    }

    pub fn set_price_min(&self, price_min: Option<f64>) {
        self.send(SearchEvent::SetPriceMin(price_min));
    }

    pub fn set_price_max(&self, price_max: Option<f64>) {
        self.send(SearchEvent::SetPriceMax(price_max));
    }

    pub fn set_price_range(&self, min: Option<f64>, max: Option<f64>) {
        self.send(SearchEvent::SetPriceRange { min, max });
    }

    pub fn set_supplier(&self, supplier_id: Option<impl Into<String>>) {
        self.send(SearchEvent::SetSupplier(supplier_id.map(Into::into)));
    }

    pub fn set_availability(&self, availability: Option<Availability>) {
        self.send(SearchEvent::SetAvailability(availability));
    }

    pub fn set_sort_by(&self, sort_by: SortBy) {
        self.send(SearchEvent::SetSortBy(sort_by));
    }

    pub fn set_sort_order(&self, sort_order: SortOrder) {
        self.send(SearchEvent::SetSortOrder(sort_order));
    }

    pub fn toggle_sort_order(&self) {
        self.send(SearchEvent::ToggleSortOrder);
    }

    pub fn set_page(&self, page: u32) {
        self.send(SearchEvent::SetPage(page));
    }

    pub fn clear_all(&self) {
        self.send(SearchEvent::ClearAll);
    }

    /// Overwrite several fields at once and push a new history entry.
    pub fn apply_external_intent(&self, patch: IntentPatch) {
        self.apply_external_intent_with_mode(patch, HistoryMode::Push);
    }

    pub fn apply_external_intent_with_mode(&self, patch: IntentPatch, mode: HistoryMode) {
        self.send(SearchEvent::ApplyExternalIntent { patch, mode });
    }

    /// Resolves once every command sent before it has been applied.
    pub async fn sync(&self) -> EngineResult<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.event_tx
            .send(SearchEvent::Sync { reply: reply_tx })
            .map_err(|_| EngineError::Stopped)?;
        reply_rx.await.map_err(|_| EngineError::Stopped)
    }

    pub fn snapshot(&self) -> SearchSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub fn materials(&self) -> Vec<Material> {
        self.snapshot_rx.borrow().materials().to_vec()
    }

    pub fn loading(&self) -> bool {
        self.snapshot_rx.borrow().loading
    }

    pub fn error(&self) -> Option<String> {
        self.snapshot_rx.borrow().error.clone()
    }

    pub fn total_pages(&self) -> u32 {
        self.snapshot_rx.borrow().total_pages()
    }

    pub fn total_materials(&self) -> u64 {
        self.snapshot_rx.borrow().total_materials()
    }

    pub fn committed_query(&self) -> String {
        self.snapshot_rx.borrow().committed_query().to_string()
    }

    pub fn categories(&self) -> Vec<String> {
        self.snapshot_rx.borrow().categories.to_vec()
    }

    pub fn suppliers(&self) -> Vec<SupplierOption> {
        self.snapshot_rx.borrow().suppliers()
    }

    pub fn current_query(&self) -> UrlQuery {
        self.snapshot_rx.borrow().current_query()
    }

    /// Stream of snapshots, starting with the current one.
    pub fn subscribe(&self) -> WatchStream<SearchSnapshot> {
        WatchStream::new(self.snapshot_rx.clone())
    }

    /// Wait for the next snapshot change.
    pub async fn changed(&self) -> EngineResult<SearchSnapshot> {
        let mut rx = self.snapshot_rx.clone();
        rx.mark_unchanged();
        rx.changed().await.map_err(|_| EngineError::Stopped)?;
        let snapshot = rx.borrow_and_update().clone();
        Ok(snapshot)
    }

    /// Wait until no request is outstanding and a page or an error is shown.
    pub async fn settled(&self) -> EngineResult<SearchSnapshot> {
        let mut rx = self.snapshot_rx.clone();
        let snapshot = rx
            .wait_for(|snapshot| {
                !snapshot.loading && (snapshot.result.is_some() || snapshot.error.is_some())
            })
            .await
            .map_err(|_| EngineError::Stopped)?;
        Ok(snapshot.clone())
    }
}

/// Owns a running search runtime. Dropping it tears the runtime down.
pub struct SearchSession {
    handle: SearchHandle,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SearchSession {
    pub fn handle(&self) -> &SearchHandle {
        &self.handle
    }

    /// Stop the runtime: the pending debounce is dropped and in-flight
    /// requests are abandoned without reporting.
    pub fn shutdown(&mut self) {
        self.cancel.cancel();
    }

    /// Shut down and wait for the runtime task to finish.
    pub async fn join(mut self) {
        self.shutdown();
        if let Some(task) = self.task.take() {
            if let Err(error) = task.await {
                tracing::warn!(
                    "search runtime {} ended abnormally: {}",
                    self.handle.session_id,
                    error
                );
            }
        }
    }
}

impl Drop for SearchSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub fn spawn_search_session(
    config: SearchConfig,
    source: Arc<dyn ListingSource>,
    location: Arc<dyn LocationPort>,
) -> SearchSession {
    let session_id = Uuid::now_v7().to_string();
    let engine = SearchEngine::new(config, location, Arc::new(RuntimeClock));
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot_rx) = watch::channel(engine.snapshot());
    let cancel = CancellationToken::new();

    let runtime = SearchRuntime::new(
        session_id.clone(),
        engine,
        source,
        event_tx.clone(),
        event_rx,
        snapshot_tx,
        cancel.clone(),
    );
    let task = tokio::spawn(async move {
        runtime.run().await;
    });

    SearchSession {
        handle: SearchHandle {
            session_id,
            event_tx,
            snapshot_rx,
        },
        cancel,
        task: Some(task),
    }
}
