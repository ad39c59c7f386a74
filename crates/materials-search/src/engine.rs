//! Synchronous search orchestration.
//!
//! [`SearchEngine`] owns the intent, the debounce state, the sequencer and the
//! latest accepted page. Mutations only change state; [`SearchEngine::flush`]
//! then writes the address and hands back at most one [`RequestTicket`] for
//! the caller to execute. Responses come back through
//! [`SearchEngine::complete`], which applies sequence gating.

use std::sync::Arc;
use std::time::Instant;

use crate::codec::{self, UrlQuery};
use crate::config::SearchConfig;
use crate::debounce::Debouncer;
use crate::error::EngineResult;
use crate::intent::{Availability, IntentPatch, SearchIntent, SortBy, SortOrder};
use crate::location::{HistoryMode, LocationPort};
use crate::material::{ListingResponse, Material, ResultPage, SupplierOption};
use crate::pagination::{ClampOutcome, PaginationController};
use crate::sequencer::{FetchSequencer, RequestTicket, Settlement};
use crate::store::FilterStore;
use crate::utils::clock::Clock;

/// Immutable view of the engine handed to collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSnapshot {
    pub intent: SearchIntent,
    pub result: Option<Arc<ResultPage>>,
    pub loading: bool,
    pub error: Option<String>,
    pub categories: Arc<Vec<String>>,
}

impl Default for SearchSnapshot {
    fn default() -> Self {
        Self {
            intent: SearchIntent::default(),
            result: None,
            loading: false,
            error: None,
            categories: Arc::new(Vec::new()),
        }
    }
}

impl SearchSnapshot {
    pub fn materials(&self) -> &[Material] {
        self.result
            .as_ref()
            .map(|page| page.items.as_slice())
            .unwrap_or_default()
    }

    pub fn total_pages(&self) -> u32 {
        self.result.as_ref().map_or(1, |page| page.total_pages)
    }

    pub fn total_materials(&self) -> u64 {
        self.result.as_ref().map_or(0, |page| page.total_count)
    }

    pub fn page(&self) -> u32 {
        self.intent.page
    }

    pub fn committed_query(&self) -> &str {
        &self.intent.committed_query
    }

    pub fn suppliers(&self) -> Vec<SupplierOption> {
        self.result
            .as_ref()
            .map(|page| page.suppliers())
            .unwrap_or_default()
    }

    /// Encoded form of the committed intent, as written to the address bar.
    pub fn current_query(&self) -> UrlQuery {
        codec::encode(&self.intent)
    }
}

pub struct SearchEngine {
    config: SearchConfig,
    store: FilterStore,
    debouncer: Debouncer<String>,
    sequencer: FetchSequencer,
    location: Arc<dyn LocationPort>,
    result: Option<Arc<ResultPage>>,
    error: Option<String>,
    categories: Arc<Vec<String>>,
    written: UrlQuery,
    last_issued: Option<SearchIntent>,
    next_write_mode: HistoryMode,
    force_fetch: bool,
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("intent", self.store.intent())
            .field("debouncer", &self.debouncer)
            .field("sequencer", &self.sequencer)
            .field("written", &self.written)
            .finish()
    }
}

impl SearchEngine {
    /// Build an engine from whatever the address bar currently holds.
    pub fn new(config: SearchConfig, location: Arc<dyn LocationPort>, clock: Arc<dyn Clock>) -> Self {
        let written = location.read();
        let intent = SearchIntent::from_patch(&codec::decode(written.as_str())).normalized();
        Self {
            debouncer: Debouncer::new(config.debounce_window(), clock),
            config,
            store: FilterStore::new(intent),
            sequencer: FetchSequencer::new(),
            location,
            result: None,
            error: None,
            categories: Arc::new(Vec::new()),
            written,
            last_issued: None,
            next_write_mode: HistoryMode::Replace,
            force_fetch: false,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn intent(&self) -> &SearchIntent {
        self.store.intent()
    }

    pub fn set_query(&mut self, raw: String) {
        self.store.set_raw_query(raw.clone());
        let deadline = self.debouncer.commit(raw);
        tracing::trace!(?deadline, "debounce window restarted");
    }

    /// Emit the debounced query if its window has elapsed.
    pub fn poll_debounce(&mut self) -> bool {
        match self.debouncer.poll() {
            Some(query) => {
                tracing::debug!(query = %query, "debounced query committed");
                self.store.commit_query(query)
            }
            None => false,
        }
    }

    pub fn debounce_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Commit the raw query now and search from the first page, even if
    /// nothing changed.
    pub fn submit(&mut self) {
        self.debouncer.cancel();
        let raw = self.store.intent().raw_query.clone();
        self.store.commit_query(raw);
        self.store.set_page(1);
        self.force_fetch = true;
    }

    pub fn retry(&mut self) {
        self.force_fetch = true;
    }

    pub fn set_category(&mut self, category: Option<String>) -> bool {
        self.store.set_category(category)
    }

    pub fn set_price_min(&mut self, price_min: Option<f64>) -> bool {
        self.store.set_price_min(price_min)
    }

    pub fn set_price_max(&mut self, price_max: Option<f64>) -> bool {
        self.store.set_price_max(price_max)
    }

    pub fn set_price_range(&mut self, price_min: Option<f64>, price_max: Option<f64>) -> bool {
        self.store.set_price_range(price_min, price_max)
    }

    pub fn set_supplier(&mut self, supplier_id: Option<String>) -> bool {
        self.store.set_supplier(supplier_id)
    }

    pub fn set_availability(&mut self, availability: Option<Availability>) -> bool {
        self.store.set_availability(availability)
    }

    pub fn set_sort_by(&mut self, sort_by: SortBy) -> bool {
        self.store.set_sort_by(sort_by)
    }

    pub fn set_sort_order(&mut self, sort_order: SortOrder) -> bool {
        self.store.set_sort_order(sort_order)
    }

    pub fn toggle_sort_order(&mut self) -> bool {
        self.store.toggle_sort_order()
    }

    pub fn set_page(&mut self, page: u32) -> bool {
        self.store.set_page(page)
    }

    /// Reset everything. A request still in flight is superseded by the
    /// clear's own request even when the intent was already at defaults.
    pub fn clear_all(&mut self) -> bool {
        self.debouncer.cancel();
        let changed = self.store.clear_all();
        if self.sequencer.is_loading() {
            self.force_fetch = true;
        }
        changed
    }

    /// Overwrite several fields at once on behalf of a collaborator. A pending
    /// debounced query survives unless the patch replaces the query.
    pub fn apply_external_intent(&mut self, patch: &IntentPatch, mode: HistoryMode) -> bool {
        if patch.query.is_some() {
            self.debouncer.cancel();
        }
        let changed = self.store.apply(patch);
        if changed {
            self.next_write_mode = mode;
        }
        changed
    }

    pub fn set_categories(&mut self, categories: Vec<String>) {
        self.categories = Arc::new(categories);
    }

    /// Sync the address bar, then issue a request if the committed intent
    /// differs from the last one issued.
    pub fn flush(&mut self) -> Option<RequestTicket> {
        self.flush_with(false)
    }

    fn flush_with(&mut self, corrective: bool) -> Option<RequestTicket> {
        self.write_location();

        let committed = self.store.intent().normalized();
        let force = std::mem::take(&mut self.force_fetch);
        if !force && self.last_issued.as_ref() == Some(&committed) {
            return None;
        }
        self.last_issued = Some(committed.clone());
        let ticket = self.sequencer.issue(committed, corrective);
        tracing::debug!(
            sequence = ticket.sequence,
            corrective,
            request = %ticket.request(self.config.page_size()).query_string(),
            "issuing listing request"
        );
        Some(ticket)
    }

    fn write_location(&mut self) {
        let mode = std::mem::take(&mut self.next_write_mode);
        let encoded = codec::encode(self.store.intent());
        if encoded == self.written {
            return;
        }
        tracing::debug!(query = %encoded, ?mode, "writing location");
        self.location.write(&encoded, mode);
        self.written = encoded;
    }

    /// Apply the outcome of request `sequence`. Returns a corrective ticket
    /// when the accepted page was out of range.
    pub fn complete(
        &mut self,
        sequence: u64,
        result: EngineResult<ListingResponse>,
    ) -> Option<RequestTicket> {
        let ticket = match self.sequencer.settle(sequence) {
            Settlement::Accepted(ticket) => ticket,
            Settlement::Stale { sequence, latest } => {
                tracing::trace!(sequence, latest, "discarding stale response");
                return None;
            }
        };

        let response = match result {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(sequence, "listing request failed: {}", error);
                self.error = Some(error.to_string());
                return None;
            }
        };

        let mut page = ResultPage::from_response(response, ticket.intent.page);
        let outcome = PaginationController::check(&ticket, &page);
        if let ClampOutcome::Reissue { to, .. } | ClampOutcome::ClampOnly { to, .. } = outcome {
            page.page = to;
        }
        self.error = None;
        self.result = Some(Arc::new(page));

        match outcome {
            ClampOutcome::InBounds => None,
            ClampOutcome::Reissue { from, to } => {
                tracing::debug!(from, to, "page out of range, re-issuing");
                self.store.set_page(to);
                self.flush_with(true)
            }
            ClampOutcome::ClampOnly { from, to } => {
                tracing::debug!(from, to, "page out of range after correction, clamping only");
                self.store.set_page(to);
                self.write_location();
                self.last_issued = Some(self.store.intent().normalized());
                None
            }
        }
    }

    pub fn loading(&self) -> bool {
        self.sequencer.is_loading()
    }

    pub fn latest_issued(&self) -> u64 {
        self.sequencer.latest_issued()
    }

    pub fn snapshot(&self) -> SearchSnapshot {
        SearchSnapshot {
            intent: self.store.intent().clone(),
            result: self.result.clone(),
            loading: self.sequencer.is_loading(),
            error: self.error.clone(),
            categories: self.categories.clone(),
        }
    }

    /// Drop pending work at teardown. Responses still on the wire are stale.
    pub fn shutdown(&mut self) {
        self.debouncer.cancel();
        self.sequencer.abandon_all();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::EngineError;
    use crate::location::MemoryLocation;
    use crate::material::test_support::material;
    use crate::utils::clock::ManualClock;

    struct Harness {
        engine: SearchEngine,
        location: Arc<MemoryLocation>,
        clock: Arc<ManualClock>,
    }

    fn harness(initial: &str) -> Harness {
        let location = Arc::new(MemoryLocation::with_query(
            "/search",
            UrlQuery::from_raw(initial),
        ));
        let clock = Arc::new(ManualClock::new());
        let engine = SearchEngine::new(SearchConfig::default(), location.clone(), clock.clone());
        Harness {
            engine,
            location,
            clock,
        }
    }

    fn response(ids: &[i64], total: u64, pages: u32) -> ListingResponse {
        ListingResponse {
            materials: ids.iter().map(|id| material(*id, None)).collect(),
            total,
            pages,
            ..ListingResponse::default()
        }
    }

    fn ids(snapshot: &SearchSnapshot) -> Vec<i64> {
        snapshot.materials().iter().map(|m| m.id).collect()
    }

    #[test]
    fn initial_flush_decodes_location_and_fetches_once() {
        let mut h = harness("q=steel&category=Metals&page=2&utm_source=mail");
        let ticket = h.engine.flush().expect("initial request");

        assert_eq!(ticket.intent.committed_query, "steel");
        assert_eq!(ticket.intent.category.as_deref(), Some("Metals"));
        assert_eq!(ticket.intent.page, 2);
        assert_eq!(h.location.read().as_str(), "q=steel&category=Metals&page=2");
        assert!(h.engine.snapshot().loading);
        assert!(h.engine.flush().is_none());
    }

    #[test]
    fn typing_debounces_into_one_request() {
        let mut h = harness("");
        let first = h.engine.flush().expect("initial");
        h.engine.complete(first.sequence, Ok(response(&[1], 1, 1)));

        for raw in ["c", "co", "con", "concrete"] {
            h.engine.set_query(raw.to_string());
            h.clock.advance(Duration::from_millis(100));
            assert!(!h.engine.poll_debounce());
            assert!(h.engine.flush().is_none());
        }
        assert_eq!(h.engine.intent().raw_query, "concrete");
        assert_eq!(h.engine.intent().committed_query, "");

        h.clock.advance(Duration::from_millis(200));
        assert!(h.engine.poll_debounce());
        let ticket = h.engine.flush().expect("debounced request");
        assert_eq!(ticket.intent.committed_query, "concrete");
        assert!(h.engine.flush().is_none());
        assert_eq!(h.location.read().as_str(), "q=concrete");
    }

    #[test]
    fn quick_follow_up_edit_requests_only_the_final_query() {
        let mut h = harness("");
        let first = h.engine.flush().expect("initial");
        h.engine.complete(first.sequence, Ok(response(&[], 0, 1)));

        h.engine.set_query("concrete".to_string());
        h.clock.advance(Duration::from_millis(100));
        h.engine.poll_debounce();
        h.engine.set_query("concrete block".to_string());
        assert!(h.engine.flush().is_none());

        h.clock.advance(Duration::from_millis(300));
        assert!(h.engine.poll_debounce());
        let ticket = h.engine.flush().expect("one request");
        assert!(ticket
            .request(12)
            .query_string()
            .ends_with("&q=concrete+block"));
        assert!(h.engine.flush().is_none());
    }

    #[test]
    fn stale_success_is_discarded() {
        let mut h = harness("");
        h.engine.set_query("steel".to_string());
        h.engine.submit();
        let steel = h.engine.flush().expect("steel");
        h.engine.set_query("steel beam".to_string());
        h.engine.submit();
        let beam = h.engine.flush().expect("steel beam");

        h.engine.complete(beam.sequence, Ok(response(&[2], 1, 1)));
        h.engine.complete(steel.sequence, Ok(response(&[1], 1, 1)));

        let snapshot = h.engine.snapshot();
        assert_eq!(ids(&snapshot), vec![2]);
        assert!(!snapshot.loading);
        assert!(snapshot.error.is_none());
    }

    #[test]
    fn stale_failure_is_never_surfaced() {
        let mut h = harness("");
        let first = h.engine.flush().expect("first");
        h.engine.set_category(Some("Lumber".to_string()));
        let second = h.engine.flush().expect("second");

        h.engine.complete(second.sequence, Ok(response(&[7], 1, 1)));
        h.engine
            .complete(first.sequence, Err(EngineError::status(500)));

        let snapshot = h.engine.snapshot();
        assert!(snapshot.error.is_none());
        assert_eq!(ids(&snapshot), vec![7]);
    }

    #[test]
    fn latest_failure_keeps_last_good_page() {
        let mut h = harness("");
        let first = h.engine.flush().expect("first");
        h.engine.complete(first.sequence, Ok(response(&[1, 2], 2, 1)));

        h.engine.set_sort_by(SortBy::Price);
        let second = h.engine.flush().expect("second");
        h.engine
            .complete(second.sequence, Err(EngineError::status(503)));

        let snapshot = h.engine.snapshot();
        assert_eq!(snapshot.error.as_deref(), Some("HTTP error! status: 503"));
        assert_eq!(ids(&snapshot), vec![1, 2]);
        assert!(!snapshot.loading);
    }

    #[test]
    fn retry_reissues_and_clears_error_on_success() {
        let mut h = harness("");
        let first = h.engine.flush().expect("first");
        h.engine
            .complete(first.sequence, Err(EngineError::Transport("refused".to_string())));
        assert!(h.engine.flush().is_none());

        h.engine.retry();
        let again = h.engine.flush().expect("retry");
        assert_eq!(again.intent, first.intent);
        h.engine.complete(again.sequence, Ok(response(&[3], 1, 1)));
        assert!(h.engine.snapshot().error.is_none());
    }

    #[test]
    fn filter_change_resets_page() {
        let mut h = harness("page=3");
        let first = h.engine.flush().expect("first");
        h.engine.complete(first.sequence, Ok(response(&[1], 40, 4)));

        h.engine.set_category(Some("Lumber".to_string()));
        let ticket = h.engine.flush().expect("filtered");
        assert_eq!(ticket.intent.page, 1);
        assert_eq!(
            ticket.request(12).query_string(),
            "page=1&per_page=12&sort_by=name&sort_order=asc&category=Lumber"
        );
        assert_eq!(h.location.read().as_str(), "category=Lumber");
    }

    #[test]
    fn same_value_set_is_a_no_op() {
        let mut h = harness("category=Lumber&page=2");
        let first = h.engine.flush().expect("first");
        h.engine.complete(first.sequence, Ok(response(&[1], 30, 3)));
        let writes = h.location.writes().len();

        assert!(!h.engine.set_category(Some("Lumber".to_string())));
        assert!(h.engine.flush().is_none());
        assert_eq!(h.engine.intent().page, 2);
        assert_eq!(h.location.writes().len(), writes);
    }

    #[test]
    fn out_of_range_page_issues_one_corrective_request() {
        let mut h = harness("page=7");
        let first = h.engine.flush().expect("first");

        let corrective = h
            .engine
            .complete(first.sequence, Ok(response(&[], 20, 2)))
            .expect("corrective");
        assert!(corrective.corrective);
        assert_eq!(corrective.intent.page, 2);
        assert_eq!(h.location.read().as_str(), "page=2");
        let shown = h.engine.snapshot().result.expect("out-of-range page installed");
        assert_eq!(shown.page, 2);

        // The data shrank again while the corrective request was in flight.
        assert!(h
            .engine
            .complete(corrective.sequence, Ok(response(&[], 10, 1)))
            .is_none());
        assert_eq!(h.engine.intent().page, 1);
        let shown = h.engine.snapshot().result.expect("clamped page installed");
        assert_eq!(shown.page, 1);
        assert_eq!(shown.total_pages, 1);
        assert!(h.engine.flush().is_none());
        assert_eq!(h.location.href(), "/search");
    }

    #[test]
    fn clear_all_returns_to_bare_path_with_one_request() {
        let mut h = harness("q=steel&category=Metals&sort_order=desc&page=2");
        let first = h.engine.flush().expect("first");
        h.engine.complete(first.sequence, Ok(response(&[1], 30, 3)));
        h.engine.set_query("steel be".to_string());

        assert!(h.engine.clear_all());
        let ticket = h.engine.flush().expect("cleared");
        assert_eq!(ticket.intent, SearchIntent::default());
        assert!(h.engine.flush().is_none());
        assert_eq!(h.location.href(), "/search");
        assert_eq!(h.engine.snapshot().committed_query(), "");

        h.clock.advance(Duration::from_secs(1));
        assert!(!h.engine.poll_debounce());
    }

    #[test]
    fn clear_all_supersedes_in_flight_request() {
        let mut h = harness("");
        let first = h.engine.flush().expect("first");
        h.engine.clear_all();
        let cleared = h.engine.flush().expect("clear-all request");

        h.engine.complete(first.sequence, Ok(response(&[9], 1, 1)));
        assert!(h.engine.snapshot().materials().is_empty());
        assert!(h.engine.snapshot().loading);

        h.engine.complete(cleared.sequence, Ok(response(&[4], 1, 1)));
        assert_eq!(ids(&h.engine.snapshot()), vec![4]);
    }

    #[test]
    fn engine_writes_replace_and_external_intent_pushes() {
        let mut h = harness("");
        let first = h.engine.flush().expect("first");
        h.engine.complete(first.sequence, Ok(response(&[1], 1, 1)));

        h.engine.set_availability(Some(Availability::InStock));
        h.engine.flush();
        assert_eq!(h.location.history_len(), 1);

        let saved = IntentPatch::from_query_str("q=rebar&sort_by=price&page=2");
        assert!(h.engine.apply_external_intent(&saved, HistoryMode::Push));
        let ticket = h.engine.flush().expect("external");
        assert_eq!(ticket.intent.committed_query, "rebar");
        assert_eq!(ticket.intent.page, 2);
        assert!(ticket.intent.availability.is_none());
        assert_eq!(h.location.history_len(), 2);
        assert_eq!(
            h.location.writes().last(),
            Some(&(UrlQuery::from_raw("q=rebar&sort_by=price&page=2"), HistoryMode::Push))
        );

        h.engine.set_page(3);
        h.engine.flush();
        assert_eq!(h.location.history_len(), 2);
    }

    #[test]
    fn partial_external_intent_keeps_pending_query() {
        let mut h = harness("");
        let first = h.engine.flush().expect("first");
        h.engine.complete(first.sequence, Ok(response(&[], 0, 1)));

        h.engine.set_query("steel".to_string());
        h.clock.advance(Duration::from_millis(100));
        let lumber = IntentPatch::new().category(Some("Lumber"));
        assert!(h.engine.apply_external_intent(&lumber, HistoryMode::Push));
        let filtered = h.engine.flush().expect("category request");
        assert_eq!(filtered.intent.committed_query, "");

        h.clock.advance(Duration::from_secs(5));
        assert!(h.engine.poll_debounce());
        let ticket = h.engine.flush().expect("debounced request");
        assert_eq!(ticket.intent.committed_query, "steel");
        assert_eq!(ticket.intent.category.as_deref(), Some("Lumber"));
        assert_eq!(h.engine.intent().raw_query, "steel");
    }

    #[test]
    fn external_query_replaces_pending_query() {
        let mut h = harness("");
        h.engine.flush().expect("first");

        h.engine.set_query("ste".to_string());
        let rebar = IntentPatch::new().query("rebar");
        assert!(h.engine.apply_external_intent(&rebar, HistoryMode::Push));
        h.engine.flush().expect("external request");

        h.clock.advance(Duration::from_secs(5));
        assert!(!h.engine.poll_debounce());
        assert_eq!(h.engine.intent().committed_query, "rebar");
    }

    #[test]
    fn submit_forces_first_page_request() {
        let mut h = harness("q=steel&page=3");
        let first = h.engine.flush().expect("first");
        h.engine.complete(first.sequence, Ok(response(&[1], 40, 4)));

        h.engine.submit();
        let ticket = h.engine.flush().expect("submitted");
        assert_eq!(ticket.intent.committed_query, "steel");
        assert_eq!(ticket.intent.page, 1);
    }

    #[test]
    fn snapshot_exposes_totals_suppliers_and_categories() {
        let mut h = harness("");
        h.engine
            .set_categories(vec!["Lumber".to_string(), "Concrete".to_string()]);
        let first = h.engine.flush().expect("first");
        let mut listing = response(&[], 25, 3);
        listing.materials = vec![
            material(1, Some((4, "Acme"))),
            material(2, None),
            material(3, Some((4, "Acme"))),
            material(4, Some((8, "Beam Co"))),
        ];
        h.engine.complete(first.sequence, Ok(listing));

        let snapshot = h.engine.snapshot();
        assert_eq!(snapshot.total_materials(), 25);
        assert_eq!(snapshot.total_pages(), 3);
        assert_eq!(snapshot.categories.len(), 2);
        let names: Vec<_> = snapshot.suppliers().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Acme".to_string(), "Beam Co".to_string()]);
    }

    #[test]
    fn empty_snapshot_defaults() {
        let h = harness("");
        let snapshot = h.engine.snapshot();
        assert!(snapshot.materials().is_empty());
        assert_eq!(snapshot.total_pages(), 1);
        assert_eq!(snapshot.total_materials(), 0);
        assert!(snapshot.current_query().is_empty());
    }

    #[test]
    fn shutdown_cancels_pending_work() {
        let mut h = harness("");
        let first = h.engine.flush().expect("first");
        h.engine.set_query("late".to_string());
        h.engine.shutdown();

        h.clock.advance(Duration::from_secs(1));
        assert!(!h.engine.poll_debounce());
        h.engine.complete(first.sequence, Ok(response(&[1], 1, 1)));
        assert!(h.engine.snapshot().materials().is_empty());
    }
}
