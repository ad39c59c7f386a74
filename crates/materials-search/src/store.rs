//! Filter state store: the single owner of the [`SearchIntent`].
//!
//! Every setter returns whether the committed part of the intent changed,
//! which is what the engine uses to schedule a URL write and a fetch. A real
//! filter change always brings the page back to 1.

use crate::intent::{Availability, IntentPatch, SearchIntent, SortBy, SortOrder};
use crate::pagination::PaginationController;

#[derive(Debug, Clone, Default)]
pub struct FilterStore {
    intent: SearchIntent,
}

impl FilterStore {
    pub fn new(intent: SearchIntent) -> Self {
        Self { intent }
    }

    pub fn intent(&self) -> &SearchIntent {
        &self.intent
    }

    /// Keystroke-level query. Never affects the committed intent by itself.
    pub fn set_raw_query(&mut self, query: impl Into<String>) {
        self.intent.raw_query = query.into();
    }

    /// Install a debounced query.
    pub fn commit_query(&mut self, query: String) -> bool {
        self.update_filters(|intent| intent.committed_query = query)
    }

    pub fn set_category(&mut self, category: Option<String>) -> bool {
        self.apply(&IntentPatch::new().category(category))
    }

    pub fn set_price_min(&mut self, price_min: Option<f64>) -> bool {
        self.apply(&IntentPatch::new().price_min(price_min))
    }

    pub fn set_price_max(&mut self, price_max: Option<f64>) -> bool {
        self.apply(&IntentPatch::new().price_max(price_max))
    }

    pub fn set_price_range(&mut self, price_min: Option<f64>, price_max: Option<f64>) -> bool {
        self.apply(&IntentPatch::new().price_min(price_min).price_max(price_max))
    }

    pub fn set_supplier(&mut self, supplier_id: Option<String>) -> bool {
        self.apply(&IntentPatch::new().supplier_id(supplier_id))
    }

    pub fn set_availability(&mut self, availability: Option<Availability>) -> bool {
        self.apply(&IntentPatch::new().availability(availability))
    }

    pub fn set_sort_by(&mut self, sort_by: SortBy) -> bool {
        self.apply(&IntentPatch::new().sort_by(sort_by))
    }

    pub fn set_sort_order(&mut self, sort_order: SortOrder) -> bool {
        self.apply(&IntentPatch::new().sort_order(sort_order))
    }

    pub fn toggle_sort_order(&mut self) -> bool {
        let next = self.intent.sort_order.toggled();
        self.set_sort_order(next)
    }

    pub fn set_page(&mut self, page: u32) -> bool {
        PaginationController::request_page(&mut self.intent, page)
    }

    /// Reset every field, raw query included, in one step.
    pub fn clear_all(&mut self) -> bool {
        let changed = self.intent.normalized() != SearchIntent::default();
        self.intent = SearchIntent::default();
        changed
    }

    /// Overwrite several fields at once. Filter changes reset the page unless
    /// the patch names a page itself.
    pub fn apply(&mut self, patch: &IntentPatch) -> bool {
        let before = self.intent.clone();
        self.intent.apply(patch);
        let filters_changed = !self.intent.same_filters(&before);
        if filters_changed && patch.page.is_none() && patch.touches_filters() {
            PaginationController::reset_for_filter_change(&mut self.intent);
        }
        self.intent.normalized() != before.normalized()
    }

    fn update_filters(&mut self, mutate: impl FnOnce(&mut SearchIntent)) -> bool {
        let before = self.intent.clone();
        mutate(&mut self.intent);
        if self.intent.same_filters(&before) {
            return false;
        }
        PaginationController::reset_for_filter_change(&mut self.intent);
        true
    }
}
