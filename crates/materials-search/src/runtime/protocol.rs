use tokio::sync::oneshot;

use crate::error::EngineResult;
use crate::intent::{Availability, IntentPatch, SortBy, SortOrder};
use crate::location::HistoryMode;
use crate::material::ListingResponse;

/// Everything the runtime actor reacts to: facade commands and the results
/// of work it spawned itself.
#[derive(Debug)]
pub enum SearchEvent {
    SetQuery(String),
    Submit,
    Retry,
    SetCategory(Option<String>),
    SetPriceMin(Option<f64>),
    SetPriceMax(Option<f64>),
    SetPriceRange {
        min: Option<f64>,
        max: Option<f64>,
    },
    SetSupplier(Option<String>),
    SetAvailability(Option<Availability>),
    SetSortBy(SortBy),
    SetSortOrder(SortOrder),
    ToggleSortOrder,
    SetPage(u32),
    ClearAll,
    ApplyExternalIntent {
        patch: IntentPatch,
        mode: HistoryMode,
    },
    Sync {
        reply: oneshot::Sender<()>,
    },
    FetchSettled {
        sequence: u64,
        result: EngineResult<ListingResponse>,
    },
    CategoriesLoaded(EngineResult<Vec<String>>),
}
