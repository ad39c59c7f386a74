pub mod codec;
pub mod config;
pub mod debounce;
pub mod engine;
pub mod error;
pub mod intent;
pub mod listing;
pub mod location;
pub mod material;
pub mod pagination;
pub mod runtime;
pub mod sequencer;
pub mod store;
pub mod utils;

pub use crate::codec::UrlQuery;
pub use crate::config::SearchConfig;
pub use crate::engine::{SearchEngine, SearchSnapshot};
pub use crate::error::{EngineError, EngineResult};
pub use crate::intent::{Availability, IntentPatch, SearchIntent, SortBy, SortOrder};
pub use crate::listing::{HttpListingSource, ListingRequest, ListingSource};
pub use crate::location::{HistoryMode, LocationPort, MemoryLocation};
pub use crate::material::{ListingResponse, Material, ResultPage, SupplierOption};
pub use crate::runtime::{spawn_search_session, SearchHandle, SearchSession};
