pub(crate) mod actor;
pub mod handle;
pub(crate) mod protocol;

pub use handle::{spawn_search_session, SearchHandle, SearchSession};
