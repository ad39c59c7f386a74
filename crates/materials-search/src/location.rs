//! Location port: the engine's only view of the address bar.

use parking_lot::Mutex;

use crate::codec::UrlQuery;

/// How a write lands in the navigation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryMode {
    /// Overwrite the current entry. Every engine-initiated write uses this.
    #[default]
    Replace,
    /// Add a new back-navigable entry.
    Push,
}

pub trait LocationPort: Send + Sync {
    fn read(&self) -> UrlQuery;
    fn write(&self, query: &UrlQuery, mode: HistoryMode);
}

/// In-memory address bar with a history stack, for hosts without a browser.
#[derive(Debug)]
pub struct MemoryLocation {
    path: String,
    state: Mutex<HistoryState>,
}

#[derive(Debug)]
struct HistoryState {
    entries: Vec<UrlQuery>,
    writes: Vec<(UrlQuery, HistoryMode)>,
}

impl MemoryLocation {
    pub fn new(path: impl Into<String>) -> Self {
        Self::with_query(path, UrlQuery::empty())
    }

    pub fn with_query(path: impl Into<String>, query: UrlQuery) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(HistoryState {
                entries: vec![query],
                writes: Vec::new(),
            }),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Current address, e.g. `/search?q=steel`.
    pub fn href(&self) -> String {
        self.read().href(&self.path)
    }

    /// Number of history entries (the initial one included).
    pub fn history_len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn history(&self) -> Vec<UrlQuery> {
        self.state.lock().entries.clone()
    }

    /// Every write received, oldest first.
    pub fn writes(&self) -> Vec<(UrlQuery, HistoryMode)> {
        self.state.lock().writes.clone()
    }
}

impl LocationPort for MemoryLocation {
    fn read(&self) -> UrlQuery {
        self.state.lock().entries.last().cloned().unwrap_or_default()
    }

    fn write(&self, query: &UrlQuery, mode: HistoryMode) {
        let mut state = self.state.lock();
        state.writes.push((query.clone(), mode));
        match mode {
            HistoryMode::Push => state.entries.push(query.clone()),
            HistoryMode::Replace => match state.entries.last_mut() {
                Some(current) => *current = query.clone(),
                None => state.entries.push(query.clone()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_keeps_history_length() {
        let location = MemoryLocation::new("/search");
        location.write(&UrlQuery::from_raw("q=a"), HistoryMode::Replace);
        location.write(&UrlQuery::from_raw("q=ab"), HistoryMode::Replace);
        assert_eq!(location.history_len(), 1);
        assert_eq!(location.href(), "/search?q=ab");
    }

    #[test]
    fn push_adds_entry() {
        let location = MemoryLocation::with_query("/search", UrlQuery::from_raw("?q=old"));
        location.write(&UrlQuery::from_raw("q=new"), HistoryMode::Push);
        assert_eq!(location.history_len(), 2);
        assert_eq!(location.read().as_str(), "q=new");
        assert_eq!(location.history()[0].as_str(), "q=old");
    }

    #[test]
    fn empty_query_is_bare_path() {
        let location = MemoryLocation::with_query("/search", UrlQuery::from_raw("q=x"));
        location.write(&UrlQuery::empty(), HistoryMode::Replace);
        assert_eq!(location.href(), "/search");
        assert_eq!(location.writes().len(), 1);
    }
}
