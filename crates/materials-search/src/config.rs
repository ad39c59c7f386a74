//! Engine configuration.
//!
//! Defaults match the materials catalog API; every numeric field can be
//! overridden from the environment, and a JSON file may supply any subset of
//! fields.

use std::env;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

const DEFAULT_BASE_URL: &str = "http://localhost:5000";
const DEFAULT_SEARCH_PATH: &str = "/api/v1/materials/search";
const DEFAULT_CATEGORIES_PATH: &str = "/api/v1/categories";
const DEFAULT_LOCATION_PATH: &str = "/search";
const DEFAULT_PER_PAGE: u32 = 12;
const DEFAULT_DEBOUNCE_MS: u64 = 300;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub base_url: String,
    pub search_path: String,
    pub categories_path: String,
    /// Fixed page size sent with every listing request.
    pub per_page: u32,
    pub debounce_ms: u64,
    pub request_timeout_secs: u64,
    /// Bare path of the address bar the engine keeps in sync.
    pub location_path: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            search_path: DEFAULT_SEARCH_PATH.to_string(),
            categories_path: DEFAULT_CATEGORIES_PATH.to_string(),
            per_page: DEFAULT_PER_PAGE,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            location_path: DEFAULT_LOCATION_PATH.to_string(),
        }
    }
}

impl SearchConfig {
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Read a JSON config file, then apply environment overrides.
    pub fn load(path: &Path) -> EngineResult<Self> {
        let data = std::fs::read_to_string(path).map_err(|error| {
            EngineError::Config(format!(
                "failed to read search config {}: {error}",
                path.display()
            ))
        })?;
        let config: SearchConfig = serde_json::from_str(&data).map_err(|error| {
            EngineError::Config(format!(
                "failed to parse search config {}: {error}",
                path.display()
            ))
        })?;
        Ok(config.with_env_overrides())
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Some(base_url) = env::var("MATERIALS_SEARCH_BASE_URL")
            .ok()
            .filter(|value| !value.is_empty())
        {
            self.base_url = base_url;
        }
        if let Some(per_page) = env_parse::<u32>("MATERIALS_SEARCH_PER_PAGE") {
            self.per_page = per_page;
        }
        if let Some(debounce_ms) = env_parse::<u64>("MATERIALS_SEARCH_DEBOUNCE_MS") {
            self.debounce_ms = debounce_ms;
        }
        if let Some(timeout) = env_parse::<u64>("MATERIALS_SEARCH_TIMEOUT_SECS") {
            self.request_timeout_secs = timeout;
        }
        self
    }

    /// Page size actually sent; the endpoint rejects anything outside `1..=100`.
    pub fn page_size(&self) -> u32 {
        self.per_page.clamp(1, MAX_PER_PAGE)
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn search_url(&self) -> String {
        join_url(&self.base_url, &self.search_path)
    }

    pub fn categories_url(&self) -> String {
        join_url(&self.base_url, &self.categories_path)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| value.trim().parse::<T>().ok())
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
