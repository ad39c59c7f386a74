//! The search intent: everything the user has asked for, plus the partial
//! form used by the URL codec and by external collaborators.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Sort field understood by the listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortBy {
    #[default]
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "price")]
    Price,
    #[serde(rename = "lead_time_days")]
    LeadTimeDays,
    #[serde(rename = "availability")]
    Availability,
}

impl SortBy {
    pub const ALL: [SortBy; 4] = [
        SortBy::Name,
        SortBy::Price,
        SortBy::LeadTimeDays,
        SortBy::Availability,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Name => "name",
            SortBy::Price => "price",
            SortBy::LeadTimeDays => "lead_time_days",
            SortBy::Availability => "availability",
        }
    }

    /// Human label for sort pickers.
    pub fn label(&self) -> &'static str {
        match self {
            SortBy::Name => "Name",
            SortBy::Price => "Price",
            SortBy::LeadTimeDays => "Lead Time",
            SortBy::Availability => "Availability",
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortBy {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        SortBy::ALL
            .into_iter()
            .find(|sort| sort.as_str() == value)
            .ok_or_else(|| EngineError::InvalidInput(format!("unknown sort field: {value}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(EngineError::InvalidInput(format!(
                "unknown sort order: {other}"
            ))),
        }
    }
}

/// Stock status filter. The wire text is also what appears in the address bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Availability {
    #[serde(rename = "In Stock")]
    InStock,
    #[serde(rename = "Limited Stock")]
    LimitedStock,
    #[serde(rename = "Out of Stock")]
    OutOfStock,
}

impl Availability {
    pub const ALL: [Availability; 3] = [
        Availability::InStock,
        Availability::LimitedStock,
        Availability::OutOfStock,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::InStock => "In Stock",
            Availability::LimitedStock => "Limited Stock",
            Availability::OutOfStock => "Out of Stock",
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Availability {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Availability::ALL
            .into_iter()
            .find(|availability| availability.as_str() == value)
            .ok_or_else(|| EngineError::InvalidInput(format!("unknown availability: {value}")))
    }
}

/// Full search intent.
///
/// `raw_query` follows every keystroke; `committed_query` only moves once the
/// debounce window has elapsed, and is the only query the URL and the network
/// ever see.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchIntent {
    pub raw_query: String,
    pub committed_query: String,
    pub category: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub supplier_id: Option<String>,
    pub availability: Option<Availability>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub page: u32,
}

impl Default for SearchIntent {
    fn default() -> Self {
        Self {
            raw_query: String::new(),
            committed_query: String::new(),
            category: None,
            price_min: None,
            price_max: None,
            supplier_id: None,
            availability: None,
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
            page: 1,
        }
    }
}

impl SearchIntent {
    pub fn from_patch(patch: &IntentPatch) -> Self {
        let mut intent = Self::default();
        intent.apply(patch);
        intent
    }

    /// Canonical form: what survives a trip through the address bar.
    pub fn normalized(&self) -> Self {
        Self {
            raw_query: self.committed_query.clone(),
            committed_query: self.committed_query.clone(),
            category: non_empty(&self.category),
            price_min: self.price_min.filter(|value| value.is_finite()),
            price_max: self.price_max.filter(|value| value.is_finite()),
            supplier_id: non_empty(&self.supplier_id),
            availability: self.availability,
            sort_by: self.sort_by,
            sort_order: self.sort_order,
            page: self.page.max(1),
        }
    }

    /// Overwrite the fields present in `patch`. Returns whether anything changed.
    ///
    /// A query in the patch sets both the raw and the committed query: an
    /// externally supplied query is already settled.
    pub fn apply(&mut self, patch: &IntentPatch) -> bool {
        let before = self.clone();
        if let Some(query) = &patch.query {
            self.raw_query = query.clone();
            self.committed_query = query.clone();
        }
        if let Some(category) = &patch.category {
            self.category = non_empty(category);
        }
        if let Some(price_min) = patch.price_min {
            self.price_min = price_min.filter(|value| value.is_finite());
        }
        if let Some(price_max) = patch.price_max {
            self.price_max = price_max.filter(|value| value.is_finite());
        }
        if let Some(supplier_id) = &patch.supplier_id {
            self.supplier_id = non_empty(supplier_id);
        }
        if let Some(availability) = patch.availability {
            self.availability = availability;
        }
        if let Some(sort_by) = patch.sort_by {
            self.sort_by = sort_by;
        }
        if let Some(sort_order) = patch.sort_order {
            self.sort_order = sort_order;
        }
        if let Some(page) = patch.page {
            self.page = page.max(1);
        }
        *self != before
    }

    /// Everything except the raw query and the page: the part whose change
    /// sends pagination back to the first page.
    pub(crate) fn same_filters(&self, other: &SearchIntent) -> bool {
        self.committed_query == other.committed_query
            && self.category == other.category
            && self.price_min == other.price_min
            && self.price_max == other.price_max
            && self.supplier_id == other.supplier_id
            && self.availability == other.availability
            && self.sort_by == other.sort_by
            && self.sort_order == other.sort_order
    }
}

/// A partial intent. `None` leaves a field alone; for nullable fields
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntentPatch {
    pub query: Option<String>,
    pub category: Option<Option<String>>,
    pub price_min: Option<Option<f64>>,
    pub price_max: Option<Option<f64>>,
    pub supplier_id: Option<Option<String>>,
    pub availability: Option<Option<Availability>>,
    pub sort_by: Option<SortBy>,
    pub sort_order: Option<SortOrder>,
    pub page: Option<u32>,
}

impl IntentPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a saved address query as a full replacement intent.
    pub fn from_query_str(query: &str) -> Self {
        crate::codec::decode_replacement(query)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn category(mut self, category: Option<impl Into<String>>) -> Self {
        self.category = Some(category.map(Into::into));
        self
    }

    pub fn price_min(mut self, price_min: Option<f64>) -> Self {
        self.price_min = Some(price_min);
        self
    }

    pub fn price_max(mut self, price_max: Option<f64>) -> Self {
        self.price_max = Some(price_max);
        self
    }

    pub fn supplier_id(mut self, supplier_id: Option<impl Into<String>>) -> Self {
        self.supplier_id = Some(supplier_id.map(Into::into));
        self
    }

    pub fn availability(mut self, availability: Option<Availability>) -> Self {
        self.availability = Some(availability);
        self
    }

    pub fn sort_by(mut self, sort_by: SortBy) -> Self {
        self.sort_by = Some(sort_by);
        self
    }

    pub fn sort_order(mut self, sort_order: SortOrder) -> Self {
        self.sort_order = Some(sort_order);
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Turn every absent field into an explicit default, so that applying the
    /// patch replaces the whole intent instead of merging into it.
    pub fn with_defaults(self) -> Self {
        Self {
            query: Some(self.query.unwrap_or_default()),
            category: Some(self.category.flatten()),
            price_min: Some(self.price_min.flatten()),
            price_max: Some(self.price_max.flatten()),
            supplier_id: Some(self.supplier_id.flatten()),
            availability: Some(self.availability.flatten()),
            sort_by: Some(self.sort_by.unwrap_or_default()),
            sort_order: Some(self.sort_order.unwrap_or_default()),
            page: Some(self.page.unwrap_or(1)),
        }
    }

    pub(crate) fn touches_filters(&self) -> bool {
        self.query.is_some()
            || self.category.is_some()
            || self.price_min.is_some()
            || self.price_max.is_some()
            || self.supplier_id.is_some()
            || self.availability.is_some()
            || self.sort_by.is_some()
            || self.sort_order.is_some()
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|value| !value.is_empty()).cloned()
}
