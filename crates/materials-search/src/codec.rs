//! Address-bar codec for [`SearchIntent`].
//!
//! Only non-default committed fields are written, always in the order of
//! [`QUERY_KEYS`], so equal intents produce byte-equal query strings.
//! Decoding is forgiving: a field that does not parse is simply absent.

use std::collections::HashSet;
use std::fmt;

use crate::intent::{IntentPatch, SearchIntent};

/// Recognized keys, in encoding order. Anything else is ignored on decode.
pub const QUERY_KEYS: [&str; 9] = [
    "q",
    "category",
    "min_price",
    "max_price",
    "supplier_id",
    "availability",
    "sort_by",
    "sort_order",
    "page",
];

/// Normalized query string without the leading `?`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct UrlQuery(String);

impl UrlQuery {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrap text read from an address bar. A leading `?` is dropped.
    pub fn from_raw(raw: &str) -> Self {
        Self(raw.strip_prefix('?').unwrap_or(raw).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `path` alone when there is nothing to encode, `path?query` otherwise.
    pub fn href(&self, path: &str) -> String {
        if self.0.is_empty() {
            path.to_string()
        } else {
            format!("{path}?{}", self.0)
        }
    }
}

impl fmt::Display for UrlQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn encode(intent: &SearchIntent) -> UrlQuery {
    let mut pairs: Vec<(&str, String)> = Vec::new();
    if !intent.committed_query.is_empty() {
        pairs.push(("q", intent.committed_query.clone()));
    }
    if let Some(category) = intent.category.as_ref().filter(|value| !value.is_empty()) {
        pairs.push(("category", category.clone()));
    }
    if let Some(price_min) = intent.price_min.filter(|value| value.is_finite()) {
        pairs.push(("min_price", price_min.to_string()));
    }
    if let Some(price_max) = intent.price_max.filter(|value| value.is_finite()) {
        pairs.push(("max_price", price_max.to_string()));
    }
    if let Some(supplier_id) = intent.supplier_id.as_ref().filter(|value| !value.is_empty()) {
        pairs.push(("supplier_id", supplier_id.clone()));
    }
    if let Some(availability) = intent.availability {
        pairs.push(("availability", availability.as_str().to_string()));
    }
    if intent.sort_by != Default::default() {
        pairs.push(("sort_by", intent.sort_by.as_str().to_string()));
    }
    if intent.sort_order != Default::default() {
        pairs.push(("sort_order", intent.sort_order.as_str().to_string()));
    }
    if intent.page > 1 {
        pairs.push(("page", intent.page.to_string()));
    }
    UrlQuery(join_pairs(pairs.iter().map(|(key, value)| (*key, value.as_str()))))
}

/// Decode the fields present in `query`; absent or unparsable fields stay `None`.
pub fn decode(query: &str) -> IntentPatch {
    let mut patch = IntentPatch::new();
    let mut seen = HashSet::new();

    for (key, value) in split_pairs(query) {
        let Some(key) = key else { continue };
        if !QUERY_KEYS.contains(&key.as_str()) || !seen.insert(key.clone()) {
            continue;
        }
        let Some(value) = value.filter(|value| !value.is_empty()) else {
            continue;
        };
        match key.as_str() {
            "q" => patch.query = Some(value),
            "category" => patch.category = Some(Some(value)),
            "min_price" => patch.price_min = parse_price(&value).map(Some),
            "max_price" => patch.price_max = parse_price(&value).map(Some),
            "supplier_id" => patch.supplier_id = Some(Some(value)),
            "availability" => patch.availability = value.parse().ok().map(Some),
            "sort_by" => patch.sort_by = value.parse().ok(),
            "sort_order" => patch.sort_order = value.parse().ok(),
            "page" => patch.page = parse_page(&value),
            _ => {}
        }
    }
    patch
}

/// Decode a saved or externally supplied query as a full replacement: every
/// field missing from `query` resets to its default.
pub fn decode_replacement(query: &str) -> IntentPatch {
    decode(query).with_defaults()
}

/// Build `key=value&...` with form-style escaping (spaces become `+`).
pub(crate) fn join_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    pairs
        .into_iter()
        .map(|(key, value)| format!("{}={}", encode_component(key), encode_component(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn encode_component(value: &str) -> String {
    urlencoding::encode(value).replace("%20", "+")
}

fn decode_component(value: &str) -> Option<String> {
    urlencoding::decode(&value.replace('+', " "))
        .ok()
        .map(|decoded| decoded.into_owned())
}

/// Split into decoded pairs. A component that fails to decode comes back as `None`.
fn split_pairs(query: &str) -> impl Iterator<Item = (Option<String>, Option<String>)> + '_ {
    query
        .strip_prefix('?')
        .unwrap_or(query)
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(key), decode_component(value))
        })
}

fn parse_price(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|price| price.is_finite())
}

fn parse_page(value: &str) -> Option<u32> {
    let page = value.trim().parse::<i64>().ok()?;
    Some(page.clamp(1, u32::MAX as i64) as u32)
}
