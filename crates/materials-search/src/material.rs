use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A catalog item as returned by the listing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub specifications: Option<serde_json::Value>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub supplier_id: Option<i64>,
    #[serde(default)]
    pub supplier_name: Option<String>,
    #[serde(default)]
    pub availability: Option<String>,
    #[serde(default)]
    pub lead_time_days: Option<i64>,
    #[serde(default)]
    pub minimum_order: Option<f64>,
    #[serde(default)]
    pub certifications: Option<Vec<String>>,
    #[serde(default)]
    pub sustainability_rating: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Body of a successful listing response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingResponse {
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "default_pages")]
    pub pages: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_next: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_prev: Option<bool>,
}

fn default_pages() -> u32 {
    1
}

impl Default for ListingResponse {
    fn default() -> Self {
        Self {
            materials: Vec::new(),
            total: 0,
            pages: default_pages(),
            current_page: None,
            per_page: None,
            has_next: None,
            has_prev: None,
        }
    }
}

/// An accepted page of results. Only the fetch path builds these.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultPage {
    pub items: Vec<Material>,
    pub total_count: u64,
    pub total_pages: u32,
    pub page: u32,
}

impl ResultPage {
    pub(crate) fn from_response(response: ListingResponse, requested_page: u32) -> Self {
        Self {
            items: response.materials,
            total_count: response.total,
            // An empty result set still has one (empty) page.
            total_pages: response.pages.max(1),
            page: requested_page.max(1),
        }
    }

    /// Distinct suppliers among the items, in first-seen order.
    pub fn suppliers(&self) -> Vec<SupplierOption> {
        let mut seen = HashSet::new();
        self.items
            .iter()
            .filter_map(|material| {
                let name = material.supplier_name.as_ref().filter(|name| !name.is_empty())?;
                let id = material
                    .supplier_id
                    .map(|id| id.to_string())
                    .unwrap_or_default();
                seen.insert((id.clone(), name.clone())).then(|| SupplierOption {
                    id,
                    name: name.clone(),
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplierOption {
    pub id: String,
    pub name: String,
}
