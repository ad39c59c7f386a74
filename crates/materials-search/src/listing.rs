//! Client side of the listing and categories endpoints.

use async_trait::async_trait;
use serde::Deserialize;

use crate::codec::join_pairs;
use crate::config::SearchConfig;
use crate::error::{EngineError, EngineResult};
use crate::intent::{Availability, SearchIntent, SortBy, SortOrder};
use crate::material::ListingResponse;

/// One outbound listing request, built from a committed intent.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRequest {
    pub page: u32,
    pub per_page: u32,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub query: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub supplier_id: Option<String>,
    pub availability: Option<Availability>,
}

impl ListingRequest {
    pub fn from_intent(intent: &SearchIntent, per_page: u32) -> Self {
        let intent = intent.normalized();
        Self {
            page: intent.page,
            per_page,
            sort_by: intent.sort_by,
            sort_order: intent.sort_order,
            query: Some(intent.committed_query).filter(|query| !query.is_empty()),
            category: intent.category,
            min_price: intent.price_min,
            max_price: intent.price_max,
            supplier_id: intent.supplier_id,
            availability: intent.availability,
        }
    }

    /// Wire parameters: the four always-present ones first, then the optional filters.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("per_page", self.per_page.to_string()),
            ("sort_by", self.sort_by.as_str().to_string()),
            ("sort_order", self.sort_order.as_str().to_string()),
        ];
        if let Some(query) = &self.query {
            pairs.push(("q", query.clone()));
        }
        if let Some(category) = &self.category {
            pairs.push(("category", category.clone()));
        }
        if let Some(min_price) = self.min_price {
            pairs.push(("min_price", min_price.to_string()));
        }
        if let Some(max_price) = self.max_price {
            pairs.push(("max_price", max_price.to_string()));
        }
        if let Some(supplier_id) = &self.supplier_id {
            pairs.push(("supplier_id", supplier_id.clone()));
        }
        if let Some(availability) = self.availability {
            pairs.push(("availability", availability.as_str().to_string()));
        }
        pairs
    }

    pub fn query_string(&self) -> String {
        let pairs = self.query_pairs();
        join_pairs(pairs.iter().map(|(key, value)| (*key, value.as_str())))
    }
}

#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn search(&self, request: &ListingRequest) -> EngineResult<ListingResponse>;
    async fn categories(&self) -> EngineResult<Vec<String>>;
}

#[derive(Debug, Deserialize)]
struct CategoriesResponse {
    #[serde(default)]
    categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// [`ListingSource`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpListingSource {
    client: reqwest::Client,
    search_url: String,
    categories_url: String,
}

impl HttpListingSource {
    pub fn new(config: &SearchConfig) -> EngineResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| EngineError::Config(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            search_url: config.search_url(),
            categories_url: config.categories_url(),
        })
    }

    async fn error_for(response: reqwest::Response) -> EngineError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(payload) if !payload.error.is_empty() => EngineError::Status {
                status,
                message: payload.error,
            },
            _ => EngineError::status(status),
        }
    }
}

#[async_trait]
impl ListingSource for HttpListingSource {
    async fn search(&self, request: &ListingRequest) -> EngineResult<ListingResponse> {
        let response = self
            .client
            .get(&self.search_url)
            .query(&request.query_pairs())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        response
            .json::<ListingResponse>()
            .await
            .map_err(|e| EngineError::Decode(e.to_string()))
    }

    async fn categories(&self) -> EngineResult<Vec<String>> {
        let response = self.client.get(&self.categories_url).send().await?;
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        let payload = response
            .json::<CategoriesResponse>()
            .await
            .map_err(|e| EngineError::Decode(e.to_string()))?;
        Ok(payload.categories)
    }
}
