use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::core::quote::{Quote, QuoteProvider};

/// market.csgo.com v2 API client. Quote prices come back as integer
/// kopecks and are converted to RUB here; every call carries the
/// session API key as a query parameter.
pub struct MarketCsgoProvider {
    base_url: String,
    api_key: String,
}

impl MarketCsgoProvider {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        MarketCsgoProvider {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn client(&self) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder().user_agent("skinarb/1.0").build()?)
    }

    /// Aggregated sales info for one item (min/max/average plus the
    /// recent trade history).
    pub async fn item_info(&self, hash_name: &str) -> Result<ItemInfo> {
        let url = format!("{}/api/v2/get-list-items-info", self.base_url);
        debug!("Requesting item info from {}", url);

        let response = self
            .client()?
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("list_hash_name[]", hash_name)])
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for item: {}", e, hash_name))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for item: {}",
                response.status(),
                hash_name
            ));
        }

        let data = response.json::<ItemInfoResponse>().await?;
        if !data.success {
            return Err(anyhow!("market.csgo reported failure for item: {}", hash_name));
        }

        Ok(data.data.get(hash_name).cloned().unwrap_or_default())
    }

    /// One page of the account's order log. Timestamps are UNIX
    /// seconds, rendered by the caller.
    pub async fn order_log(&self, page: u32) -> Result<Vec<OrderLogEntry>> {
        let url = format!("{}/api/v2/get-orders-log", self.base_url);
        debug!("Requesting order log page {} from {}", page, url);

        let response = self
            .client()?
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("page", &page.to_string())])
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for order log page {}", e, page))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for order log page {}",
                response.status(),
                page
            ));
        }

        let data = response.json::<OrderLogResponse>().await?;
        Ok(data.orders)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    success: bool,
    #[serde(default)]
    data: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    id: Option<ItemId>,
    price: i64,
}

// Listing ids show up both as numbers and strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ItemId {
    Number(u64),
    Text(String),
}

impl ItemId {
    fn as_string(&self) -> String {
        match self {
            ItemId::Number(n) => n.to_string(),
            ItemId::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ItemInfoResponse {
    success: bool,
    #[serde(default)]
    data: HashMap<String, ItemInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemInfo {
    #[serde(default)]
    pub min: f64,
    #[serde(default)]
    pub max: f64,
    #[serde(default)]
    pub average: f64,
    /// (UNIX timestamp, price) pairs, most recent first.
    #[serde(default)]
    pub history: Vec<(i64, f64)>,
}

#[derive(Debug, Deserialize)]
struct OrderLogResponse {
    #[serde(default)]
    orders: Vec<OrderLogEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderLogEntry {
    #[serde(default)]
    pub market_hash_name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub date: i64,
    #[serde(default)]
    pub event: String,
}

#[async_trait]
impl QuoteProvider for MarketCsgoProvider {
    #[instrument(name = "MarketQuoteFetch", skip_all, fields(hash_name = %name))]
    async fn fetch_quotes(&self, name: &str, _external_id: &str) -> Result<Vec<Quote>> {
        let url = format!("{}/api/v2/search-item-by-hash-name", self.base_url);
        debug!("Requesting listings from {}", url);

        let response = self
            .client()?
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("hash_name", name)])
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for item: {}", e, name))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for item: {}",
                response.status(),
                name
            ));
        }

        let data = response.json::<SearchResponse>().await.map_err(|e| {
            anyhow!("Failed to parse market.csgo response for {}: {}", name, e)
        })?;

        // An unsuccessful flag is indistinguishable from a transport
        // failure for the caller.
        if !data.success {
            return Err(anyhow!("market.csgo reported failure for item: {}", name));
        }

        let quotes = data
            .data
            .iter()
            .map(|item| Quote {
                description: name.to_string(),
                // Prices arrive in kopecks.
                price: item.price as f64 / 100.0,
                link: item
                    .id
                    .as_ref()
                    .map(|id| format!("{}/item/{}", self.base_url, id.as_string())),
            })
            .collect::<Vec<_>>();

        debug!("Fetched {} market.csgo listings for {}", quotes.len(), name);
        Ok(quotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_search_mock(hash_name: &str, mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v2/search-item-by-hash-name"))
            .and(query_param("hash_name", hash_name))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }

    #[tokio::test]
    async fn test_successful_search_converts_kopecks() {
        let mock_response = r#"{
            "success": true,
            "data": [
                {"id": 136256008, "price": 9500},
                {"id": "136256009", "price": 9600}
            ]
        }"#;
        let mock_server = create_search_mock("AK-47 | Redline", mock_response).await;

        let provider = MarketCsgoProvider::new(&mock_server.uri(), "test-key");
        let quotes = provider.fetch_quotes("AK-47 | Redline", "").await.unwrap();

        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].description, "AK-47 | Redline");
        assert_eq!(quotes[0].price, 95.0);
        assert_eq!(quotes[1].price, 96.0);
        assert!(quotes[0].link.as_deref().unwrap().ends_with("/item/136256008"));
        assert!(quotes[1].link.as_deref().unwrap().ends_with("/item/136256009"));
    }

    #[tokio::test]
    async fn test_unsuccessful_flag_is_an_error() {
        let mock_response = r#"{"success": false, "data": []}"#;
        let mock_server = create_search_mock("AK-47 | Redline", mock_response).await;

        let provider = MarketCsgoProvider::new(&mock_server.uri(), "test-key");
        let result = provider.fetch_quotes("AK-47 | Redline", "").await;
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("market.csgo reported failure")
        );
    }

    #[tokio::test]
    async fn test_http_error_is_an_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/search-item-by-hash-name"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&mock_server)
            .await;

        let provider = MarketCsgoProvider::new(&mock_server.uri(), "test-key");
        let result = provider.fetch_quotes("AK-47 | Redline", "").await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("HTTP error: 502"));
    }

    #[tokio::test]
    async fn test_item_info_picks_requested_item() {
        let mock_server = MockServer::start().await;
        let mock_response = r#"{
            "success": true,
            "data": {
                "AK-47 | Redline": {
                    "min": 90.0,
                    "max": 120.0,
                    "average": 101.5,
                    "history": [[1700000000, 99.0], [1700000100, 103.0]]
                }
            }
        }"#;
        Mock::given(method("GET"))
            .and(path("/api/v2/get-list-items-info"))
            .and(query_param("list_hash_name[]", "AK-47 | Redline"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        let provider = MarketCsgoProvider::new(&mock_server.uri(), "test-key");
        let info = provider.item_info("AK-47 | Redline").await.unwrap();
        assert_eq!(info.average, 101.5);
        assert_eq!(info.history.len(), 2);
        assert_eq!(info.history[0], (1700000000, 99.0));
    }

    #[tokio::test]
    async fn test_item_info_absent_item_yields_default() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/get-list-items-info"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"success": true, "data": {}}"#),
            )
            .mount(&mock_server)
            .await;

        let provider = MarketCsgoProvider::new(&mock_server.uri(), "test-key");
        let info = provider.item_info("Unknown Item").await.unwrap();
        assert_eq!(info.average, 0.0);
        assert!(info.history.is_empty());
    }

    #[tokio::test]
    async fn test_order_log_fetch() {
        let mock_server = MockServer::start().await;
        let mock_response = r#"{
            "success": true,
            "orders": [
                {"market_hash_name": "AK-47 | Redline", "price": 95.5, "date": 1700000000, "event": "buy"}
            ]
        }"#;
        Mock::given(method("GET"))
            .and(path("/api/v2/get-orders-log"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        let provider = MarketCsgoProvider::new(&mock_server.uri(), "test-key");
        let orders = provider.order_log(2).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].market_hash_name, "AK-47 | Redline");
        assert_eq!(orders[0].price, 95.5);
        assert_eq!(orders[0].date, 1700000000);
    }
}
