use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::core::quote::{Quote, QuoteProvider};

// Buff rejects requests without a browser-ish user agent.
const USER_AGENT: &str = "Mozilla/5.0";

/// Fetches current sell orders for a goods id from Buff163. Prices are
/// CNY; the quote description is the canonical catalog name so the
/// merge can join against market.csgo results.
pub struct BuffProvider {
    base_url: String,
}

impl BuffProvider {
    pub fn new(base_url: &str) -> Self {
        BuffProvider {
            base_url: base_url.to_string(),
        }
    }

    fn listing_link(&self, goods_id: &str) -> String {
        format!("{}/goods/{}?from=market#tab=selling", self.base_url, goods_id)
    }
}

#[derive(Debug, Deserialize)]
struct SellOrderResponse {
    data: Option<SellOrderData>,
}

#[derive(Debug, Deserialize)]
struct SellOrderData {
    items: Option<Vec<SellOrderItem>>,
}

#[derive(Debug, Deserialize)]
struct SellOrderItem {
    price: PriceField,
}

// Buff encodes listing prices as decimal strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PriceField {
    Text(String),
    Number(f64),
}

impl PriceField {
    fn to_f64(&self) -> Result<f64> {
        match self {
            PriceField::Number(n) => Ok(*n),
            PriceField::Text(s) => s
                .parse::<f64>()
                .map_err(|e| anyhow!("Invalid price '{}': {}", s, e)),
        }
    }
}

#[async_trait]
impl QuoteProvider for BuffProvider {
    #[instrument(name = "BuffQuoteFetch", skip_all, fields(goods_id = %external_id))]
    async fn fetch_quotes(&self, name: &str, external_id: &str) -> Result<Vec<Quote>> {
        let url = format!(
            "{}/api/market/goods/sell_order?game=csgo&goods_id={}&page_num=1",
            self.base_url, external_id
        );
        debug!("Requesting sell orders from {}", url);

        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        let response = client.get(&url).send().await.map_err(|e| {
            anyhow!("Request error: {} for goods id: {} URL: {}", e, external_id, url)
        })?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for goods id: {}",
                response.status(),
                external_id
            ));
        }

        let data = response.json::<SellOrderResponse>().await.map_err(|e| {
            anyhow!("Failed to parse Buff response for goods id {}: {}", external_id, e)
        })?;

        // A well-formed response with no data section simply has no
        // listings for this item.
        let items = data
            .data
            .and_then(|d| d.items)
            .unwrap_or_default();

        let quotes = items
            .iter()
            .map(|item| {
                Ok(Quote {
                    description: name.to_string(),
                    price: item.price.to_f64()?,
                    link: Some(self.listing_link(external_id)),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("Fetched {} Buff listings for goods id {}", quotes.len(), external_id);
        Ok(quotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(goods_id: &str, mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/market/goods/sell_order"))
            .and(query_param("goods_id", goods_id))
            .and(query_param("game", "csgo"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }

    #[tokio::test]
    async fn test_successful_sell_order_fetch() {
        let mock_response = r#"{
            "code": "OK",
            "data": {
                "items": [
                    {"price": "105.5"},
                    {"price": "106.0"}
                ]
            }
        }"#;
        let mock_server = create_mock_server("33912", mock_response).await;

        let provider = BuffProvider::new(&mock_server.uri());
        let quotes = provider
            .fetch_quotes("AK-47 | Redline (Field-Tested)", "33912")
            .await
            .unwrap();

        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].description, "AK-47 | Redline (Field-Tested)");
        assert_eq!(quotes[0].price, 105.5);
        assert_eq!(quotes[1].price, 106.0);
        let link = quotes[0].link.as_deref().unwrap();
        assert!(link.contains("/goods/33912"));
    }

    #[tokio::test]
    async fn test_numeric_prices_are_accepted() {
        let mock_response = r#"{"data": {"items": [{"price": 99.9}]}}"#;
        let mock_server = create_mock_server("33912", mock_response).await;

        let provider = BuffProvider::new(&mock_server.uri());
        let quotes = provider.fetch_quotes("AK-47 | Redline", "33912").await.unwrap();
        assert_eq!(quotes[0].price, 99.9);
    }

    #[tokio::test]
    async fn test_missing_data_section_is_empty_not_error() {
        let mock_response = r#"{"code": "Login Required"}"#;
        let mock_server = create_mock_server("33912", mock_response).await;

        let provider = BuffProvider::new(&mock_server.uri());
        let quotes = provider.fetch_quotes("AK-47 | Redline", "33912").await.unwrap();
        assert!(quotes.is_empty());
    }

    #[tokio::test]
    async fn test_http_error_is_an_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/market/goods/sell_order"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let provider = BuffProvider::new(&mock_server.uri());
        let result = provider.fetch_quotes("AK-47 | Redline", "33912").await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("HTTP error: 500"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_an_error() {
        let mock_server = create_mock_server("33912", "not json").await;

        let provider = BuffProvider::new(&mock_server.uri());
        let result = provider.fetch_quotes("AK-47 | Redline", "33912").await;
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse Buff response")
        );
    }
}
