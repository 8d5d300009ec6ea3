use anyhow::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::errors::FetchError;
use crate::core::quote::{QuoteFetcher, QuoteRecord};

const USER_AGENT: &str = "ppfin/1.0";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches quotes from the Yahoo Finance chart endpoint. The chart `meta`
/// object becomes the quote record.
pub struct YahooQuoteFetcher {
    base_url: String,
    client: reqwest::Client,
}

impl YahooQuoteFetcher {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(YahooQuoteFetcher {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Option<Vec<ChartItem>>,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    meta: Map<String, Value>,
}

#[async_trait]
impl QuoteFetcher for YahooQuoteFetcher {
    #[instrument(name = "YahooQuoteFetch", skip(self), fields(symbol = %symbol))]
    async fn fetch(&self, symbol: &str) -> Result<QuoteRecord, FetchError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        debug!("Requesting quote from {}", url);

        let transport = |e: reqwest::Error| FetchError::Transport {
            symbol: symbol.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(&url).send().await.map_err(transport)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(symbol.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                symbol: symbol.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response.text().await.map_err(transport)?;
        let data: YahooChartResponse =
            serde_json::from_str(&text).map_err(|e| FetchError::Malformed {
                symbol: symbol.to_string(),
                message: e.to_string(),
            })?;

        let item = data
            .chart
            .result
            .and_then(|items| items.into_iter().next())
            .ok_or_else(|| FetchError::NoData(symbol.to_string()))?;

        Ok(QuoteRecord::new(item.meta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(symbol: &str, response: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;
        let request_path = format!("/v8/finance/chart/{symbol}");

        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(response)
            .mount(&mock_server)
            .await;

        mock_server
    }

    #[tokio::test]
    async fn test_successful_quote_fetch() {
        let mock_response = r#"{
            "chart": {
                "result": [{
                    "meta": {
                        "regularMarketPrice": 150.65,
                        "currency": "USD",
                        "shortName": "Apple Inc."
                    }
                }]
            }
        }"#;
        let mock_server = create_mock_server(
            "AAPL",
            ResponseTemplate::new(200).set_body_string(mock_response),
        )
        .await;

        let fetcher = YahooQuoteFetcher::new(&mock_server.uri()).unwrap();
        let record = fetcher.fetch("AAPL").await.unwrap();

        assert_eq!(record.price("AAPL", "regularMarketPrice"), Ok(150.65));
        assert_eq!(record.short_name().as_deref(), Some("Apple Inc."));
        assert_eq!(record.get("currency"), Some(&Value::from("USD")));
    }

    #[tokio::test]
    async fn test_fx_symbol_fetch() {
        let mock_response =
            r#"{"chart": {"result": [{"meta": {"regularMarketPrice": 1.2345}}]}}"#;
        let mock_server = create_mock_server(
            "USDEUR=X",
            ResponseTemplate::new(200).set_body_string(mock_response),
        )
        .await;

        let fetcher = YahooQuoteFetcher::new(&mock_server.uri()).unwrap();
        let record = fetcher.fetch("USDEUR=X").await.unwrap();
        assert_eq!(record.price("USDEUR=X", "regularMarketPrice"), Ok(1.2345));
    }

    #[tokio::test]
    async fn test_empty_result_is_no_data() {
        for body in [
            r#"{"chart": {"result": []}}"#,
            r#"{"chart": {"result": null, "error": {"code": "Not Found"}}}"#,
        ] {
            let mock_server =
                create_mock_server("INVALID", ResponseTemplate::new(200).set_body_string(body))
                    .await;
            let fetcher = YahooQuoteFetcher::new(&mock_server.uri()).unwrap();

            let result = fetcher.fetch("INVALID").await;
            assert_eq!(result, Err(FetchError::NoData("INVALID".to_string())));
        }
    }

    #[tokio::test]
    async fn test_not_found_status() {
        let mock_server = create_mock_server("NOPE", ResponseTemplate::new(404)).await;
        let fetcher = YahooQuoteFetcher::new(&mock_server.uri()).unwrap();

        let error = fetcher.fetch("NOPE").await.unwrap_err();
        assert_eq!(error, FetchError::NotFound("NOPE".to_string()));
        assert!(!error.is_transient());
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let mock_server = create_mock_server("USDEUR=X", ResponseTemplate::new(500)).await;
        let fetcher = YahooQuoteFetcher::new(&mock_server.uri()).unwrap();

        let error = fetcher.fetch("USDEUR=X").await.unwrap_err();
        assert_eq!(error.to_string(), "HTTP error: 500 for symbol: USDEUR=X");
        assert!(error.is_transient());
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let mock_server = create_mock_server(
            "AAPL",
            ResponseTemplate::new(200).set_body_string("<html>rate limited</html>"),
        )
        .await;
        let fetcher = YahooQuoteFetcher::new(&mock_server.uri()).unwrap();

        let error = fetcher.fetch("AAPL").await.unwrap_err();
        assert!(matches!(error, FetchError::Malformed { ref symbol, .. } if symbol == "AAPL"));
        assert!(!error.is_transient());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        // Nothing listens on the discard port.
        let fetcher = YahooQuoteFetcher::new("http://127.0.0.1:9").unwrap();

        let error = fetcher.fetch("AAPL").await.unwrap_err();
        assert!(matches!(error, FetchError::Transport { .. }));
        assert!(error.is_transient());
    }
}
