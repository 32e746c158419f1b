//! HTTP transport layer for pricing provider requests

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tcg_core::{Config, Error, Result};
use tcg_models::ApiResponse;
use tracing::{debug, error, instrument, warn};
use url::Url;

/// HTTP transport layer for making requests to the provider API.
///
/// Every call is attempted exactly once; retries happen on the scheduler's next cycle.
pub struct Transport {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    set_timeout: Duration,
}

impl Transport {
    /// Create a new transport instance
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent("tcg-client/0.1.0")
            .build()
            .map_err(|e| Error::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            set_timeout: Duration::from_secs(config.set_timeout_secs),
        })
    }

    /// Create a mock transport for testing
    #[cfg(test)]
    pub fn new_mock() -> Self {
        Self {
            client: Client::new(),
            base_url: "https://mock.justtcg.com/v1".to_string(),
            api_key: Some("test_key".to_string()),
            timeout: Duration::from_secs(30),
            set_timeout: Duration::from_secs(60),
        }
    }

    /// Make a GET request against `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Endpoint path relative to the base URL, e.g. `cards`
    /// * `params` - Query parameters
    /// * `timeout` - Per-request timeout
    #[instrument(skip(self, params))]
    pub async fn get<T>(
        &self,
        path: &str,
        params: &[(&str, String)],
        timeout: Duration,
    ) -> Result<ApiResponse<T>>
    where
        T: DeserializeOwned,
    {
        let url = self.build_url(path, params)?;
        debug!("GET {}", url);
        self.execute(self.client.get(url).timeout(timeout)).await
    }

    /// Make a POST request with a JSON body against `path`
    #[instrument(skip(self, params, body))]
    pub async fn post<B, T>(
        &self,
        path: &str,
        params: &[(&str, String)],
        body: &B,
        timeout: Duration,
    ) -> Result<ApiResponse<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.build_url(path, params)?;
        debug!("POST {}", url);
        self.execute(self.client.post(url).json(body).timeout(timeout)).await
    }

    /// Build the full URL for an API request
    fn build_url(&self, path: &str, params: &[(&str, String)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/{}", self.base_url, path.trim_start_matches('/')))
            .map_err(|e| Error::Config(format!("Invalid base URL: {}", e)))?;

        if !params.is_empty() {
            let mut query_pairs = url.query_pairs_mut();
            for (key, value) in params {
                query_pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }

    async fn execute<T>(&self, request: RequestBuilder) -> Result<ApiResponse<T>>
    where
        T: DeserializeOwned,
    {
        let request = match &self.api_key {
            Some(key) => request.header("X-API-Key", key),
            None => request,
        };

        let response = request
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| Error::Transport(format!("Request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Transport(format!("Failed to read response body: {}", e)))?;

        debug!("Response status {} body length: {} bytes", status, text.len());

        if !status.is_success() {
            return Err(status_error(status, &text));
        }

        let parsed: ApiResponse<T> = serde_json::from_str(&text).map_err(|e| {
            error!("Failed to parse JSON response: {}", e);
            Error::Malformed(format!("{}. Response: {}", e, snippet(&text, 200)))
        })?;

        Self::check_api_error(&parsed)?;
        Ok(parsed)
    }

    /// Surface a provider error payload that arrived with a success status
    fn check_api_error<T>(response: &ApiResponse<T>) -> Result<()> {
        if let Some(message) = response.error_message() {
            warn!("Provider reported error: {}", message);
            return Err(Error::Provider {
                code: response.code.clone(),
                message: message.to_string(),
            });
        }
        Ok(())
    }

    /// Get the base URL being used
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Timeout for single and batched price lookups
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Timeout for set listing pages, which are larger
    pub fn set_timeout(&self) -> Duration {
        self.set_timeout
    }
}

fn status_error(status: StatusCode, text: &str) -> Error {
    // error bodies are usually the standard envelope; fall back to raw text
    let body = serde_json::from_str::<ApiResponse<serde_json::Value>>(text)
        .ok()
        .and_then(|r| r.error_message().map(str::to_string))
        .unwrap_or_else(|| snippet(text, 200).to_string());

    error!("Request failed with status: {}", status);
    Error::Status { status: status.as_u16(), body }
}

fn snippet(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url() {
        let transport = Transport::new_mock();
        let params = vec![("set", "base-set-pokemon".to_string()), ("limit", "100".to_string())];

        let url = transport.build_url("cards", &params).unwrap();

        assert_eq!(
            url.as_str(),
            "https://mock.justtcg.com/v1/cards?set=base-set-pokemon&limit=100"
        );
    }

    #[test]
    fn test_check_api_error_payload() {
        let response: ApiResponse<Vec<serde_json::Value>> =
            serde_json::from_str(r#"{"error": "Invalid set", "code": "BAD_SET"}"#).unwrap();

        match Transport::check_api_error(&response) {
            Err(Error::Provider { code, message }) => {
                assert_eq!(code.as_deref(), Some("BAD_SET"));
                assert_eq!(message, "Invalid set");
            }
            other => panic!("Expected Provider error, got {:?}", other),
        }
    }

    #[test]
    fn test_check_api_error_success() {
        let response: ApiResponse<Vec<serde_json::Value>> =
            serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(Transport::check_api_error(&response).is_ok());
    }

    #[test]
    fn test_status_error_prefers_envelope_message() {
        let err = status_error(StatusCode::BAD_REQUEST, r#"{"error": "too many items"}"#);
        assert!(matches!(err, Error::Status { status: 400, ref body } if body == "too many items"));

        let err = status_error(StatusCode::BAD_GATEWAY, "<html>upstream</html>");
        assert!(matches!(err, Error::Status { status: 502, ref body } if body == "<html>upstream</html>"));
    }

    #[test]
    fn test_snippet_respects_char_boundaries() {
        assert_eq!(snippet("héllo", 2), "hé");
        assert_eq!(snippet("abc", 10), "abc");
    }
}
