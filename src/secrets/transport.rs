// Outbound HTTP for credential tests

use crate::utils::Result;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::time::Duration;

/// Raw HTTP answer: status plus body text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends an authenticated JSON POST
///
/// Implementations report non-2xx answers as a normal response; only
/// connection-level failures and timeouts are errors.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn post_json(&self, url: &str, bearer: &str, body: &Value) -> Result<TransportResponse>;
}

/// reqwest-backed transport
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(format!("keydeck/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ChatTransport for ReqwestTransport {
    async fn post_json(&self, url: &str, bearer: &str, body: &Value) -> Result<TransportResponse> {
        log::debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .bearer_auth(bearer)
            .json(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        log::debug!("POST {} -> {}", url, status);
        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn test_sends_bearer_token_and_json_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(json!({ "model": "m", "max_tokens": 5 })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();
        let url = format!("{}/v1/chat/completions", server.url());
        let response = transport
            .post_json(&url, "sk-test", &json!({ "model": "m", "max_tokens": 5 }))
            .await
            .unwrap();

        assert!(response.is_success());
        assert_eq!(response.body, r#"{"choices":[]}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_is_a_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();
        let url = format!("{}/chat/completions", server.url());
        let response = transport.post_json(&url, "k", &json!({})).await.unwrap();

        assert_eq!(response.status, 500);
        assert_eq!(response.body, "boom");
        assert!(!response.is_success());
    }
}
