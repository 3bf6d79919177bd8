//! Minimal Anthropic Messages API client with the server-side web search tool.

use std::fmt;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{DiscoveryError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const API_VERSION: &str = "2023-06-01";
pub const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";

// ============================================================================
// Wire types
// ============================================================================

#[derive(Clone, Debug, Serialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Server tool definition, e.g. `{"type": "web_search_20250305", "name": "web_search"}`.
#[derive(Clone, Debug, Serialize)]
pub struct ToolSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
}

impl ToolSpec {
    pub fn web_search() -> Self {
        Self {
            kind: "web_search_20250305".to_string(),
            name: "web_search".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct MessageRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSpec>,
}

/// Response content. Only text blocks matter; tool use and search results
/// are carried through as `Other`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub id: String,
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Usage,
}

impl MessageResponse {
    /// Text blocks in response order.
    pub fn text_blocks(&self) -> impl Iterator<Item = &str> {
        self.content.iter().filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            ContentBlock::Other => None,
        })
    }
}

// ============================================================================
// Client
// ============================================================================

#[derive(Clone)]
pub struct AnthropicClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Create from `ANTHROPIC_API_KEY`. Callers load `.env` first.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(API_KEY_VAR)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| DiscoveryError::Config(format!("{API_KEY_VAR} not set")))?;
        Ok(Self::new(api_key))
    }

    /// Point at a proxy or a mock server.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST /v1/messages. No retries.
    pub async fn create_message(&self, request: &MessageRequest) -> Result<MessageResponse> {
        let start = std::time::Instant::now();

        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Messages request failed");
                DiscoveryError::Http(e)
            })?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!(status = %status, error = %body, "Messages API error");
            return Err(DiscoveryError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let parsed: MessageResponse =
            serde_json::from_str(&body).map_err(|source| DiscoveryError::Decode {
                context: "messages response",
                source,
            })?;

        debug!(
            model = %request.model,
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            duration_ms = start.elapsed().as_millis() as u64,
            "Messages call complete"
        );
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> MessageRequest {
        MessageRequest {
            model: "claude-sonnet-4-5-20250929".to_string(),
            max_tokens: 1024,
            messages: vec![Message::user("find venues")],
            tools: vec![ToolSpec::web_search()],
        }
    }

    #[test]
    fn test_request_serialization() {
        let value = serde_json::to_value(request()).unwrap();
        assert_eq!(value["tools"][0]["type"], "web_search_20250305");
        assert_eq!(value["tools"][0]["name"], "web_search");
        assert_eq!(value["messages"][0]["role"], "user");

        let mut bare = request();
        bare.tools.clear();
        let value = serde_json::to_value(bare).unwrap();
        assert!(value.get("tools").is_none());
    }

    #[test]
    fn test_unknown_blocks_are_skipped() {
        let body = serde_json::json!({
            "id": "msg_1",
            "content": [
                {"type": "server_tool_use", "id": "t1", "name": "web_search", "input": {"query": "x"}},
                {"type": "web_search_tool_result", "tool_use_id": "t1", "content": []},
                {"type": "text", "text": "[]"}
            ],
            "stop_reason": "end_turn"
        });
        let response: MessageResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.content.len(), 3);
        assert_eq!(response.text_blocks().collect::<Vec<_>>(), vec!["[]"]);
    }

    #[test]
    fn test_debug_masks_key() {
        let client = AnthropicClient::new("sk-secret");
        let shown = format!("{:?}", client);
        assert!(!shown.contains("sk-secret"));
        assert!(shown.contains("***"));
    }

    #[tokio::test]
    async fn test_create_message_sends_headers_and_tool() {
        let server = MockServer::start().await;
        let client = AnthropicClient::new("test-key").with_base_url(server.uri());

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", API_VERSION))
            .and(body_partial_json(serde_json::json!({
                "tools": [{"type": "web_search_20250305", "name": "web_search"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "msg_1",
                "content": [{"type": "text", "text": "hello"}],
                "usage": {"input_tokens": 10, "output_tokens": 2}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client.create_message(&request()).await.unwrap();
        assert_eq!(response.text_blocks().next(), Some("hello"));
        assert_eq!(response.usage.output_tokens, 2);
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        let client = AnthropicClient::new("test-key").with_base_url(server.uri());

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Rate limit exceeded"))
            .expect(1)
            .mount(&server)
            .await;

        match client.create_message(&request()).await {
            Err(DiscoveryError::Status { code, body }) => {
                assert_eq!(code, 429);
                assert_eq!(body, "Rate limit exceeded");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_garbage_body_is_decode_error() {
        let server = MockServer::start().await;
        let client = AnthropicClient::new("test-key").with_base_url(server.uri());

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client.create_message(&request()).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::Decode { .. }));
    }
}
