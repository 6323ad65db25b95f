//! OpenAI-compatible chat completions session.
//!
//! Works with: OpenAI, llama.cpp server, KoboldCpp, Ollama, vLLM, text-generation-webui
//! and any endpoint exposing `/v1/chat/completions`.
//!
//! The configured formatter rewrites the context before it is sent, so the same
//! endpoint can be driven with Alpaca, Llama3 or plain chat payloads.

use async_trait::async_trait;
use llmpu_core::error::SessionError;
use llmpu_core::turn::roles;
use llmpu_core::{Formatter, Session, SessionReply, Turn};
use llmpu_formatters::OaiChatFormatter;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Default completions path appended to the host.
pub const DEFAULT_PATH: &str = "/v1/chat/completions";

/// Default `max_tokens` for a request.
pub const DEFAULT_TOKEN_LIMIT: u32 = 1024;

/// A session against an OpenAI-compatible chat completions endpoint.
pub struct OpenAiCompatSession {
    name: String,
    endpoint: String,
    api_key: Option<String>,
    token_limit: u32,
    extra_props: serde_json::Map<String, serde_json::Value>,
    formatter: Box<dyn Formatter>,
    client: reqwest::Client,
    last_response: Mutex<Option<serde_json::Value>>,
}

impl OpenAiCompatSession {
    /// Create a session for `host` + `path` with a 120s request timeout.
    pub fn new(host: &str, path: &str) -> Result<Self, SessionError> {
        Self::with_timeout(host, path, std::time::Duration::from_secs(120))
    }

    /// Create a session with a custom request timeout.
    pub fn with_timeout(
        host: &str,
        path: &str,
        timeout: std::time::Duration,
    ) -> Result<Self, SessionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SessionError::NotConfigured(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            name: "openai_compatible".into(),
            endpoint: join_endpoint(host, path),
            api_key: None,
            token_limit: DEFAULT_TOKEN_LIMIT,
            extra_props: serde_json::Map::new(),
            formatter: Box::new(OaiChatFormatter),
            client,
            last_response: Mutex::new(None),
        })
    }

    /// Create a session for a local server on the default path.
    pub fn local(port: u16) -> Result<Self, SessionError> {
        Self::new(&format!("http://localhost:{port}"), DEFAULT_PATH)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_formatter(mut self, formatter: Box<dyn Formatter>) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn with_token_limit(mut self, token_limit: u32) -> Self {
        self.token_limit = token_limit;
        self
    }

    /// Extra body fields sent with every request (temperature, model, ...).
    pub fn with_extra_props(mut self, props: serde_json::Map<String, serde_json::Value>) -> Self {
        self.extra_props = props;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn formatter(&self) -> &dyn Formatter {
        self.formatter.as_ref()
    }

    pub fn set_formatter(&mut self, formatter: Box<dyn Formatter>) {
        self.formatter = formatter;
    }

    pub fn token_limit(&self) -> u32 {
        self.token_limit
    }

    pub fn set_token_limit(&mut self, token_limit: u32) {
        self.token_limit = token_limit;
    }

    /// Raw JSON of the last successful response.
    pub async fn last_response(&self) -> Option<serde_json::Value> {
        self.last_response.lock().await.clone()
    }

    /// Assemble the request body: extra props overlaid with the formatted
    /// messages and token limit.
    fn build_body(&self, context: &[Turn], token_limit: Option<u32>) -> serde_json::Value {
        let mut body = serde_json::Value::Object(self.extra_props.clone());

        body["messages"] = serde_json::json!(self.formatter.apply(context));
        body["max_tokens"] = serde_json::json!(token_limit.unwrap_or(self.token_limit));

        let stop = self.formatter.stop_words();
        if !stop.is_empty() && !self.extra_props.contains_key("stop") {
            body["stop"] = serde_json::json!(stop);
        }

        body
    }
}

/// Pull `choices[0].message` out of a chat completions response.
fn extract_reply(response: &serde_json::Value) -> Result<SessionReply, SessionError> {
    let message = response
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .ok_or_else(|| SessionError::InvalidResponse(response.to_string()))?;

    Ok(SessionReply {
        role: message
            .get("role")
            .and_then(|r| r.as_str())
            .unwrap_or(roles::ASSISTANT)
            .to_string(),
        content: message
            .get("content")
            .and_then(|c| c.as_str())
            .unwrap_or_default()
            .to_string(),
    })
}

fn join_endpoint(host: &str, path: &str) -> String {
    format!(
        "{}/{}",
        host.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[async_trait]
impl Session for OpenAiCompatSession {
    fn name(&self) -> &str {
        &self.name
    }

    async fn respond(
        &self,
        context: &[Turn],
        token_limit: Option<u32>,
    ) -> std::result::Result<SessionReply, SessionError> {
        let body = self.build_body(context, token_limit);

        debug!(
            session = %self.name,
            endpoint = %self.endpoint,
            format = self.formatter.name(),
            turns = context.len(),
            "Sending completion request"
        );

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {api_key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| SessionError::Network(e.to_string()))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| SessionError::Network(e.to_string()))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), body = %raw, "Provider returned error");
            return Err(SessionError::Api {
                status_code: status.as_u16(),
                body: raw,
            });
        }

        let value: serde_json::Value =
            serde_json::from_str(&raw).map_err(|_| SessionError::InvalidResponse(raw.clone()))?;
        let reply = extract_reply(&value)?;

        *self.last_response.lock().await = Some(value);
        Ok(reply)
    }
}
