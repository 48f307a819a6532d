//! Protocol adapters for the generation backends.
//!
//! Three wire shapes exist: the local Ollama chat endpoint (NDJSON stream,
//! no credential), the Anthropic Messages API (dedicated `system` field,
//! versioned header, SSE `content_block_delta` events), and the
//! OpenAI-compatible chat completions shape used by every other provider
//! (bearer credential, SSE `data:` frames terminated by `[DONE]`).
//!
//! Adapters establish streams eagerly: the request is sent and the HTTP
//! status classified *before* a stream is handed to the caller, so retryable
//! failures reach the fallback state machine for streaming and unary calls
//! alike. Once a stream is live, a spawned reader forwards increments over a
//! bounded channel; a dropped receiver stops the reader on its next send.

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::debug;

use crate::domain::errors::{GatewayError, GatewayResult};
use crate::domain::models::message::{Message, Role};
use crate::domain::models::provider::ResolvedConfig;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MAX_TOKENS: u32 = 4096;
const STREAM_CHANNEL_CAPACITY: usize = 100;

/// One increment of a streamed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatStreamEvent {
    /// Incremental text in backend order.
    Delta(String),
    /// Normal end of stream.
    Done,
    /// Mid-stream failure; no further events follow.
    Error(String),
}

/// Result of a generation call: a complete answer or an ordered stream.
#[derive(Debug)]
pub enum ChatOutput {
    /// Unary response.
    Complete(String),
    /// Ordered stream of [`ChatStreamEvent`]s.
    Stream(mpsc::Receiver<ChatStreamEvent>),
}

/// Protocol family of a resolved backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Local Ollama chat endpoint.
    Local,
    /// Anthropic Messages API.
    Anthropic,
    /// OpenAI-compatible chat completions; the default for all other
    /// providers.
    OpenAiCompatible,
}

/// Select the protocol family for a resolved config.
///
/// Pure function of the provider name and the endpoint host, isolated from
/// the fallback state machine.
pub fn backend_kind(config: &ResolvedConfig) -> BackendKind {
    let base_url = config.base_url.to_lowercase();
    if config.provider == "ollama" || base_url.contains("ollama") {
        BackendKind::Local
    } else if config.provider == "anthropic" || base_url.contains("anthropic") {
        BackendKind::Anthropic
    } else {
        BackendKind::OpenAiCompatible
    }
}

/// Shared capability of all protocol adapters.
#[async_trait]
pub trait ChatAdapter: Send + Sync {
    /// Send a chat request, unary or streaming.
    async fn send_chat(
        &self,
        messages: &[Message],
        config: &ResolvedConfig,
        stream: bool,
    ) -> GatewayResult<ChatOutput>;
}

/// Classify a non-2xx response into the gateway taxonomy.
async fn classify_response(response: reqwest::Response) -> GatewayResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::from_status(status.as_u16(), body))
}

/// How a stream decoder reacts to one line of backend output.
enum LineAction {
    /// Emit this text increment.
    Delta(String),
    /// Terminate the stream normally.
    Stop,
    /// Nothing useful on this line.
    Skip,
}

/// Forward a live byte stream to the caller as ordered increments.
///
/// `notice`, when present, is emitted as the very first increment before any
/// backend content. Lines are decoded by `parse`; a send failure means the
/// receiver was dropped and reading stops immediately, releasing the
/// connection.
fn spawn_stream_reader<F>(
    response: reqwest::Response,
    notice: Option<String>,
    mut parse: F,
) -> mpsc::Receiver<ChatStreamEvent>
where
    F: FnMut(&str) -> LineAction + Send + 'static,
{
    let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);

    tokio::spawn(async move {
        if let Some(notice) = notice {
            if tx.send(ChatStreamEvent::Delta(notice)).await.is_err() {
                return;
            }
        }

        let mut bytes = response.bytes_stream();
        let mut buffer = Vec::<u8>::new();

        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    let _ = tx.send(ChatStreamEvent::Error(e.to_string())).await;
                    return;
                }
            };
            buffer.extend_from_slice(&chunk);

            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&line);
                match parse(line.trim()) {
                    LineAction::Delta(text) => {
                        if tx.send(ChatStreamEvent::Delta(text)).await.is_err() {
                            return;
                        }
                    }
                    LineAction::Stop => {
                        let _ = tx.send(ChatStreamEvent::Done).await;
                        return;
                    }
                    LineAction::Skip => {}
                }
            }
        }

        // Backend closed the stream without an explicit terminator. A final
        // line without a trailing newline is still a frame; decode it before
        // finishing.
        if !buffer.is_empty() {
            let line = String::from_utf8_lossy(&buffer);
            if let LineAction::Delta(text) = parse(line.trim()) {
                if tx.send(ChatStreamEvent::Delta(text)).await.is_err() {
                    return;
                }
            }
        }
        let _ = tx.send(ChatStreamEvent::Done).await;
    });

    rx
}

fn fallback_notice(config: &ResolvedConfig) -> Option<String> {
    config.is_fallback.then(|| config.fallback_notice())
}

fn prefix_notice(config: &ResolvedConfig, content: String) -> String {
    match fallback_notice(config) {
        Some(notice) => format!("{notice}{content}"),
        None => content,
    }
}

// ---------------------------------------------------------------------------
// OpenAI-compatible adapter
// ---------------------------------------------------------------------------

/// Adapter for OpenAI-compatible chat completion endpoints.
pub struct OpenAiCompatAdapter {
    client: reqwest::Client,
}

impl OpenAiCompatAdapter {
    /// Create an adapter using the given HTTP client.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn request(
        &self,
        messages: &[Message],
        config: &ResolvedConfig,
        stream: bool,
    ) -> GatewayResult<reqwest::Response> {
        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        debug!(provider = %config.provider, model = %config.model, stream, "POST {url}");

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&json!({
                "model": config.model,
                "messages": messages,
                "stream": stream,
            }));
        if !config.api_key.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", config.api_key));
        }

        let response = request.send().await?;
        classify_response(response).await
    }

    fn parse_stream_line(line: &str) -> LineAction {
        let Some(payload) = line.strip_prefix("data: ") else {
            return LineAction::Skip;
        };
        if payload.trim() == "[DONE]" {
            return LineAction::Stop;
        }
        let Ok(frame) = serde_json::from_str::<Value>(payload) else {
            return LineAction::Skip;
        };
        frame["choices"][0]["delta"]["content"]
            .as_str()
            .map_or(LineAction::Skip, |text| LineAction::Delta(text.to_string()))
    }
}

#[async_trait]
impl ChatAdapter for OpenAiCompatAdapter {
    async fn send_chat(
        &self,
        messages: &[Message],
        config: &ResolvedConfig,
        stream: bool,
    ) -> GatewayResult<ChatOutput> {
        let response = self.request(messages, config, stream).await?;

        if stream {
            let rx = spawn_stream_reader(response, fallback_notice(config), Self::parse_stream_line);
            return Ok(ChatOutput::Stream(rx));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                GatewayError::InvalidResponse("missing choices[0].message.content".to_string())
            })?
            .to_string();

        Ok(ChatOutput::Complete(prefix_notice(config, content)))
    }
}

// ---------------------------------------------------------------------------
// Anthropic-style adapter
// ---------------------------------------------------------------------------

/// Adapter for the Anthropic Messages API.
pub struct AnthropicAdapter {
    client: reqwest::Client,
}

impl AnthropicAdapter {
    /// Create an adapter using the given HTTP client.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Separate system content from chat turns.
    ///
    /// The Messages API takes the system prompt as a dedicated field; system
    /// messages are not valid turns. The last system message wins.
    fn split_system(messages: &[Message]) -> (Option<String>, Vec<&Message>) {
        let mut system = None;
        let mut turns = Vec::new();
        for message in messages {
            if message.role == Role::System {
                system = Some(message.content.clone());
            } else {
                turns.push(message);
            }
        }
        (system, turns)
    }

    async fn request(
        &self,
        messages: &[Message],
        config: &ResolvedConfig,
        stream: bool,
    ) -> GatewayResult<reqwest::Response> {
        let url = format!("{}/messages", config.base_url.trim_end_matches('/'));
        debug!(provider = %config.provider, model = %config.model, stream, "POST {url}");

        let (system, turns) = Self::split_system(messages);
        let mut body = json!({
            "model": config.model,
            "max_tokens": ANTHROPIC_MAX_TOKENS,
            "messages": turns,
            "stream": stream,
        });
        if let Some(system) = system {
            body["system"] = json!(system);
        }

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-api-key", &config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;
        classify_response(response).await
    }

    fn parse_stream_line(line: &str) -> LineAction {
        let Some(payload) = line.strip_prefix("data: ") else {
            return LineAction::Skip;
        };
        let Ok(frame) = serde_json::from_str::<Value>(payload) else {
            return LineAction::Skip;
        };
        match frame["type"].as_str() {
            Some("content_block_delta") => frame["delta"]["text"]
                .as_str()
                .map_or(LineAction::Skip, |text| LineAction::Delta(text.to_string())),
            Some("message_stop") => LineAction::Stop,
            _ => LineAction::Skip,
        }
    }
}

#[async_trait]
impl ChatAdapter for AnthropicAdapter {
    async fn send_chat(
        &self,
        messages: &[Message],
        config: &ResolvedConfig,
        stream: bool,
    ) -> GatewayResult<ChatOutput> {
        let response = self.request(messages, config, stream).await?;

        if stream {
            let rx = spawn_stream_reader(response, fallback_notice(config), Self::parse_stream_line);
            return Ok(ChatOutput::Stream(rx));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        let blocks = body["content"].as_array().ok_or_else(|| {
            GatewayError::InvalidResponse("missing content blocks".to_string())
        })?;
        let content: String = blocks
            .iter()
            .filter_map(|block| block["text"].as_str())
            .collect();

        Ok(ChatOutput::Complete(prefix_notice(config, content)))
    }
}

// ---------------------------------------------------------------------------
// Local adapter (Ollama)
// ---------------------------------------------------------------------------

/// Adapter for the local Ollama chat endpoint. No credential header; the
/// stream is newline-delimited JSON rather than SSE.
pub struct LocalAdapter {
    client: reqwest::Client,
}

impl LocalAdapter {
    /// Create an adapter using the given HTTP client.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn request(
        &self,
        messages: &[Message],
        config: &ResolvedConfig,
        stream: bool,
    ) -> GatewayResult<reqwest::Response> {
        let url = format!("{}/api/chat", config.base_url.trim_end_matches('/'));
        debug!(model = %config.model, stream, "POST {url}");

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "model": config.model,
                "messages": messages,
                "stream": stream,
            }))
            .send()
            .await?;
        classify_response(response).await
    }

    fn parse_stream_line(line: &str) -> LineAction {
        if line.is_empty() {
            return LineAction::Skip;
        }
        let Ok(frame) = serde_json::from_str::<Value>(line) else {
            return LineAction::Skip;
        };
        if frame["done"].as_bool() == Some(true) {
            return LineAction::Stop;
        }
        frame["message"]["content"]
            .as_str()
            .filter(|text| !text.is_empty())
            .map_or(LineAction::Skip, |text| LineAction::Delta(text.to_string()))
    }
}

#[async_trait]
impl ChatAdapter for LocalAdapter {
    async fn send_chat(
        &self,
        messages: &[Message],
        config: &ResolvedConfig,
        stream: bool,
    ) -> GatewayResult<ChatOutput> {
        let response = self.request(messages, config, stream).await?;

        if stream {
            let rx = spawn_stream_reader(response, fallback_notice(config), Self::parse_stream_line);
            return Ok(ChatOutput::Stream(rx));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        let content = body["message"]["content"]
            .as_str()
            .ok_or_else(|| GatewayError::InvalidResponse("missing message.content".to_string()))?
            .to_string();

        Ok(ChatOutput::Complete(prefix_notice(config, content)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str, base_url: &str) -> ResolvedConfig {
        ResolvedConfig {
            provider: provider.to_string(),
            base_url: base_url.to_string(),
            api_key: String::new(),
            model: "m".to_string(),
            is_fallback: false,
            original_provider: None,
            fallback_level: 0,
        }
    }

    #[test]
    fn test_backend_kind_by_provider_name() {
        assert_eq!(
            backend_kind(&config("ollama", "http://localhost:11434")),
            BackendKind::Local
        );
        assert_eq!(
            backend_kind(&config("anthropic", "https://api.anthropic.com/v1")),
            BackendKind::Anthropic
        );
        assert_eq!(
            backend_kind(&config("qwen", "https://dashscope.aliyuncs.com/compatible-mode/v1")),
            BackendKind::OpenAiCompatible
        );
    }

    #[test]
    fn test_backend_kind_by_endpoint_substring() {
        // Custom endpoints carry an informational provider label only.
        assert_eq!(
            backend_kind(&config("custom", "http://ollama.internal:11434")),
            BackendKind::Local
        );
        assert_eq!(
            backend_kind(&config("custom", "https://proxy.anthropic.example/v1")),
            BackendKind::Anthropic
        );
        assert_eq!(
            backend_kind(&config("custom", "https://llm.example/v1")),
            BackendKind::OpenAiCompatible
        );
    }

    #[test]
    fn test_openai_stream_line_parsing() {
        assert!(matches!(
            OpenAiCompatAdapter::parse_stream_line(
                r#"data: {"choices":[{"delta":{"content":"hi"}}]}"#
            ),
            LineAction::Delta(text) if text == "hi"
        ));
        assert!(matches!(
            OpenAiCompatAdapter::parse_stream_line("data: [DONE]"),
            LineAction::Stop
        ));
        assert!(matches!(
            OpenAiCompatAdapter::parse_stream_line(r#"data: {"choices":[{"delta":{}}]}"#),
            LineAction::Skip
        ));
        assert!(matches!(
            OpenAiCompatAdapter::parse_stream_line(": keepalive"),
            LineAction::Skip
        ));
    }

    #[test]
    fn test_anthropic_stream_line_parsing() {
        assert!(matches!(
            AnthropicAdapter::parse_stream_line(
                r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"om"}}"#
            ),
            LineAction::Delta(text) if text == "om"
        ));
        assert!(matches!(
            AnthropicAdapter::parse_stream_line(r#"data: {"type":"message_stop"}"#),
            LineAction::Stop
        ));
        assert!(matches!(
            AnthropicAdapter::parse_stream_line(r#"data: {"type":"ping"}"#),
            LineAction::Skip
        ));
    }

    #[test]
    fn test_local_stream_line_parsing() {
        assert!(matches!(
            LocalAdapter::parse_stream_line(r#"{"message":{"content":"hi"},"done":false}"#),
            LineAction::Delta(text) if text == "hi"
        ));
        assert!(matches!(
            LocalAdapter::parse_stream_line(r#"{"done":true}"#),
            LineAction::Stop
        ));
        assert!(matches!(LocalAdapter::parse_stream_line(""), LineAction::Skip));
    }

    #[test]
    fn test_split_system_takes_last_system_message() {
        let messages = vec![
            Message::system("first"),
            Message::user("q"),
            Message::system("second"),
            Message::assistant("a"),
        ];
        let (system, turns) = AnthropicAdapter::split_system(&messages);
        assert_eq!(system.as_deref(), Some("second"));
        assert_eq!(turns.len(), 2);
    }

    #[test]
    fn test_prefix_notice_only_on_fallback() {
        let mut cfg = config("ollama", "http://localhost:11434");
        assert_eq!(prefix_notice(&cfg, "answer".to_string()), "answer");

        cfg.is_fallback = true;
        cfg.original_provider = Some("openai".to_string());
        let prefixed = prefix_notice(&cfg, "answer".to_string());
        assert!(prefixed.starts_with('['));
        assert!(prefixed.ends_with("answer"));
    }
}
