/// LLM Client — the single point of entry for every model call in skillmatch.
///
/// Two wire formats are supported behind `CompletionBackend`:
/// - hosted: OpenAI-compatible `/chat/completions` (Groq by default), bearer API key
/// - local: Ollama-style `/api/generate`, no key
///
/// One request per run. There is no retry loop; a caller wanting resilience re-runs the
/// whole process.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{BackendKind, Config};

pub mod prompts;

const TEMPERATURE: f32 = 0.1;
const MAX_TOKENS: u32 = 1024;
/// Longest slice of an error body kept in messages.
const ERROR_BODY_LIMIT: usize = 500;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("API key missing: set {0}")]
    MissingApiKey(&'static str),
}

/// A text-completion endpoint. Implementations send one prompt and return the raw reply text.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Short label for logs, e.g. `hosted:llama3-70b-8192`.
    fn describe(&self) -> String;

    async fn complete(&self, prompt: &str, system: &str) -> Result<String, LlmError>;
}

/// Builds the backend selected in `config`. Fails fast when the hosted backend has no key.
pub fn build_backend(config: &Config) -> Result<Box<dyn CompletionBackend>, LlmError> {
    let client = Client::builder().timeout(config.timeout).build()?;

    let backend: Box<dyn CompletionBackend> = match config.backend {
        BackendKind::Hosted => {
            let api_key = config
                .api_key
                .clone()
                .ok_or(LlmError::MissingApiKey("GROQ_API_KEY"))?;
            Box::new(HostedBackend {
                client,
                base_url: config.base_url.clone(),
                model: config.model.clone(),
                api_key,
                timeout: config.timeout,
            })
        }
        BackendKind::Local => Box::new(LocalBackend {
            client,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            timeout: config.timeout,
        }),
    };

    info!("LLM backend initialized ({})", backend.describe());
    Ok(backend)
}

// ────────────────────────────────────────────────────────────────────────────
// Hosted: OpenAI-compatible chat completions
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ChatReplyMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

pub struct HostedBackend {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

#[async_trait]
impl CompletionBackend for HostedBackend {
    fn describe(&self) -> String {
        format!("hosted:{}", self.model)
    }

    async fn complete(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        let request_body = ChatRequest {
            model: &self.model,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.timeout))?;

        let response = ensure_success(response).await?;
        let chat: ChatResponse = decode_body(response, self.timeout).await?;

        if let Some(usage) = &chat.usage {
            debug!(
                "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(LlmError::EmptyContent)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Local: Ollama-style generate endpoint
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

pub struct LocalBackend {
    client: Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

#[async_trait]
impl CompletionBackend for LocalBackend {
    fn describe(&self) -> String {
        format!("local:{} @ {}", self.model, self.base_url)
    }

    async fn complete(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        let request_body = GenerateRequest {
            model: &self.model,
            prompt,
            system,
            stream: false,
            options: GenerateOptions {
                temperature: TEMPERATURE,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.timeout))?;

        let response = ensure_success(response).await?;
        let generated: GenerateResponse = decode_body(response, self.timeout).await?;

        generated
            .response
            .filter(|text| !text.trim().is_empty())
            .ok_or(LlmError::EmptyContent)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Shared response handling
// ────────────────────────────────────────────────────────────────────────────

fn map_transport_error(e: reqwest::Error, timeout: Duration) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout {
            secs: timeout.as_secs(),
        }
    } else {
        LlmError::Http(e)
    }
}

async fn ensure_success(response: Response) -> Result<Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!("LLM API returned {}: {}", status, truncate(&body, ERROR_BODY_LIMIT));
    Err(LlmError::Api {
        status: status.as_u16(),
        message: api_error_message(&body),
    })
}

async fn decode_body<T: serde::de::DeserializeOwned>(
    response: Response,
    timeout: Duration,
) -> Result<T, LlmError> {
    let body = response
        .text()
        .await
        .map_err(|e| map_transport_error(e, timeout))?;
    serde_json::from_str(&body).map_err(LlmError::Parse)
}

/// Pulls `error.message` out of an OpenAI-style error body, else returns the body itself.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| truncate(body, ERROR_BODY_LIMIT).to_string())
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::oneshot;

    use super::*;

    fn config(backend: BackendKind, api_key: Option<&str>) -> Config {
        Config {
            backend,
            base_url: "http://127.0.0.1:9".to_string(),
            model: "test-model".to_string(),
            api_key: api_key.map(String::from),
            timeout: Duration::from_secs(5),
            max_cv_chars: 100,
            insights: false,
            log_file: None::<PathBuf>,
            rust_log: "info".to_string(),
        }
    }

    #[test]
    fn test_hosted_backend_requires_api_key() {
        let err = build_backend(&config(BackendKind::Hosted, None))
            .err()
            .expect("missing key must fail");
        assert!(matches!(err, LlmError::MissingApiKey("GROQ_API_KEY")));
    }

    #[test]
    fn test_local_backend_needs_no_key() {
        let backend = build_backend(&config(BackendKind::Local, None)).unwrap();
        assert_eq!(backend.describe(), "local:test-model @ http://127.0.0.1:9");
    }

    #[test]
    fn test_hosted_describe_names_model() {
        let backend = build_backend(&config(BackendKind::Hosted, Some("gsk_test"))).unwrap();
        assert_eq!(backend.describe(), "hosted:test-model");
    }

    #[test]
    fn test_api_error_message_from_openai_envelope() {
        let body = r#"{"error":{"message":"Invalid API Key","type":"invalid_request_error"}}"#;
        assert_eq!(api_error_message(body), "Invalid API Key");
    }

    #[test]
    fn test_api_error_message_falls_back_to_body() {
        assert_eq!(api_error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
    }

    #[test]
    fn test_chat_response_deserializes() {
        let json = r#"{
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "{\"match_score\": 50}"}}],
            "usage": {"prompt_tokens": 120, "completion_tokens": 8, "total_tokens": 128}
        }"#;
        let parsed: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("{\"match_score\": 50}")
        );
        assert_eq!(parsed.usage.unwrap().completion_tokens, 8);
    }

    #[test]
    fn test_generate_response_deserializes() {
        let json = r#"{"model":"llama3.2","response":"{}","done":true}"#;
        let parsed: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.response.as_deref(), Some("{}"));
    }

    #[test]
    fn test_chat_request_serializes_system_then_user() {
        let request = ChatRequest {
            model: "m",
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "sys",
                },
                ChatMessage {
                    role: "user",
                    content: "hi",
                },
            ],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "hi");
    }

    /// Answers exactly one HTTP request with `status` and `body` after `delay`, and hands the
    /// raw request text back through the receiver.
    async fn serve_once(
        status: &'static str,
        body: &'static str,
        delay: Duration,
    ) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let _ = tx.send(request);
            tokio::time::sleep(delay).await;
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });

        (format!("http://{addr}"), rx)
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn backend_at(kind: BackendKind, base_url: String) -> Box<dyn CompletionBackend> {
        let mut config = config(kind, Some("gsk_test"));
        config.base_url = base_url;
        config.timeout = Duration::from_secs(1);
        build_backend(&config).unwrap()
    }

    #[tokio::test]
    async fn test_hosted_complete_returns_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"{\"matched_skills\":[\"Go\"]}"}}],"usage":{"prompt_tokens":10,"completion_tokens":5}}"#;
        let (url, request) = serve_once("200 OK", body, Duration::ZERO).await;
        let backend = backend_at(BackendKind::Hosted, url);

        let reply = backend.complete("the prompt", "be terse").await.unwrap();
        assert_eq!(reply, r#"{"matched_skills":["Go"]}"#);

        let request = request.await.unwrap();
        assert!(request.starts_with("POST /chat/completions "));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer gsk_test"));
        assert!(request.contains(r#""content":"the prompt""#));
        assert!(request.contains(r#""role":"system""#));
    }

    #[tokio::test]
    async fn test_hosted_non_success_status_is_api_error() {
        let body = r#"{"error":{"message":"model overloaded","type":"server_error"}}"#;
        let (url, _request) = serve_once("500 Internal Server Error", body, Duration::ZERO).await;
        let backend = backend_at(BackendKind::Hosted, url);

        let err = backend.complete("p", "s").await.unwrap_err();
        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "model overloaded");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_hosted_blank_content_is_empty_reply() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  \n "}}]}"#;
        let (url, _request) = serve_once("200 OK", body, Duration::ZERO).await;
        let backend = backend_at(BackendKind::Hosted, url);

        let err = backend.complete("p", "s").await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyContent));
    }

    #[tokio::test]
    async fn test_hosted_no_choices_is_empty_reply() {
        let (url, _request) = serve_once("200 OK", r#"{"choices":[]}"#, Duration::ZERO).await;
        let backend = backend_at(BackendKind::Hosted, url);

        let err = backend.complete("p", "s").await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyContent));
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let (url, _request) = serve_once("200 OK", "not json", Duration::ZERO).await;
        let backend = backend_at(BackendKind::Hosted, url);

        let err = backend.complete("p", "s").await.unwrap_err();
        assert!(matches!(err, LlmError::Parse(_)));
    }

    #[tokio::test]
    async fn test_local_complete_reads_response_field() {
        let body = r#"{"model":"test-model","response":"{\"match_score\": 40}","done":true}"#;
        let (url, request) = serve_once("200 OK", body, Duration::ZERO).await;
        let backend = backend_at(BackendKind::Local, url);

        let reply = backend.complete("the prompt", "be terse").await.unwrap();
        assert_eq!(reply, r#"{"match_score": 40}"#);

        let request = request.await.unwrap();
        assert!(request.starts_with("POST /api/generate "));
        assert!(request.contains(r#""stream":false"#));
        assert!(!request.to_ascii_lowercase().contains("authorization:"));
    }

    #[tokio::test]
    async fn test_slow_backend_times_out() {
        let body = r#"{"response":"{}"}"#;
        let (url, _request) = serve_once("200 OK", body, Duration::from_secs(3)).await;
        let backend = backend_at(BackendKind::Local, url);

        let err = backend.complete("p", "s").await.unwrap_err();
        assert!(matches!(err, LlmError::Timeout { secs: 1 }), "got {err:?}");
    }
}
