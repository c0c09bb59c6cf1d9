//! Anthropic Messages API client.
//!
//! Two call shapes: a plain request/response for the slug, and a streaming
//! request for the design document, where SSE `content_block_delta` events
//! are accumulated into the full response text. Unknown event types are
//! skipped rather than failing the stream.

use std::sync::OnceLock;
use std::time::Duration;

use futures::StreamExt;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ArchitectError, Result};
use crate::prompt;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// Small, cheap model for naming the system.
const SLUG_MODEL: &str = "claude-3-5-haiku-latest";
/// Model for the design document itself.
const DESIGN_MODEL: &str = "claude-opus-4-20250514";

/// Features are truncated to this many characters for the slug call.
const SLUG_INPUT_LIMIT: usize = 500;

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct Client {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl Client {
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    fn with_base_url(api_key: String, base_url: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    /// Test constructor pointed at a mock server.
    #[cfg(test)]
    pub(crate) fn for_tests(api_key: &str, base_url: String) -> Self {
        Self::with_base_url(api_key.to_string(), base_url).unwrap()
    }

    /// Ask the model for a short slug naming the system described by
    /// `features`, sanitized down to `[a-z0-9_]`.
    pub async fn slug(&self, features: &str) -> Result<String> {
        let truncated: String = features.chars().take(SLUG_INPUT_LIMIT).collect();
        let raw = self
            .complete(&MessagesRequest {
                model: SLUG_MODEL,
                max_tokens: 50,
                temperature: 0.1,
                system: None,
                messages: vec![MessageParam {
                    role: "user",
                    content: &prompt::slug_prompt(&truncated),
                }],
                stream: false,
            })
            .await?;
        Ok(sanitize_slug(&raw))
    }

    /// Generate the design document, streaming. `on_chunk` is invoked with
    /// the running delta count so the caller can show progress.
    pub async fn technical_design(
        &self,
        features: &str,
        context: &str,
        existing: &str,
        on_chunk: &mut dyn FnMut(usize),
    ) -> Result<String> {
        let user = prompt::design_prompt(features, context, existing);
        self.complete_streaming(
            &MessagesRequest {
                model: DESIGN_MODEL,
                max_tokens: 20_000,
                temperature: 0.2,
                system: Some(prompt::SYSTEM_PROMPT),
                messages: vec![MessageParam {
                    role: "user",
                    content: &user,
                }],
                stream: true,
            },
            on_chunk,
        )
        .await
    }

    async fn post(&self, req: &MessagesRequest<'_>) -> Result<reqwest::Response> {
        let resp = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(req)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            // Prefer the structured error message when the body carries one.
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_owned))
                .unwrap_or(body);
            return Err(ArchitectError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp)
    }

    async fn complete(&self, req: &MessagesRequest<'_>) -> Result<String> {
        let resp = self.post(req).await?;
        let body: MessagesResponse = resp.json().await?;
        Ok(body
            .content
            .iter()
            .filter_map(|b| b.text.as_deref())
            .collect::<Vec<_>>()
            .join(""))
    }

    async fn complete_streaming(
        &self,
        req: &MessagesRequest<'_>,
        on_chunk: &mut dyn FnMut(usize),
    ) -> Result<String> {
        let resp = self.post(req).await?;
        let mut stream = resp.bytes_stream();

        let mut buf = String::new();
        let mut text = String::new();
        let mut chunks = 0usize;

        while let Some(chunk) = stream.next().await {
            let bytes = chunk?;
            buf.push_str(&String::from_utf8_lossy(&bytes));

            // SSE frames are newline-delimited; only `data:` lines carry JSON.
            while let Some(pos) = buf.find('\n') {
                let line = buf[..pos].trim_end_matches('\r').to_string();
                buf.drain(..=pos);

                let Some(data) = line.strip_prefix("data: ") else {
                    continue;
                };
                match serde_json::from_str::<StreamEvent>(data) {
                    Ok(StreamEvent::ContentBlockDelta { delta }) => {
                        if let Some(t) = delta.text {
                            text.push_str(&t);
                            chunks += 1;
                            on_chunk(chunks);
                        }
                    }
                    Ok(StreamEvent::Error { error }) => {
                        return Err(ArchitectError::Stream(error.message));
                    }
                    Ok(StreamEvent::Other) | Err(_) => continue,
                }
            }
        }

        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<MessageParam<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct MessageParam<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    ContentBlockDelta { delta: Delta },
    Error { error: ApiErrorBody },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct Delta {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

// ---------------------------------------------------------------------------
// Slug sanitization
// ---------------------------------------------------------------------------

static SLUG_STRIP_RE: OnceLock<Regex> = OnceLock::new();
static SLUG_SEP_RE: OnceLock<Regex> = OnceLock::new();

/// Clean a model-produced slug into something safe for filenames:
/// drop everything but word characters, whitespace, and dashes, then
/// collapse separator runs into underscores and lowercase the result.
pub fn sanitize_slug(raw: &str) -> String {
    let strip = SLUG_STRIP_RE.get_or_init(|| Regex::new(r"[^\w\s-]").unwrap());
    let sep = SLUG_SEP_RE.get_or_init(|| Regex::new(r"[-\s]+").unwrap());

    let cleaned = strip.replace_all(raw.trim(), "");
    sep.replace_all(&cleaned, "_").to_lowercase()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
