// rzpchat-core/src/docs.rs

//! Client for the Razorpay documentation-search endpoint.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

use crate::config::AssistConfig;
use crate::errors::{snippet, DispatchError};

const ANSWER_FIELDS: [&str; 4] = ["answer", "content", "text", "delta"];

/// A previous question and the answer it received.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct DocsSource {
    pub title: Option<String>,
    pub url: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct DocsAnswer {
    pub answer: String,
    pub sources: Vec<DocsSource>,
}

#[async_trait]
pub trait DocsSearch: Send + Sync {
    async fn ask(&self, question: &str) -> Result<DocsAnswer, DispatchError>;
    /// Forgets prior exchanges.
    async fn reset(&self);
}

pub struct DocsClient {
    http: Client,
    endpoint: String,
    timeout: Duration,
    window: usize,
    history: Mutex<VecDeque<Exchange>>,
}

impl DocsClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration, window: usize) -> Result<Self, DispatchError> {
        let endpoint = endpoint.into();
        let http = Client::builder()
            .build()
            .map_err(|source| DispatchError::Connection {
                endpoint: endpoint.clone(),
                source,
            })?;
        Ok(Self {
            http,
            endpoint,
            timeout,
            window,
            history: Mutex::new(VecDeque::with_capacity(window)),
        })
    }

    /// `None` when no docs endpoint is configured.
    pub fn from_config(config: &AssistConfig) -> Result<Option<Self>, DispatchError> {
        match &config.docs.endpoint {
            Some(endpoint) => Self::new(endpoint.clone(), config.docs.timeout(), config.docs.history_window).map(Some),
            None => {
                info!("No docs endpoint configured; docs search disabled.");
                Ok(None)
            }
        }
    }

    pub async fn history(&self) -> Vec<Exchange> {
        self.history.lock().await.iter().cloned().collect()
    }

    async fn remember(&self, question: &str, answer: &str) {
        if self.window == 0 {
            return;
        }
        let mut history = self.history.lock().await;
        history.push_back(Exchange {
            question: question.to_string(),
            answer: answer.to_string(),
        });
        while history.len() > self.window {
            history.pop_front();
        }
    }
}

/// Request payload; `history` is omitted entirely when `window` is zero.
pub fn build_request(question: &str, history: &[Exchange], window: usize) -> Value {
    let mut body = Map::new();
    body.insert("question".into(), json!(question));
    body.insert("products".into(), json!(["docs"]));
    if window > 0 {
        let skip = history.len().saturating_sub(window);
        body.insert("history".into(), json!(history[skip..]));
    }
    Value::Object(body)
}

fn error_message(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| Some(value.to_string())),
        other => Some(other.to_string()),
    }
}

fn parse_source(value: &Value) -> Option<DocsSource> {
    match value {
        Value::String(url) => Some(DocsSource {
            title: None,
            url: Some(url.clone()),
        }),
        Value::Object(map) => {
            let field = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);
            let source = DocsSource {
                title: field("title").or_else(|| field("name")),
                url: field("url").or_else(|| field("link")),
            };
            (source.title.is_some() || source.url.is_some()).then_some(source)
        }
        _ => None,
    }
}

/// Folds one JSON chunk into `answer`. Remote errors short-circuit.
fn absorb_chunk(chunk: &Map<String, Value>, answer: &mut DocsAnswer) -> Result<(), DispatchError> {
    if let Some(message) = chunk.get("error").and_then(error_message) {
        return Err(DispatchError::Remote { code: None, message });
    }
    if let Some(text) = ANSWER_FIELDS
        .iter()
        .find_map(|key| chunk.get(*key).and_then(Value::as_str))
    {
        answer.answer.push_str(text);
    }
    if let Some(Value::Array(items)) = chunk.get("sources") {
        answer.sources.extend(items.iter().filter_map(parse_source));
    }
    Ok(())
}

/// Parses either a single JSON object or an SSE stream of `data:` chunks.
pub fn parse_docs_body(body: &str) -> Result<DocsAnswer, DispatchError> {
    let trimmed = body.trim();
    let mut answer = DocsAnswer::default();

    if !trimmed.starts_with('{') && trimmed.lines().any(|l| l.trim_start().starts_with("data:")) {
        for line in trimmed.lines() {
            let Some(payload) = line.trim_start().strip_prefix("data:") else {
                continue;
            };
            let payload = payload.strip_prefix(' ').unwrap_or(payload);
            if payload.trim().is_empty() || payload.trim() == "[DONE]" {
                continue;
            }
            match serde_json::from_str::<Value>(payload) {
                Ok(Value::Object(chunk)) => absorb_chunk(&chunk, &mut answer)?,
                Ok(Value::String(text)) => answer.answer.push_str(&text),
                _ => answer.answer.push_str(payload),
            }
        }
        trace!(answer_len = answer.answer.len(), "Assembled streamed docs answer.");
        return Ok(answer);
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => {
            absorb_chunk(&map, &mut answer)?;
            Ok(answer)
        }
        Ok(Value::String(text)) => {
            answer.answer = text;
            Ok(answer)
        }
        Ok(other) => Err(DispatchError::Remote {
            code: None,
            message: format!("Unexpected docs response: {}", snippet(&other.to_string())),
        }),
        Err(e) => Err(DispatchError::parse(e, body)),
    }
}

#[async_trait]
impl DocsSearch for DocsClient {
    async fn ask(&self, question: &str) -> Result<DocsAnswer, DispatchError> {
        let history = self.history().await;
        let body = build_request(question, &history, self.window);
        debug!(endpoint = %self.endpoint, history = history.len(), "Sending docs question.");

        let exchange = async {
            let response = self
                .http
                .post(&self.endpoint)
                .header(CONTENT_TYPE, "application/json")
                .header(ACCEPT, "application/json, text/event-stream")
                .json(&body)
                .send()
                .await?;
            let status = response.status();
            let text = response.text().await?;
            Ok::<_, reqwest::Error>((status, text))
        };

        let (status, text) = match tokio::time::timeout(self.timeout, exchange).await {
            Err(_) => {
                warn!(endpoint = %self.endpoint, "Docs search timed out.");
                return Err(DispatchError::Timeout {
                    endpoint: self.endpoint.clone(),
                    seconds: self.timeout.as_secs(),
                });
            }
            Ok(Err(source)) => {
                return Err(DispatchError::Connection {
                    endpoint: self.endpoint.clone(),
                    source,
                })
            }
            Ok(Ok(pair)) => pair,
        };

        let answer = match (parse_docs_body(&text), status.is_success()) {
            (Ok(answer), true) => answer,
            (Err(e @ DispatchError::Remote { .. }), _) => return Err(e),
            (_, false) => {
                return Err(DispatchError::Http {
                    endpoint: self.endpoint.clone(),
                    status: status.as_u16(),
                    snippet: snippet(&text),
                })
            }
            (Err(e), true) => return Err(e),
        };

        self.remember(question, &answer.answer).await;
        Ok(answer)
    }

    async fn reset(&self) {
        self.history.lock().await.clear();
    }
}
