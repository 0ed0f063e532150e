//! Blocking client for the Ollama HTTP API.
//!
//! The [`ChatModel`] trait decouples the conversation loop from the actual
//! backend. Tests use scripted models that return predetermined responses
//! without any network traffic.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::core::types::Message;
use crate::io::cancel::CancelToken;

pub const DEFAULT_HOST: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Failure to obtain a reply from the model endpoint.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("request cancelled by user")]
    Cancelled,
    #[error("Ollama server responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("no response received from Ollama server. Is it running at {url}? ({reason})")]
    Unreachable { url: String, reason: String },
    #[error("unexpected response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

/// Abstraction over chat backends.
pub trait ChatModel {
    /// Send the full history and return the assistant's reply text.
    fn chat(
        &self,
        model: &str,
        messages: &[Message],
        cancel: &CancelToken,
    ) -> Result<String, ModelError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

/// Client for a local (or remote) Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    host: String,
    client: Client,
}

impl OllamaClient {
    pub fn new(host: impl Into<String>) -> Result<Self> {
        // Local generation can take minutes; interrupts go through the cancel token.
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(None::<Duration>)
            .build()
            .context("build http client")?;
        Ok(Self {
            host: host.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.host)
    }

    /// Names of the models installed on the server (`GET /api/tags`).
    #[instrument(skip(self), fields(host = %self.host))]
    pub fn list_models(&self) -> Result<Vec<String>, ModelError> {
        let url = self.url("/api/tags");
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| unreachable(&url, &err))?;
        let tags: TagsResponse = decode_response(&url, response)?;
        Ok(tags.models.into_iter().map(|tag| tag.name).collect())
    }

    fn post_chat(&self, url: &str, body: &serde_json::Value) -> Result<String, ModelError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .map_err(|err| unreachable(url, &err))?;
        let reply: ChatResponse = decode_response(url, response)?;
        Ok(reply.message.content)
    }
}

impl ChatModel for OllamaClient {
    #[instrument(skip_all, fields(model = %model, messages = messages.len()))]
    fn chat(
        &self,
        model: &str,
        messages: &[Message],
        cancel: &CancelToken,
    ) -> Result<String, ModelError> {
        let url = self.url("/api/chat");
        let body = serde_json::to_value(ChatRequest {
            model,
            messages,
            stream: false,
        })
        .map_err(|err| ModelError::Decode {
            url: url.clone(),
            reason: format!("serialize request: {err}"),
        })?;

        // The blocking request runs on a worker so an interrupt can abandon the wait.
        let (tx, rx) = mpsc::channel();
        let worker = self.clone();
        let worker_url = url.clone();
        thread::spawn(move || {
            let _ = tx.send(worker.post_chat(&worker_url, &body));
        });

        debug!(url = %url, "waiting for model reply");
        loop {
            if cancel.is_cancelled() {
                warn!("model request cancelled");
                return Err(ModelError::Cancelled);
            }
            match rx.recv_timeout(CANCEL_POLL_INTERVAL) {
                Ok(result) => return result,
                Err(mpsc::RecvTimeoutError::Timeout) => continue,
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return Err(ModelError::Unreachable {
                        url,
                        reason: "request worker exited without a reply".to_string(),
                    });
                }
            }
        }
    }
}

fn unreachable(url: &str, err: &reqwest::Error) -> ModelError {
    ModelError::Unreachable {
        url: url.to_string(),
        reason: err.to_string(),
    }
}

fn decode_response<T: serde::de::DeserializeOwned>(
    url: &str,
    response: reqwest::blocking::Response,
) -> Result<T, ModelError> {
    let status = response.status();
    let text = response.text().map_err(|err| ModelError::Decode {
        url: url.to_string(),
        reason: format!("read body: {err}"),
    })?;
    if !status.is_success() {
        return Err(ModelError::Status {
            status: status.as_u16(),
            body: text,
        });
    }
    serde_json::from_str(&text).map_err(|err| ModelError::Decode {
        url: url.to_string(),
        reason: err.to_string(),
    })
}
