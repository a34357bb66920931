//! Language-model text service interaction.
//!
//! This module provides the interface the curator, summarizer, and post
//! generator use to talk to an OpenAI-compatible chat completion API.
//!
//! # Architecture
//!
//! - [`TextService`]: Core trait defining async prompt → text interaction
//! - [`OpenAiChat`]: `reqwest`-backed implementation for `/chat/completions`
//! - [`ask_timed`]: Entry point used by the stages; adds timing and logging
//!
//! There is no retry layer. A failed call surfaces as an error and each
//! caller converts it into its own fallback value.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

/// One prompt for the text service: a model id plus system and user turns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub model: String,
    pub system: String,
    pub user: String,
}

impl ChatRequest {
    pub fn new(model: &str, system: &str, user: String) -> Self {
        Self {
            model: model.to_string(),
            system: system.to_string(),
            user,
        }
    }
}

/// Trait for async text service interaction.
///
/// Implementors send a [`ChatRequest`] and return the model's free-form text.
/// The text is expected, but not guaranteed, to contain a JSON object.
pub trait TextService {
    async fn ask(&self, request: &ChatRequest) -> Result<String, Box<dyn Error>>;
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireReply,
}

#[derive(Debug, Deserialize)]
struct WireReply {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat completion client.
pub struct OpenAiChat {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiChat {
    pub fn new(api_key: &str, base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn headers(&self) -> Result<HeaderMap, Box<dyn Error>> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

impl fmt::Debug for OpenAiChat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiChat")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl TextService for OpenAiChat {
    #[instrument(level = "info", skip_all, fields(model = %request.model))]
    async fn ask(&self, request: &ChatRequest) -> Result<String, Box<dyn Error>> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = WireRequest {
            model: &request.model,
            messages: vec![
                WireMessage {
                    role: "system",
                    content: &request.system,
                },
                WireMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
        };

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(%status, "Chat completion rejected");
            return Err(format!("chat completion error ({}): {}", status, error_text).into());
        }

        let parsed: WireResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or("chat completion returned no content")?;
        Ok(content.trim().to_string())
    }
}

/// Send one request through a [`TextService`], logging how long it took.
///
/// Errors are logged and returned unchanged; callers decide the fallback.
#[instrument(level = "info", skip_all, fields(model = %request.model))]
pub async fn ask_timed<T: TextService>(
    service: &T,
    request: &ChatRequest,
) -> Result<String, Box<dyn Error>> {
    let t0 = Instant::now();
    let res = service.ask(request).await;
    let dt = t0.elapsed();

    match &res {
        Ok(text) => info!(
            elapsed_ms = dt.as_millis(),
            bytes = text.len(),
            "Text service responded"
        ),
        Err(e) => error!(elapsed_ms = dt.as_millis(), error = %e, "Text service call failed"),
    }
    res
}
