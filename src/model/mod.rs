pub mod provider;
pub mod response;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::ModelSettings;
use crate::retry::{ErrorClass, Retryable};

const USER_AGENT: &str = concat!("diff-triage/", env!("CARGO_PKG_VERSION"));

/// Longest error body kept from a failed model response.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("model endpoint rate limited the request")]
    RateLimited { retry_after: Option<Duration> },

    #[error("model endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("model response did not match any known shape")]
    UnexpectedShape,

    #[error("model reply is missing severity sections: {missing}")]
    MissingSeverities { missing: String },
}

impl From<reqwest::Error> for ModelError {
    /// The URL is dropped; some providers authenticate through it.
    fn from(e: reqwest::Error) -> Self {
        ModelError::Transport(e.without_url())
    }
}

impl Retryable for ModelError {
    fn class(&self) -> ErrorClass {
        match self {
            ModelError::RateLimited { retry_after } => ErrorClass::RateLimited {
                retry_after: *retry_after,
            },
            ModelError::Status { status, .. } if *status == 408 || *status >= 500 => {
                ErrorClass::Transient
            }
            // Bad key, bad model name, malformed request: no attempt will fix it.
            ModelError::Status { .. } => ErrorClass::Fatal,
            ModelError::Transport(_)
            | ModelError::UnexpectedShape
            | ModelError::MissingSeverities { .. } => ErrorClass::Transient,
        }
    }
}

/// Instructions plus payload for one generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// A generative-text endpoint.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Generate a reply for `prompt`. One attempt; retries belong to the caller.
    async fn generate(&self, prompt: &Prompt) -> Result<String, ModelError>;
}

/// [`ModelClient`] talking HTTP to the configured provider.
pub struct HttpModelClient {
    client: reqwest::Client,
    settings: ModelSettings,
}

impl HttpModelClient {
    pub fn new(settings: ModelSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, settings })
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    #[instrument(skip_all, fields(provider = %self.settings.provider, model = %self.settings.model))]
    async fn generate(&self, prompt: &Prompt) -> Result<String, ModelError> {
        let request = self.settings.provider.request(&self.settings, prompt);

        let mut builder = self.client.post(&request.url).json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value.as_str());
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }

        debug!("sending generation request");
        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ModelError::RateLimited {
                retry_after: parse_retry_after(response.headers()),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body: clip(&body, MAX_ERROR_BODY),
            });
        }

        let value: serde_json::Value = response.json().await?;
        let (shape, text) = response::extract_text(&value).ok_or(ModelError::UnexpectedShape)?;
        debug!(?shape, chars = text.chars().count(), "received model reply");
        Ok(text)
    }
}

/// `Retry-After` in its delay-seconds form. HTTP-date values are ignored.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

fn clip(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
