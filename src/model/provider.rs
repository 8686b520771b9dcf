use serde::Deserialize;
use serde_json::{json, Value};

use super::Prompt;
use crate::config::ModelSettings;

/// Generative-model APIs the analyzer can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Google AI Studio `generateContent`, API key in `x-goog-api-key`.
    #[default]
    Gemini,
    /// OpenAI-compatible chat completions, bearer token.
    OpenAi,
    /// Vertex AI `predict`, bearer access token.
    Vertex,
}

impl Provider {
    pub fn default_base_url(self) -> &'static str {
        match self {
            Provider::Gemini => "https://generativelanguage.googleapis.com",
            Provider::OpenAi => "https://api.openai.com",
            Provider::Vertex => "https://us-central1-aiplatform.googleapis.com",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Gemini => "gemini-1.5-flash",
            Provider::OpenAi => "gpt-4o-mini",
            Provider::Vertex => "text-bison",
        }
    }

    /// Build the provider-specific HTTP request for `prompt`.
    pub fn request(self, settings: &ModelSettings, prompt: &Prompt) -> ProviderRequest {
        match self {
            Provider::Gemini => ProviderRequest {
                url: format!(
                    "{}/v1beta/models/{}:generateContent",
                    settings.base_url, settings.model
                ),
                headers: vec![("x-goog-api-key", settings.api_key.clone())],
                bearer: None,
                body: json!({
                    "systemInstruction": { "parts": [{ "text": prompt.system }] },
                    "contents": [{ "role": "user", "parts": [{ "text": prompt.user }] }],
                    "generationConfig": {
                        "temperature": settings.temperature,
                        "maxOutputTokens": settings.max_output_tokens,
                    },
                }),
            },
            Provider::OpenAi => ProviderRequest {
                url: format!("{}/v1/chat/completions", settings.base_url),
                headers: Vec::new(),
                bearer: Some(settings.api_key.clone()),
                body: json!({
                    "model": settings.model,
                    "messages": [
                        { "role": "system", "content": prompt.system },
                        { "role": "user", "content": prompt.user },
                    ],
                    "temperature": settings.temperature,
                    "max_tokens": settings.max_output_tokens,
                }),
            },
            Provider::Vertex => ProviderRequest {
                url: format!(
                    "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:predict",
                    settings.base_url,
                    settings.project.as_deref().unwrap_or_default(),
                    settings.region,
                    settings.model
                ),
                headers: Vec::new(),
                bearer: Some(settings.api_key.clone()),
                body: json!({
                    "instances": [{ "prompt": format!("{}\n\n{}", prompt.system, prompt.user) }],
                    "parameters": {
                        "temperature": settings.temperature,
                        "maxOutputTokens": settings.max_output_tokens,
                    },
                }),
            },
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Provider::Gemini),
            "openai" => Ok(Provider::OpenAi),
            "vertex" => Ok(Provider::Vertex),
            other => Err(format!(
                "unknown model provider: {other} (expected: gemini, openai, vertex)"
            )),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Gemini => write!(f, "gemini"),
            Provider::OpenAi => write!(f, "openai"),
            Provider::Vertex => write!(f, "vertex"),
        }
    }
}

/// Everything needed to issue one model call.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub url: String,
    /// Extra credential headers. Never put secrets in `url`: it shows up in errors.
    pub headers: Vec<(&'static str, String)>,
    pub bearer: Option<String>,
    pub body: Value,
}
