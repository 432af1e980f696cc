//! Gemini API client.
//!
//! Thin wrapper over the `generateContent` endpoint: text prompts in, text
//! out, with optional inline image data. Best-effort, no automatic retries.

use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

use crate::error::AdvisorError;

const REQUEST_TIMEOUT_SECS: u64 = 30;

pub struct AdvisorClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl AdvisorClient {
    /// Create a client against the given API base URL.
    ///
    /// `api_key` may be absent; every generation then fails with
    /// `AdvisorError::NotConfigured` instead of hitting the network.
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: &str,
    ) -> Result<Self, AdvisorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
        })
    }

    /// Whether an API key is available.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a text response for a text prompt.
    #[instrument(skip(self, prompt), level = "info")]
    pub async fn generate(&self, prompt: &str) -> Result<String, AdvisorError> {
        self.send(vec![Part::text(prompt)]).await
    }

    /// Generate a text response for a prompt with an attached image.
    #[instrument(skip(self, prompt, image), level = "info")]
    pub async fn generate_with_image(
        &self,
        prompt: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String, AdvisorError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let parts = vec![Part::text(prompt), Part::inline_data(mime_type, encoded)];
        self.send(parts).await
    }

    async fn send(&self, parts: Vec<Part>) -> Result<String, AdvisorError> {
        let key = self.api_key.as_deref().ok_or(AdvisorError::NotConfigured)?;

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, key
        );
        let request = GenerateRequest {
            contents: vec![Content { parts }],
        };

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdvisorError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AdvisorError::Parse(e.to_string()))?;

        parsed
            .candidates
            .into_iter()
            .flat_map(|c| c.content.parts)
            .find_map(|p| p.text.filter(|t| !t.is_empty()))
            .ok_or(AdvisorError::EmptyResponse)
    }
}

impl std::fmt::Debug for AdvisorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdvisorClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("configured", &self.api_key.is_some())
            .finish()
    }
}

// Gemini wire format

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            inline_data: None,
        }
    }

    fn inline_data(mime_type: &str, data: String) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.to_string(),
                data,
            }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}
