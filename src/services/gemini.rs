use crate::error::{status_error, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Anything that turns a prompt into free text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, base_url: String, timeout: Duration) -> Self {
        GeminiClient {
            client: Client::new(),
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
        };

        tracing::debug!(
            model = %self.model,
            prompt_chars = prompt.len(),
            "Gemini request: {} chars",
            prompt.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", &self.api_key)])
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error("Gemini", response).await);
        }

        let parsed: GenerateResponse = response.json().await?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            tracing::warn!(model = %self.model, "Gemini returned no text");
            return Err(ProviderError::EmptyResponse);
        }

        tracing::debug!(response_chars = text.len(), "Gemini response: {} chars", text.len());
        Ok(text)
    }
}

// Gemini API request/response types

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_includes_model() {
        let client = GeminiClient::new(
            "key".to_string(),
            "gemini-2.0-flash-lite".to_string(),
            "http://localhost:9999/v1beta/".to_string(),
            Duration::from_secs(5),
        );
        assert_eq!(
            client.endpoint(),
            "http://localhost:9999/v1beta/models/gemini-2.0-flash-lite:generateContent"
        );
    }

    #[test]
    fn response_text_parts_deserialize() {
        let parsed: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"- Munnar"}],"role":"model"}}]}"#,
        )
        .unwrap();
        let text = parsed.candidates[0].content.as_ref().unwrap().parts[0]
            .text
            .clone();
        assert_eq!(text.as_deref(), Some("- Munnar"));
    }
}
