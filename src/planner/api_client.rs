//! Gemini API client
//!
//! Direct HTTP client for the `generateContent` endpoint. This is the
//! production [`LanguageModel`](super::LanguageModel).

use crate::config::GeminiConfig;
use crate::error::PlanError;
use crate::planner::gemini_types::{
    GeminiApiRequest, GeminiApiResponse, GenerationConfig, RequestContent, RequestPart,
};
use crate::planner::LanguageModel;
use async_trait::async_trait;

/// Header carrying the API key, kept out of the URL so it never shows up in
/// request errors
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini client bound to one model
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// Build a client from configuration
    ///
    /// # Errors
    /// * `PlanError::Model` if the HTTP client cannot be constructed
    pub fn new(config: &GeminiConfig) -> Result<Self, PlanError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PlanError::Model(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(http, config))
    }

    /// Build a client around an existing `reqwest::Client` (shared pool)
    pub fn with_client(http: reqwest::Client, config: &GeminiConfig) -> Self {
        Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Model this client talks to
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    /// Send `prompt` and return the first candidate's text
    ///
    /// JSON output is always requested; callers still strip fences because the
    /// model occasionally wraps its answer anyway.
    ///
    /// # Errors
    /// * Returns `PlanError::Model` if the API key is missing, the HTTP request
    ///   fails, the response cannot be parsed, or no text was produced.
    async fn complete(&self, prompt: &str) -> Result<String, PlanError> {
        if self.api_key.is_empty() {
            return Err(PlanError::Model("API key is empty".to_string()));
        }

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let request_body = GeminiApiRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                temperature: Some(0.0),
            }),
        };

        tracing::debug!(
            model = %self.model,
            prompt_len = prompt.len(),
            "Calling Gemini API"
        );

        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                PlanError::Model(format!(
                    "Failed to send HTTP request to Gemini API: {}",
                    e.without_url()
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());

            tracing::error!(
                status_code = status_code,
                error_body = %error_body,
                "Gemini API returned error status"
            );

            if status_code == 429 {
                return Err(PlanError::Model(format!(
                    "Gemini API rate limit exceeded (HTTP {}): {}",
                    status_code, error_body
                )));
            }

            return Err(PlanError::Model(format!(
                "Gemini API returned error status {}: {}",
                status_code, error_body
            )));
        }

        let response_body = response.text().await.map_err(|e| {
            PlanError::Model(format!(
                "Failed to read response body from Gemini API: {}",
                e.without_url()
            ))
        })?;

        let parsed: GeminiApiResponse = serde_json::from_str(&response_body).map_err(|e| {
            PlanError::Model(format!(
                "Failed to parse JSON response from Gemini API: {} - Response body: {}",
                e, response_body
            ))
        })?;

        if let Some(reason) = parsed
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_ref())
        {
            return Err(PlanError::Model(format!(
                "Gemini API blocked the prompt: {}",
                reason
            )));
        }

        if parsed.candidates.is_empty() {
            return Err(PlanError::Model(
                "Gemini API response contains no candidates".to_string(),
            ));
        }

        let text = parsed.first_text().unwrap_or_default();
        if text.trim().is_empty() {
            let reason = parsed.candidates[0]
                .finish_reason
                .clone()
                .unwrap_or_else(|| "unknown".to_string());
            return Err(PlanError::Model(format!(
                "Gemini API response text is empty (finish reason: {})",
                reason
            )));
        }

        if let Some(usage) = &parsed.usage_metadata {
            tracing::debug!(
                prompt_tokens = usage.prompt_token_count,
                output_tokens = usage.candidates_token_count,
                response_len = text.len(),
                "Received response from Gemini API"
            );
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use std::time::Duration;

    fn config(base_url: &str, api_key: &str) -> GeminiConfig {
        GeminiConfig {
            api_key: api_key.to_string(),
            model: "gemini-2.0-flash-lite".to_string(),
            base_url: base_url.to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    fn endpoint() -> &'static str {
        "/models/gemini-2.0-flash-lite:generateContent"
    }

    #[tokio::test]
    async fn test_complete_empty_api_key() {
        let client = GeminiClient::new(&config("http://127.0.0.1:1", "")).unwrap();
        let result = client.complete("test prompt").await;
        assert!(result.unwrap_err().to_string().contains("API key is empty"));
    }

    #[tokio::test]
    async fn test_complete_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", endpoint())
            .match_query(Matcher::Missing)
            .match_header("x-goog-api-key", "test-key")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "generationConfig": {"responseMimeType": "application/json"}
            })))
            .with_status(200)
            .with_body(
                r#"{
                    "candidates": [{
                        "content": {
                            "parts": [{"text": "{\"category_text\": \"Commercial\"}"}],
                            "role": "model"
                        },
                        "finishReason": "STOP"
                    }],
                    "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 8}
                }"#,
            )
            .create_async()
            .await;

        let client = GeminiClient::new(&config(&server.url(), "test-key")).unwrap();
        let result = client.complete("test prompt").await;

        mock.assert_async().await;
        assert_eq!(result.unwrap(), "{\"category_text\": \"Commercial\"}");
    }

    #[tokio::test]
    async fn test_complete_empty_candidates() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", endpoint())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"candidates": []}"#)
            .create_async()
            .await;

        let client = GeminiClient::new(&config(&server.url(), "test-key")).unwrap();
        let result = client.complete("test prompt").await;

        mock.assert_async().await;
        assert!(result.unwrap_err().to_string().contains("no candidates"));
    }

    #[tokio::test]
    async fn test_complete_blocked_prompt() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", endpoint())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"candidates": [], "promptFeedback": {"blockReason": "SAFETY"}}"#)
            .create_async()
            .await;

        let client = GeminiClient::new(&config(&server.url(), "test-key")).unwrap();
        let error_msg = client.complete("test prompt").await.unwrap_err().to_string();

        mock.assert_async().await;
        assert!(
            error_msg.contains("blocked the prompt: SAFETY"),
            "Error message should mention the block, got: {}",
            error_msg
        );
    }

    #[tokio::test]
    async fn test_complete_rate_limit() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", endpoint())
            .match_query(Matcher::Any)
            .with_status(429)
            .with_body(r#"{"error": "Rate limit exceeded"}"#)
            .create_async()
            .await;

        let client = GeminiClient::new(&config(&server.url(), "test-key")).unwrap();
        let error_msg = client.complete("test prompt").await.unwrap_err().to_string();

        mock.assert_async().await;
        assert!(error_msg.contains("rate limit") && error_msg.contains("429"));
    }

    #[tokio::test]
    async fn test_complete_invalid_json() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", endpoint())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("This is not JSON")
            .create_async()
            .await;

        let client = GeminiClient::new(&config(&server.url(), "test-key")).unwrap();
        let result = client.complete("test prompt").await;

        mock.assert_async().await;
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Failed to parse JSON"));
    }

    #[tokio::test]
    async fn test_complete_reports_finish_reason_when_text_missing() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", endpoint())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"candidates": [{"finishReason": "MAX_TOKENS"}]}"#)
            .create_async()
            .await;

        let client = GeminiClient::new(&config(&server.url(), "test-key")).unwrap();
        let error_msg = client.complete("test prompt").await.unwrap_err().to_string();
        assert!(error_msg.contains("MAX_TOKENS"));
    }

    #[tokio::test]
    async fn test_transport_error_does_not_expose_api_key() {
        let client = GeminiClient::new(&config("http://127.0.0.1:1", "AIzaSECRETKEY")).unwrap();
        let err = client.complete("test prompt").await.unwrap_err().to_string();

        assert!(err.contains("Failed to send HTTP request"));
        assert!(!err.contains("AIzaSECRETKEY"));
    }
}
