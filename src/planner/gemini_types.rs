//! Gemini API wire types
//!
//! Structs that mirror the `generateContent` JSON format. The API speaks
//! camelCase on the wire.

use serde::{Deserialize, Serialize};

/// Top-level Gemini API response
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GeminiApiResponse {
    /// Candidate responses from the model
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Feedback about the prompt (e.g., if it was blocked)
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
    /// Token accounting
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
}

impl GeminiApiResponse {
    /// Concatenated text of the first candidate
    pub fn first_text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        let text: String = candidate
            .content
            .as_ref()?
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        Some(text)
    }
}

/// A single candidate response
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Absent when generation stopped before producing output
    #[serde(default)]
    pub content: Option<Content>,
    /// Why the model stopped generating
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Content of a candidate
#[derive(Deserialize, Debug)]
pub struct Content {
    /// Content parts (typically one text part)
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// One part of a candidate's content
#[derive(Deserialize, Debug)]
pub struct Part {
    /// Text, when this is a text part
    #[serde(default)]
    pub text: Option<String>,
}

/// Feedback about the prompt
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    /// Reason the prompt was blocked, if it was
    #[serde(default)]
    pub block_reason: Option<String>,
}

/// Token counts reported by the API
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    /// Tokens in the prompt
    #[serde(default)]
    pub prompt_token_count: u64,
    /// Tokens across all candidates
    #[serde(default)]
    pub candidates_token_count: u64,
}

/// Request body for `generateContent`
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GeminiApiRequest {
    /// Conversation turns (a single user turn here)
    pub contents: Vec<RequestContent>,
    /// Output controls
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

/// One turn of a request
#[derive(Serialize, Debug)]
pub struct RequestContent {
    /// Speaker of this turn
    pub role: &'static str,
    /// Turn parts
    pub parts: Vec<RequestPart>,
}

/// One text part of a request turn
#[derive(Serialize, Debug)]
pub struct RequestPart {
    /// The text content
    pub text: String,
}

/// Output controls
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// MIME type to force (e.g., "application/json")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_camel_case() {
        let request = GeminiApiRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart {
                    text: "hi".to_string(),
                }],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                temperature: None,
            }),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert!(json["generationConfig"].get("temperature").is_none());
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
    }

    #[test]
    fn test_first_text_joins_parts_and_tolerates_missing_content() {
        let response: GeminiApiResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "[{"}, {"text": "}]"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(response.first_text().as_deref(), Some("[{}]"));

        let stopped: GeminiApiResponse =
            serde_json::from_str(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#).unwrap();
        assert_eq!(stopped.first_text(), None);
        assert_eq!(
            stopped.candidates[0].finish_reason.as_deref(),
            Some("SAFETY")
        );
    }
}
