// src/ai/gemini.rs
//! Gemini image generation backend.

use base64::{engine::general_purpose, Engine as _};
use log::{error, info};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::connector::{GeneratedImage, HugGenerator};
use super::error::{sanitize_error_message, GenerationError};
use crate::config::GenerationConfig;
use crate::intake::{mime_type_of, strip_data_uri};

/// Instruction sent alongside the two reference photos.
pub const HUG_PROMPT: &str = "Generate a high-quality, realistic, and heartwarming image.
Input 1 is a reference photo of a person as a child.
Input 2 is a reference photo of the same person as an adult.

Task: Create a seamless image where the adult person (from Input 2) is affectionately hugging the child version of themselves (from Input 1).

Style: Realistic photography, soft lighting, emotional connection.
Requirements:
- The adult should resemble the person in Input 2.
- The child should resemble the person in Input 1.
- The pose should be a natural, gentle hug.
- The background MUST be pure solid white (#FFFFFF).
- Do not add frames, text, or artifacts.";

/// Finish reasons that mean the output was withheld by a safety filter.
const BLOCKED_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "IMAGE_SAFETY",
    "IMAGE_PROHIBITED_CONTENT",
    "IMAGE_RECITATION",
    "RECITATION",
    "PROHIBITED_CONTENT",
    "BLOCKLIST",
];

pub struct GeminiClient {
    client: Client,
    config: GenerationConfig,
}

impl GeminiClient {
    pub fn new(config: GenerationConfig) -> Result<Self, GenerationError> {
        if config.api_key.trim().is_empty() {
            return Err(GenerationError::Config(
                crate::config::MISSING_KEY_MESSAGE.to_string(),
            ));
        }

        info!("Initializing Gemini client: model {} at {}", config.model, config.endpoint);

        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint, self.config.model
        )
    }

    /// Check that the key is accepted and the model exists.
    pub fn health_check(&self) -> Result<(), GenerationError> {
        let url = format!("{}/models/{}", self.config.endpoint, self.config.model);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .send()?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let text = response.text().unwrap_or_default();
            Err(GenerationError::Api {
                status: status.as_u16(),
                message: sanitize_error_message(&text),
            })
        }
    }
}

impl HugGenerator for GeminiClient {
    fn generate(&self, child_image: &str, adult_image: &str) -> Result<GeneratedImage, GenerationError> {
        let start = Instant::now();
        let request = GeminiRequest::hug(child_image, adult_image);

        info!("Sending hug request to Gemini model {}...", self.config.model);

        let response = self
            .client
            .post(self.generate_url())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .map_err(|e| {
                error!("Gemini request failed: {}", e);
                GenerationError::Network(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            let err = GenerationError::Api {
                status: status.as_u16(),
                message: sanitize_error_message(&text),
            };
            error!("Gemini generation error: {}", err);
            return Err(err);
        }

        let body = parse_response(&response.text()?)?;
        let image = extract_image(body)?;

        info!(
            "Gemini returned a {} image ({} bytes) in {} ms",
            image.mime_type,
            image.bytes.len(),
            start.elapsed().as_millis()
        );
        Ok(image)
    }

    fn name(&self) -> &str {
        "Gemini Nano Banana"
    }
}

fn parse_response(text: &str) -> Result<GeminiResponse, GenerationError> {
    serde_json::from_str(text).map_err(|e| {
        error!("Unreadable Gemini response: {}", e);
        GenerationError::Json(e)
    })
}

/// Pull the first inline image out of a response.
fn extract_image(response: GeminiResponse) -> Result<GeneratedImage, GenerationError> {
    // Blocked prompts still come back as HTTP 200
    if let Some(feedback) = response.prompt_feedback {
        if let Some(reason) = feedback.block_reason {
            let msg = feedback.block_reason_message.unwrap_or(reason);
            return Err(GenerationError::ContentBlocked(msg));
        }
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(GenerationError::NoImage)?;

    if let Some(reason) = candidate.finish_reason.as_deref() {
        if BLOCKED_FINISH_REASONS.contains(&reason) {
            return Err(GenerationError::ContentBlocked(reason.to_string()));
        }
    }

    let inline = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .find_map(|p| p.inline_data.filter(|d| !d.data.is_empty()))
        .ok_or(GenerationError::NoImage)?;

    let bytes = general_purpose::STANDARD
        .decode(inline.data.trim())
        .map_err(|e| GenerationError::UnusableImage(e.to_string()))?;

    Ok(GeneratedImage {
        data_uri: format!("data:image/png;base64,{}", inline.data),
        bytes,
        mime_type: inline.mime_type.unwrap_or_else(|| "image/png".to_string()),
    })
}

// Request/Response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiRequestPart>,
}

/// A part in a Gemini request - can be text or inline image data.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiRequestPart {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<String>,
}

impl GeminiRequestPart {
    fn image(input: &str) -> Self {
        GeminiRequestPart::InlineData {
            inline_data: GeminiInlineData {
                mime_type: mime_type_of(input).to_string(),
                data: strip_data_uri(input).to_string(),
            },
        }
    }
}

impl GeminiRequest {
    /// Child photo, adult photo, then the instruction; image output only.
    fn hug(child_image: &str, adult_image: &str) -> Self {
        Self {
            contents: vec![GeminiContent {
                parts: vec![
                    GeminiRequestPart::image(child_image),
                    GeminiRequestPart::image(adult_image),
                    GeminiRequestPart::Text {
                        text: HUG_PROMPT.to_string(),
                    },
                ],
            }],
            generation_config: GeminiConfig {
                response_modalities: vec!["IMAGE".to_string()],
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    data: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::error::ErrorKind;

    fn parse(json: &str) -> GeminiResponse {
        parse_response(json).unwrap()
    }

    fn unreachable_client() -> GeminiClient {
        // Nothing listens on port 9 of localhost; the connect fails fast.
        let config = GenerationConfig::new("k")
            .with_endpoint("http://127.0.0.1:9/v1beta")
            .with_timeout(std::time::Duration::from_secs(5));
        GeminiClient::new(config).unwrap()
    }

    #[test]
    fn test_client_requires_key() {
        let result = GeminiClient::new(GenerationConfig::new(""));
        assert!(matches!(result, Err(GenerationError::Config(_))));

        let client = GeminiClient::new(GenerationConfig::new("test-key")).unwrap();
        assert_eq!(client.model(), "gemini-2.5-flash-image");
    }

    #[test]
    fn test_generate_url() {
        let config = GenerationConfig::new("k").with_endpoint("http://localhost:9999/v1beta/");
        let client = GeminiClient::new(config).unwrap();
        assert_eq!(
            client.generate_url(),
            "http://localhost:9999/v1beta/models/gemini-2.5-flash-image:generateContent"
        );
    }

    #[test]
    fn test_request_shape() {
        let req = GeminiRequest::hug("data:image/jpeg;base64,CHILD", "data:image/png;base64,ADULT");
        let json = serde_json::to_value(&req).unwrap();

        let parts = json["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0]["inlineData"]["data"], "CHILD");
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[1]["inlineData"]["data"], "ADULT");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[2]["text"], HUG_PROMPT);
        assert_eq!(
            json["generationConfig"]["responseModalities"],
            serde_json::json!(["IMAGE"])
        );
        assert!(json.get("generation_config").is_none());
    }

    #[test]
    fn test_request_raw_base64_defaults_to_jpeg() {
        let req = GeminiRequest::hug("/9j/CHILD", "/9j/ADULT");
        let json = serde_json::to_value(&req).unwrap();
        let parts = json["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[0]["inlineData"]["data"], "/9j/CHILD");
    }

    #[test]
    fn test_prompt_describes_composition() {
        assert!(HUG_PROMPT.contains("hugging the child version of themselves"));
        assert!(HUG_PROMPT.contains("pure solid white"));
        assert!(HUG_PROMPT.contains("Do not add frames, text, or artifacts."));
    }

    #[test]
    fn test_extract_first_inline_image() {
        let resp = parse(
            r#"{
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "Here you go"},
                        {"inlineData": {"mimeType": "image/png", "data": "iVBORw0KGgo="}},
                        {"inlineData": {"mimeType": "image/png", "data": "AAAA"}}
                    ]
                },
                "finishReason": "STOP"
            }]
        }"#,
        );
        let image = extract_image(resp).unwrap();
        assert_eq!(image.data_uri, "data:image/png;base64,iVBORw0KGgo=");
        assert_eq!(image.bytes, vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
        assert_eq!(image.mime_type, "image/png");
    }

    #[test]
    fn test_extract_no_inline_image() {
        let resp = parse(r#"{"candidates": [{"content": {"parts": [{"text": "sorry"}]}}]}"#);
        let err = extract_image(resp).unwrap_err();
        assert!(matches!(err, GenerationError::NoImage));
        assert_eq!(err.kind(), ErrorKind::EmptyResult);
        assert_eq!(err.to_string(), "No image generated in the response.");
    }

    #[test]
    fn test_extract_no_candidates() {
        let err = extract_image(parse(r#"{}"#)).unwrap_err();
        assert!(matches!(err, GenerationError::NoImage));
    }

    #[test]
    fn test_extract_undecodable_payload() {
        let resp = parse(
            r#"{"candidates": [{"content": {"parts": [{"inlineData": {"mimeType": "image/png", "data": "not base64!!"}}]}}]}"#,
        );
        let err = extract_image(resp).unwrap_err();
        assert!(matches!(err, GenerationError::UnusableImage(_)));
        assert_eq!(err.kind(), ErrorKind::EmptyResult);
    }

    #[test]
    fn test_extract_prompt_blocked() {
        let resp = parse(
            r#"{
            "candidates": [],
            "promptFeedback": {
                "blockReason": "SAFETY",
                "blockReasonMessage": "Prompt was blocked due to safety"
            }
        }"#,
        );
        let err = extract_image(resp).unwrap_err();
        assert_eq!(
            err.to_string(),
            "No image generated in the response (blocked: Prompt was blocked due to safety)."
        );
        assert_eq!(err.kind(), ErrorKind::EmptyResult);
    }

    #[test]
    fn test_extract_prompt_blocked_without_message() {
        let resp = parse(r#"{"promptFeedback": {"blockReason": "OTHER"}}"#);
        let err = extract_image(resp).unwrap_err();
        assert_eq!(err.to_string(), "No image generated in the response (blocked: OTHER).");
    }

    #[test]
    fn test_extract_safety_finish_reason() {
        let resp = parse(r#"{"candidates": [{"finishReason": "IMAGE_SAFETY"}]}"#);
        let err = extract_image(resp).unwrap_err();
        assert!(matches!(err, GenerationError::ContentBlocked(_)));
        assert_eq!(err.kind(), ErrorKind::EmptyResult);
        assert_eq!(
            err.to_string(),
            "No image generated in the response (blocked: IMAGE_SAFETY)."
        );
    }

    #[test]
    fn test_malformed_body_is_json_error() {
        let err = parse_response("<html>gateway hiccup</html>").unwrap_err();
        assert!(matches!(err, GenerationError::Json(_)));
        assert_eq!(err.kind(), ErrorKind::Transport);

        let err = parse_response(r#"{"candidates": "nope"}"#).unwrap_err();
        assert!(matches!(err, GenerationError::Json(_)));
    }

    #[test]
    fn test_health_check_unreachable() {
        let err = unreachable_client().health_check().unwrap_err();
        assert!(matches!(err, GenerationError::Network(_)));
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_network_error_surfaces_verbatim() {
        let client = unreachable_client();

        let err = client.generate("AAAA", "BBBB").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        match &err {
            GenerationError::Network(inner) => assert_eq!(err.to_string(), inner.to_string()),
            other => panic!("expected network error, got {:?}", other),
        }
    }
}
