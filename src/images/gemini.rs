//! Gemini `generateContent` client.
//!
//! Only the slice of the API needed for image generation is modelled: a single
//! text prompt goes in with image output requested, and the first candidate's
//! parts come back with their inline data decoded from base64.

use super::{ImageGenerator, Part};
use anyhow::{anyhow, Context, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Generated images are returned inline, so responses run to several megabytes.
const MAX_RESPONSE_BYTES: u64 = 64 * 1024 * 1024;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

pub struct Gemini {
    agent: ureq::Agent,
    api_key: String,
    model: String,
}

impl std::fmt::Debug for Gemini {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gemini").field("model", &self.model).finish()
    }
}

impl Gemini {
    pub fn new<K: ToString, M: ToString>(api_key: K, model: M) -> Gemini {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build()
            .into();
        Gemini {
            agent,
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{API_BASE}/{}:generateContent", self.model)
    }
}

impl ImageGenerator for Gemini {
    fn generate(&mut self, prompt: &str) -> Result<Vec<Part>> {
        let request = GenerateContentRequest::new(prompt);
        let mut response = self
            .agent
            .post(&self.endpoint())
            .header("x-goog-api-key", self.api_key.as_str())
            .send_json(&request)
            .with_context(|| format!("Gemini request to {} failed", self.model))?;

        let body: GenerateContentResponse = response
            .body_mut()
            .with_config()
            .limit(MAX_RESPONSE_BYTES)
            .read_json()
            .with_context(|| "Failed to parse Gemini response")?;

        body.into_parts()
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Debug)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize, Debug)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
}

impl<'a> GenerateContentRequest<'a> {
    fn new(prompt: &'a str) -> Self {
        GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["IMAGE", "TEXT"],
            },
        }
    }
}

#[derive(Deserialize, Debug, Default)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

impl GenerateContentResponse {
    fn into_parts(self) -> Result<Vec<Part>> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Gemini response contained no candidates"))?;
        let content = candidate
            .content
            .ok_or_else(|| anyhow!("Gemini candidate has no content"))?;

        let mut parts = Vec::with_capacity(content.parts.len());
        for part in content.parts {
            if let Some(inline) = part.inline_data {
                let data = base64::engine::general_purpose::STANDARD
                    .decode(inline.data.as_bytes())
                    .with_context(|| {
                        format!("Failed to decode {} inline data", inline.mime_type)
                    })?;
                parts.push(Part::InlineData {
                    mime_type: inline.mime_type,
                    data,
                });
            } else if let Some(text) = part.text {
                parts.push(Part::Text(text));
            }
        }
        Ok(parts)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn request_uses_camel_case_wire_names() {
        let request = GenerateContentRequest::new("a lighthouse at dusk");
        let json = serde_json::to_value(&request).expect("can serialize request");
        assert_eq!(
            json,
            serde_json::json!({
                "contents": [{ "parts": [{ "text": "a lighthouse at dusk" }] }],
                "generationConfig": { "responseModalities": ["IMAGE", "TEXT"] }
            })
        );
    }

    #[test]
    fn response_parts_are_decoded() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "text": "Here is your image" },
                        { "inlineData": { "mimeType": "image/png", "data": "iVBORw==" } }
                    ]
                },
                "finishReason": "STOP"
            }]
        }))
        .expect("can parse response");

        let parts = response.into_parts().expect("can convert parts");
        assert_eq!(
            parts,
            vec![
                Part::Text("Here is your image".to_string()),
                Part::InlineData {
                    mime_type: "image/png".to_string(),
                    data: vec![0x89, b'P', b'N', b'G'],
                },
            ]
        );
    }

    #[test]
    fn empty_candidates_are_an_error() {
        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#)
                .expect("can parse response");
        assert!(response.into_parts().is_err());
    }

    #[test]
    fn endpoint_names_the_model() {
        let gemini = Gemini::new("key", "gemini-2.0-flash-exp-image-generation");
        assert_eq!(
            gemini.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash-exp-image-generation:generateContent"
        );
        assert!(!format!("{gemini:?}").contains("api_key"));
    }
}
