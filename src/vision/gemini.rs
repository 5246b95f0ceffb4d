//! Google Gemini `generateContent` client.

use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use super::prompt::prompt_for;
use super::response::parse_model_text;
use super::{CapturedImage, Extraction, VisionExtractor};
use crate::config::VisionConfig;
use crate::scoring::ScoringMode;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    temperature: f32,
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

pub struct GeminiExtractor {
    client: Client,
    endpoint: String,
    api_key: String,
    infer_teams: bool,
}

impl GeminiExtractor {
    pub fn new(config: &VisionConfig, infer_teams: bool) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build Gemini HTTP client")?;

        let base = if config.base_url.trim().is_empty() {
            DEFAULT_BASE_URL
        } else {
            config.base_url.trim()
        };

        Ok(Self {
            client,
            endpoint: format!(
                "{}/models/{}:generateContent",
                base.trim_end_matches('/'),
                config.model
            ),
            api_key: config.api_key.clone(),
            infer_teams,
        })
    }

    fn request(&self, image: &CapturedImage, mode: ScoringMode) -> Result<String> {
        let prompt = prompt_for(mode, self.infer_teams);
        let body = build_request(&prompt, image);

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .context("Gemini request failed")?;

        let status = response.status();
        let text = response.text().context("Failed to read Gemini response")?;
        if !status.is_success() {
            anyhow::bail!("Gemini returned {}: {}", status, text);
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&text).context("Gemini response is not valid JSON")?;
        Ok(collect_text(parsed))
    }
}

impl VisionExtractor for GeminiExtractor {
    fn extract(&self, image: &CapturedImage, mode: ScoringMode) -> Extraction {
        match self.request(image, mode) {
            Ok(text) => {
                debug!("Gemini reply: {}", text);
                parse_model_text(&text)
            }
            Err(e) => {
                warn!("Gemini extraction failed: {:#}", e);
                Extraction::Failed(format!("{:#}", e))
            }
        }
    }
}

fn build_request<'a>(prompt: &'a str, image: &CapturedImage) -> GenerateRequest<'a> {
    GenerateRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![
                Part::Text { text: prompt },
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: "image/png",
                        data: image.base64(),
                    },
                },
            ],
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
            temperature: 0.0,
        },
    }
}

fn collect_text(response: GenerateResponse) -> String {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tiny_image() -> CapturedImage {
        CapturedImage {
            png: vec![1, 2, 3],
            width: 1,
            height: 1,
        }
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(build_request("read it", &tiny_image())).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        {"text": "read it"},
                        {"inlineData": {"mimeType": "image/png", "data": "AQID"}}
                    ]
                }],
                "generationConfig": {"responseMimeType": "application/json", "temperature": 0.0}
            })
        );
    }

    #[test]
    fn test_collect_text_joins_parts() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "[{\"name\":"}, {"text": "\"a\"}]"}]}}]
        }))
        .unwrap();
        assert_eq!(collect_text(response), "[{\"name\":\"a\"}]");
    }

    #[test]
    fn test_collect_text_without_candidates() {
        let response: GenerateResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(collect_text(response), "");
    }

    #[test]
    fn test_endpoint_uses_model_and_base() {
        let config = VisionConfig {
            api_key: "k".to_string(),
            model: "gemini-test".to_string(),
            base_url: "http://localhost:9/v1beta/".to_string(),
            ..VisionConfig::default()
        };
        let extractor = GeminiExtractor::new(&config, false).unwrap();
        assert_eq!(
            extractor.endpoint,
            "http://localhost:9/v1beta/models/gemini-test:generateContent"
        );
    }

    #[test]
    fn test_unreachable_endpoint_is_failed_extraction() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let config = VisionConfig {
            api_key: "k".to_string(),
            base_url: base,
            timeout_secs: 2,
            ..VisionConfig::default()
        };
        let extractor = GeminiExtractor::new(&config, false).unwrap();
        assert!(matches!(
            extractor.extract(&tiny_image(), ScoringMode::Race),
            Extraction::Failed(_)
        ));
    }
}
