//! OpenAI-compatible chat completions client.

use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::prompt::prompt_for;
use super::response::parse_model_text;
use super::{CapturedImage, Extraction, VisionExtractor};
use crate::config::VisionConfig;
use crate::scoring::ScoringMode;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

pub struct OpenAiExtractor {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    infer_teams: bool,
}

impl OpenAiExtractor {
    pub fn new(config: &VisionConfig, infer_teams: bool) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build OpenAI HTTP client")?;

        let base = if config.base_url.trim().is_empty() {
            DEFAULT_BASE_URL
        } else {
            config.base_url.trim()
        };

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            infer_teams,
        })
    }

    fn request(&self, image: &CapturedImage, mode: ScoringMode) -> Result<String> {
        let prompt = prompt_for(mode, self.infer_teams);
        let body = build_request(&self.model, &prompt, image);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .context("OpenAI request failed")?;

        let status = response.status();
        let text = response.text().context("Failed to read OpenAI response")?;
        if !status.is_success() {
            anyhow::bail!("OpenAI returned {}: {}", status, text);
        }

        let parsed: ChatResponse =
            serde_json::from_str(&text).context("OpenAI response is not valid JSON")?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}

impl VisionExtractor for OpenAiExtractor {
    fn extract(&self, image: &CapturedImage, mode: ScoringMode) -> Extraction {
        match self.request(image, mode) {
            Ok(text) => {
                debug!("OpenAI reply: {}", text);
                parse_model_text(&text)
            }
            Err(e) => {
                warn!("OpenAI extraction failed: {:#}", e);
                Extraction::Failed(format!("{:#}", e))
            }
        }
    }
}

fn build_request(model: &str, prompt: &str, image: &CapturedImage) -> Value {
    json!({
        "model": model,
        "temperature": 0,
        "response_format": {"type": "json_object"},
        "messages": [{
            "role": "user",
            "content": [
                {"type": "text", "text": prompt},
                {
                    "type": "image_url",
                    "image_url": {"url": format!("data:image/png;base64,{}", image.base64())}
                }
            ]
        }]
    })
}
