//! Vision-model collaborators that read a result screen into raw rows.
//!
//! This module provides:
//! - Screenshot loading and PNG encoding (`CapturedImage`)
//! - The extractor seam (`VisionExtractor`) and its Gemini/OpenAI clients
//! - Lenient parsing of the model's text reply (`response`)
//!
//! Rows come back untrusted; `extraction::normalize` validates them.

pub mod gemini;
pub mod openai;
pub mod prompt;
pub mod response;

use std::io::Cursor;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use serde_json::Value;

use crate::config::{VisionConfig, VisionProvider};
use crate::scoring::ScoringMode;

pub use gemini::GeminiExtractor;
pub use openai::OpenAiExtractor;

/// What the vision model returned for one screenshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// Raw rows, still to be normalized.
    Records(Vec<Value>),
    /// The model (or the transport) reported an error. Never applied.
    Failed(String),
}

/// A screenshot encoded as PNG, ready to upload.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl CapturedImage {
    /// Loads an image file, downscaling so neither side exceeds `max_side`.
    pub fn load(path: &Path, max_side: u32) -> Result<Self> {
        let img = image::open(path)
            .with_context(|| format!("Failed to open screenshot {}", path.display()))?;
        Self::from_image(img, max_side)
    }

    pub fn from_image(img: DynamicImage, max_side: u32) -> Result<Self> {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(anyhow!("Screenshot is empty ({}x{})", width, height));
        }

        let img = if max_side > 0 && width.max(height) > max_side {
            img.resize(max_side, max_side, FilterType::Triangle)
        } else {
            img
        };
        let (width, height) = img.dimensions();

        let mut png = Cursor::new(Vec::new());
        img.write_to(&mut png, ImageFormat::Png)
            .context("Failed to encode screenshot as PNG")?;

        Ok(Self {
            png: png.into_inner(),
            width,
            height,
        })
    }

    pub fn base64(&self) -> String {
        STANDARD.encode(&self.png)
    }
}

/// Reads one result screen.
///
/// Implementations never return transport errors directly; they come back
/// as [`Extraction::Failed`] so the caller treats them as a no-op.
pub trait VisionExtractor: Send {
    fn extract(&self, image: &CapturedImage, mode: ScoringMode) -> Extraction;
}

/// Builds the extractor selected in the config.
pub fn build_extractor(config: &VisionConfig, infer_teams: bool) -> Result<Box<dyn VisionExtractor>> {
    if config.api_key.trim().is_empty() {
        return Err(anyhow!(
            "No API key configured for {:?}. Set vision.api_key in config.json or the {} environment variable.",
            config.provider,
            config.provider.api_key_env()
        ));
    }

    Ok(match config.provider {
        VisionProvider::Gemini => Box::new(GeminiExtractor::new(config, infer_teams)?),
        VisionProvider::Openai => Box::new(OpenAiExtractor::new(config, infer_teams)?),
    })
}
