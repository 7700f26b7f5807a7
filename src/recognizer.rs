// 🔎 Recognizer Adapter - text recognition as a swappable capability
//
// The adapter returns fragments exactly as the underlying capability
// produced them. No reordering, no filtering: that is the normalizer's job.

use crate::error::{Result, TollError};
use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, ImageFormat};
use log::debug;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::time::Duration;

// ============================================================================
// RECOGNITION RESULT
// ============================================================================

/// One piece of recognized text with its confidence in [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub text: String,
    pub confidence: f64,
}

impl Fragment {
    pub fn new(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// Text recognition capability: pixels in, ordered fragments out
pub trait Recognizer: Send + Sync {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<Fragment>>;
}

// ============================================================================
// HTTP SIDECAR
// ============================================================================

#[derive(Serialize)]
struct ImageRequest {
    image_base64: String,
}

#[derive(Deserialize)]
struct TextBox {
    text: String,
    score: f64,
}

#[derive(Deserialize)]
struct OcrResponse {
    boxes: Vec<TextBox>,
}

/// Talks to an OCR server over HTTP (frame sent as base64 PNG)
pub struct HttpRecognizer {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpRecognizer {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TollError::RecognitionUnavailable(format!("client setup: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    fn encode_png(image: &DynamicImage) -> Result<String> {
        let mut buf = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| TollError::RecognitionUnavailable(format!("frame encoding: {}", e)))?;
        Ok(general_purpose::STANDARD.encode(&buf))
    }
}

impl Recognizer for HttpRecognizer {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<Fragment>> {
        let request = ImageRequest {
            image_base64: Self::encode_png(image)?,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| TollError::RecognitionUnavailable(e.to_string()))?;

        let body: OcrResponse = response
            .json()
            .map_err(|e| TollError::RecognitionUnavailable(format!("bad OCR response: {}", e)))?;

        debug!("OCR server returned {} boxes", body.boxes.len());

        Ok(body
            .boxes
            .into_iter()
            .map(|b| Fragment::new(b.text, b.score))
            .collect())
    }
}

// ============================================================================
// UNCONFIGURED / FIXED
// ============================================================================

/// Stand-in when no recognizer has been configured
pub struct UnconfiguredRecognizer;

impl Recognizer for UnconfiguredRecognizer {
    fn recognize(&self, _image: &DynamicImage) -> Result<Vec<Fragment>> {
        Err(TollError::RecognitionUnavailable(
            "recognizer not initialized (set recognizer_url)".to_string(),
        ))
    }
}

/// Deterministic recognizer that always returns the same fragments
#[derive(Debug, Clone, Default)]
pub struct FixedRecognizer {
    fragments: Vec<Fragment>,
}

impl FixedRecognizer {
    pub fn new(fragments: Vec<Fragment>) -> Self {
        Self { fragments }
    }

    /// Single fully-confident fragment
    pub fn plate(text: &str) -> Self {
        Self::new(vec![Fragment::new(text, 0.99)])
    }
}

impl Recognizer for FixedRecognizer {
    fn recognize(&self, _image: &DynamicImage) -> Result<Vec<Fragment>> {
        Ok(self.fragments.clone())
    }
}
