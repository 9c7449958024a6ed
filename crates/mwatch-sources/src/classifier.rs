//! Sentiment and language classification.
//!
//! [`HttpClassifier`] posts text to a sentiment model endpoint and falls back
//! to the lexicon when the endpoint fails. [`LexiconClassifier`] is used
//! directly when no endpoint is configured.

use std::sync::Arc;

use async_trait::async_trait;
use mwatch_core::Sentiment;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::http::build_client;
use crate::language::detect_language;
use crate::scorer::lexicon_score;
use crate::types::SourcesConfig;

/// Longest text, in characters, sent to the model.
pub const MAX_TEXT_CHARS: usize = 512;

const FALLBACK_POLAR_CONFIDENCE: f64 = 0.4;
const FALLBACK_NEUTRAL_CONFIDENCE: f64 = 0.2;

#[async_trait]
pub trait TextClassifier: Send + Sync {
    /// Classify `text`. Never fails: implementations degrade to a neutral or
    /// lexicon result.
    async fn classify(&self, text: &str) -> Sentiment;

    fn language(&self, text: &str) -> String {
        detect_language(text).to_string()
    }
}

/// Word-list classifier with fixed confidences.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconClassifier;

impl LexiconClassifier {
    #[must_use]
    pub fn score(text: &str) -> Sentiment {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Sentiment::neutral(0.0);
        }
        let score = lexicon_score(trimmed);
        let (label, confidence) = if score > 0.0 {
            ("positive", FALLBACK_POLAR_CONFIDENCE)
        } else if score < 0.0 {
            ("negative", FALLBACK_POLAR_CONFIDENCE)
        } else {
            ("neutral", FALLBACK_NEUTRAL_CONFIDENCE)
        };
        Sentiment {
            label: label.to_string(),
            confidence,
        }
    }
}

#[async_trait]
impl TextClassifier for LexiconClassifier {
    async fn classify(&self, text: &str) -> Sentiment {
        Self::score(text)
    }
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    inputs: &'a str,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    label: String,
    score: f64,
}

/// Models answer `[{label, score}]`, or `[[{label, score}]]` when they echo
/// batch shape.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PredictResponse {
    Flat(Vec<Prediction>),
    Nested(Vec<Vec<Prediction>>),
}

/// Client for a text-classification endpoint (`POST {url}/predict`).
pub struct HttpClassifier {
    client: reqwest::Client,
    url: String,
}

impl HttpClassifier {
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            url: format!("{}/predict", base_url.trim_end_matches('/')),
        }
    }

    /// Ask the model for the top label of `text`, truncated to
    /// [`MAX_TEXT_CHARS`].
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Classifier`] if the request fails, the status is
    /// not 2xx, or the response holds no prediction.
    pub async fn predict(&self, text: &str) -> Result<Sentiment, SourceError> {
        let truncated: String = text.chars().take(MAX_TEXT_CHARS).collect();
        let response = self
            .client
            .post(&self.url)
            .json(&PredictRequest { inputs: &truncated })
            .send()
            .await
            .map_err(|e| SourceError::Classifier(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(SourceError::Classifier(format!(
                "model returned status {}",
                response.status()
            )));
        }

        let body: PredictResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Classifier(format!("response parse error: {e}")))?;

        let predictions = match body {
            PredictResponse::Flat(p) => p,
            PredictResponse::Nested(p) => p.into_iter().flatten().collect(),
        };

        let top = predictions
            .into_iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
            .ok_or_else(|| SourceError::Classifier("empty prediction list".to_string()))?;

        Ok(Sentiment {
            label: top.label.to_lowercase(),
            confidence: top.score,
        })
    }
}

#[async_trait]
impl TextClassifier for HttpClassifier {
    async fn classify(&self, text: &str) -> Sentiment {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Sentiment::neutral(0.0);
        }
        match self.predict(trimmed).await {
            Ok(sentiment) => sentiment,
            Err(e) => {
                tracing::warn!(error = %e, "sentiment model unavailable, using lexicon");
                LexiconClassifier::score(trimmed)
            }
        }
    }
}

/// Pick the classifier for this deployment.
///
/// # Errors
///
/// Returns [`SourceError::Http`] if the HTTP client cannot be built.
pub fn classifier_from_config(
    config: &SourcesConfig,
) -> Result<Arc<dyn TextClassifier>, SourceError> {
    match config.classifier_url.as_deref() {
        Some(url) => Ok(Arc::new(HttpClassifier::new(build_client(config)?, url))),
        None => Ok(Arc::new(LexiconClassifier)),
    }
}
