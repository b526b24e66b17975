//! Classifier seam and score decoding.

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use signflow_core::{Error, Result};

/// Label reported for a class index outside the label set
pub const UNKNOWN_LABEL: &str = "Unknown";

/// External sequence model.
///
/// Receives one `(sequence_length, feature_length)` window and returns one
/// score per class.
pub trait SequenceClassifier: Send + Sync {
    fn predict(&self, window: ArrayView2<'_, f32>) -> Result<Vec<f32>>;
}

/// Class labels in model output order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMap {
    labels: Vec<String>,
}

impl LabelMap {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Label for `index`, or [`UNKNOWN_LABEL`]
    pub fn label(&self, index: usize) -> &str {
        self.get(index).unwrap_or(UNKNOWN_LABEL)
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }
}

impl From<Vec<String>> for LabelMap {
    fn from(labels: Vec<String>) -> Self {
        Self::new(labels)
    }
}

/// Decoded classifier output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub class_index: usize,
    pub label: String,
    pub confidence: f32,
    /// Confidence strictly above the threshold
    pub accepted: bool,
}

impl Prediction {
    pub fn is_known(&self) -> bool {
        self.label != UNKNOWN_LABEL
    }
}

/// Argmax decoding with a confidence threshold
#[derive(Debug, Clone)]
pub struct PredictionDecoder {
    labels: LabelMap,
    threshold: f32,
}

impl PredictionDecoder {
    pub fn new(labels: LabelMap, threshold: f32) -> Self {
        Self { labels, threshold }
    }

    pub fn labels(&self) -> &LabelMap {
        &self.labels
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn decode(&self, scores: &[f32]) -> Result<Prediction> {
        let (class_index, confidence) = scores
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, s)| s.is_finite())
            .fold(None, |best: Option<(usize, f32)>, (i, s)| match best {
                Some((_, b)) if b >= s => best,
                _ => Some((i, s)),
            })
            .ok_or_else(|| {
                Error::Classifier(format!("no finite scores in {} outputs", scores.len()))
            })?;

        Ok(Prediction {
            class_index,
            label: self.labels.label(class_index).to_string(),
            confidence,
            accepted: confidence > self.threshold,
        })
    }
}
