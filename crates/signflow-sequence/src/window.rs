//! Completed sequence windows.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use signflow_core::FeatureVector;

/// Label and sequence index of a recorded segment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowTag {
    pub label: String,
    pub sequence_index: usize,
}

impl WindowTag {
    pub fn new(label: impl Into<String>, sequence_index: usize) -> Self {
        Self {
            label: label.into(),
            sequence_index,
        }
    }
}

/// Exactly `N` feature vectors in frame arrival order.
///
/// Segment windows carry a [`WindowTag`]; sliding windows do not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceWindow {
    tag: Option<WindowTag>,
    frames: Vec<FeatureVector>,
    /// Frames that came from the stream (the rest are zero padding)
    captured: usize,
}

impl SequenceWindow {
    pub(crate) fn new(tag: Option<WindowTag>, frames: Vec<FeatureVector>, captured: usize) -> Self {
        Self {
            tag,
            frames,
            captured,
        }
    }

    pub fn tag(&self) -> Option<&WindowTag> {
        self.tag.as_ref()
    }

    pub fn label(&self) -> Option<&str> {
        self.tag.as_ref().map(|t| t.label.as_str())
    }

    pub fn frames(&self) -> &[FeatureVector] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of frames captured before padding
    pub fn captured_frames(&self) -> usize {
        self.captured
    }

    pub fn padded_frames(&self) -> usize {
        self.frames.len() - self.captured
    }

    pub fn feature_length(&self) -> usize {
        self.frames.first().map(|f| f.len()).unwrap_or(0)
    }

    /// Row-major `sequence_length × feature_length` scalars
    pub fn flatten(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.len() * self.feature_length());
        for frame in &self.frames {
            out.extend_from_slice(frame.as_slice());
        }
        out
    }

    /// Model input of shape `(sequence_length, feature_length)`
    pub fn to_array(&self) -> Array2<f32> {
        let shape = (self.len(), self.feature_length());
        Array2::from_shape_vec(shape, self.flatten())
            .unwrap_or_else(|_| Array2::zeros(shape))
    }
}
