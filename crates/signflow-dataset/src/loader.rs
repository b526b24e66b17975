//! Rebuilding training tensors from recorded sequences.

use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

use signflow_core::{Error, Result, SignflowConfig};

use crate::layout::DatasetLayout;
use crate::npy;

/// What the loader had to repair or skip
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub sequences_loaded: usize,
    /// `(action, sequence)` pairs with fewer than `min_frames` frames on disk
    pub sequences_skipped: Vec<(String, usize)>,
    /// Missing or unreadable frames replaced by zeros
    pub frames_zero_filled: usize,
    /// Frames truncated or zero-padded to the feature length
    pub frames_resized: usize,
}

/// Training tensors: `sequences` has shape `(S, N, F)` and `labels[i]` is
/// the class index of sequence `i`
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub sequences: Array3<f32>,
    pub labels: Vec<usize>,
    pub actions: Vec<String>,
    pub report: LoadReport,
}

impl LoadedDataset {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels as one-hot rows of shape `(S, classes)`
    pub fn one_hot_labels(&self) -> Array2<f32> {
        let mut out = Array2::zeros((self.labels.len(), self.actions.len()));
        for (row, label) in self.labels.iter().enumerate() {
            if *label < self.actions.len() {
                out[[row, *label]] = 1.0;
            }
        }
        out
    }
}

/// Reads `<root>/<action>/<sequence>/<frame>.npy` into training tensors
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    layout: DatasetLayout,
    feature_length: usize,
    min_frames: usize,
}

impl DatasetLoader {
    pub fn new(layout: DatasetLayout, feature_length: usize, min_frames: usize) -> Result<Self> {
        if feature_length == 0 {
            return Err(Error::Config("feature length must be at least 1".into()));
        }
        if min_frames == 0 || min_frames > layout.sequence_length() {
            return Err(Error::Config(format!(
                "min_frames must be in 1..={}, got {min_frames}",
                layout.sequence_length()
            )));
        }

        Ok(Self {
            layout,
            feature_length,
            min_frames,
        })
    }

    pub fn from_config(config: &SignflowConfig) -> Result<Self> {
        config.window.validate()?;
        let feature_length = config.schema.layout()?.feature_length();
        let layout = DatasetLayout::from_config(&config.dataset, config.window.sequence_length)?;
        Self::new(layout, feature_length, config.window.min_frames)
    }

    pub fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    /// Load every sequence of every action.
    ///
    /// Missing frames become zero frames and wrongly sized frames are
    /// truncated or zero-padded. A sequence with fewer than `min_frames`
    /// readable frames is skipped. Fails with [`Error::EmptyDataset`] when
    /// nothing could be loaded.
    pub fn load(&self) -> Result<LoadedDataset> {
        let n = self.layout.sequence_length();
        let f = self.feature_length;

        let mut data: Vec<f32> = Vec::new();
        let mut labels = Vec::new();
        let mut report = LoadReport::default();

        for (class, action) in self.layout.actions().iter().enumerate() {
            for sequence in 0..self.layout.sequences_per_action() {
                let Some(frames) = self.load_sequence(action, sequence, &mut report) else {
                    report.sequences_skipped.push((action.clone(), sequence));
                    continue;
                };
                data.extend(frames);
                labels.push(class);
            }
        }

        if labels.is_empty() {
            return Err(Error::EmptyDataset(
                self.layout.root().display().to_string(),
            ));
        }

        report.sequences_loaded = labels.len();
        let sequences = Array3::from_shape_vec((labels.len(), n, f), data)
            .map_err(|e| Error::Dataset(format!("tensor assembly failed: {e}")))?;

        tracing::info!(
            root = %self.layout.root().display(),
            loaded = report.sequences_loaded,
            skipped = report.sequences_skipped.len(),
            zero_filled = report.frames_zero_filled,
            resized = report.frames_resized,
            "dataset loaded"
        );

        Ok(LoadedDataset {
            sequences,
            labels,
            actions: self.layout.actions().to_vec(),
            report,
        })
    }

    fn load_sequence(
        &self,
        action: &str,
        sequence: usize,
        report: &mut LoadReport,
    ) -> Option<Vec<f32>> {
        let n = self.layout.sequence_length();
        let f = self.feature_length;

        let mut frames = Vec::with_capacity(n * f);
        let mut present = 0;
        let mut zero_filled = 0;
        let mut resized = 0;

        for frame in 0..n {
            let path = self.layout.frame_path(action, sequence, frame);
            let mut values = match npy::read_frame(&path) {
                Ok(values) => {
                    present += 1;
                    values
                }
                Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::warn!(path = %path.display(), "missing frame, using zeros");
                    zero_filled += 1;
                    vec![0.0; f]
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "unreadable frame, using zeros"
                    );
                    zero_filled += 1;
                    vec![0.0; f]
                }
            };

            if values.len() != f {
                tracing::warn!(
                    path = %path.display(),
                    expected = f,
                    actual = values.len(),
                    "frame length mismatch, resizing"
                );
                values.resize(f, 0.0);
                resized += 1;
            }
            frames.extend(values);
        }

        if present < self.min_frames {
            tracing::warn!(
                action,
                sequence,
                present,
                min_frames = self.min_frames,
                "skipping short sequence"
            );
            return None;
        }

        report.frames_zero_filled += zero_filled;
        report.frames_resized += resized;
        Some(frames)
    }
}
