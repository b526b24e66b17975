//! Persisting recorded segment windows.

use std::path::PathBuf;

use signflow_core::{Error, FeatureVector, Result};
use signflow_sequence::SequenceWindow;

use crate::layout::DatasetLayout;
use crate::manifest::{self, DatasetManifest};
use crate::npy;

/// Writes labeled windows as one NPY file per frame
#[derive(Debug, Clone)]
pub struct DatasetWriter {
    layout: DatasetLayout,
    feature_length: usize,
}

impl DatasetWriter {
    pub fn new(layout: DatasetLayout, feature_length: usize) -> Self {
        Self {
            layout,
            feature_length,
        }
    }

    pub fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    /// Write every frame of a segment window; returns the sequence directory
    pub fn write_window(&self, window: &SequenceWindow) -> Result<PathBuf> {
        let tag = window
            .tag()
            .ok_or_else(|| Error::Dataset("cannot store an unlabeled window".into()))?;

        if self.layout.action_index(&tag.label).is_none() {
            return Err(Error::Dataset(format!(
                "action {:?} is not part of the dataset",
                tag.label
            )));
        }
        if tag.sequence_index >= self.layout.sequences_per_action() {
            return Err(Error::Dataset(format!(
                "sequence index {} out of range (0..{})",
                tag.sequence_index,
                self.layout.sequences_per_action()
            )));
        }
        if window.len() != self.layout.sequence_length() {
            return Err(Error::Dataset(format!(
                "window holds {} frames, dataset expects {}",
                window.len(),
                self.layout.sequence_length()
            )));
        }

        let dir = self.layout.sequence_dir(&tag.label, tag.sequence_index);
        std::fs::create_dir_all(&dir)?;

        for (index, frame) in window.frames().iter().enumerate() {
            self.write_frame(&tag.label, tag.sequence_index, index, frame)?;
        }

        tracing::info!(
            action = %tag.label,
            sequence = tag.sequence_index,
            frames = window.len(),
            padded = window.padded_frames(),
            "sequence written"
        );
        Ok(dir)
    }

    pub fn write_frame(
        &self,
        action: &str,
        sequence: usize,
        frame: usize,
        features: &FeatureVector,
    ) -> Result<()> {
        if features.len() != self.feature_length {
            return Err(Error::FeatureLength {
                expected: self.feature_length,
                actual: features.len(),
            });
        }
        npy::write_frame(
            &self.layout.frame_path(action, sequence, frame),
            features.as_slice(),
        )
    }

    pub fn write_manifest(&self) -> Result<PathBuf> {
        std::fs::create_dir_all(self.layout.root())?;
        let path = self.layout.manifest_path();
        let contents = DatasetManifest::new(&self.layout, self.feature_length);
        manifest::write_manifest(&path, &contents)?;
        Ok(path)
    }
}
