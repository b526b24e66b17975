//! Label manifest (`labels.json`).

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use signflow_core::{Error, Result};

use crate::layout::DatasetLayout;

/// Action → class index mapping plus the tensor geometry of the dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub labels: BTreeMap<String, usize>,
    pub sequence_length: usize,
    pub feature_length: usize,
    pub sequences_per_action: usize,
    pub created_at: DateTime<Utc>,
}

impl DatasetManifest {
    pub fn new(layout: &DatasetLayout, feature_length: usize) -> Self {
        Self {
            labels: layout
                .actions()
                .iter()
                .enumerate()
                .map(|(i, a)| (a.clone(), i))
                .collect(),
            sequence_length: layout.sequence_length(),
            feature_length,
            sequences_per_action: layout.sequences_per_action(),
            created_at: Utc::now(),
        }
    }

    /// Action names ordered by class index
    pub fn actions(&self) -> Vec<String> {
        let mut pairs: Vec<(&String, &usize)> = self.labels.iter().collect();
        pairs.sort_by_key(|(_, idx)| **idx);
        pairs.into_iter().map(|(a, _)| a.clone()).collect()
    }

    /// Class indices must be exactly `0..labels.len()`
    pub fn validate(&self) -> Result<()> {
        let mut indices: Vec<usize> = self.labels.values().copied().collect();
        indices.sort_unstable();
        if indices.iter().enumerate().any(|(i, idx)| i != *idx) {
            return Err(Error::Dataset(format!(
                "manifest class indices are not contiguous: {indices:?}"
            )));
        }
        Ok(())
    }
}

pub fn write_manifest(path: &Path, manifest: &DatasetManifest) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, manifest)?;
    tracing::debug!(path = %path.display(), labels = manifest.labels.len(), "manifest written");
    Ok(())
}

pub fn read_manifest(path: &Path) -> Result<DatasetManifest> {
    let reader = BufReader::new(File::open(path)?);
    let manifest: DatasetManifest = serde_json::from_reader(reader)?;
    manifest.validate()?;
    Ok(manifest)
}
