//! Dataset directory layout.

use std::path::{Path, PathBuf};

use signflow_core::{DatasetConfig, Error, Result};

/// Manifest file name under the dataset root
pub const MANIFEST_FILE: &str = "labels.json";

/// Paths of a dataset rooted at one directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    root: PathBuf,
    actions: Vec<String>,
    sequences_per_action: usize,
    sequence_length: usize,
}

impl DatasetLayout {
    pub fn new(
        root: impl Into<PathBuf>,
        actions: Vec<String>,
        sequences_per_action: usize,
        sequence_length: usize,
    ) -> Result<Self> {
        let config = DatasetConfig {
            root: root.into(),
            actions,
            sequences_per_action,
        };
        Self::from_config(&config, sequence_length)
    }

    pub fn from_config(config: &DatasetConfig, sequence_length: usize) -> Result<Self> {
        config.validate()?;
        if sequence_length == 0 {
            return Err(Error::Config("sequence length must be at least 1".into()));
        }

        Ok(Self {
            root: config.root.clone(),
            actions: config.actions.clone(),
            sequences_per_action: config.sequences_per_action,
            sequence_length,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    /// Class index of an action (its position in the action list)
    pub fn action_index(&self, action: &str) -> Option<usize> {
        self.actions.iter().position(|a| a == action)
    }

    pub fn sequences_per_action(&self) -> usize {
        self.sequences_per_action
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    pub fn action_dir(&self, action: &str) -> PathBuf {
        self.root.join(action)
    }

    pub fn sequence_dir(&self, action: &str, sequence: usize) -> PathBuf {
        self.action_dir(action).join(sequence.to_string())
    }

    pub fn frame_path(&self, action: &str, sequence: usize, frame: usize) -> PathBuf {
        self.sequence_dir(action, sequence)
            .join(format!("{frame}.npy"))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// Create every `<action>/<sequence>` directory
    pub fn prepare(&self) -> Result<()> {
        for action in &self.actions {
            for sequence in 0..self.sequences_per_action {
                std::fs::create_dir_all(self.sequence_dir(action, sequence))?;
            }
        }

        tracing::info!(
            root = %self.root.display(),
            actions = self.actions.len(),
            sequences = self.sequences_per_action,
            "dataset directories prepared"
        );
        Ok(())
    }
}
