//! Pipeline configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::layout::FeatureLayout;
use crate::types::EntityKind;

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignflowConfig {
    /// Landmark stabilizer (Kalman + EMA)
    pub stabilizer: StabilizerConfig,

    /// Sequence window framing
    pub window: WindowConfig,

    /// Per-entity point counts of the feature layout
    pub schema: SchemaConfig,

    /// Live recognition
    pub recognition: RecognitionConfig,

    /// On-disk training data
    pub dataset: DatasetConfig,
}

/// Which position components the Kalman filter tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterDimensions {
    Xy,
    Xyz,
}

impl FilterDimensions {
    pub fn count(&self) -> usize {
        match self {
            FilterDimensions::Xy => 2,
            FilterDimensions::Xyz => 3,
        }
    }
}

/// What an undetected entity contributes to the feature vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcclusionPolicy {
    /// Zero placeholders, identical to the layout used for training data
    ZeroFill,
    /// Predicted estimates for slots whose filter has been initialized.
    ///
    /// Predictions extrapolate the last velocity, so long occlusions can
    /// leave the normalized range, and with EMA enabled the drift carries
    /// into the first frames after re-acquisition.
    Predicted,
}

/// Window framing policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferMode {
    /// Fixed non-overlapping windows (recording labeled training data)
    Segment,
    /// Continuously available latest window (live recognition)
    Sliding,
}

impl BufferMode {
    pub fn name(&self) -> &'static str {
        match self {
            BufferMode::Segment => "segment",
            BufferMode::Sliding => "sliding",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizerConfig {
    /// Process noise variance (Q diagonal)
    pub process_noise: f64,

    /// Measurement noise variance (R diagonal)
    pub measurement_noise: f64,

    /// Initial state covariance (P diagonal) when a slot is first observed
    pub initial_covariance: f64,

    /// EMA smoothing factor in (0, 1]; `None` disables smoothing
    pub ema_alpha: Option<f64>,

    /// Filtered position components
    pub dimensions: FilterDimensions,

    /// Entities routed through a filter bank; others pass through raw
    pub filtered_entities: Vec<EntityKind>,

    /// Feature contribution of undetected entities
    pub occlusion: OcclusionPolicy,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            process_noise: 0.1,
            measurement_noise: 10.0,
            initial_covariance: 1000.0,
            ema_alpha: Some(0.6),
            dimensions: FilterDimensions::Xy,
            filtered_entities: vec![EntityKind::LeftHand, EntityKind::RightHand],
            occlusion: OcclusionPolicy::ZeroFill,
        }
    }
}

impl StabilizerConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("process_noise", self.process_noise),
            ("measurement_noise", self.measurement_noise),
            ("initial_covariance", self.initial_covariance),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::Config(format!(
                    "stabilizer.{name} must be finite and positive, got {value}"
                )));
            }
        }

        if let Some(alpha) = self.ema_alpha {
            if !(alpha > 0.0 && alpha <= 1.0) {
                return Err(Error::Config(format!(
                    "stabilizer.ema_alpha must be in (0, 1], got {alpha}"
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Frames per window (N)
    pub sequence_length: usize,

    /// Minimum captured frames for a segment to be kept (M <= N)
    pub min_frames: usize,

    /// Framing policy
    pub mode: BufferMode,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            sequence_length: 30,
            min_frames: 20,
            mode: BufferMode::Segment,
        }
    }
}

impl WindowConfig {
    pub fn segment(sequence_length: usize, min_frames: usize) -> Self {
        Self {
            sequence_length,
            min_frames,
            mode: BufferMode::Segment,
        }
    }

    pub fn sliding(sequence_length: usize) -> Self {
        Self {
            sequence_length,
            min_frames: sequence_length,
            mode: BufferMode::Sliding,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.sequence_length == 0 {
            return Err(Error::Config(
                "window.sequence_length must be at least 1".into(),
            ));
        }
        if self.min_frames == 0 || self.min_frames > self.sequence_length {
            return Err(Error::Config(format!(
                "window.min_frames must be in 1..={}, got {}",
                self.sequence_length, self.min_frames
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    pub pose_points: usize,
    pub face_points: usize,
    pub left_hand_points: usize,
    pub right_hand_points: usize,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            pose_points: FeatureLayout::POSE_POINTS,
            face_points: FeatureLayout::FACE_POINTS,
            left_hand_points: FeatureLayout::HAND_POINTS,
            right_hand_points: FeatureLayout::HAND_POINTS,
        }
    }
}

impl SchemaConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, count) in [
            ("pose_points", self.pose_points),
            ("face_points", self.face_points),
            ("left_hand_points", self.left_hand_points),
            ("right_hand_points", self.right_hand_points),
        ] {
            if count == 0 {
                return Err(Error::Config(format!("schema.{name} must be at least 1")));
            }
        }
        Ok(())
    }

    pub fn layout(&self) -> Result<FeatureLayout> {
        self.validate()?;
        FeatureLayout::from_counts(
            self.pose_points,
            self.face_points,
            self.left_hand_points,
            self.right_hand_points,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Minimum top-class score for a prediction to be accepted
    pub confidence_threshold: f32,

    /// Repeats of the same label within this interval are suppressed
    pub debounce_secs: f64,

    /// Class labels in model output order
    pub labels: Vec<String>,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.65,
            debounce_secs: 1.0,
            labels: DatasetConfig::default().actions,
        }
    }
}

impl RecognitionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(Error::Config(format!(
                "recognition.confidence_threshold must be in [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        if !self.debounce_secs.is_finite() || self.debounce_secs < 0.0 {
            return Err(Error::Config(format!(
                "recognition.debounce_secs must be non-negative, got {}",
                self.debounce_secs
            )));
        }
        if self.labels.is_empty() {
            return Err(Error::Config("recognition.labels must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Dataset root directory
    pub root: PathBuf,

    /// Action labels, one directory each
    pub actions: Vec<String>,

    /// Recorded sequences per action
    pub sequences_per_action: usize,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("MP_Data"),
            actions: vec![
                "thanks".to_string(),
                "hello".to_string(),
                "I_love_you".to_string(),
            ],
            sequences_per_action: 30,
        }
    }
}

impl DatasetConfig {
    pub fn validate(&self) -> Result<()> {
        if self.actions.is_empty() {
            return Err(Error::Config("dataset.actions must not be empty".into()));
        }
        if let Some(bad) = self.actions.iter().find(|a| !is_directory_name(a)) {
            return Err(Error::Config(format!(
                "dataset action {bad:?} is not a valid directory name"
            )));
        }
        Ok(())
    }
}

fn is_directory_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '\\']) && name != ".."
}

impl SignflowConfig {
    /// Load configuration from file, overridden by `SIGNFLOW_*` variables.
    ///
    /// Nested keys are joined with `__`, e.g. `SIGNFLOW_WINDOW__SEQUENCE_LENGTH`.
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name(path))
            .add_source(
                ::config::Environment::with_prefix("SIGNFLOW")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(
                ::config::Environment::with_prefix("SIGNFLOW")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.stabilizer.validate()?;
        self.window.validate()?;
        self.schema.validate()?;
        self.recognition.validate()?;
        self.dataset.validate()?;
        Ok(())
    }
}
