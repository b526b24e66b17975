//! Segment and sliding window buffering.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use signflow_core::{BufferMode, Error, FeatureVector, Result, WindowConfig};

use crate::window::{SequenceWindow, WindowTag};

/// Counters kept over the lifetime of a buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferStats {
    /// Windows handed out (sliding mode counts every emitted view)
    pub emitted: u64,
    /// Segments finalized with fewer than `min_frames` frames
    pub discarded_short: u64,
    /// Segments replaced by `start_segment` before completing
    pub abandoned: u64,
    /// Segments that needed zero padding
    pub padded: u64,
}

/// Collects feature vectors into windows of exactly `sequence_length` frames
#[derive(Debug, Clone)]
pub struct SequenceWindowBuffer {
    config: WindowConfig,
    feature_length: usize,
    frames: VecDeque<FeatureVector>,
    /// Open segment (segment mode only)
    segment: Option<WindowTag>,
    stats: BufferStats,
}

impl SequenceWindowBuffer {
    pub fn new(config: WindowConfig, feature_length: usize) -> Result<Self> {
        config.validate()?;
        if feature_length == 0 {
            return Err(Error::Config("feature length must be at least 1".into()));
        }

        Ok(Self {
            frames: VecDeque::with_capacity(config.sequence_length + 1),
            config,
            feature_length,
            segment: None,
            stats: BufferStats::default(),
        })
    }

    pub fn mode(&self) -> BufferMode {
        self.config.mode
    }

    pub fn sequence_length(&self) -> usize {
        self.config.sequence_length
    }

    pub fn min_frames(&self) -> usize {
        self.config.min_frames
    }

    pub fn feature_length(&self) -> usize {
        self.feature_length
    }

    /// Frames currently held
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn stats(&self) -> BufferStats {
        self.stats
    }

    pub fn open_segment(&self) -> Option<&WindowTag> {
        self.segment.as_ref()
    }

    /// Whether `push` would accept a frame right now
    pub fn accepts_frames(&self) -> bool {
        match self.config.mode {
            BufferMode::Segment => self.segment.is_some(),
            BufferMode::Sliding => true,
        }
    }

    /// Sliding mode: the buffer holds a full window
    pub fn is_warm(&self) -> bool {
        self.config.mode == BufferMode::Sliding && self.frames.len() == self.config.sequence_length
    }

    /// Open a new labeled segment, dropping any unfinished one
    pub fn start_segment(&mut self, label: impl Into<String>, sequence_index: usize) -> Result<()> {
        self.require_mode(BufferMode::Segment, "start_segment")?;

        let tag = WindowTag::new(label, sequence_index);
        if let Some(previous) = self.segment.take() {
            tracing::debug!(
                label = %previous.label,
                sequence = previous.sequence_index,
                frames = self.frames.len(),
                "abandoning unfinished segment"
            );
            self.stats.abandoned += 1;
        }
        self.frames.clear();

        tracing::debug!(label = %tag.label, sequence = tag.sequence_index, "segment started");
        self.segment = Some(tag);
        Ok(())
    }

    /// Append one frame.
    ///
    /// Segment mode returns the window once it reaches `sequence_length`
    /// frames and closes the segment. Sliding mode returns the latest
    /// window on every push once warm.
    pub fn push(&mut self, features: FeatureVector) -> Result<Option<SequenceWindow>> {
        if features.len() != self.feature_length {
            return Err(Error::FeatureLength {
                expected: self.feature_length,
                actual: features.len(),
            });
        }

        match self.config.mode {
            BufferMode::Segment => self.push_segment(features),
            BufferMode::Sliding => Ok(self.push_sliding(features)),
        }
    }

    fn push_segment(&mut self, features: FeatureVector) -> Result<Option<SequenceWindow>> {
        if self.segment.is_none() {
            return Err(Error::NoOpenSegment);
        }

        self.frames.push_back(features);
        if self.frames.len() < self.config.sequence_length {
            return Ok(None);
        }

        Ok(self.emit_segment())
    }

    fn push_sliding(&mut self, features: FeatureVector) -> Option<SequenceWindow> {
        self.frames.push_back(features);
        while self.frames.len() > self.config.sequence_length {
            self.frames.pop_front();
        }

        let window = self.current_window()?;
        self.stats.emitted += 1;
        Some(window)
    }

    /// Close the open segment early.
    ///
    /// A segment holding at least `min_frames` frames is zero-padded to
    /// `sequence_length` and returned; a shorter one is discarded. Returns
    /// `None` when no segment is open.
    pub fn finalize(&mut self) -> Result<Option<SequenceWindow>> {
        self.require_mode(BufferMode::Segment, "finalize")?;

        let Some(tag) = self.segment.as_ref() else {
            return Ok(None);
        };

        if self.frames.len() < self.config.min_frames {
            tracing::warn!(
                label = %tag.label,
                sequence = tag.sequence_index,
                frames = self.frames.len(),
                min_frames = self.config.min_frames,
                "discarding short segment"
            );
            self.stats.discarded_short += 1;
            self.segment = None;
            self.frames.clear();
            return Ok(None);
        }

        Ok(self.emit_segment())
    }

    /// Latest full window without consuming it (sliding mode)
    pub fn current_window(&self) -> Option<SequenceWindow> {
        if !self.is_warm() {
            return None;
        }
        let frames: Vec<FeatureVector> = self.frames.iter().cloned().collect();
        let captured = frames.len();
        Some(SequenceWindow::new(None, frames, captured))
    }

    /// Drop buffered frames and any open segment; statistics are kept
    pub fn clear(&mut self) {
        self.frames.clear();
        self.segment = None;
    }

    fn emit_segment(&mut self) -> Option<SequenceWindow> {
        let tag = self.segment.take()?;
        let captured = self.frames.len();
        let mut frames: Vec<FeatureVector> = self.frames.drain(..).collect();

        let padding = self.config.sequence_length.saturating_sub(captured);
        if padding > 0 {
            let zeros = FeatureVector::zeros(self.feature_length);
            frames.resize(captured + padding, zeros);
            self.stats.padded += 1;
        }
        self.stats.emitted += 1;

        tracing::info!(
            label = %tag.label,
            sequence = tag.sequence_index,
            captured,
            padded = padding,
            "segment window emitted"
        );

        Some(SequenceWindow::new(Some(tag), frames, captured))
    }

    fn require_mode(&self, mode: BufferMode, operation: &'static str) -> Result<()> {
        if self.config.mode != mode {
            return Err(Error::ModeMismatch {
                operation,
                mode: self.config.mode.name(),
            });
        }
        Ok(())
    }
}
