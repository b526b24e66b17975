//! Per-frame processing: stabilize, flatten, buffer.

use signflow_core::{
    FeatureLayout, FeatureVector, HolisticFrame, Result, SignflowConfig, StabilizerConfig,
    Timestamp, WindowConfig,
};
use signflow_stabilizer::{EntityEstimate, FrameStabilizer};

use crate::buffer::{BufferStats, SequenceWindowBuffer};
use crate::window::SequenceWindow;

/// Result of processing one detector frame
#[derive(Debug, Clone)]
pub struct FrameOutput {
    pub timestamp: Timestamp,
    /// Stabilized, flattened features for this frame
    pub features: FeatureVector,
    /// Slot results for the filtered entities
    pub estimates: Vec<EntityEstimate>,
    /// Window completed by this frame, if any
    pub window: Option<SequenceWindow>,
}

/// Stabilizer, feature layout and window buffer for one capture stream
#[derive(Debug, Clone)]
pub struct FramePipeline {
    layout: FeatureLayout,
    stabilizer: FrameStabilizer,
    buffer: SequenceWindowBuffer,
    frames_processed: u64,
}

impl FramePipeline {
    pub fn new(
        layout: FeatureLayout,
        stabilizer: &StabilizerConfig,
        window: WindowConfig,
    ) -> Result<Self> {
        let stabilizer = FrameStabilizer::new(&layout, stabilizer)?;
        let buffer = SequenceWindowBuffer::new(window, layout.feature_length())?;

        Ok(Self {
            layout,
            stabilizer,
            buffer,
            frames_processed: 0,
        })
    }

    pub fn from_config(config: &SignflowConfig) -> Result<Self> {
        Self::new(
            config.schema.layout()?,
            &config.stabilizer,
            config.window.clone(),
        )
    }

    pub fn layout(&self) -> &FeatureLayout {
        &self.layout
    }

    pub fn buffer(&self) -> &SequenceWindowBuffer {
        &self.buffer
    }

    pub fn stats(&self) -> BufferStats {
        self.buffer.stats()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Process one frame.
    ///
    /// Filters always advance, so in segment mode frames that arrive while
    /// no segment is open keep the stabilizer warm without being buffered.
    pub fn process(&mut self, frame: &HolisticFrame) -> Result<FrameOutput> {
        let stabilized = self.stabilizer.stabilize(frame);
        let features = self.layout.flatten(&stabilized.frame);
        self.frames_processed += 1;

        let window = if self.buffer.accepts_frames() {
            self.buffer.push(features.clone())?
        } else {
            tracing::trace!(
                timestamp = frame.timestamp.as_nanos(),
                "no open segment, frame not buffered"
            );
            None
        };

        Ok(FrameOutput {
            timestamp: frame.timestamp,
            features,
            estimates: stabilized.estimates,
            window,
        })
    }

    pub fn start_segment(&mut self, label: impl Into<String>, sequence_index: usize) -> Result<()> {
        self.buffer.start_segment(label, sequence_index)
    }

    /// Close the open segment; see [`SequenceWindowBuffer::finalize`]
    pub fn finish_segment(&mut self) -> Result<Option<SequenceWindow>> {
        self.buffer.finalize()
    }

    /// Forget all filter state and buffered frames
    pub fn reset(&mut self) {
        self.stabilizer.reset();
        self.buffer.clear();
        tracing::debug!(frames = self.frames_processed, "pipeline reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signflow_core::{EntityKind, Error, Landmark};

    fn frame(t: i64, x: f32) -> HolisticFrame {
        HolisticFrame::new(Timestamp::from_nanos(t))
            .with_entity(
                EntityKind::Pose,
                vec![Landmark::new(0.5, 0.5, 0.0).with_visibility(1.0); 33],
            )
            .with_entity(
                EntityKind::LeftHand,
                (0..21)
                    .map(|i| Landmark::new(x, 0.01 * i as f32, 0.0))
                    .collect(),
            )
    }

    #[test]
    fn test_segment_recording() {
        let mut pipeline = FramePipeline::from_config(&SignflowConfig::default()).unwrap();

        // Countdown frames before the segment opens are not buffered
        for t in 0..5 {
            let out = pipeline.process(&frame(t, 0.3)).unwrap();
            assert_eq!(out.features.len(), 1662);
            assert!(out.window.is_none());
        }
        assert!(pipeline.buffer().is_empty());

        pipeline.start_segment("hello", 0).unwrap();
        let mut windows = Vec::new();
        for t in 5..35 {
            if let Some(w) = pipeline.process(&frame(t, 0.3)).unwrap().window {
                windows.push(w);
            }
        }

        assert_eq!(windows.len(), 1);
        let array = windows[0].to_array();
        assert_eq!(array.shape(), &[30, 1662]);
        assert_eq!(pipeline.frames_processed(), 35);
    }

    #[test]
    fn test_features_follow_layout_order() {
        let mut pipeline = FramePipeline::from_config(&SignflowConfig::default()).unwrap();
        let out = pipeline.process(&frame(0, 0.3)).unwrap();
        let values = out.features.as_slice();

        // Pose block first: x, y, z, visibility
        assert_eq!(&values[..4], &[0.5, 0.5, 0.0, 1.0]);
        // Face absent: zero-filled
        assert!(values[132..132 + 1404].iter().all(|v| *v == 0.0));
        // Left hand block holds the (unchanged) first observation
        let lh = 132 + 1404;
        assert!((values[lh] - 0.3).abs() < 1e-6);
        // Right hand never seen
        assert!(values[lh + 63..].iter().all(|v| *v == 0.0));

        let left = out
            .estimates
            .iter()
            .find(|e| e.kind == EntityKind::LeftHand)
            .unwrap();
        assert!(left.detected);
        assert_eq!(left.observed_count(), 21);
    }

    #[test]
    fn test_sliding_pipeline_emits_after_warmup() {
        let mut config = SignflowConfig::default();
        config.window = WindowConfig::sliding(30);
        let mut pipeline = FramePipeline::from_config(&config).unwrap();

        let mut emitted = Vec::new();
        for t in 0..32 {
            emitted.push(pipeline.process(&frame(t, 0.4)).unwrap().window.is_some());
        }

        assert!(emitted[..29].iter().all(|e| !e));
        assert!(emitted[29..].iter().all(|e| *e));
        assert!(matches!(
            pipeline.start_segment("a", 0),
            Err(Error::ModeMismatch { .. })
        ));
    }

    #[test]
    fn test_finish_short_segment() {
        let mut pipeline = FramePipeline::from_config(&SignflowConfig::default()).unwrap();
        pipeline.start_segment("thanks", 2).unwrap();
        for t in 0..10 {
            pipeline.process(&frame(t, 0.3)).unwrap();
        }
        assert!(pipeline.finish_segment().unwrap().is_none());
        assert_eq!(pipeline.stats().discarded_short, 1);
    }

    #[test]
    fn test_reset_clears_buffer() {
        let mut config = SignflowConfig::default();
        config.window = WindowConfig::sliding(5);
        let mut pipeline = FramePipeline::from_config(&config).unwrap();
        for t in 0..5 {
            pipeline.process(&frame(t, 0.3)).unwrap();
        }
        assert!(pipeline.buffer().is_warm());

        pipeline.reset();
        assert!(pipeline.buffer().is_empty());
    }
}
