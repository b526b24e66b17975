//! Recognition sessions and the session registry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use signflow_core::{
    Error, HolisticFrame, Result, SessionId, SignflowConfig, Timestamp, WindowConfig,
};
use signflow_sequence::FramePipeline;

use crate::classifier::{LabelMap, Prediction, PredictionDecoder, SequenceClassifier};
use crate::debounce::GestureDebouncer;

/// A gesture reported by a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recognition {
    pub session_id: SessionId,
    pub timestamp: Timestamp,
    pub label: String,
    pub class_index: usize,
    pub confidence: f32,
}

/// Per-session counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub frames: u64,
    pub windows_classified: u64,
    pub recognized: u64,
    pub below_threshold: u64,
    pub debounced: u64,
}

/// One live capture stream: sliding-window pipeline, decoder and debouncer
pub struct RecognitionSession {
    id: SessionId,
    opened_at: Timestamp,
    pipeline: FramePipeline,
    classifier: Arc<dyn SequenceClassifier>,
    decoder: PredictionDecoder,
    debouncer: GestureDebouncer,
    last_prediction: Option<Prediction>,
    stats: SessionStats,
}

impl RecognitionSession {
    /// Build a session; the window policy is always sliding with the
    /// configured sequence length.
    pub fn new(
        id: SessionId,
        config: &SignflowConfig,
        classifier: Arc<dyn SequenceClassifier>,
    ) -> Result<Self> {
        config.recognition.validate()?;

        let pipeline = FramePipeline::new(
            config.schema.layout()?,
            &config.stabilizer,
            WindowConfig::sliding(config.window.sequence_length),
        )?;

        let recognition = &config.recognition;
        Ok(Self {
            id,
            opened_at: Timestamp::now(),
            pipeline,
            classifier,
            decoder: PredictionDecoder::new(
                LabelMap::new(recognition.labels.clone()),
                recognition.confidence_threshold,
            ),
            debouncer: GestureDebouncer::new(recognition.debounce_secs),
            last_prediction: None,
            stats: SessionStats::default(),
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn opened_at(&self) -> Timestamp {
        self.opened_at
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Most recent decoded prediction, accepted or not
    pub fn last_prediction(&self) -> Option<&Prediction> {
        self.last_prediction.as_ref()
    }

    /// Process one frame captured at `timestamp`.
    ///
    /// Returns a recognition only when the window is warm, the top score is
    /// above the threshold and the label is not a debounced repeat.
    pub fn process_frame(
        &mut self,
        frame: &HolisticFrame,
        timestamp: Timestamp,
    ) -> Result<Option<Recognition>> {
        self.stats.frames += 1;

        let Some(window) = self.pipeline.process(frame)?.window else {
            return Ok(None);
        };

        let scores = self.classifier.predict(window.to_array().view())?;
        self.stats.windows_classified += 1;

        let prediction = self.decoder.decode(&scores)?;
        let outcome = if !prediction.accepted {
            tracing::trace!(
                session = %self.id,
                label = %prediction.label,
                confidence = prediction.confidence,
                "prediction below threshold"
            );
            self.stats.below_threshold += 1;
            None
        } else if !self.debouncer.accept(&prediction.label, timestamp) {
            self.stats.debounced += 1;
            None
        } else {
            tracing::info!(
                session = %self.id,
                label = %prediction.label,
                confidence = prediction.confidence,
                "gesture recognized"
            );
            self.stats.recognized += 1;
            Some(Recognition {
                session_id: self.id,
                timestamp,
                label: prediction.label.clone(),
                class_index: prediction.class_index,
                confidence: prediction.confidence,
            })
        };

        self.last_prediction = Some(prediction);
        Ok(outcome)
    }

    /// Drop filter state, buffered frames and debounce history
    pub fn reset(&mut self) {
        self.pipeline.reset();
        self.debouncer.reset();
        self.last_prediction = None;
    }
}

/// Live sessions keyed by id. Sessions share the classifier but nothing
/// else; each is locked independently.
pub struct SessionRegistry {
    config: SignflowConfig,
    classifier: Arc<dyn SequenceClassifier>,
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<RecognitionSession>>>>,
}

impl SessionRegistry {
    pub fn new(config: SignflowConfig, classifier: Arc<dyn SequenceClassifier>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            classifier,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &SignflowConfig {
        &self.config
    }

    /// Open a session with fresh filter state
    pub fn open(&self) -> Result<SessionId> {
        let id = SessionId::new();
        let session = RecognitionSession::new(id, &self.config, Arc::clone(&self.classifier))?;
        self.sessions
            .write()
            .insert(id, Arc::new(Mutex::new(session)));

        tracing::info!(session = %id, "session opened");
        Ok(id)
    }

    /// Close a session and return its final counters
    pub fn close(&self, id: SessionId) -> Result<SessionStats> {
        let session = self
            .sessions
            .write()
            .remove(&id)
            .ok_or_else(|| Error::UnknownSession(id.to_string()))?;

        let stats = session.lock().stats();
        tracing::info!(
            session = %id,
            frames = stats.frames,
            recognized = stats.recognized,
            "session closed"
        );
        Ok(stats)
    }

    pub fn process_frame(
        &self,
        id: SessionId,
        frame: &HolisticFrame,
        timestamp: Timestamp,
    ) -> Result<Option<Recognition>> {
        let session = self.session(id)?;
        let mut session = session.lock();
        session.process_frame(frame, timestamp)
    }

    pub fn reset(&self, id: SessionId) -> Result<()> {
        self.session(id)?.lock().reset();
        Ok(())
    }

    pub fn stats(&self, id: SessionId) -> Result<SessionStats> {
        Ok(self.session(id)?.lock().stats())
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.read().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    fn session(&self, id: SessionId) -> Result<Arc<Mutex<RecognitionSession>>> {
        self.sessions
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::UnknownSession(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::ArrayView2;
    use signflow_core::{EntityKind, Landmark};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scores "hello" when the left hand is raised above mid-frame
    struct HandHeightClassifier {
        calls: AtomicUsize,
    }

    impl HandHeightClassifier {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl SequenceClassifier for HandHeightClassifier {
        fn predict(&self, window: ArrayView2<'_, f32>) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(window.shape(), &[SEQ, 1662]);

            // Left-hand wrist y of the newest frame
            let y = window[[SEQ - 1, 132 + 1404 + 1]];
            if y > 0.0 && y < 0.5 {
                Ok(vec![0.9, 0.05, 0.05])
            } else {
                Ok(vec![0.4, 0.3, 0.3])
            }
        }
    }

    struct FailingClassifier;

    impl SequenceClassifier for FailingClassifier {
        fn predict(&self, _window: ArrayView2<'_, f32>) -> Result<Vec<f32>> {
            Err(Error::Classifier("model unavailable".into()))
        }
    }

    const SEQ: usize = 5;

    fn config() -> SignflowConfig {
        let mut config = SignflowConfig::default();
        config.window = WindowConfig::segment(SEQ, 3);
        config.recognition.labels = vec!["hello".into(), "thanks".into(), "I_love_you".into()];
        config
    }

    fn frame(t: f64, hand_y: Option<f32>) -> HolisticFrame {
        let mut frame = HolisticFrame::empty(Timestamp::from_secs_f64(t));
        if let Some(y) = hand_y {
            frame.set_entity(
                EntityKind::LeftHand,
                Some((0..21).map(|_| Landmark::new(0.5, y, 0.0)).collect()),
            );
        }
        frame
    }

    fn run(
        registry: &SessionRegistry,
        id: SessionId,
        start: f64,
        count: usize,
        hand_y: Option<f32>,
    ) -> Vec<Recognition> {
        (0..count)
            .filter_map(|i| {
                let t = start + i as f64 / 30.0;
                registry
                    .process_frame(id, &frame(t, hand_y), Timestamp::from_secs_f64(t))
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_session_recognizes_after_warmup() {
        let classifier = HandHeightClassifier::new();
        let registry = SessionRegistry::new(config(), classifier.clone()).unwrap();
        let id = registry.open().unwrap();

        let recognized = run(&registry, id, 0.0, SEQ, Some(0.3));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
        assert_eq!(recognized.len(), 1);
        assert_eq!(recognized[0].label, "hello");
        assert_eq!(recognized[0].session_id, id);
        assert!((recognized[0].confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_repeats_debounced_within_interval() {
        let registry = SessionRegistry::new(config(), HandHeightClassifier::new()).unwrap();
        let id = registry.open().unwrap();

        // 0.5 s of the same sign at 30 fps: one report
        let recognized = run(&registry, id, 0.0, 15, Some(0.3));
        assert_eq!(recognized.len(), 1);

        // Still signing after the interval: reported again
        let recognized = run(&registry, id, 1.5, 1, Some(0.3));
        assert_eq!(recognized.len(), 1);

        let stats = registry.stats(id).unwrap();
        assert_eq!(stats.frames, 16);
        assert_eq!(stats.windows_classified, 16 - SEQ as u64 + 1);
        assert_eq!(stats.recognized, 2);
        assert!(stats.debounced > 0);
    }

    #[test]
    fn test_low_confidence_not_reported() {
        let registry = SessionRegistry::new(config(), HandHeightClassifier::new()).unwrap();
        let id = registry.open().unwrap();

        assert!(run(&registry, id, 0.0, 10, None).is_empty());
        let stats = registry.stats(id).unwrap();
        assert_eq!(stats.below_threshold, 10 - SEQ as u64 + 1);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let registry = SessionRegistry::new(config(), HandHeightClassifier::new()).unwrap();
        let a = registry.open().unwrap();
        let b = registry.open().unwrap();
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);

        run(&registry, a, 0.0, SEQ - 1, Some(0.3));
        // Session b has not warmed up and must not see a's frames
        assert!(run(&registry, b, 0.0, 1, Some(0.3)).is_empty());
        assert_eq!(run(&registry, a, 0.2, 1, Some(0.3)).len(), 1);
    }

    #[test]
    fn test_unknown_session() {
        let registry = SessionRegistry::new(config(), HandHeightClassifier::new()).unwrap();
        let id = registry.open().unwrap();
        registry.close(id).unwrap();

        let result = registry.process_frame(id, &frame(0.0, None), Timestamp::from_secs_f64(0.0));
        assert!(matches!(result, Err(Error::UnknownSession(_))));
        assert!(matches!(registry.close(id), Err(Error::UnknownSession(_))));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_classifier_error_propagates() {
        let registry = SessionRegistry::new(config(), Arc::new(FailingClassifier)).unwrap();
        let id = registry.open().unwrap();

        for i in 0..SEQ - 1 {
            let t = i as f64;
            assert!(registry
                .process_frame(id, &frame(t, None), Timestamp::from_secs_f64(t))
                .unwrap()
                .is_none());
        }
        let result = registry.process_frame(id, &frame(9.0, None), Timestamp::from_secs_f64(9.0));
        assert!(matches!(result, Err(Error::Classifier(_))));
    }

    #[test]
    fn test_reset_requires_new_warmup() {
        let registry = SessionRegistry::new(config(), HandHeightClassifier::new()).unwrap();
        let id = registry.open().unwrap();
        run(&registry, id, 0.0, SEQ, Some(0.3));

        registry.reset(id).unwrap();
        assert!(run(&registry, id, 5.0, SEQ - 1, Some(0.3)).is_empty());
        assert_eq!(run(&registry, id, 6.0, 1, Some(0.3)).len(), 1);
    }
}
