//! Multi-entity stabilization of holistic detector frames.

use serde::{Deserialize, Serialize};

use signflow_core::{
    EntityKind, Error, FeatureLayout, HolisticFrame, Landmark, OcclusionPolicy, Result,
    StabilizerConfig,
};

use crate::stabilizer::{LandmarkStabilizer, SlotEstimate};

/// Per-entity stabilization result for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityEstimate {
    pub kind: EntityKind,
    /// Whether the detector reported the entity this frame
    pub detected: bool,
    pub slots: Vec<SlotEstimate>,
}

impl EntityEstimate {
    pub fn observed_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_observed()).count()
    }
}

/// Output of [`FrameStabilizer::stabilize`]
#[derive(Debug, Clone, PartialEq)]
pub struct StabilizedFrame {
    /// Frame carrying the estimates to flatten into a feature vector
    pub frame: HolisticFrame,
    /// Slot results for every filtered entity
    pub estimates: Vec<EntityEstimate>,
}

impl StabilizedFrame {
    pub fn estimate(&self, kind: EntityKind) -> Option<&EntityEstimate> {
        self.estimates.iter().find(|e| e.kind == kind)
    }
}

/// Filter banks for every filtered entity of one capture session.
///
/// Entities not listed in `filtered_entities` pass through unchanged.
#[derive(Debug, Clone)]
pub struct FrameStabilizer {
    banks: Vec<(EntityKind, LandmarkStabilizer)>,
    occlusion: OcclusionPolicy,
}

impl FrameStabilizer {
    pub fn new(layout: &FeatureLayout, config: &StabilizerConfig) -> Result<Self> {
        config.validate()?;

        let mut banks: Vec<(EntityKind, LandmarkStabilizer)> =
            Vec::with_capacity(config.filtered_entities.len());
        for &kind in &config.filtered_entities {
            if banks.iter().any(|(k, _)| *k == kind) {
                return Err(Error::Config(format!(
                    "entity {} listed twice in filtered_entities",
                    kind.name()
                )));
            }

            let schema = layout.schema(kind).ok_or_else(|| {
                Error::Config(format!(
                    "filtered entity {} is not part of the feature layout",
                    kind.name()
                ))
            })?;

            banks.push((kind, LandmarkStabilizer::new(schema.point_count, config)?));
        }

        tracing::debug!(
            entities = ?config.filtered_entities,
            dimensions = ?config.dimensions,
            "frame stabilizer created"
        );

        Ok(Self {
            banks,
            occlusion: config.occlusion,
        })
    }

    pub fn filtered_entities(&self) -> impl Iterator<Item = EntityKind> + '_ {
        self.banks.iter().map(|(k, _)| *k)
    }

    /// Stabilize one frame. Never fails: an undetected entity runs
    /// predict-only steps on its slots.
    pub fn stabilize(&mut self, raw: &HolisticFrame) -> StabilizedFrame {
        let mut frame = raw.clone();
        let mut estimates = Vec::with_capacity(self.banks.len());

        for (kind, bank) in &mut self.banks {
            let observations = raw.entity(*kind);
            let slots = bank.stabilize(observations);
            let detected = observations.is_some();

            let output = match (detected, self.occlusion) {
                (true, _) => Some(landmarks(&slots)),
                (false, OcclusionPolicy::Predicted) if slots.iter().any(|s| s.initialized) => {
                    Some(landmarks(&slots))
                }
                (false, _) => None,
            };
            frame.set_entity(*kind, output);

            estimates.push(EntityEstimate {
                kind: *kind,
                detected,
                slots,
            });
        }

        StabilizedFrame { frame, estimates }
    }

    pub fn reset(&mut self) {
        for (_, bank) in &mut self.banks {
            bank.reset();
        }
    }
}

fn landmarks(slots: &[SlotEstimate]) -> Vec<Landmark> {
    slots.iter().map(|s| s.landmark).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use signflow_core::Timestamp;

    fn hand() -> Vec<Landmark> {
        (0..21)
            .map(|i| Landmark::new(0.5, 0.01 * i as f32, 0.0))
            .collect()
    }

    fn frame_with_hand(t: i64) -> HolisticFrame {
        HolisticFrame::new(Timestamp::from_nanos(t))
            .with_entity(EntityKind::RightHand, hand())
            .with_entity(
                EntityKind::Pose,
                vec![Landmark::new(0.5, 0.5, 0.0).with_visibility(0.9); 33],
            )
    }

    #[test]
    fn test_unfiltered_entities_pass_through() {
        let layout = FeatureLayout::holistic();
        let mut stabilizer = FrameStabilizer::new(&layout, &StabilizerConfig::default()).unwrap();

        let raw = frame_with_hand(0);
        let out = stabilizer.stabilize(&raw);

        assert_eq!(
            out.frame.entity(EntityKind::Pose),
            raw.entity(EntityKind::Pose)
        );
        assert!(out.estimate(EntityKind::Pose).is_none());
        assert!(out.estimate(EntityKind::RightHand).is_some());
    }

    #[test]
    fn test_absent_hand_zero_filled_by_default() {
        let layout = FeatureLayout::holistic();
        let mut stabilizer = FrameStabilizer::new(&layout, &StabilizerConfig::default()).unwrap();

        stabilizer.stabilize(&frame_with_hand(0));
        let out = stabilizer.stabilize(&HolisticFrame::empty(Timestamp::from_nanos(1)));

        assert!(!out.frame.is_detected(EntityKind::RightHand));
        let est = out.estimate(EntityKind::RightHand).unwrap();
        assert!(!est.detected);
        assert_eq!(est.observed_count(), 0);
        assert!(est.slots.iter().all(|s| s.initialized));
    }

    #[test]
    fn test_predicted_policy_fills_occluded_hand() {
        let layout = FeatureLayout::holistic();
        let config = StabilizerConfig {
            occlusion: OcclusionPolicy::Predicted,
            ..Default::default()
        };
        let mut stabilizer = FrameStabilizer::new(&layout, &config).unwrap();

        // Never-seen hand stays undetected even with the predicted policy
        let out = stabilizer.stabilize(&HolisticFrame::empty(Timestamp::from_nanos(0)));
        assert!(!out.frame.is_detected(EntityKind::LeftHand));

        stabilizer.stabilize(&frame_with_hand(1));
        let out = stabilizer.stabilize(&HolisticFrame::empty(Timestamp::from_nanos(2)));
        let hand = out.frame.entity(EntityKind::RightHand).unwrap();
        assert_eq!(hand.len(), 21);
        assert!((hand[0].x - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_filtered_entity_must_exist_in_layout() {
        let layout = FeatureLayout::new(vec![signflow_core::EntitySchema::new(
            EntityKind::LeftHand,
            21,
            signflow_core::ComponentLayout::Xyz,
        )])
        .unwrap();
        let result = FrameStabilizer::new(&layout, &StabilizerConfig::default());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_reset_forgets_entities() {
        let layout = FeatureLayout::holistic();
        let config = StabilizerConfig {
            occlusion: OcclusionPolicy::Predicted,
            ..Default::default()
        };
        let mut stabilizer = FrameStabilizer::new(&layout, &config).unwrap();
        stabilizer.stabilize(&frame_with_hand(0));
        stabilizer.reset();

        let out = stabilizer.stabilize(&HolisticFrame::empty(Timestamp::from_nanos(1)));
        assert!(!out.frame.is_detected(EntityKind::RightHand));
    }
}
