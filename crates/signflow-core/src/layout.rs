//! Flattened feature-vector layout.
//!
//! Training data and live inference must agree on a single flatten order:
//! pose, then face, then left hand, then right hand. Within an entity, each
//! point contributes its components in `x, y, z[, visibility]` order. An
//! entity that was not detected in a frame occupies its full width with
//! zeros.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{ComponentLayout, EntityKind, HolisticFrame, Landmark, Timestamp};

/// Point count and component layout of one tracked entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySchema {
    pub kind: EntityKind,
    pub point_count: usize,
    pub components: ComponentLayout,
}

impl EntitySchema {
    pub fn new(kind: EntityKind, point_count: usize, components: ComponentLayout) -> Self {
        Self {
            kind,
            point_count,
            components,
        }
    }

    /// Number of scalars this entity contributes to a feature vector
    pub fn width(&self) -> usize {
        self.point_count * self.components.width()
    }
}

/// Ordered entity schema defining the feature-vector layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureLayout {
    entities: Vec<EntitySchema>,
    offsets: Vec<usize>,
    feature_length: usize,
}

impl FeatureLayout {
    pub const POSE_POINTS: usize = 33;
    pub const FACE_POINTS: usize = 468;
    pub const HAND_POINTS: usize = 21;

    /// Build a layout; entities must be listed once each, in flatten order.
    pub fn new(entities: Vec<EntitySchema>) -> Result<Self> {
        if entities.is_empty() {
            return Err(Error::Config("feature layout has no entities".into()));
        }

        for pair in entities.windows(2) {
            if pair[0].kind.index() >= pair[1].kind.index() {
                return Err(Error::Config(format!(
                    "entity {} listed after {}: entities must be unique and in flatten order",
                    pair[1].kind.name(),
                    pair[0].kind.name()
                )));
            }
        }

        if let Some(empty) = entities.iter().find(|e| e.point_count == 0) {
            return Err(Error::Config(format!(
                "entity {} has no points",
                empty.kind.name()
            )));
        }

        Ok(Self::assemble(entities))
    }

    /// Holistic detector layout: 33 pose points with visibility, 468 face
    /// points, 21 points per hand (1662 scalars).
    pub fn holistic() -> Self {
        Self::assemble(holistic_entities(
            Self::POSE_POINTS,
            Self::FACE_POINTS,
            Self::HAND_POINTS,
            Self::HAND_POINTS,
        ))
    }

    /// Holistic layout with custom point counts
    pub fn from_counts(
        pose: usize,
        face: usize,
        left_hand: usize,
        right_hand: usize,
    ) -> Result<Self> {
        Self::new(holistic_entities(pose, face, left_hand, right_hand))
    }

    fn assemble(entities: Vec<EntitySchema>) -> Self {
        let mut offsets = Vec::with_capacity(entities.len());
        let mut feature_length = 0;
        for entity in &entities {
            offsets.push(feature_length);
            feature_length += entity.width();
        }

        Self {
            entities,
            offsets,
            feature_length,
        }
    }

    pub fn feature_length(&self) -> usize {
        self.feature_length
    }

    pub fn entities(&self) -> &[EntitySchema] {
        &self.entities
    }

    pub fn schema(&self, kind: EntityKind) -> Option<&EntitySchema> {
        self.entities.iter().find(|e| e.kind == kind)
    }

    /// Start offset of an entity inside the flattened vector
    pub fn offset_of(&self, kind: EntityKind) -> Option<usize> {
        self.entities
            .iter()
            .position(|e| e.kind == kind)
            .map(|i| self.offsets[i])
    }

    /// All-zero vector (padding frame)
    pub fn zeros(&self) -> FeatureVector {
        FeatureVector {
            values: vec![0.0; self.feature_length],
        }
    }

    /// Flatten a frame; undetected entities and missing trailing points are
    /// zero-filled, surplus points beyond the schema are ignored.
    ///
    /// Visibility is stored only for [`ComponentLayout::XyzVisibility`]
    /// entities, where a missing value is written as `0.0`. Visibility on
    /// `Xyz` entities is dropped.
    pub fn flatten(&self, frame: &HolisticFrame) -> FeatureVector {
        let mut values = vec![0.0f32; self.feature_length];

        for (schema, &offset) in self.entities.iter().zip(&self.offsets) {
            let Some(landmarks) = frame.entity(schema.kind) else {
                continue;
            };

            let width = schema.components.width();
            for (i, lm) in landmarks.iter().take(schema.point_count).enumerate() {
                let base = offset + i * width;
                values[base] = lm.x;
                values[base + 1] = lm.y;
                values[base + 2] = lm.z;
                if schema.components == ComponentLayout::XyzVisibility {
                    values[base + 3] = lm.visibility.unwrap_or(0.0);
                }
            }
        }

        FeatureVector { values }
    }

    /// Recover per-entity landmark arrays from a flattened vector.
    ///
    /// Landmarks of visibility entities always come back with
    /// `Some(visibility)`, all others with `None`, so `flatten` followed by
    /// `parse` normalizes visibility to the entity's component layout.
    pub fn parse(&self, vector: &FeatureVector) -> Result<ParsedFrame> {
        if vector.len() != self.feature_length {
            return Err(Error::FeatureLength {
                expected: self.feature_length,
                actual: vector.len(),
            });
        }

        let values = vector.as_slice();
        let entities = self
            .entities
            .iter()
            .zip(&self.offsets)
            .map(|(schema, &offset)| {
                let width = schema.components.width();
                let landmarks = values[offset..offset + schema.width()]
                    .chunks_exact(width)
                    .map(|c| {
                        let lm = Landmark::new(c[0], c[1], c[2]);
                        match schema.components {
                            ComponentLayout::XyzVisibility => lm.with_visibility(c[3]),
                            ComponentLayout::Xyz => lm,
                        }
                    })
                    .collect();
                (schema.kind, landmarks)
            })
            .collect();

        Ok(ParsedFrame { entities })
    }
}

fn holistic_entities(
    pose: usize,
    face: usize,
    left_hand: usize,
    right_hand: usize,
) -> Vec<EntitySchema> {
    vec![
        EntitySchema::new(EntityKind::Pose, pose, ComponentLayout::XyzVisibility),
        EntitySchema::new(EntityKind::Face, face, ComponentLayout::Xyz),
        EntitySchema::new(EntityKind::LeftHand, left_hand, ComponentLayout::Xyz),
        EntitySchema::new(EntityKind::RightHand, right_hand, ComponentLayout::Xyz),
    ]
}

impl Default for FeatureLayout {
    fn default() -> Self {
        Self::holistic()
    }
}

/// Flat, fixed-length per-frame feature vector.
///
/// Immutable once produced; only [`FeatureLayout`] and the length-checked
/// constructor can build one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    values: Vec<f32>,
}

impl FeatureVector {
    /// Wrap raw values, checking them against the expected feature length
    pub fn from_values(values: Vec<f32>, expected_len: usize) -> Result<Self> {
        if values.len() != expected_len {
            return Err(Error::FeatureLength {
                expected: expected_len,
                actual: values.len(),
            });
        }
        Ok(Self { values })
    }

    pub fn zeros(len: usize) -> Self {
        Self {
            values: vec![0.0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|v| *v == 0.0)
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.values
    }
}

/// Per-entity landmark arrays recovered from a feature vector
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFrame {
    pub entities: Vec<(EntityKind, Vec<Landmark>)>,
}

impl ParsedFrame {
    pub fn entity(&self, kind: EntityKind) -> Option<&[Landmark]> {
        self.entities
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, l)| l.as_slice())
    }

    /// Convert back into a detector frame; all-zero entities are treated as
    /// not detected, matching how they were written.
    pub fn into_frame(self, timestamp: Timestamp) -> HolisticFrame {
        let mut frame = HolisticFrame::new(timestamp);
        for (kind, landmarks) in self.entities {
            let detected = landmarks.iter().any(|lm| {
                lm.x != 0.0 || lm.y != 0.0 || lm.z != 0.0 || lm.visibility.unwrap_or(0.0) != 0.0
            });
            if detected {
                frame.set_entity(kind, Some(landmarks));
            }
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> HolisticFrame {
        let pose = (0..33)
            .map(|i| {
                Landmark::new(i as f32 * 0.01, 0.5, -0.1).with_visibility(0.9 - i as f32 * 0.01)
            })
            .collect();
        let face = (0..468)
            .map(|i| Landmark::new(0.3, i as f32 * 0.001, 0.02))
            .collect();
        let left = (0..21)
            .map(|i| Landmark::new(0.2 + i as f32 * 0.005, 0.6, -0.03))
            .collect();
        let right = (0..21)
            .map(|i| Landmark::new(0.7, 0.6 - i as f32 * 0.004, 0.01))
            .collect();

        HolisticFrame::new(Timestamp::from_nanos(0))
            .with_entity(EntityKind::Pose, pose)
            .with_entity(EntityKind::Face, face)
            .with_entity(EntityKind::LeftHand, left)
            .with_entity(EntityKind::RightHand, right)
    }

    #[test]
    fn test_holistic_feature_length() {
        let layout = FeatureLayout::holistic();
        assert_eq!(layout.feature_length(), 33 * 4 + 468 * 3 + 21 * 3 + 21 * 3);
        assert_eq!(layout.feature_length(), 1662);
        assert_eq!(layout.offset_of(EntityKind::Face), Some(132));
        assert_eq!(layout.offset_of(EntityKind::LeftHand), Some(132 + 1404));
        assert_eq!(
            layout.offset_of(EntityKind::RightHand),
            Some(132 + 1404 + 63)
        );
    }

    #[test]
    fn test_flatten_order() {
        let layout = FeatureLayout::holistic();
        let frame = sample_frame();
        let vector = layout.flatten(&frame);
        let values = vector.as_slice();

        // pose point 1: x, y, z, visibility
        assert!((values[4] - 0.01).abs() < 1e-6);
        assert!((values[5] - 0.5).abs() < 1e-6);
        assert!((values[6] + 0.1).abs() < 1e-6);
        assert!((values[7] - 0.89).abs() < 1e-6);

        // first right hand point
        let rh = layout.offset_of(EntityKind::RightHand).unwrap();
        assert!((values[rh] - 0.7).abs() < 1e-6);
        assert!((values[rh + 1] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_undetected_entity_zero_filled() {
        let layout = FeatureLayout::holistic();
        let frame = HolisticFrame::new(Timestamp::from_nanos(0))
            .with_entity(
                EntityKind::RightHand,
                vec![Landmark::new(0.5, 0.5, 0.5); 21],
            );
        let vector = layout.flatten(&frame);

        let rh = layout.offset_of(EntityKind::RightHand).unwrap();
        assert!(vector.as_slice()[..rh].iter().all(|v| *v == 0.0));
        assert!(vector.as_slice()[rh..].iter().all(|v| *v == 0.5));
    }

    #[test]
    fn test_flatten_parse_reconstructs_entities() {
        let layout = FeatureLayout::holistic();
        let frame = sample_frame();
        let parsed = layout.parse(&layout.flatten(&frame)).unwrap();

        for kind in EntityKind::ALL {
            assert_eq!(parsed.entity(kind), frame.entity(kind), "{}", kind.name());
        }
        assert_eq!(parsed.into_frame(frame.timestamp), frame);

        // Visibility is normalized to each entity's component layout
        let mut pose = frame.entity(EntityKind::Pose).unwrap().to_vec();
        pose[0].visibility = None;
        let mut left = frame.entity(EntityKind::LeftHand).unwrap().to_vec();
        left[0] = left[0].with_visibility(0.7);
        let lossy = frame
            .clone()
            .with_entity(EntityKind::Pose, pose)
            .with_entity(EntityKind::LeftHand, left);

        let parsed = layout.parse(&layout.flatten(&lossy)).unwrap();
        let pose = parsed.entity(EntityKind::Pose).unwrap();
        assert_eq!(pose[0].visibility, Some(0.0));
        assert_eq!(pose[1], frame.entity(EntityKind::Pose).unwrap()[1]);
        let left = parsed.entity(EntityKind::LeftHand).unwrap();
        assert_eq!(left[0].visibility, None);
        assert_eq!(left[0].x, 0.2);
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        let layout = FeatureLayout::holistic();
        let err = layout.parse(&FeatureVector::zeros(10)).unwrap_err();
        assert!(matches!(
            err,
            Error::FeatureLength {
                expected: 1662,
                actual: 10
            }
        ));
    }

    #[test]
    fn test_layout_rejects_out_of_order_entities() {
        let result = FeatureLayout::new(vec![
            EntitySchema::new(EntityKind::RightHand, 21, ComponentLayout::Xyz),
            EntitySchema::new(EntityKind::LeftHand, 21, ComponentLayout::Xyz),
        ]);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_from_counts_matches_holistic() {
        let layout = FeatureLayout::from_counts(33, 468, 21, 21).unwrap();
        assert_eq!(layout, FeatureLayout::holistic());
    }

    #[test]
    fn test_from_counts_rejects_zero_counts() {
        assert!(matches!(
            FeatureLayout::from_counts(0, 468, 21, 21),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            FeatureLayout::from_counts(33, 468, 21, 0),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_hands_only_layout() {
        let layout = FeatureLayout::new(vec![
            EntitySchema::new(EntityKind::LeftHand, 21, ComponentLayout::Xyz),
            EntitySchema::new(EntityKind::RightHand, 21, ComponentLayout::Xyz),
        ])
        .unwrap();
        assert_eq!(layout.feature_length(), 126);
        assert_eq!(layout.offset_of(EntityKind::Pose), None);
    }
}
