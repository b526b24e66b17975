//! Fundamental types for the signflow pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one capture session (one filter bank per session)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Timestamp wrapper with nanosecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp_nanos_opt().unwrap_or(0))
    }

    pub fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        Self((secs * 1_000_000_000.0) as i64)
    }

    pub fn as_nanos(&self) -> i64 {
        self.0
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1_000_000_000.0
    }

    /// Seconds elapsed since `earlier` (negative if `earlier` is later)
    pub fn secs_since(&self, earlier: Timestamp) -> f64 {
        (self.0 - earlier.0) as f64 / 1_000_000_000.0
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.0)
    }
}

/// Tracked entity types reported by the holistic landmark detector.
///
/// The declaration order is the flatten order of a feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum EntityKind {
    Pose = 0,
    Face = 1,
    LeftHand = 2,
    RightHand = 3,
}

impl EntityKind {
    pub const COUNT: usize = 4;

    /// All entity kinds in flatten order
    pub const ALL: [EntityKind; Self::COUNT] = [
        EntityKind::Pose,
        EntityKind::Face,
        EntityKind::LeftHand,
        EntityKind::RightHand,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(idx: usize) -> Option<Self> {
        match idx {
            0 => Some(Self::Pose),
            1 => Some(Self::Face),
            2 => Some(Self::LeftHand),
            3 => Some(Self::RightHand),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Pose => "pose",
            EntityKind::Face => "face",
            EntityKind::LeftHand => "left_hand",
            EntityKind::RightHand => "right_hand",
        }
    }
}

/// Per-point component layout of a flattened entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentLayout {
    /// x, y, z
    Xyz,
    /// x, y, z, visibility
    XyzVisibility,
}

impl ComponentLayout {
    pub fn width(&self) -> usize {
        match self {
            ComponentLayout::Xyz => 3,
            ComponentLayout::XyzVisibility => 4,
        }
    }
}

/// One landmark in normalized image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Detector visibility/confidence, reported for pose landmarks only
    pub visibility: Option<f32>,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            visibility: None,
        }
    }

    pub fn with_visibility(mut self, visibility: f32) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Position components `[x, y, z]`
    pub fn position(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

/// Detector output for a single captured frame.
///
/// Each entity is either a list of landmarks or `None` when the detector did
/// not find it in this frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolisticFrame {
    pub timestamp: Timestamp,
    entities: [Option<Vec<Landmark>>; EntityKind::COUNT],
}

impl HolisticFrame {
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            entities: [None, None, None, None],
        }
    }

    /// Frame with no detected entity (e.g. the subject left the view)
    pub fn empty(timestamp: Timestamp) -> Self {
        Self::new(timestamp)
    }

    pub fn with_entity(mut self, kind: EntityKind, landmarks: Vec<Landmark>) -> Self {
        self.entities[kind.index()] = Some(landmarks);
        self
    }

    pub fn set_entity(&mut self, kind: EntityKind, landmarks: Option<Vec<Landmark>>) {
        self.entities[kind.index()] = landmarks;
    }

    pub fn entity(&self, kind: EntityKind) -> Option<&[Landmark]> {
        self.entities[kind.index()].as_deref()
    }

    pub fn is_detected(&self, kind: EntityKind) -> bool {
        self.entities[kind.index()].is_some()
    }

    pub fn detected_entities(&self) -> impl Iterator<Item = EntityKind> + '_ {
        EntityKind::ALL
            .into_iter()
            .filter(move |kind| self.is_detected(*kind))
    }
}
