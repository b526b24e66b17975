//! Slot-indexed filter bank for one tracked entity.
//!
//! Slot `i` always filters the `i`-th point reported for the entity; the bank
//! does not track physical identity, so a slot's state is only meaningful
//! while detection stays continuous.

use serde::{Deserialize, Serialize};

use signflow_core::{Error, Landmark, Result, StabilizerConfig};

use crate::ema::EmaState;
use crate::kalman::{KalmanParams, KalmanState};

/// Whether a slot's estimate fused an observation this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Observed,
    Predicted,
}

/// Estimate for one slot in one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlotEstimate {
    /// Filtered landmark; zero for slots that were never observed
    pub landmark: Landmark,
    pub status: SlotStatus,
    /// False until the slot receives its first observation
    pub initialized: bool,
}

impl SlotEstimate {
    fn uninitialized() -> Self {
        Self {
            landmark: Landmark::zero(),
            status: SlotStatus::Predicted,
            initialized: false,
        }
    }

    pub fn is_observed(&self) -> bool {
        self.status == SlotStatus::Observed
    }
}

/// Kalman and EMA state of one point.
///
/// Unobserved frames run the Kalman prediction along the last velocity and
/// feed it through the EMA, so a long occlusion can drift outside the
/// normalized range and that drift is blended into the first re-acquired
/// estimate. The Kalman part itself snaps back because its covariance grows
/// while predicting.
#[derive(Debug, Clone, Default)]
struct Slot {
    kalman: Option<KalmanState>,
    ema: Option<EmaState>,
    /// Last observed z, carried when z is not filtered
    depth: f32,
}

/// Kalman + EMA filter bank for the `K` points of one entity
#[derive(Debug, Clone)]
pub struct LandmarkStabilizer {
    params: KalmanParams,
    ema_alpha: Option<f64>,
    slots: Vec<Slot>,
}

impl LandmarkStabilizer {
    /// Create a bank of `point_count` slots; the configuration is validated
    /// here so per-frame calls cannot fail.
    pub fn new(point_count: usize, config: &StabilizerConfig) -> Result<Self> {
        config.validate()?;
        if point_count == 0 {
            return Err(Error::Config("stabilizer needs at least one slot".into()));
        }

        Ok(Self {
            params: KalmanParams::from_config(config),
            ema_alpha: config.ema_alpha,
            slots: vec![Slot::default(); point_count],
        })
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots that have been observed at least once
    pub fn initialized_count(&self) -> usize {
        self.slots.iter().filter(|s| s.kalman.is_some()).count()
    }

    /// Run one frame.
    ///
    /// `observations` is `None` when the entity was not detected. Points
    /// beyond the slot count are ignored and missing or non-finite points
    /// are treated as absent for this frame.
    pub fn stabilize(&mut self, observations: Option<&[Landmark]>) -> Vec<SlotEstimate> {
        if let Some(obs) = observations {
            if obs.len() != self.slots.len() {
                tracing::debug!(
                    expected = self.slots.len(),
                    actual = obs.len(),
                    "landmark count differs from slot count"
                );
            }
        }

        let dims = self.params.dimensions.count();
        let params = self.params;
        let ema_alpha = self.ema_alpha;

        self.slots
            .iter_mut()
            .enumerate()
            .map(|(i, slot)| {
                let observation = observations
                    .and_then(|o| o.get(i))
                    .filter(|lm| is_finite(lm));
                slot.step(observation, dims, &params, ema_alpha)
            })
            .collect()
    }

    /// Drop all filter state (end of capture session)
    pub fn reset(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = Slot::default());
    }
}

impl Slot {
    fn step(
        &mut self,
        observation: Option<&Landmark>,
        dims: usize,
        params: &KalmanParams,
        ema_alpha: Option<f64>,
    ) -> SlotEstimate {
        let status = if let Some(kalman) = self.kalman.as_mut() {
            let step = kalman.predict();
            match observation {
                Some(obs) => {
                    // A failed inversion keeps the prediction, but the frame
                    // still carried an observation.
                    step.update(&measurement(obs, dims));
                    SlotStatus::Observed
                }
                None => SlotStatus::Predicted,
            }
        } else if let Some(obs) = observation {
            self.kalman = Some(KalmanState::new(&measurement(obs, dims), params));
            self.ema = ema_alpha.map(EmaState::new);
            SlotStatus::Observed
        } else {
            return SlotEstimate::uninitialized();
        };

        if let Some(obs) = observation {
            self.depth = obs.z;
        }

        let Some(kalman) = &self.kalman else {
            return SlotEstimate::uninitialized();
        };

        let position = match &mut self.ema {
            Some(ema) => ema.smooth(kalman.position()).to_vec(),
            None => kalman.position().to_vec(),
        };

        let z = if dims >= 3 {
            position[2] as f32
        } else {
            self.depth
        };

        SlotEstimate {
            landmark: Landmark {
                x: position[0] as f32,
                y: position[1] as f32,
                z,
                visibility: observation.and_then(|o| o.visibility),
            },
            status,
            initialized: true,
        }
    }
}

fn measurement(lm: &Landmark, dims: usize) -> Vec<f64> {
    lm.position()[..dims].iter().map(|v| *v as f64).collect()
}

fn is_finite(lm: &Landmark) -> bool {
    lm.x.is_finite() && lm.y.is_finite() && lm.z.is_finite()
}
