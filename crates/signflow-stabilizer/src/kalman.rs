//! Constant-velocity Kalman filter for a single landmark slot.
//!
//! State vector: `[p_0 .. p_{D-1}, v_0 .. v_{D-1}]` with `D` = 2 (x, y) or
//! 3 (x, y, z). One step is one frame, so the transition is
//!
//! ```text
//! | I  I |
//! | 0  I |
//! ```
//!
//! and only positions are measured (`H = [I 0]`).

use nalgebra::{DMatrix, DVector};

use signflow_core::{FilterDimensions, StabilizerConfig};

/// Fixed filter parameters shared by every slot of a bank
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KalmanParams {
    pub dimensions: FilterDimensions,
    pub process_noise: f64,
    pub measurement_noise: f64,
    pub initial_covariance: f64,
}

impl KalmanParams {
    pub fn from_config(config: &StabilizerConfig) -> Self {
        Self {
            dimensions: config.dimensions,
            process_noise: config.process_noise,
            measurement_noise: config.measurement_noise,
            initial_covariance: config.initial_covariance,
        }
    }
}

impl Default for KalmanParams {
    fn default() -> Self {
        Self::from_config(&StabilizerConfig::default())
    }
}

/// Kalman state owned by one landmark slot
#[derive(Debug, Clone)]
pub struct KalmanState {
    dims: usize,
    /// State: positions then velocities
    state: DVector<f64>,
    /// State covariance (uncertainty)
    covariance: DMatrix<f64>,
    transition: DMatrix<f64>,
    observation: DMatrix<f64>,
    process_noise: DMatrix<f64>,
    measurement_noise: DMatrix<f64>,
}

impl KalmanState {
    /// Seed a filter at the first observed position with zero velocity
    pub fn new(position: &[f64], params: &KalmanParams) -> Self {
        let dims = params.dimensions.count();
        let n = 2 * dims;

        let mut state = DVector::zeros(n);
        for (i, p) in position.iter().take(dims).enumerate() {
            state[i] = *p;
        }

        let mut transition = DMatrix::identity(n, n);
        for i in 0..dims {
            transition[(i, dims + i)] = 1.0;
        }

        let mut observation = DMatrix::zeros(dims, n);
        for i in 0..dims {
            observation[(i, i)] = 1.0;
        }

        Self {
            dims,
            state,
            covariance: DMatrix::identity(n, n) * params.initial_covariance,
            transition,
            observation,
            process_noise: DMatrix::identity(n, n) * params.process_noise,
            measurement_noise: DMatrix::identity(dims, dims) * params.measurement_noise,
        }
    }

    /// Override the velocity estimate
    pub fn with_velocity(mut self, velocity: &[f64]) -> Self {
        for (i, v) in velocity.iter().take(self.dims).enumerate() {
            self.state[self.dims + i] = *v;
        }
        self
    }

    /// Advance one frame with the constant-velocity model.
    ///
    /// The returned step is the only way to fuse a measurement, so a
    /// measurement can never be applied to a state that was not predicted
    /// for the current frame. Dropping the step leaves the prediction as the
    /// estimate.
    pub fn predict(&mut self) -> PredictedStep<'_> {
        // x = F x
        self.state = &self.transition * &self.state;

        // P = F P Fᵀ + Q
        self.covariance =
            &self.transition * &self.covariance * self.transition.transpose() + &self.process_noise;

        PredictedStep { filter: self }
    }

    fn correct(&mut self, measurement: &[f64]) -> bool {
        debug_assert_eq!(measurement.len(), self.dims);
        let z = DVector::from_iterator(self.dims, measurement.iter().copied());

        // Innovation: y = z - H x
        let innovation = z - &self.observation * &self.state;

        // Innovation covariance: S = H P Hᵀ + R
        let s = &self.observation * &self.covariance * self.observation.transpose()
            + &self.measurement_noise;

        let Some(s_inv) = s.try_inverse() else {
            tracing::warn!("singular innovation covariance, keeping prediction");
            return false;
        };

        // Kalman gain: K = P Hᵀ S⁻¹
        let gain = &self.covariance * self.observation.transpose() * s_inv;

        // x = x + K y
        self.state += &gain * innovation;

        // P = (I - K H) P
        let n = self.state.len();
        self.covariance = (DMatrix::identity(n, n) - &gain * &self.observation) * &self.covariance;

        true
    }

    /// Number of filtered position components
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Estimated position (first `dims` state entries)
    pub fn position(&self) -> &[f64] {
        &self.state.as_slice()[..self.dims]
    }

    /// Estimated velocity per frame
    pub fn velocity(&self) -> &[f64] {
        &self.state.as_slice()[self.dims..]
    }

    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    /// Total positional variance (trace of the position block)
    pub fn position_variance(&self) -> f64 {
        (0..self.dims).map(|i| self.covariance[(i, i)]).sum()
    }
}

/// A filter that has been predicted for the current frame
pub struct PredictedStep<'a> {
    filter: &'a mut KalmanState,
}

impl PredictedStep<'_> {
    /// Fuse a measurement into the prediction.
    ///
    /// Returns `false` if the innovation covariance could not be inverted, in
    /// which case the prediction is kept.
    pub fn update(self, measurement: &[f64]) -> bool {
        self.filter.correct(measurement)
    }

    /// Predicted position for this frame
    pub fn position(&self) -> &[f64] {
        self.filter.position()
    }
}
