//! Exponential moving average over a landmark position.

/// EMA state paired with one Kalman slot.
///
/// The first sample seeds the average unchanged; afterwards
/// `smoothed = α·new + (1 − α)·previous`.
#[derive(Debug, Clone)]
pub struct EmaState {
    alpha: f64,
    state: Option<Vec<f64>>,
}

impl EmaState {
    /// `alpha` must be in (0, 1]; validated by the stabilizer configuration
    pub fn new(alpha: f64) -> Self {
        Self { alpha, state: None }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn is_seeded(&self) -> bool {
        self.state.is_some()
    }

    /// Feed one sample and return the smoothed value
    pub fn smooth(&mut self, sample: &[f64]) -> &[f64] {
        let alpha = self.alpha;
        match &mut self.state {
            Some(prev) if prev.len() == sample.len() => {
                for (p, x) in prev.iter_mut().zip(sample) {
                    *p = alpha * x + (1.0 - alpha) * *p;
                }
            }
            state => {
                *state = Some(sample.to_vec());
            }
        }

        self.state.as_deref().unwrap_or(&[])
    }

    pub fn value(&self) -> Option<&[f64]> {
        self.state.as_deref()
    }

    pub fn reset(&mut self) {
        self.state = None;
    }
}
