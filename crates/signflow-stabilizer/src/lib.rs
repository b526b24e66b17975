//! # Signflow-Stabilizer
//!
//! Temporal stabilization of per-frame landmark observations.
//!
//! Every tracked point owns a slot holding a constant-velocity Kalman filter
//! and an optional exponential moving average. Each frame, every initialized
//! slot is advanced with a prediction step; slots that received an
//! observation then fuse it through the Kalman gain. Slots without an
//! observation keep the prediction, which bridges brief occlusions.
//!
//! ## Stages per slot
//!
//! 1. **Predict**: `p += v`, `v` unchanged, `P = F P Fᵀ + Q`
//! 2. **Update** (observed only): innovation, gain, posterior
//! 3. **Smooth** (optional): `s = α·p + (1 − α)·s_prev`, seeded on first use

pub mod ema;
pub mod frame;
pub mod kalman;
pub mod stabilizer;

pub use ema::*;
pub use frame::*;
pub use kalman::*;
pub use stabilizer::*;
