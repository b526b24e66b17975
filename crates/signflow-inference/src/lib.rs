//! # Signflow-Inference
//!
//! Live recognition on top of the sliding-window pipeline. Each capture
//! session owns its own stabilizer and window buffer; completed windows are
//! handed to an external [`SequenceClassifier`], decoded against the label
//! set and debounced before being reported.

pub mod classifier;
pub mod debounce;
pub mod session;

pub use classifier::*;
pub use debounce::*;
pub use session::*;
