//! # Signflow-Dataset
//!
//! Recorded gestures are stored one frame per file:
//!
//! ```text
//! <root>/
//!   labels.json
//!   <action>/
//!     <sequence>/
//!       0.npy .. <N-1>.npy      # 1-D float32 feature vector
//! ```
//!
//! [`DatasetWriter`] persists segment windows into this layout and
//! [`DatasetLoader`] rebuilds `(sequences, N, F)` training tensors from it,
//! tolerating missing or malformed frames.

pub mod layout;
pub mod loader;
pub mod manifest;
pub mod npy;
pub mod writer;

pub use layout::*;
pub use loader::*;
pub use manifest::*;
pub use writer::*;
