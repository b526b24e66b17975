//! # Signflow-Sequence
//!
//! Assembly of per-frame feature vectors into fixed-length sequence windows.
//!
//! Two framing policies share one buffer:
//!
//! - **Segment**: fixed, non-overlapping windows for recording labeled
//!   training data. A segment emits exactly once, either when it reaches
//!   the sequence length or when it is finalized early (zero-padded if it
//!   holds at least the minimum frame count, discarded otherwise).
//! - **Sliding**: the latest `N` frames, available on every push once the
//!   buffer has warmed up. Used for live recognition.
//!
//! [`FramePipeline`] chains the stabilizer, the feature layout and the
//! buffer into a single per-frame call.

pub mod buffer;
pub mod pipeline;
pub mod window;

pub use buffer::*;
pub use pipeline::*;
pub use window::*;
