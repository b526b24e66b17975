//! # Signflow-Core
//!
//! Core types and utilities for the signflow sign-language landmark
//! pipeline: landmark and frame types, the flattened feature-vector layout
//! shared by data collection and live recognition, and the configuration
//! surface consumed by every other crate.

pub mod config;
pub mod error;
pub mod layout;
pub mod types;

pub use self::config::*;
pub use error::{Error, Result};
pub use layout::*;
pub use types::*;
