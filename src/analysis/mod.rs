//! Analysis modules.
//!
//! Grouping of descriptors and collision detection.

pub mod aggregator;

pub use aggregator::*;
