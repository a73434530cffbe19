//! Output modules.
//!
//! YAML output files and collision reports.

pub mod emit;
pub mod generator;

pub use emit::{Indent, YamlEmitter};
pub use generator::*;
