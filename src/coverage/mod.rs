//! Element Coverage
//!
//! Coverage sources (discoverable elements per screen) and the calculator
//! that compares them with the elements actually operated.

pub mod source;
pub mod calculator;

pub use calculator::{CoverageCalculator, ElementCoverage, ScreenCoverage};
pub use source::{CoverageSource, CoverageSources};
