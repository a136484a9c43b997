//! Field identity resolution: similarity scoring and redundancy detection
//!
//! Detects when independently-placed fields across a multi-page document
//! represent the same logical input. Detection output is advisory only; the
//! catalog is never mutated here.

mod detector;
mod similarity;

pub use detector::*;
pub use similarity::*;
