//! API route handlers

pub mod dedup;
pub mod fields;
pub mod generate;
pub mod merge;
pub mod templates;
