//! FormFill Server Library
//!
//! Field identity resolution for PDF form templates: redundancy detection,
//! merge coordination, fill resolution, and document rendering. The crate
//! root exposes every module so integration tests and benchmarks can drive
//! the engine directly; the server binary is in main.rs.

pub mod catalog;
pub mod config;
pub mod db;
pub mod dedup;
pub mod error;
pub mod fill;
pub mod merge;
pub mod routes;
pub mod state;
pub mod storage;
