//! Fill-time resolution and rendering
//!
//! Turns a submission value map into draw instructions (resolving every
//! alias to its group's value) and renders those instructions onto the
//! original PDF bytes.

mod renderer;
mod resolver;

pub use renderer::*;
pub use resolver::*;
