//! Field catalog domain types
//!
//! The catalog is the set of declared fillable locations for one template.
//! External collaborators never touch the rows directly; everything goes
//! through the engine's repositories and coordinators.

mod types;

pub use types::*;
