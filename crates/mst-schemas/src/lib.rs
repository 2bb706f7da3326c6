//! Shared domain types and the cross-cutting error taxonomy.
//!
//! Persistence records (with surrogate ids and timestamps) live alongside
//! plain domain values here deliberately: the workspace keeps the two
//! conceptually distinct (components pass domain values to each other; only
//! the persistence layer deals in full records), but both are defined in one
//! crate so every other crate depends on a single, stable vocabulary.

pub mod entities;
pub mod error;

pub use entities::*;
pub use error::{AppError, AppResult};
