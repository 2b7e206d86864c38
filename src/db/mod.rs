//! Local persistence of the current generation results.
//!
//! This module is split into two submodules:
//! - `model`: typed records returned by the repository.
//! - `repo`: SQL-only functions that map rows into records.
//!
//! The repository API is re-exported at `newzly::db`.

pub mod model;
pub mod repo;

pub use model::StoredArticle;
pub use repo::*;
