//! Schema compiler and grid query compiler for admin CRUD scaffolding.
//!
//! A model hands over a declarative [`schema::ModelSchema`]; the
//! [`schema::SchemaRegistry`] merges and caches per-purpose property sets,
//! [`form`] turns them into input descriptors and validators, and [`grid`]
//! compiles grid requests into query plans, runs them and shapes the rows.

pub mod error;
pub mod form;
pub mod grid;
pub mod schema;
pub mod sql;

pub use error::{ScaffoldError, ScaffoldResult};
