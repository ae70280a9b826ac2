//! branchql — compiles a declarative nested spec into dependency-ordered
//! SQL and assembles flat rows back into tree-shaped entity records.
//!
//! Six collaborating components carry the pipeline end to end:
//! - [`spec`] parses the DSL into a [`spec::TableSpec`] AST.
//! - [`analyzer`] classifies relationships, promotes single-valued joins
//!   into their root's query group, and computes output paths.
//! - [`transform`] resolves named value transforms applied to raw columns.
//! - [`planner`] emits the SELECT/JOIN SQL for a query group.
//! - [`assembler`] folds a flat aliased row back into a nested record.
//! - [`driver`] sequences id resolution, batching, and per-batch queries
//!   into a lazy stream of assembled records.
//!
//! [`db`] and [`selection`] are the external collaborators this crate
//! drives rather than owns: a concrete `Database` implementation and a
//! selection predicate are both supplied by the caller.

pub mod analyzer;
pub mod assembler;
pub mod config;
pub mod db;
pub mod driver;
pub mod error;
pub mod planner;
pub mod selection;
pub mod spec;
pub mod transform;

pub use config::BatchConfig;
pub use driver::{compile, entities, entity, entity_ids, EntitiesOptions, EntityRecord};
pub use error::ExtractError;
pub use selection::{Age, Selection};
pub use spec::CompiledSpec;
pub use transform::{TransformRef, TransformRegistry};
