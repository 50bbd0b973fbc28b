//! # mosaic-orm: componentized database layer for mosaic
//!
//! An application assembled out of mosaic components shares one physical
//! database while every component keeps its own table metadata and its own
//! migration history. This crate holds the pieces that make that work:
//!
//! - the component resolver and schema registry that partition model types
//!   into per-component metadata collections at registration time,
//! - the scope filter and bulk operations (`init`, `clear`, `flush`),
//! - the migration engine with per-component revision chains over a single
//!   shared version table,
//! - the database backends and the memoizing engine manager.
//!
//! Everything operates on explicit context objects (`EngineManager`,
//! `SchemaRegistry`); there is no global mutable state.

pub mod backends;
pub mod component;
pub mod engine;
pub mod error;
pub mod migrations;
pub mod operations;
pub mod schema;

pub use component::ComponentResolver;
pub use engine::{DatabaseUrl, Engine, EngineManager};
pub use error::{OrmError, OrmResult};
pub use migrations::{
    ComponentStatus, MigrationConfig, MigrationEngine, MigrationReport, Revision,
    ScriptDirectory, SharedVersionTable, VersionStore,
};
pub use operations::{clear, flush, init, OpOptions, OpSummary};
pub use schema::{ModelDef, SchemaRegistry};
