//! # mosaic-core: configuration foundation for mosaic
//!
//! Holds the process-wide settings model shared by every mosaic crate:
//! the registered component list, the database map, and the testing flag,
//! together with the error taxonomy for configuration failures.
//!
//! Settings are plain data. They are loaded once (from `mosaic.toml` and the
//! environment), handed to an explicit context object, and never mutated
//! behind the caller's back.

pub mod config;
pub mod error;

pub use config::{DatabaseConfig, Settings};
pub use error::{ConfigError, CoreError, CoreResult};
