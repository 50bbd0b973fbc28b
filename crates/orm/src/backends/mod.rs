//! Database backend abstraction
//!
//! The schema and migration layers talk to the database through these
//! object-safe traits. Two backends ship with the crate: PostgreSQL over
//! sqlx, and a lightweight in-memory engine used by the testing redirect.

mod core;
mod memory;
mod postgres;

pub use self::core::{Database, DatabaseConnection};
pub use memory::MemoryDatabase;
pub use postgres::PostgresDatabase;
