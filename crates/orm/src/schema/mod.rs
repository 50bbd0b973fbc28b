//! Schema metadata: table definitions, per-component collections, the
//! registry that partitions model types into them, and the scope filter
//! used by bulk operations.

mod metadata;
mod registry;
mod scope;
mod table;

pub use metadata::MetadataCollection;
pub use registry::{ClassRegistry, ComponentEntry, RegisteredModel, SchemaRegistry};
pub use scope::{included, validate_names};
pub use table::{ColumnDef, ForeignKeyDef, ModelDef, ModelIdent, TableDef};
