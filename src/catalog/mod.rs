pub mod schema;
pub mod types;

pub use schema::{FieldRule, FieldSpec, RecordSchema, SchemaDef};
pub use types::{Record, Value};
