pub mod upsert;

pub use upsert::{UpsertOutcome, apply_upsert, upsert};
