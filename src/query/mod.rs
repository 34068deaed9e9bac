pub mod executor;
pub mod operators;
pub mod plan;

pub use executor::Pipeline;
pub use operators::Stage;
pub use plan::{Entry, EntryId, MatchAnnotations, Order, QueryOutput, WorkingSet};
