pub mod genre;
pub mod movie;
pub mod search;

pub use genre::{Genre, normalize_genre};
pub use movie::Movie;
pub use search::MovieSearch;
