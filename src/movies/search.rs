use crate::FlatDb;
use crate::error::FlatDbError;
use crate::movies::genre::{Genre, normalize_genre};
use crate::movies::movie::Movie;
use crate::query::plan::{Order, QueryOutput};
use crate::repository::Entity;
use tracing::debug;

/// Runtime tolerance, in minutes, on either side of the requested duration.
pub const RUNTIME_WINDOW: i64 = 10;

/// Movie lookup by preferred runtime and genres.
///
/// With no criteria a single random movie is returned. With genres, movies
/// sharing more of the requested genres come first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovieSearch {
    pub duration: Option<i64>,
    pub genres: Vec<String>,
}

impl MovieSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn duration(mut self, minutes: i64) -> Self {
        self.duration = Some(minutes);
        self
    }

    pub fn genres<I, S>(mut self, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.genres = genres.into_iter().map(|g| g.as_ref().to_string()).collect();
        self
    }

    /// Checks the criteria and returns the normalized genre names.
    pub async fn validate(&self, db: &FlatDb) -> Result<Vec<String>, FlatDbError> {
        if let Some(duration) = self.duration
            && duration < 1
        {
            return Err(FlatDbError::validation(
                "duration",
                "must be an integer of at least 1",
            ));
        }
        if self.genres.is_empty() {
            return Ok(Vec::new());
        }
        let known = Genre::names(db).await?;
        let mut normalized = Vec::with_capacity(self.genres.len());
        for raw in &self.genres {
            let genre = normalize_genre(raw);
            if !known.contains(&genre) {
                return Err(FlatDbError::validation(
                    "genres",
                    format!("{genre} genre is not recognized"),
                ));
            }
            normalized.push(genre);
        }
        Ok(normalized)
    }

    pub async fn run(&self, db: &FlatDb) -> Result<QueryOutput<Movie>, FlatDbError> {
        let genres = self.validate(db).await?;
        let query = Movie::query(db);
        let window = self
            .duration
            .map(|d| (d.saturating_sub(RUNTIME_WINDOW), d.saturating_add(RUNTIME_WINDOW)));
        debug!(duration = ?self.duration, genres = genres.len(), "movie search");

        match (window, genres.is_empty()) {
            (None, true) => Ok(QueryOutput::One(query.random().await?)),
            (None, false) => {
                query
                    .filter_in("genres", genres)?
                    .order_by_matches(0, Order::Desc)
                    .execute()
                    .await
            }
            (Some(window), true) => Ok(QueryOutput::One(
                query.filter_between("runtime", window)?.random().await?,
            )),
            (Some(window), false) => {
                query
                    .filter_in("genres", genres)?
                    .filter_between("runtime", window)?
                    .order_by_matches(0, Order::Desc)
                    .execute()
                    .await
            }
        }
    }
}
