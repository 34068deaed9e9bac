use crate::FlatDb;
use crate::catalog::schema::{FieldRule, SchemaDef};
use crate::catalog::types::{Record, Value};
use crate::error::FlatDbError;
use crate::movies::genre::Genre;
use crate::repository::{Entity, expect_kind, i64_field, text_field, text_list_field};
use async_trait::async_trait;
use once_cell::sync::Lazy;

const TEXT_1_255: FieldRule = FieldRule::Text {
    min_len: Some(1),
    max_len: Some(255),
};

const FREE_TEXT: FieldRule = FieldRule::Text {
    min_len: None,
    max_len: None,
};

static MOVIE_SCHEMA: Lazy<SchemaDef> = Lazy::new(|| {
    SchemaDef::new("movies")
        .field("genres", FieldRule::List { min_len: Some(1) })
        .field("title", TEXT_1_255)
        .field("director", TEXT_1_255)
        .field(
            "year",
            FieldRule::Integer {
                min: Some(1888),
                max: None,
                coerce: true,
            },
        )
        .field(
            "runtime",
            FieldRule::Integer {
                min: Some(0),
                max: None,
                coerce: true,
            },
        )
        .optional_field("actors", FREE_TEXT)
        .optional_field("plot", FREE_TEXT)
        .optional_field("posterUrl", FREE_TEXT)
});

#[derive(Debug, Clone, PartialEq)]
pub struct Movie {
    record: Record,
}

impl Movie {
    pub fn new(title: &str, director: &str, year: i64, runtime: i64, genres: &[&str]) -> Self {
        Self {
            record: Record::new()
                .with("title", title)
                .with("director", director)
                .with("year", year)
                .with("runtime", runtime)
                .with("genres", genres.to_vec()),
        }
    }

    /// Wraps caller-supplied fields as-is; `save` coerces and validates them.
    pub fn from_fields(record: Record) -> Self {
        Self { record }
    }

    pub fn with_actors(mut self, actors: &str) -> Self {
        self.record.insert("actors", actors);
        self
    }

    pub fn with_plot(mut self, plot: &str) -> Self {
        self.record.insert("plot", plot);
        self
    }

    pub fn with_poster_url(mut self, url: &str) -> Self {
        self.record.insert("posterUrl", url);
        self
    }

    pub fn id(&self) -> Option<i64> {
        i64_field(&self.record, "id")
    }

    pub fn title(&self) -> &str {
        text_field(&self.record, "title").unwrap_or_default()
    }

    pub fn director(&self) -> &str {
        text_field(&self.record, "director").unwrap_or_default()
    }

    pub fn year(&self) -> Option<i64> {
        i64_field(&self.record, "year")
    }

    pub fn runtime(&self) -> Option<i64> {
        i64_field(&self.record, "runtime")
    }

    pub fn genres(&self) -> Vec<String> {
        text_list_field(&self.record, "genres")
    }

    pub fn actors(&self) -> Option<&str> {
        text_field(&self.record, "actors")
    }

    pub fn plot(&self) -> Option<&str> {
        text_field(&self.record, "plot")
    }

    pub fn poster_url(&self) -> Option<&str> {
        text_field(&self.record, "posterUrl")
    }
}

#[async_trait]
impl Entity for Movie {
    fn schema() -> &'static SchemaDef {
        &MOVIE_SCHEMA
    }

    fn from_record(record: Record) -> Result<Self, FlatDbError> {
        expect_kind(&record, "title", "Text")?;
        expect_kind(&record, "genres", "List")?;
        Ok(Self { record })
    }

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    /// Genres are checked first, including that each one is already stored,
    /// then the remaining schema rules.
    async fn validate(&self, db: &FlatDb) -> Result<(), FlatDbError> {
        Self::schema().validate_field(&self.record, "genres")?;
        let known = Genre::names(db).await?;
        let listed = self.record.field("genres").as_list().unwrap_or_default();
        for genre in listed {
            let recognized = genre
                .as_str()
                .is_some_and(|name| known.iter().any(|k| k == name));
            if !recognized {
                return Err(FlatDbError::validation(
                    "genres",
                    format!("{} genre is not recognized", display(genre)),
                ));
            }
        }
        self.validate_schema()
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::Text(text) => text.to_string(),
        other => serde_json::to_string(other)
            .unwrap_or_else(|_| other.kind_name().to_string()),
    }
}
