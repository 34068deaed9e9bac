use crate::FlatDb;
use crate::catalog::schema::{FieldRule, SchemaDef};
use crate::catalog::types::Record;
use crate::error::FlatDbError;
use crate::repository::{Entity, expect_kind, text_field};
use async_trait::async_trait;
use once_cell::sync::Lazy;

static GENRE_SCHEMA: Lazy<SchemaDef> = Lazy::new(|| {
    SchemaDef::new("genres").without_primary_key().field(
        "value",
        FieldRule::Text {
            min_len: Some(1),
            max_len: Some(64),
        },
    )
});

/// A genre name. Genres carry no identity; two genres with the same name are
/// the same genre.
#[derive(Debug, Clone, PartialEq)]
pub struct Genre {
    record: Record,
}

impl Genre {
    pub fn new(name: &str) -> Self {
        Self {
            record: Record::new().with("value", normalize_genre(name)),
        }
    }

    pub fn name(&self) -> &str {
        text_field(&self.record, "value").unwrap_or_default()
    }

    /// Every stored genre name, in insertion order.
    pub async fn names(db: &FlatDb) -> Result<Vec<String>, FlatDbError> {
        Ok(Self::query(db)
            .all()
            .await?
            .iter()
            .map(|genre| genre.name().to_string())
            .collect())
    }
}

impl std::fmt::Display for Genre {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[async_trait]
impl Entity for Genre {
    fn schema() -> &'static SchemaDef {
        &GENRE_SCHEMA
    }

    fn from_record(record: Record) -> Result<Self, FlatDbError> {
        expect_kind(&record, "value", "Text")?;
        Ok(Self { record })
    }

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    async fn validate(&self, db: &FlatDb) -> Result<(), FlatDbError> {
        self.validate_schema()?;
        let name = self.name();
        if Self::names(db).await?.iter().any(|known| known == name) {
            return Err(FlatDbError::validation(
                "value",
                format!("{name} genre already exists"),
            ));
        }
        Ok(())
    }
}

/// Upper-cases the first character and lower-cases the rest, so `"sCI-fI"`
/// becomes `"Sci-fi"`.
pub fn normalize_genre(name: &str) -> String {
    let mut chars = name.trim().chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
