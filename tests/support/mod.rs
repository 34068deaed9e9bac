#![allow(dead_code)]

use async_trait::async_trait;
use flatdb::FlatDb;
use flatdb::catalog::schema::{FieldRule, SchemaDef};
use flatdb::catalog::types::{Record, Value};
use flatdb::error::FlatDbError;
use flatdb::repository::{Entity, i64_field, text_field};
use flatdb::storage::{MemoryStorage, Snapshot};
use once_cell::sync::Lazy;
use std::sync::Arc;

static PEOPLE: Lazy<SchemaDef> = Lazy::new(|| {
    SchemaDef::new("people")
        .field(
            "name",
            FieldRule::Text {
                min_len: Some(1),
                max_len: Some(32),
            },
        )
        .optional_field(
            "age",
            FieldRule::Integer {
                min: Some(0),
                max: None,
                coerce: true,
            },
        )
});

static POSTS: Lazy<SchemaDef> = Lazy::new(|| {
    SchemaDef::new("posts")
        .field("hashtags", FieldRule::List { min_len: None })
        .optional_field("mentions", FieldRule::List { min_len: None })
});

#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    record: Record,
}

impl Person {
    pub fn new(name: &str, age: i64) -> Self {
        Self {
            record: Record::new().with("name", name).with("age", age),
        }
    }

    pub fn with_id(id: i64) -> Self {
        Self {
            record: Record::new().with("id", id),
        }
    }

    pub fn id(&self) -> Option<i64> {
        i64_field(&self.record, "id")
    }

    pub fn name(&self) -> &str {
        text_field(&self.record, "name").unwrap_or_default()
    }

    pub fn age(&self) -> Option<i64> {
        i64_field(&self.record, "age")
    }
}

#[async_trait]
impl Entity for Person {
    fn schema() -> &'static SchemaDef {
        &PEOPLE
    }

    fn from_record(record: Record) -> Result<Self, FlatDbError> {
        Ok(Self { record })
    }

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    record: Record,
}

impl Post {
    pub fn id(&self) -> Option<i64> {
        i64_field(&self.record, "id")
    }
}

#[async_trait]
impl Entity for Post {
    fn schema() -> &'static SchemaDef {
        &POSTS
    }

    fn from_record(record: Record) -> Result<Self, FlatDbError> {
        Ok(Self { record })
    }

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }
}

pub fn person(id: i64, name: &str, age: i64) -> Record {
    Record::new().with("id", id).with("name", name).with("age", age)
}

pub fn people() -> Vec<Record> {
    vec![
        person(1, "Jean", 18),
        person(2, "Juliett", 21),
        person(3, "Robert", 31),
        person(4, "Gary", 29),
    ]
}

pub fn post(id: i64, hashtags: &[&str], mentions: &[&str]) -> Record {
    Record::new()
        .with("id", id)
        .with("hashtags", hashtags.to_vec())
        .with("mentions", mentions.to_vec())
}

pub fn posts() -> Vec<Record> {
    vec![
        post(1, &["throwback", "Friends"], &["anna", "bob"]),
        post(2, &["throwback", "partynight"], &["anna", "bob", "carl"]),
        post(3, &["Throwback", "GoodTimes", "friends"], &["dora"]),
    ]
}

/// Memory-backed database seeded with `people` and `posts`. The storage is
/// returned alongside so tests can inspect read/write counters.
pub fn seeded() -> (FlatDb, Arc<MemoryStorage>) {
    let mut snapshot = Snapshot::new();
    snapshot.insert("people".to_string(), people());
    snapshot.insert("posts".to_string(), posts());
    let storage = Arc::new(MemoryStorage::with_snapshot(snapshot));
    let db = FlatDb::with_storage(Default::default(), storage.clone()).expect("db");
    (db, storage)
}

pub fn ages(people: &[Person]) -> Vec<i64> {
    people.iter().filter_map(Person::age).collect()
}

pub fn ids(posts: &[Post]) -> Vec<i64> {
    posts.iter().filter_map(Post::id).collect()
}

pub fn field<'a, E: Entity>(entity: &'a E, name: &str) -> &'a Value {
    entity.record().field(name)
}
