mod support;

use flatdb::catalog::types::Value;
use flatdb::repository::Entity;
use support::{Person, field, seeded};

#[tokio::test]
async fn save_assigns_a_key_and_find_returns_it() {
    let (db, _) = seeded();
    let mut ann = Person::new("Ann", 40);
    assert!(ann.primary_key().is_none());
    ann.save(&db).await.expect("save");
    assert_eq!(ann.id(), Some(5));

    let found = Person::query(&db).find(5).await.expect("find").expect("ann");
    assert_eq!(found, ann);
}

#[tokio::test]
async fn save_coerces_numeric_text() {
    let (db, storage) = seeded();
    let mut person = Person::new("Zoe", 0);
    person.record_mut().insert("age", "27");
    person.save(&db).await.expect("save");
    assert_eq!(person.age(), Some(27));
    assert_eq!(storage.contents()["people"][4].field("age"), &Value::Integer(27));
}

#[tokio::test]
async fn validation_failure_writes_nothing() {
    let (db, storage) = seeded();
    let mut nameless = Person::new("", 30);
    let err = nameless.save(&db).await.expect_err("empty name");
    assert_eq!(err.code_str(), "validation");
    assert_eq!(
        err.to_string(),
        "Model validation failed. Field 'name': length must be between 1 and 32"
    );
    assert_eq!(storage.writes(), 0);
    assert_eq!(storage.reads(), 0);
}

#[tokio::test]
async fn load_merges_every_stored_field() {
    let (db, _) = seeded();
    let mut robert = Person::with_id(3);
    robert.record_mut().insert("nickname", "Bob");
    assert!(robert.load(&db).await.expect("load"));
    assert_eq!(robert.name(), "Robert");
    assert_eq!(robert.age(), Some(31));
    assert_eq!(field(&robert, "nickname"), &Value::from("Bob"));

    let mut ghost = Person::with_id(77);
    assert!(!ghost.load(&db).await.expect("load"));
    assert!(field(&ghost, "name").is_null());
}

#[tokio::test]
async fn load_without_a_key_is_rejected() {
    let (db, _) = seeded();
    let mut unsaved = Person::new("Nobody", 1);
    let err = unsaved.load(&db).await.expect_err("no key");
    assert_eq!(err.code_str(), "invalid_argument");
}

#[tokio::test]
async fn save_then_load_round_trips_updates() {
    let (db, _) = seeded();
    let mut gary = Person::query(&db).find(4).await.expect("find").expect("gary");
    gary.record_mut().insert("age", 30);
    gary.save(&db).await.expect("save");

    let mut reloaded = Person::with_id(4);
    reloaded.load(&db).await.expect("load");
    assert_eq!(reloaded.age(), Some(30));
    assert_eq!(Person::query(&db).count().await.expect("count"), 4);
}
