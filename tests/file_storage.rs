mod support;

use flatdb::FlatDb;
use flatdb::config::{FlatDbConfig, SnapshotFormat};
use flatdb::repository::Entity;
use support::Person;
use tempfile::tempdir;

#[tokio::test]
async fn saved_records_survive_reopening() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("db.json");
    let config = FlatDbConfig::default().with_collections(["people"]);

    let db = FlatDb::open_file(config.clone(), &path).await.expect("open");
    let mut ann = Person::new("Ann", 40);
    ann.save(&db).await.expect("save");
    let mut bob = Person::new("Bob", 35);
    bob.save(&db).await.expect("save");
    drop(db);

    let db = FlatDb::open_file(config, &path).await.expect("reopen");
    let people = Person::query(&db).all().await.expect("all");
    assert_eq!(people, vec![ann, bob]);

    let text = std::fs::read_to_string(&path).expect("read file");
    assert!(text.starts_with("{\n  \"people\": ["));
    assert!(dir.path().join("db.json.prev").exists());
}

#[tokio::test]
async fn msgpack_snapshots_round_trip() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("db.msgpack");
    let config = FlatDbConfig::development()
        .with_format(SnapshotFormat::MessagePack)
        .with_collections(["people"]);

    let db = FlatDb::open_file(config.clone(), &path).await.expect("open");
    Person::new("Cleo", 22).save(&db).await.expect("save");

    let db = FlatDb::open_file(config, &path).await.expect("reopen");
    let cleo = Person::query(&db).find(1).await.expect("find").expect("cleo");
    assert_eq!(cleo.name(), "Cleo");
    assert!(!dir.path().join("db.msgpack.prev").exists());
}

#[tokio::test]
async fn production_profile_requires_an_existing_file() {
    let dir = tempdir().expect("temp dir");
    let err = FlatDb::open_file(
        FlatDbConfig::production().with_collections(["people"]),
        &dir.path().join("missing.json"),
    )
    .await
    .expect_err("missing file");
    assert_eq!(err.code_str(), "io");
}

#[tokio::test]
async fn ensure_collections_only_writes_when_something_is_added() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("db.json");
    let db = FlatDb::open_file(FlatDbConfig::default(), &path)
        .await
        .expect("open");
    assert!(!path.exists());

    assert_eq!(db.ensure_collections(&["genres", "movies"]).await.expect("ensure"), 2);
    let modified = std::fs::metadata(&path).expect("meta").modified().expect("mtime");
    assert_eq!(db.ensure_collections(&["movies"]).await.expect("ensure"), 0);
    let again = std::fs::metadata(&path).expect("meta").modified().expect("mtime");
    assert_eq!(modified, again);
    assert_eq!(db.snapshot().await.expect("snapshot").len(), 2);
}

#[tokio::test]
async fn invalid_config_is_rejected_on_open() {
    let dir = tempdir().expect("temp dir");
    let mut config = FlatDbConfig::default().with_format(SnapshotFormat::MessagePack);
    config.pretty_json = true;
    let err = FlatDb::open_file(config, &dir.path().join("db"))
        .await
        .expect_err("pretty msgpack");
    assert_eq!(err.code_str(), "invalid_config");
}
