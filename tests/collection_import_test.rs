// End-to-end import against the fixture-backed mock client and a real
// on-disk SQLite database.

use discollect::{
    CancellationToken, CollectionImporter, Database, DiscogsError, ImportError, MockDiscogs,
    QuietObserver,
};
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

async fn database_in(dir: &tempfile::TempDir) -> Database {
    let path = dir.path().join("collection.db");
    Database::new(path.to_str().unwrap()).await.unwrap()
}

#[tokio::test]
async fn test_import_from_mock_fixtures() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let db = database_in(&dir).await;
    let importer = CollectionImporter::new(Arc::new(MockDiscogs::new()), db.clone());

    let summary = importer
        .import_collection("someuser", &QuietObserver, &CancellationToken::new())
        .await
        .unwrap();

    // The folders fixture has the all folder plus one user folder; the items
    // fixture has three releases, each landing in both folders.
    assert_eq!(summary.custom_fields, 3);
    assert_eq!(summary.folders, 2);
    assert_eq!(summary.items, 3);
    assert_eq!(summary.folder_memberships, 6);
    assert_eq!(summary.dropped_pages, 0);

    let folders = db.folders().await.unwrap();
    assert_eq!(folders.len(), 2);
    assert_eq!(folders[0].id, 0);
    assert_eq!(folders[0].name, "All");

    let items = db.items_in_folder(0).await.unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(db.items_in_folder(1).await.unwrap().len(), 3);

    // Item 1128060 carries notes for two defined custom fields.
    let notes = db.fields_for_item(1128060).await.unwrap();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0].field_id, 1);
    assert_eq!(notes[0].value, "Near Mint (NM or M-)");
}

#[tokio::test]
async fn test_repeated_import_does_not_duplicate_records() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let db = database_in(&dir).await;
    let importer = CollectionImporter::new(Arc::new(MockDiscogs::new()), db.clone());

    for _ in 0..2 {
        importer
            .import_collection("someuser", &QuietObserver, &CancellationToken::new())
            .await
            .unwrap();
    }

    assert_eq!(db.count_custom_fields().await.unwrap(), 3);
    assert_eq!(db.count_folders().await.unwrap(), 2);
    assert_eq!(db.count_items().await.unwrap(), 3);
    assert_eq!(db.count_item_fields().await.unwrap(), 3);
    assert_eq!(db.count_folder_memberships().await.unwrap(), 6);
}

#[tokio::test]
async fn test_import_surfaces_client_failure() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let db = database_in(&dir).await;
    let importer = CollectionImporter::new(Arc::new(MockDiscogs::erroring()), db.clone());

    let result = importer
        .import_collection("someuser", &QuietObserver, &CancellationToken::new())
        .await;

    // The very first stage (custom fields) fails, which aborts the run.
    match result {
        Err(ImportError::Discogs(DiscogsError::UnknownUser { username })) => {
            assert_eq!(username, "someuser");
        }
        other => panic!("expected UnknownUser failure, got {:?}", other.map(|_| ())),
    }

    assert_eq!(db.count_custom_fields().await.unwrap(), 0);
    assert_eq!(db.count_items().await.unwrap(), 0);
}
