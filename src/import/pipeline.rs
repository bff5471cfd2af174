use crate::db::{
    self, Database, DbCollectionItem, DbCustomField, DbFolder,
};
use crate::discogs::models::{CollectionFolder, CollectionFolderItem};
use crate::discogs::{Discogs, PageParams};
use crate::import::{CancellationToken, ImportError, ImportObserver, ImportSummary};
use crate::pagination::{settle_pages, PageOutcome};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Items per page when walking a folder. Discogs caps `per_page` at 100.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// ID of the reserved folder that contains every item in the collection.
const ALL_ITEMS_FOLDER_ID: i64 = 0;

/// Imports a user's Discogs collection into the local store.
///
/// One run is a strict sequence of stages, each gated on the one before it:
/// custom fields, folders, every item in folder `0`, distribution of those
/// items into the remaining folders, then a single commit. All writes run on
/// one transaction; a failed or cancelled run commits nothing.
pub struct CollectionImporter {
    discogs: Arc<dyn Discogs>,
    db: Database,
    page_size: usize,
    active_imports: Arc<Mutex<HashSet<String>>>,
}

impl CollectionImporter {
    pub fn new(discogs: Arc<dyn Discogs>, db: Database) -> Self {
        CollectionImporter {
            discogs,
            db,
            page_size: DEFAULT_PAGE_SIZE,
            active_imports: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Run one import for `username`.
    ///
    /// A second call for the same username while a run is in flight fails
    /// fast with `ImportAlreadyRunning`; different usernames may run
    /// concurrently. Failures while fetching fields or folders abort the run.
    /// Failures of individual item pages are tolerated and only reduce the
    /// imported set (reported via `ImportSummary::dropped_pages`).
    pub async fn import_collection(
        &self,
        username: &str,
        observer: &dyn ImportObserver,
        cancel: &CancellationToken,
    ) -> Result<ImportSummary, ImportError> {
        let _guard = SingleFlightGuard::acquire(&self.active_imports, username)?;

        observer.will_begin_importing();
        info!("Starting collection import for {}", username);

        let mut tx = self.db.begin().await?;
        let mut summary = ImportSummary::default();

        // Stage 1: custom field definitions.
        self.checkpoint(cancel)?;
        let fields_by_id = self
            .import_custom_fields(&mut tx, username, &mut summary)
            .await?;

        // Stage 2: folders. Folder 0 must exist; it is the canonical source
        // of every item, so its absence makes the rest of the run pointless.
        self.checkpoint(cancel)?;
        let (discogs_folders, folders_by_id) =
            self.import_folders(&mut tx, username, &mut summary).await?;

        let all_folder = folders_by_id
            .get(&ALL_ITEMS_FOLDER_ID)
            .ok_or(ImportError::NoAllFolderWasFound)?;
        let expected_item_count = all_folder.expected_item_count.max(0) as usize;

        // Stage 3: every item in the collection, via folder 0.
        self.checkpoint(cancel)?;
        let items_by_id = self
            .import_all_items(
                &mut tx,
                username,
                expected_item_count,
                &fields_by_id,
                cancel,
                &mut summary,
            )
            .await?;

        // Stage 4: membership of the remaining folders.
        self.checkpoint(cancel)?;
        self.distribute_to_other_folders(
            &mut tx,
            username,
            &discogs_folders,
            &items_by_id,
            cancel,
            &mut summary,
        )
        .await?;

        // Stage 5: one unit of work. Dropping the transaction on any earlier
        // error path rolls everything back.
        self.checkpoint(cancel)?;
        observer.will_finish_importing();
        tx.commit().await?;

        info!(
            "Imported {} items, {} folders, {} custom fields for {} ({} pages dropped)",
            summary.items, summary.folders, summary.custom_fields, username, summary.dropped_pages
        );

        Ok(summary)
    }

    fn checkpoint(&self, cancel: &CancellationToken) -> Result<(), ImportError> {
        if cancel.is_cancelled() {
            Err(ImportError::Cancelled)
        } else {
            Ok(())
        }
    }

    async fn import_custom_fields(
        &self,
        tx: &mut sqlx::Transaction<'static, sqlx::Sqlite>,
        username: &str,
        summary: &mut ImportSummary,
    ) -> Result<HashMap<i64, DbCustomField>, ImportError> {
        let response = self.discogs.custom_collection_fields(username).await?;
        let discogs_fields = response.fields.unwrap_or_default();

        let mut fields_by_id = HashMap::new();
        for discogs_field in &discogs_fields {
            let db_field = db::upsert_custom_field(tx, discogs_field).await?;
            fields_by_id.insert(db_field.id, db_field);
        }

        summary.custom_fields = fields_by_id.len();
        debug!("Imported {} custom fields", fields_by_id.len());
        Ok(fields_by_id)
    }

    async fn import_folders(
        &self,
        tx: &mut sqlx::Transaction<'static, sqlx::Sqlite>,
        username: &str,
        summary: &mut ImportSummary,
    ) -> Result<(Vec<CollectionFolder>, HashMap<i64, DbFolder>), ImportError> {
        let response = self.discogs.collection_folders(username).await?;

        let mut folders_by_id = HashMap::new();
        for discogs_folder in &response.folders {
            let db_folder = db::upsert_folder(tx, discogs_folder).await?;
            folders_by_id.insert(db_folder.id, db_folder);
        }

        summary.folders = folders_by_id.len();
        debug!("Imported {} folders", folders_by_id.len());
        Ok((response.folders, folders_by_id))
    }

    /// Fetch every page of folder 0, flatten the pages that resolved, and
    /// upsert each item (plus its custom-field notes). The resulting map is
    /// the authoritative set of collection items for this run.
    async fn import_all_items(
        &self,
        tx: &mut sqlx::Transaction<'static, sqlx::Sqlite>,
        username: &str,
        expected_item_count: usize,
        fields_by_id: &HashMap<i64, DbCustomField>,
        cancel: &CancellationToken,
        summary: &mut ImportSummary,
    ) -> Result<HashMap<i64, DbCollectionItem>, ImportError> {
        let outcomes = self
            .download_folder_items(username, ALL_ITEMS_FOLDER_ID, expected_item_count, cancel)
            .await;
        self.checkpoint(cancel)?;

        let discogs_items = flatten_fulfilled(ALL_ITEMS_FOLDER_ID, outcomes, summary);
        info!("Importing {} Discogs collection items", discogs_items.len());

        let mut items_by_id = HashMap::new();
        for discogs_item in &discogs_items {
            let db_item = db::upsert_item(tx, discogs_item).await?;

            for note in discogs_item.notes.as_deref().unwrap_or_default() {
                // A note referencing a field that stage 1 never defined would
                // leave a dangling field ID in the store.
                if !fields_by_id.contains_key(&note.field_id) {
                    debug!(
                        "Item {} has a note for unknown field {}; skipping",
                        db_item.id, note.field_id
                    );
                    continue;
                }
                db::upsert_item_field(tx, db_item.id, note).await?;
            }

            db::link_item_to_folder(tx, db_item.id, ALL_ITEMS_FOLDER_ID).await?;
            summary.folder_memberships += 1;
            items_by_id.insert(db_item.id, db_item);
        }

        summary.items = items_by_id.len();
        Ok(items_by_id)
    }

    /// For every folder other than 0, fetch its pages and associate each
    /// retrieved item with the folder. Items that were not seen in folder 0
    /// are skipped; they should not occur under correct data, and
    /// synthesizing them here would bypass the authoritative set.
    async fn distribute_to_other_folders(
        &self,
        tx: &mut sqlx::Transaction<'static, sqlx::Sqlite>,
        username: &str,
        discogs_folders: &[CollectionFolder],
        items_by_id: &HashMap<i64, DbCollectionItem>,
        cancel: &CancellationToken,
        summary: &mut ImportSummary,
    ) -> Result<(), ImportError> {
        for discogs_folder in discogs_folders
            .iter()
            .filter(|f| f.id != ALL_ITEMS_FOLDER_ID)
        {
            self.checkpoint(cancel)?;

            let expected = discogs_folder.count.max(0) as usize;
            let outcomes = self
                .download_folder_items(username, discogs_folder.id, expected, cancel)
                .await;

            let discogs_items = flatten_fulfilled(discogs_folder.id, outcomes, summary);
            for discogs_item in &discogs_items {
                let item_id = discogs_item.id as i64;
                match items_by_id.get(&item_id) {
                    Some(db_item) => {
                        db::link_item_to_folder(tx, db_item.id, discogs_folder.id).await?;
                        summary.folder_memberships += 1;
                    }
                    None => {
                        debug!(
                            "Item {} in folder {} was not in the all-items set; skipping",
                            item_id, discogs_folder.id
                        );
                    }
                }
            }
        }

        Ok(())
    }

    /// Concurrent page fan-out over one folder. Every page gets an outcome;
    /// a page that fails does not fail its siblings. Pages issued after
    /// cancellation resolve to `Cancelled` and the caller's next checkpoint
    /// turns that into a run abort.
    async fn download_folder_items(
        &self,
        username: &str,
        folder_id: i64,
        expected_item_count: usize,
        cancel: &CancellationToken,
    ) -> Vec<PageOutcome<Vec<CollectionFolderItem>, ImportError>> {
        let page_size = self.page_size;

        settle_pages(expected_item_count, page_size, |page_number| {
            let discogs = &self.discogs;
            async move {
                if cancel.is_cancelled() {
                    return Err(ImportError::Cancelled);
                }

                let page = discogs
                    .collection_items(
                        folder_id,
                        username,
                        PageParams::page(page_number, page_size),
                    )
                    .await?;

                Ok(page.releases.unwrap_or_default())
            }
        })
        .await
    }
}

/// Collect the items of all fulfilled pages, in page order. Failed pages are
/// logged and counted, never escalated.
fn flatten_fulfilled(
    folder_id: i64,
    outcomes: Vec<PageOutcome<Vec<CollectionFolderItem>, ImportError>>,
    summary: &mut ImportSummary,
) -> Vec<CollectionFolderItem> {
    let mut items = Vec::new();

    for outcome in outcomes {
        match outcome.result {
            Ok(page_items) => items.extend(page_items),
            Err(e) => {
                warn!(
                    "Dropping page {} of folder {}: {}",
                    outcome.page_number, folder_id, e
                );
                summary.dropped_pages += 1;
            }
        }
    }

    items
}

/// Registry entry keeping one import per username in flight. Removed on drop
/// so every exit path releases the slot.
struct SingleFlightGuard {
    registry: Arc<Mutex<HashSet<String>>>,
    username: String,
}

impl SingleFlightGuard {
    fn acquire(
        registry: &Arc<Mutex<HashSet<String>>>,
        username: &str,
    ) -> Result<Self, ImportError> {
        let mut active = registry.lock().unwrap_or_else(|e| e.into_inner());
        if !active.insert(username.to_string()) {
            return Err(ImportError::ImportAlreadyRunning(username.to_string()));
        }

        Ok(SingleFlightGuard {
            registry: Arc::clone(registry),
            username: username.to_string(),
        })
    }
}

impl Drop for SingleFlightGuard {
    fn drop(&mut self) {
        self.registry
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.username);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discogs::models::*;
    use crate::discogs::DiscogsError;
    use crate::import::QuietObserver;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Test double with a scripted collection: fixed fields and folders,
    /// items served per folder in pages, and optional per-page failures.
    #[derive(Default)]
    struct ScriptedDiscogs {
        fields: Vec<CollectionCustomField>,
        folders: Vec<CollectionFolder>,
        items_by_folder: HashMap<i64, Vec<CollectionFolderItem>>,
        failing_pages: HashSet<(i64, usize)>,
        item_page_calls: AtomicUsize,
        pages_seen: Mutex<Vec<(i64, usize)>>,
    }

    impl ScriptedDiscogs {
        fn item(id: u64, rating: i64) -> CollectionFolderItem {
            CollectionFolderItem {
                id,
                rating,
                folder_id: None,
                date_added: None,
                notes: None,
            }
        }

        fn folder(id: i64, name: &str, count: i64) -> CollectionFolder {
            CollectionFolder {
                id,
                name: name.to_string(),
                count,
                resource_url: None,
            }
        }
    }

    #[async_trait]
    impl Discogs for ScriptedDiscogs {
        fn is_signed_in(&self) -> bool {
            true
        }

        fn sign_out(&self) {}

        async fn user_identity(&self) -> Result<UserIdentity, DiscogsError> {
            unimplemented!()
        }

        async fn user_profile(&self, _: &str) -> Result<UserProfile, DiscogsError> {
            unimplemented!()
        }

        async fn artist(&self, _: u64) -> Result<Artist, DiscogsError> {
            unimplemented!()
        }

        async fn artist_releases(
            &self,
            _: u64,
            _: PageParams,
        ) -> Result<ReleaseSummaries, DiscogsError> {
            unimplemented!()
        }

        async fn label(&self, _: u64) -> Result<RecordLabel, DiscogsError> {
            unimplemented!()
        }

        async fn label_releases(
            &self,
            _: u64,
            _: PageParams,
        ) -> Result<ReleaseSummaries, DiscogsError> {
            unimplemented!()
        }

        async fn master_release(&self, _: u64) -> Result<MasterRelease, DiscogsError> {
            unimplemented!()
        }

        async fn master_release_versions(
            &self,
            _: u64,
            _: PageParams,
        ) -> Result<MasterReleaseVersions, DiscogsError> {
            unimplemented!()
        }

        async fn release(&self, _: u64) -> Result<Release, DiscogsError> {
            unimplemented!()
        }

        async fn custom_collection_fields(
            &self,
            _: &str,
        ) -> Result<CollectionCustomFields, DiscogsError> {
            Ok(CollectionCustomFields {
                fields: Some(self.fields.clone()),
            })
        }

        async fn collection_value(&self, _: &str) -> Result<CollectionValue, DiscogsError> {
            unimplemented!()
        }

        async fn collection_folders(&self, _: &str) -> Result<CollectionFolders, DiscogsError> {
            Ok(CollectionFolders {
                folders: self.folders.clone(),
            })
        }

        async fn collection_folder(
            &self,
            _: i64,
            _: &str,
        ) -> Result<CollectionFolder, DiscogsError> {
            unimplemented!()
        }

        async fn create_folder(&self, _: &str, _: &str) -> Result<CollectionFolder, DiscogsError> {
            unimplemented!()
        }

        async fn edit_folder(
            &self,
            _: &CollectionFolder,
            _: &str,
        ) -> Result<CollectionFolder, DiscogsError> {
            unimplemented!()
        }

        async fn collection_items(
            &self,
            folder_id: i64,
            _username: &str,
            page: PageParams,
        ) -> Result<CollectionFolderItems, DiscogsError> {
            self.item_page_calls.fetch_add(1, Ordering::SeqCst);
            self.pages_seen
                .lock()
                .unwrap()
                .push((folder_id, page.page_number));

            if self.failing_pages.contains(&(folder_id, page.page_number)) {
                return Err(DiscogsError::Unknown("scripted page failure".into()));
            }

            let items = self
                .items_by_folder
                .get(&folder_id)
                .cloned()
                .unwrap_or_default();
            let start = (page.page_number - 1) * page.per_page;
            let page_items: Vec<_> = items
                .into_iter()
                .skip(start)
                .take(page.per_page)
                .collect();

            Ok(CollectionFolderItems {
                pagination: None,
                releases: Some(page_items),
            })
        }

        async fn add_item(
            &self,
            _: u64,
            _: i64,
            _: &str,
        ) -> Result<CollectionItemInfo, DiscogsError> {
            unimplemented!()
        }

        async fn search(
            &self,
            _: &str,
            _: Option<SearchResultType>,
        ) -> Result<SearchResults, DiscogsError> {
            unimplemented!()
        }
    }

    struct RecordingObserver {
        began: AtomicUsize,
        finished: AtomicUsize,
    }

    impl RecordingObserver {
        fn new() -> Self {
            RecordingObserver {
                began: AtomicUsize::new(0),
                finished: AtomicUsize::new(0),
            }
        }
    }

    impl ImportObserver for RecordingObserver {
        fn will_begin_importing(&self) {
            self.began.fetch_add(1, Ordering::SeqCst);
        }

        fn will_finish_importing(&self) {
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn small_collection() -> ScriptedDiscogs {
        let mut discogs = ScriptedDiscogs {
            fields: vec![CollectionCustomField {
                id: 1,
                name: "Media Condition".to_string(),
                field_type: CustomFieldType::Dropdown,
                is_public: true,
                position: 1,
                options: Some(vec!["Mint (M)".to_string()]),
                lines: None,
            }],
            folders: vec![
                ScriptedDiscogs::folder(0, "All", 3),
                ScriptedDiscogs::folder(7, "Vinyl", 2),
            ],
            ..Default::default()
        };
        let mut rated = ScriptedDiscogs::item(100, 5);
        rated.notes = Some(vec![
            ItemNote {
                field_id: 1,
                value: "Mint (M)".to_string(),
            },
            // References a field the user never defined; must be skipped.
            ItemNote {
                field_id: 9,
                value: "stale".to_string(),
            },
        ]);
        discogs.items_by_folder.insert(
            0,
            vec![
                rated,
                ScriptedDiscogs::item(200, 3),
                ScriptedDiscogs::item(300, 0),
            ],
        );
        discogs.items_by_folder.insert(
            7,
            vec![ScriptedDiscogs::item(100, 5), ScriptedDiscogs::item(300, 0)],
        );
        discogs
    }

    async fn importer_with(discogs: ScriptedDiscogs) -> (CollectionImporter, Database) {
        let db = Database::in_memory().await.unwrap();
        let importer = CollectionImporter::new(Arc::new(discogs), db.clone());
        (importer, db)
    }

    #[tokio::test]
    async fn test_import_reconciles_collection() {
        let (importer, db) = importer_with(small_collection()).await;
        let observer = RecordingObserver::new();

        let summary = importer
            .import_collection("someuser", &observer, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.custom_fields, 1);
        assert_eq!(summary.folders, 2);
        assert_eq!(summary.items, 3);
        // 3 memberships in the all folder + 2 in folder 7
        assert_eq!(summary.folder_memberships, 5);
        assert_eq!(summary.dropped_pages, 0);

        assert_eq!(db.count_items().await.unwrap(), 3);
        assert_eq!(db.items_in_folder(7).await.unwrap().len(), 2);
        // Only the note for the defined field survives.
        assert_eq!(db.count_item_fields().await.unwrap(), 1);
        assert_eq!(db.fields_for_item(100).await.unwrap()[0].value, "Mint (M)");
        assert_eq!(observer.began.load(Ordering::SeqCst), 1);
        assert_eq!(observer.finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_import_twice_is_idempotent() {
        let (importer, db) = importer_with(small_collection()).await;

        importer
            .import_collection("someuser", &QuietObserver, &CancellationToken::new())
            .await
            .unwrap();
        importer
            .import_collection("someuser", &QuietObserver, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(db.count_custom_fields().await.unwrap(), 1);
        assert_eq!(db.count_folders().await.unwrap(), 2);
        assert_eq!(db.count_items().await.unwrap(), 3);
        assert_eq!(db.count_folder_memberships().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_missing_all_folder_aborts_before_item_requests() {
        let mut discogs = small_collection();
        discogs.folders = vec![ScriptedDiscogs::folder(7, "Vinyl", 2)];
        let calls = Arc::new(discogs);
        let db = Database::in_memory().await.unwrap();
        let importer = CollectionImporter::new(calls.clone(), db.clone());

        let result = importer
            .import_collection("someuser", &QuietObserver, &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(ImportError::NoAllFolderWasFound)));
        assert_eq!(calls.item_page_calls.load(Ordering::SeqCst), 0);
        // Nothing committed, not even the folders that did arrive.
        assert_eq!(db.count_folders().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_item_absent_from_all_folder_is_skipped() {
        let mut discogs = small_collection();
        // Folder 7 references an item folder 0 never returned.
        discogs
            .items_by_folder
            .get_mut(&7)
            .unwrap()
            .push(ScriptedDiscogs::item(999, 1));
        let (importer, db) = importer_with(discogs).await;

        importer
            .import_collection("someuser", &QuietObserver, &CancellationToken::new())
            .await
            .unwrap();

        assert!(db.get_item(999).await.unwrap().is_none());
        assert_eq!(db.items_in_folder(7).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_three_pages_for_count_250() {
        let mut discogs = ScriptedDiscogs {
            folders: vec![ScriptedDiscogs::folder(0, "All", 250)],
            ..Default::default()
        };
        discogs.items_by_folder.insert(
            0,
            (1..=250).map(|n| ScriptedDiscogs::item(n, 0)).collect(),
        );
        let shared = Arc::new(discogs);
        let db = Database::in_memory().await.unwrap();
        let importer = CollectionImporter::new(shared.clone(), db.clone());

        let summary = importer
            .import_collection("someuser", &QuietObserver, &CancellationToken::new())
            .await
            .unwrap();

        let pages = shared.pages_seen.lock().unwrap().clone();
        assert_eq!(pages, vec![(0, 1), (0, 2), (0, 3)]);
        assert_eq!(summary.items, 250);
    }

    #[tokio::test]
    async fn test_failed_page_is_dropped_not_fatal() {
        let mut discogs = ScriptedDiscogs {
            folders: vec![ScriptedDiscogs::folder(0, "All", 250)],
            ..Default::default()
        };
        discogs.items_by_folder.insert(
            0,
            (1..=250).map(|n| ScriptedDiscogs::item(n, 0)).collect(),
        );
        discogs.failing_pages.insert((0, 2));
        let (importer, db) = importer_with(discogs).await;

        let summary = importer
            .import_collection("someuser", &QuietObserver, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.dropped_pages, 1);
        // Pages 1 and 3: 100 + 50 items survive.
        assert_eq!(summary.items, 150);
        assert_eq!(db.count_items().await.unwrap(), 150);
    }

    #[tokio::test]
    async fn test_cancelled_run_commits_nothing() {
        let (importer, db) = importer_with(small_collection()).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = importer
            .import_collection("someuser", &QuietObserver, &cancel)
            .await;

        assert!(matches!(result, Err(ImportError::Cancelled)));
        assert_eq!(db.count_custom_fields().await.unwrap(), 0);
        assert_eq!(db.count_items().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_single_flight_per_username() {
        let registry = Arc::new(Mutex::new(HashSet::new()));

        let first = SingleFlightGuard::acquire(&registry, "someuser").unwrap();
        let second = SingleFlightGuard::acquire(&registry, "someuser");
        assert!(matches!(
            second,
            Err(ImportError::ImportAlreadyRunning(_))
        ));

        // A different user is unaffected, and dropping the guard frees the slot.
        SingleFlightGuard::acquire(&registry, "otheruser").unwrap();
        drop(first);
        SingleFlightGuard::acquire(&registry, "someuser").unwrap();
    }
}
