use crate::discogs::client::{Discogs, DiscogsError, PageParams};
use crate::discogs::models::{
    Artist, CollectionCustomFields, CollectionFolder, CollectionFolderItems, CollectionFolders,
    CollectionItemInfo, CollectionValue, MasterRelease, MasterReleaseVersions, RecordLabel,
    Release, ReleaseSummaries, SearchResultType, SearchResults, UserIdentity, UserProfile,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// Canned JSON documents from api.discogs.com, one per operation/outcome pair.
/// Keyed by the fixture name the operation decodes.
const FIXTURES: &[(&str, &str)] = &[
    ("get-user-identity-200", include_str!("../../fixtures/get-user-identity-200.json")),
    ("get-user-profile-200", include_str!("../../fixtures/get-user-profile-200.json")),
    ("get-artist-200", include_str!("../../fixtures/get-artist-200.json")),
    ("get-artist-releases-200", include_str!("../../fixtures/get-artist-releases-200.json")),
    ("get-label-200", include_str!("../../fixtures/get-label-200.json")),
    ("get-label-releases-200", include_str!("../../fixtures/get-label-releases-200.json")),
    ("get-master-200", include_str!("../../fixtures/get-master-200.json")),
    (
        "get-master-release-versions-200",
        include_str!("../../fixtures/get-master-release-versions-200.json"),
    ),
    ("get-release-200", include_str!("../../fixtures/get-release-200.json")),
    ("get-custom-fields-200", include_str!("../../fixtures/get-custom-fields-200.json")),
    ("get-collection-value-200", include_str!("../../fixtures/get-collection-value-200.json")),
    ("get-folders-200", include_str!("../../fixtures/get-folders-200.json")),
    ("get-folder-metadata-200", include_str!("../../fixtures/get-folder-metadata-200.json")),
    ("post-create-folder-201", include_str!("../../fixtures/post-create-folder-201.json")),
    (
        "post-edit-folder-metadata-200",
        include_str!("../../fixtures/post-edit-folder-metadata-200.json"),
    ),
    ("get-items-in-folder-200", include_str!("../../fixtures/get-items-in-folder-200.json")),
    (
        "add-item-to-collection-folder-200",
        include_str!("../../fixtures/add-item-to-collection-folder-200.json"),
    ),
    ("search-200", include_str!("../../fixtures/search-200.json")),
];

fn fixture(name: &str) -> Option<&'static str> {
    FIXTURES
        .iter()
        .find(|(fixture_name, _)| *fixture_name == name)
        .map(|(_, body)| *body)
}

/// A `Discogs` implementation that replays canned JSON fixtures.
///
/// Normal mode decodes the operation's fixture and always succeeds; error
/// mode always fails with the operation's documented failure kind regardless
/// of input. Keeps the import pipeline and anything else built on the
/// contract testable without network access.
pub struct MockDiscogs {
    error_mode: bool,
}

impl MockDiscogs {
    pub fn new() -> Self {
        MockDiscogs { error_mode: false }
    }

    /// A mock whose every operation resolves to its associated error.
    pub fn erroring() -> Self {
        MockDiscogs { error_mode: true }
    }

    fn apply<T: DeserializeOwned>(
        &self,
        fixture_name: &str,
        error: DiscogsError,
    ) -> Result<T, DiscogsError> {
        if self.error_mode {
            return Err(error);
        }

        let body = fixture(fixture_name).ok_or_else(|| {
            DiscogsError::Unknown(format!("no fixture named {}", fixture_name).into())
        })?;

        serde_json::from_str(body).map_err(|e| DiscogsError::Unknown(Box::new(e)))
    }
}

impl Default for MockDiscogs {
    fn default() -> Self {
        MockDiscogs::new()
    }
}

fn unknown_user(username: &str) -> DiscogsError {
    DiscogsError::UnknownUser {
        username: username.to_string(),
    }
}

#[async_trait]
impl Discogs for MockDiscogs {
    fn is_signed_in(&self) -> bool {
        !self.error_mode
    }

    fn sign_out(&self) {}

    async fn user_identity(&self) -> Result<UserIdentity, DiscogsError> {
        self.apply("get-user-identity-200", DiscogsError::UnauthenticatedUser)
    }

    async fn user_profile(&self, username: &str) -> Result<UserProfile, DiscogsError> {
        self.apply("get-user-profile-200", unknown_user(username))
    }

    async fn artist(&self, id: u64) -> Result<Artist, DiscogsError> {
        self.apply("get-artist-200", DiscogsError::ArtistNotFound(id))
    }

    async fn artist_releases(
        &self,
        artist_id: u64,
        _page: PageParams,
    ) -> Result<ReleaseSummaries, DiscogsError> {
        self.apply(
            "get-artist-releases-200",
            DiscogsError::ArtistNotFound(artist_id),
        )
    }

    async fn label(&self, id: u64) -> Result<RecordLabel, DiscogsError> {
        self.apply("get-label-200", DiscogsError::LabelNotFound(id))
    }

    async fn label_releases(
        &self,
        label_id: u64,
        _page: PageParams,
    ) -> Result<ReleaseSummaries, DiscogsError> {
        self.apply(
            "get-label-releases-200",
            DiscogsError::LabelNotFound(label_id),
        )
    }

    async fn master_release(&self, id: u64) -> Result<MasterRelease, DiscogsError> {
        self.apply("get-master-200", DiscogsError::MasterReleaseNotFound(id))
    }

    async fn master_release_versions(
        &self,
        id: u64,
        _page: PageParams,
    ) -> Result<MasterReleaseVersions, DiscogsError> {
        self.apply(
            "get-master-release-versions-200",
            DiscogsError::MasterReleaseNotFound(id),
        )
    }

    async fn release(&self, id: u64) -> Result<Release, DiscogsError> {
        self.apply("get-release-200", DiscogsError::ReleaseNotFound(id))
    }

    async fn custom_collection_fields(
        &self,
        username: &str,
    ) -> Result<CollectionCustomFields, DiscogsError> {
        self.apply("get-custom-fields-200", unknown_user(username))
    }

    async fn collection_value(&self, username: &str) -> Result<CollectionValue, DiscogsError> {
        self.apply("get-collection-value-200", unknown_user(username))
    }

    async fn collection_folders(&self, username: &str) -> Result<CollectionFolders, DiscogsError> {
        self.apply("get-folders-200", unknown_user(username))
    }

    async fn collection_folder(
        &self,
        _folder_id: i64,
        username: &str,
    ) -> Result<CollectionFolder, DiscogsError> {
        self.apply("get-folder-metadata-200", unknown_user(username))
    }

    async fn create_folder(
        &self,
        _name: &str,
        username: &str,
    ) -> Result<CollectionFolder, DiscogsError> {
        self.apply("post-create-folder-201", unknown_user(username))
    }

    async fn edit_folder(
        &self,
        _folder: &CollectionFolder,
        username: &str,
    ) -> Result<CollectionFolder, DiscogsError> {
        self.apply("post-edit-folder-metadata-200", unknown_user(username))
    }

    async fn collection_items(
        &self,
        _folder_id: i64,
        username: &str,
        _page: PageParams,
    ) -> Result<CollectionFolderItems, DiscogsError> {
        self.apply("get-items-in-folder-200", unknown_user(username))
    }

    async fn add_item(
        &self,
        _item_id: u64,
        _folder_id: i64,
        username: &str,
    ) -> Result<CollectionItemInfo, DiscogsError> {
        self.apply("add-item-to-collection-folder-200", unknown_user(username))
    }

    async fn search(
        &self,
        _query: &str,
        _result_type: Option<SearchResultType>,
    ) -> Result<SearchResults, DiscogsError> {
        self.apply("search-200", DiscogsError::Unknown("no results".into()))
    }
}
