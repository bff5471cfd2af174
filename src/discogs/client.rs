use crate::discogs::models::{
    Artist, CollectionCustomFields, CollectionFolder, CollectionFolderItems, CollectionFolders,
    CollectionItemInfo, CollectionValue, ErrorResponse, MasterRelease, MasterReleaseVersions,
    RecordLabel, Release, ReleaseSummaries, SearchResultType, SearchResults, UserIdentity,
    UserProfile,
};
use async_trait::async_trait;
use thiserror::Error;

/// Problems retrieving data from Discogs. Every failure of every contract
/// operation is one of these kinds.
#[derive(Error, Debug)]
pub enum DiscogsError {
    #[error("no artist found with ID {0}")]
    ArtistNotFound(u64),
    #[error("no label found with ID {0}")]
    LabelNotFound(u64),
    #[error("no master release found with ID {0}")]
    MasterReleaseNotFound(u64),
    #[error("no release found with ID {0}")]
    ReleaseNotFound(u64),
    /// An operation that requires a signed-in identity was invoked without one.
    #[error("operation requires a signed-in user")]
    UnauthenticatedUser,
    #[error("unknown user: {username}")]
    UnknownUser { username: String },
    /// The API returned a structured error body.
    #[error("Discogs API error: {}", .0.message)]
    Response(ErrorResponse),
    /// Transport or decoding failure that doesn't fit any other kind.
    #[error("unknown Discogs error: {0}")]
    Unknown(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Pagination parameters for list operations. Page numbers are 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page_number: usize,
    pub per_page: usize,
}

impl Default for PageParams {
    fn default() -> Self {
        PageParams {
            page_number: 1,
            per_page: 50,
        }
    }
}

impl PageParams {
    pub fn page(page_number: usize, per_page: usize) -> Self {
        PageParams {
            page_number,
            per_page,
        }
    }
}

/// Implemented by clients of the Discogs API server.
///
/// Stateless apart from sign-in status: results are never cached, and every
/// call resolves to either the typed resource or a `DiscogsError`.
#[async_trait]
pub trait Discogs: Send + Sync {
    // User identity

    fn is_signed_in(&self) -> bool;

    fn sign_out(&self);

    async fn user_identity(&self) -> Result<UserIdentity, DiscogsError>;

    async fn user_profile(&self, username: &str) -> Result<UserProfile, DiscogsError>;

    // Database

    /// Look up the artist with the given numeric ID.
    async fn artist(&self, id: u64) -> Result<Artist, DiscogsError>;

    /// Releases credited to the artist with the given ID.
    async fn artist_releases(
        &self,
        artist_id: u64,
        page: PageParams,
    ) -> Result<ReleaseSummaries, DiscogsError>;

    async fn label(&self, id: u64) -> Result<RecordLabel, DiscogsError>;

    async fn label_releases(
        &self,
        label_id: u64,
        page: PageParams,
    ) -> Result<ReleaseSummaries, DiscogsError>;

    async fn master_release(&self, id: u64) -> Result<MasterRelease, DiscogsError>;

    /// Versions of a master release. Large masters span many pages.
    async fn master_release_versions(
        &self,
        id: u64,
        page: PageParams,
    ) -> Result<MasterReleaseVersions, DiscogsError>;

    async fn release(&self, id: u64) -> Result<Release, DiscogsError>;

    // Collections (all require a signed-in user)

    async fn custom_collection_fields(
        &self,
        username: &str,
    ) -> Result<CollectionCustomFields, DiscogsError>;

    async fn collection_value(&self, username: &str) -> Result<CollectionValue, DiscogsError>;

    async fn collection_folders(&self, username: &str) -> Result<CollectionFolders, DiscogsError>;

    async fn collection_folder(
        &self,
        folder_id: i64,
        username: &str,
    ) -> Result<CollectionFolder, DiscogsError>;

    async fn create_folder(
        &self,
        name: &str,
        username: &str,
    ) -> Result<CollectionFolder, DiscogsError>;

    async fn edit_folder(
        &self,
        folder: &CollectionFolder,
        username: &str,
    ) -> Result<CollectionFolder, DiscogsError>;

    /// One page of the items filed in a folder. Folder `0` returns the whole
    /// collection.
    async fn collection_items(
        &self,
        folder_id: i64,
        username: &str,
        page: PageParams,
    ) -> Result<CollectionFolderItems, DiscogsError>;

    async fn add_item(
        &self,
        item_id: u64,
        folder_id: i64,
        username: &str,
    ) -> Result<CollectionItemInfo, DiscogsError>;

    // Search

    async fn search(
        &self,
        query: &str,
        result_type: Option<SearchResultType>,
    ) -> Result<SearchResults, DiscogsError>;
}
