use serde::{Deserialize, Serialize};

/// Pagination block attached to every list response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pagination {
    pub page: usize,
    pub pages: usize,
    pub per_page: usize,
    pub items: usize,
}

/// An image attached to an artist, release or label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Image {
    #[serde(rename = "type")]
    pub image_type: String,
    pub uri: String,
    pub resource_url: String,
    pub uri150: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Member of a band, as listed on the artist detail response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BandMember {
    pub id: u64,
    pub name: String,
    pub active: Option<bool>,
    pub resource_url: String,
}

/// Full artist record from `/artists/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artist {
    pub id: u64,
    pub name: String,
    pub profile: Option<String>,
    pub resource_url: String,
    pub releases_url: Option<String>,
    pub images: Option<Vec<Image>>,
    pub members: Option<Vec<BandMember>>,
    #[serde(rename = "namevariations")]
    pub name_variations: Option<Vec<String>>,
}

/// One entry in an artist's or label's release list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReleaseSummary {
    pub id: u64,
    pub title: String,
    #[serde(rename = "type")]
    pub release_type: Option<String>,
    pub resource_url: String,
    pub year: Option<i64>,
    pub artist: Option<String>,
    pub label: Option<String>,
    pub format: Option<String>,
    pub thumb: Option<String>,
}

/// Paginated release list from `/artists/{id}/releases` or `/labels/{id}/releases`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReleaseSummaries {
    pub pagination: Option<Pagination>,
    pub releases: Vec<ReleaseSummary>,
}

/// Full release record from `/releases/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Release {
    pub id: u64,
    pub title: String,
    pub year: Option<i64>,
    pub resource_url: String,
    pub genres: Option<Vec<String>>,
    pub styles: Option<Vec<String>>,
    pub master_id: Option<u64>,
}

/// Master release record from `/masters/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MasterRelease {
    pub id: u64,
    pub title: String,
    pub year: Option<i64>,
    pub resource_url: String,
    pub main_release: u64,
    pub genres: Option<Vec<String>>,
    pub styles: Option<Vec<String>>,
}

/// One version of a master release.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MasterReleaseVersion {
    pub id: u64,
    pub title: String,
    pub format: Option<String>,
    pub label: Option<String>,
    pub catno: Option<String>,
    pub country: Option<String>,
    pub released: Option<String>,
    pub thumb: Option<String>,
}

/// Paginated version list from `/masters/{id}/versions`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MasterReleaseVersions {
    pub pagination: Option<Pagination>,
    pub versions: Vec<MasterReleaseVersion>,
}

/// Record label from `/labels/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordLabel {
    pub id: u64,
    pub name: String,
    pub profile: Option<String>,
    pub resource_url: String,
    pub releases_url: Option<String>,
}

/// What kind of database record a search result points at.
///
/// Search responses are heterogeneous; consumers filter on this.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchResultType {
    Artist,
    Release,
    Master,
    Label,
}

/// Single entry from `/database/search`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub id: u64,
    #[serde(rename = "type")]
    pub result_type: SearchResultType,
    pub title: String,
    pub resource_url: String,
    pub thumb: Option<String>,
    pub year: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResults {
    pub pagination: Option<Pagination>,
    pub results: Vec<SearchResult>,
}

/// A collection folder. Folder `0` is the reserved "all items" folder that
/// exists for every user and contains every item unconditionally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionFolder {
    pub id: i64,
    pub name: String,
    /// Expected number of items in this folder. Drives pagination.
    pub count: i64,
    pub resource_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionFolders {
    pub folders: Vec<CollectionFolder>,
}

/// Editing/display component for a custom field on Discogs.com.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CustomFieldType {
    Dropdown,
    Textarea,
}

impl CustomFieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomFieldType::Dropdown => "dropdown",
            CustomFieldType::Textarea => "textarea",
        }
    }
}

/// A user-defined column in the collection database.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionCustomField {
    /// Unique within a user's field set.
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: CustomFieldType,
    /// `true` if the field is visible to other users viewing the collection.
    #[serde(rename = "public")]
    pub is_public: bool,
    /// Display order among all of the user's fields.
    pub position: i64,
    /// Ordered choice strings, dropdown fields only.
    pub options: Option<Vec<String>>,
    /// Display height hint, textarea fields only.
    pub lines: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionCustomFields {
    pub fields: Option<Vec<CollectionCustomField>>,
}

/// A custom-field value the user filled in on a collection item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemNote {
    pub field_id: i64,
    pub value: String,
}

/// One item in a collection folder. The `id` is the release-version
/// identifier; the same item shows up under folder `0` and under any other
/// folder it was filed into.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionFolderItem {
    pub id: u64,
    pub rating: i64,
    pub folder_id: Option<i64>,
    pub date_added: Option<String>,
    pub notes: Option<Vec<ItemNote>>,
}

/// One page of items from `/users/{user}/collection/folders/{id}/releases`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionFolderItems {
    pub pagination: Option<Pagination>,
    pub releases: Option<Vec<CollectionFolderItem>>,
}

/// Estimated monetary value of the collection, as display strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionValue {
    pub minimum: String,
    pub median: String,
    pub maximum: String,
}

/// Result of adding an item to a folder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionItemInfo {
    pub instance_id: u64,
    pub resource_url: String,
}

/// Identity of the signed-in user, from `/oauth/identity`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserIdentity {
    pub id: u64,
    pub username: String,
    pub resource_url: String,
    pub consumer_name: Option<String>,
}

/// Public profile from `/users/{user}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: u64,
    pub username: String,
    pub resource_url: String,
    pub num_collection: Option<i64>,
    pub num_wantlist: Option<i64>,
    pub registered: Option<String>,
}

/// Structured error body returned by the Discogs API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub message: String,
}
