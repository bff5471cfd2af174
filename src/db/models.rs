use crate::discogs::models::{
    CollectionCustomField, CollectionFolder, CollectionFolderItem, ItemNote,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Local counterpart of a collection folder, keyed by the remote folder ID.
///
/// One local record per remote identifier: re-importing the same folder
/// updates this record in place instead of duplicating it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DbFolder {
    /// Remote folder ID. Folder `0` is the reserved all-items folder.
    pub id: i64,
    pub name: String,
    /// Item count reported by the API, used to drive pagination on the next
    /// import.
    pub expected_item_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbFolder {
    pub fn from_discogs_folder(folder: &CollectionFolder) -> Self {
        let now = Utc::now();
        DbFolder {
            id: folder.id,
            name: folder.name.clone(),
            expected_item_count: folder.count,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Local counterpart of a user-defined custom field, keyed by the remote
/// field ID. Dropdown options are stored as a JSON array string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DbCustomField {
    /// Remote field ID, unique within the user's field set.
    pub id: i64,
    pub name: String,
    /// "dropdown" or "textarea".
    pub field_type: String,
    pub is_public: bool,
    pub position: i64,
    /// Textarea height hint.
    pub lines: Option<i64>,
    /// JSON array of dropdown option strings.
    pub options: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbCustomField {
    pub fn from_discogs_field(field: &CollectionCustomField) -> Result<Self, serde_json::Error> {
        let now = Utc::now();
        Ok(DbCustomField {
            id: field.id,
            name: field.name.clone(),
            field_type: field.field_type.as_str().to_string(),
            is_public: field.is_public,
            position: field.position,
            lines: field.lines,
            options: field
                .options
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
            created_at: now,
            updated_at: now,
        })
    }

    /// Decode the stored dropdown options back into a list.
    pub fn options(&self) -> Result<Option<Vec<String>>, serde_json::Error> {
        self.options
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
    }
}

/// Local counterpart of a collection item, keyed by the remote
/// release-version ID. Folder membership lives in the `item_folders`
/// junction; the item row itself is folder-agnostic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DbCollectionItem {
    /// Remote release-version ID.
    pub id: i64,
    pub rating: i64,
    pub date_added: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbCollectionItem {
    pub fn from_discogs_item(item: &CollectionFolderItem) -> Self {
        let now = Utc::now();
        DbCollectionItem {
            id: item.id as i64,
            rating: item.rating,
            date_added: item.date_added.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Value of one custom field on one collection item. Unique per
/// (item, field) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DbItemField {
    pub id: String,
    pub item_id: i64,
    pub field_id: i64,
    pub value: String,
}

impl DbItemField {
    pub fn from_discogs_note(item_id: i64, note: &ItemNote) -> Self {
        DbItemField {
            id: Uuid::new_v4().to_string(),
            item_id,
            field_id: note.field_id,
            value: note.value.clone(),
        }
    }
}

/// Links items to folders (many-to-many). The same item belongs to folder `0`
/// and to every other folder the user filed it into.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DbItemFolder {
    pub id: String,
    pub item_id: i64,
    pub folder_id: i64,
}

impl DbItemFolder {
    pub fn new(item_id: i64, folder_id: i64) -> Self {
        DbItemFolder {
            id: Uuid::new_v4().to_string(),
            item_id,
            folder_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discogs::models::CustomFieldType;

    #[test]
    fn test_custom_field_options_round_trip() {
        let field = CollectionCustomField {
            id: 1,
            name: "Media Condition".to_string(),
            field_type: CustomFieldType::Dropdown,
            is_public: true,
            position: 1,
            options: Some(vec!["Mint (M)".to_string(), "Good (G)".to_string()]),
            lines: None,
        };

        let db_field = DbCustomField::from_discogs_field(&field).unwrap();
        assert_eq!(db_field.field_type, "dropdown");
        assert_eq!(
            db_field.options().unwrap().unwrap(),
            vec!["Mint (M)".to_string(), "Good (G)".to_string()]
        );
    }

    #[test]
    fn test_item_keyed_by_release_version_id() {
        let item = CollectionFolderItem {
            id: 1128060,
            rating: 4,
            folder_id: Some(1),
            date_added: Some("2019-03-01T11:55:48-08:00".to_string()),
            notes: None,
        };

        let db_item = DbCollectionItem::from_discogs_item(&item);
        assert_eq!(db_item.id, 1128060);
        assert_eq!(db_item.rating, 4);
    }
}
