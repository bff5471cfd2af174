pub mod client;
pub mod models;

pub use client::{
    link_item_to_folder, upsert_custom_field, upsert_folder, upsert_item, upsert_item_field,
    Database,
};
pub use models::{DbCollectionItem, DbCustomField, DbFolder, DbItemField, DbItemFolder};
