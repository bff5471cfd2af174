use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteConnection;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::db::models::{DbCollectionItem, DbCustomField, DbFolder, DbItemField};
use crate::discogs::models::{
    CollectionCustomField, CollectionFolder, CollectionFolderItem, ItemNote,
};

/// SQLite-backed store for the imported collection.
///
/// Every record is keyed by its remote Discogs identifier; the only write
/// pattern is fetch-or-create followed by a field update, so repeated imports
/// never duplicate rows.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if necessary) the database at the given path and make
    /// sure the schema exists.
    pub async fn new(database_path: &str) -> Result<Self, sqlx::Error> {
        // sqlite:// with ?mode=rwc creates the file if it doesn't exist
        let database_url = format!("sqlite://{}?mode=rwc", database_path);
        info!("Connecting to {}", database_url);
        let pool = SqlitePool::connect(&database_url).await?;

        let db = Database { pool };
        db.create_tables().await?;
        Ok(db)
    }

    /// In-memory database for tests.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let pool = SqlitePool::connect("sqlite::memory:").await?;
        let db = Database { pool };
        db.create_tables().await?;
        Ok(db)
    }

    /// Begin a transaction. The import pipeline runs all of its upserts on
    /// one transaction and commits them as a single unit of work.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
        self.pool.begin().await
    }

    async fn create_tables(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS folders (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                expected_item_count INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS custom_fields (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                field_type TEXT NOT NULL,
                is_public BOOLEAN NOT NULL DEFAULT FALSE,
                position INTEGER NOT NULL,
                lines INTEGER,
                options TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS collection_items (
                id INTEGER PRIMARY KEY,
                rating INTEGER NOT NULL DEFAULT 0,
                date_added TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS collection_item_fields (
                id TEXT PRIMARY KEY,
                item_id INTEGER NOT NULL,
                field_id INTEGER NOT NULL,
                value TEXT NOT NULL,
                FOREIGN KEY (item_id) REFERENCES collection_items (id) ON DELETE CASCADE,
                FOREIGN KEY (field_id) REFERENCES custom_fields (id) ON DELETE CASCADE,
                UNIQUE(item_id, field_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS item_folders (
                id TEXT PRIMARY KEY,
                item_id INTEGER NOT NULL,
                folder_id INTEGER NOT NULL,
                FOREIGN KEY (item_id) REFERENCES collection_items (id) ON DELETE CASCADE,
                FOREIGN KEY (folder_id) REFERENCES folders (id) ON DELETE CASCADE,
                UNIQUE(item_id, folder_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_folder(&self, folder_id: i64) -> Result<Option<DbFolder>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM folders WHERE id = ?")
            .bind(folder_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row_to_folder(&row)))
    }

    pub async fn folders(&self) -> Result<Vec<DbFolder>, sqlx::Error> {
        let rows = sqlx::query("SELECT * FROM folders ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(row_to_folder).collect())
    }

    pub async fn get_item(&self, item_id: i64) -> Result<Option<DbCollectionItem>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM collection_items WHERE id = ?")
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row_to_item(&row)))
    }

    pub async fn get_custom_field(
        &self,
        field_id: i64,
    ) -> Result<Option<DbCustomField>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM custom_fields WHERE id = ?")
            .bind(field_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row_to_custom_field(&row)))
    }

    pub async fn custom_fields(&self) -> Result<Vec<DbCustomField>, sqlx::Error> {
        let rows = sqlx::query("SELECT * FROM custom_fields ORDER BY position")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(row_to_custom_field).collect())
    }

    /// Items linked to a folder, ordered by remote item ID.
    pub async fn items_in_folder(
        &self,
        folder_id: i64,
    ) -> Result<Vec<DbCollectionItem>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT i.* FROM collection_items i
            JOIN item_folders f ON i.id = f.item_id
            WHERE f.folder_id = ?
            ORDER BY i.id
            "#,
        )
        .bind(folder_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_item).collect())
    }

    pub async fn fields_for_item(&self, item_id: i64) -> Result<Vec<DbItemField>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT * FROM collection_item_fields WHERE item_id = ? ORDER BY field_id",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| DbItemField {
                id: row.get("id"),
                item_id: row.get("item_id"),
                field_id: row.get("field_id"),
                value: row.get("value"),
            })
            .collect())
    }

    pub async fn count_folders(&self) -> Result<i64, sqlx::Error> {
        self.count("folders").await
    }

    pub async fn count_custom_fields(&self) -> Result<i64, sqlx::Error> {
        self.count("custom_fields").await
    }

    pub async fn count_items(&self) -> Result<i64, sqlx::Error> {
        self.count("collection_items").await
    }

    pub async fn count_item_fields(&self) -> Result<i64, sqlx::Error> {
        self.count("collection_item_fields").await
    }

    pub async fn count_folder_memberships(&self) -> Result<i64, sqlx::Error> {
        self.count("item_folders").await
    }

    async fn count(&self, table: &str) -> Result<i64, sqlx::Error> {
        let row = sqlx::query(&format!("SELECT COUNT(*) AS n FROM {}", table))
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }
}

/// Fetch the folder with the remote ID, creating it if absent, then apply
/// the remote folder's fields. Returns the up-to-date local record.
pub async fn upsert_folder(
    conn: &mut SqliteConnection,
    folder: &CollectionFolder,
) -> Result<DbFolder, sqlx::Error> {
    let existing = sqlx::query("SELECT * FROM folders WHERE id = ?")
        .bind(folder.id)
        .fetch_optional(&mut *conn)
        .await?;

    if let Some(row) = existing {
        let mut db_folder = row_to_folder(&row);
        db_folder.name = folder.name.clone();
        db_folder.expected_item_count = folder.count;
        db_folder.updated_at = Utc::now();

        sqlx::query("UPDATE folders SET name = ?, expected_item_count = ?, updated_at = ? WHERE id = ?")
            .bind(&db_folder.name)
            .bind(db_folder.expected_item_count)
            .bind(db_folder.updated_at.to_rfc3339())
            .bind(db_folder.id)
            .execute(&mut *conn)
            .await?;

        Ok(db_folder)
    } else {
        let db_folder = DbFolder::from_discogs_folder(folder);

        sqlx::query(
            r#"
            INSERT INTO folders (id, name, expected_item_count, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(db_folder.id)
        .bind(&db_folder.name)
        .bind(db_folder.expected_item_count)
        .bind(db_folder.created_at.to_rfc3339())
        .bind(db_folder.updated_at.to_rfc3339())
        .execute(&mut *conn)
        .await?;

        Ok(db_folder)
    }
}

/// Fetch-or-create for a custom field, keyed by the remote field ID.
pub async fn upsert_custom_field(
    conn: &mut SqliteConnection,
    field: &CollectionCustomField,
) -> Result<DbCustomField, sqlx::Error> {
    let fresh = DbCustomField::from_discogs_field(field)
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

    let existing = sqlx::query("SELECT * FROM custom_fields WHERE id = ?")
        .bind(field.id)
        .fetch_optional(&mut *conn)
        .await?;

    if let Some(row) = existing {
        let mut db_field = row_to_custom_field(&row);
        db_field.name = fresh.name;
        db_field.field_type = fresh.field_type;
        db_field.is_public = fresh.is_public;
        db_field.position = fresh.position;
        db_field.lines = fresh.lines;
        db_field.options = fresh.options;
        db_field.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE custom_fields
            SET name = ?, field_type = ?, is_public = ?, position = ?, lines = ?, options = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&db_field.name)
        .bind(&db_field.field_type)
        .bind(db_field.is_public)
        .bind(db_field.position)
        .bind(db_field.lines)
        .bind(&db_field.options)
        .bind(db_field.updated_at.to_rfc3339())
        .bind(db_field.id)
        .execute(&mut *conn)
        .await?;

        Ok(db_field)
    } else {
        sqlx::query(
            r#"
            INSERT INTO custom_fields (
                id, name, field_type, is_public, position, lines, options,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(fresh.id)
        .bind(&fresh.name)
        .bind(&fresh.field_type)
        .bind(fresh.is_public)
        .bind(fresh.position)
        .bind(fresh.lines)
        .bind(&fresh.options)
        .bind(fresh.created_at.to_rfc3339())
        .bind(fresh.updated_at.to_rfc3339())
        .execute(&mut *conn)
        .await?;

        Ok(fresh)
    }
}

/// Fetch-or-create for a collection item, keyed by the remote
/// release-version ID.
pub async fn upsert_item(
    conn: &mut SqliteConnection,
    item: &CollectionFolderItem,
) -> Result<DbCollectionItem, sqlx::Error> {
    let item_id = item.id as i64;

    let existing = sqlx::query("SELECT * FROM collection_items WHERE id = ?")
        .bind(item_id)
        .fetch_optional(&mut *conn)
        .await?;

    if let Some(row) = existing {
        let mut db_item = row_to_item(&row);
        db_item.rating = item.rating;
        db_item.date_added = item.date_added.clone();
        db_item.updated_at = Utc::now();

        sqlx::query(
            "UPDATE collection_items SET rating = ?, date_added = ?, updated_at = ? WHERE id = ?",
        )
        .bind(db_item.rating)
        .bind(&db_item.date_added)
        .bind(db_item.updated_at.to_rfc3339())
        .bind(db_item.id)
        .execute(&mut *conn)
        .await?;

        Ok(db_item)
    } else {
        let db_item = DbCollectionItem::from_discogs_item(item);

        sqlx::query(
            r#"
            INSERT INTO collection_items (id, rating, date_added, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(db_item.id)
        .bind(db_item.rating)
        .bind(&db_item.date_added)
        .bind(db_item.created_at.to_rfc3339())
        .bind(db_item.updated_at.to_rfc3339())
        .execute(&mut *conn)
        .await?;

        Ok(db_item)
    }
}

/// Fetch-or-create for one custom-field value on one item, keyed by the
/// (item, field) pair.
pub async fn upsert_item_field(
    conn: &mut SqliteConnection,
    item_id: i64,
    note: &ItemNote,
) -> Result<DbItemField, sqlx::Error> {
    let existing =
        sqlx::query("SELECT * FROM collection_item_fields WHERE item_id = ? AND field_id = ?")
            .bind(item_id)
            .bind(note.field_id)
            .fetch_optional(&mut *conn)
            .await?;

    if let Some(row) = existing {
        let db_field = DbItemField {
            id: row.get("id"),
            item_id,
            field_id: note.field_id,
            value: note.value.clone(),
        };

        sqlx::query("UPDATE collection_item_fields SET value = ? WHERE id = ?")
            .bind(&db_field.value)
            .bind(&db_field.id)
            .execute(&mut *conn)
            .await?;

        Ok(db_field)
    } else {
        let db_field = DbItemField::from_discogs_note(item_id, note);

        sqlx::query(
            "INSERT INTO collection_item_fields (id, item_id, field_id, value) VALUES (?, ?, ?, ?)",
        )
        .bind(&db_field.id)
        .bind(db_field.item_id)
        .bind(db_field.field_id)
        .bind(&db_field.value)
        .execute(&mut *conn)
        .await?;

        Ok(db_field)
    }
}

/// Associate an item with a folder. Idempotent: the (item, folder) pair is
/// linked at most once.
pub async fn link_item_to_folder(
    conn: &mut SqliteConnection,
    item_id: i64,
    folder_id: i64,
) -> Result<(), sqlx::Error> {
    let existing = sqlx::query("SELECT id FROM item_folders WHERE item_id = ? AND folder_id = ?")
        .bind(item_id)
        .bind(folder_id)
        .fetch_optional(&mut *conn)
        .await?;

    if existing.is_none() {
        sqlx::query("INSERT INTO item_folders (id, item_id, folder_id) VALUES (?, ?, ?)")
            .bind(Uuid::new_v4().to_string())
            .bind(item_id)
            .bind(folder_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

fn row_to_folder(row: &sqlx::sqlite::SqliteRow) -> DbFolder {
    DbFolder {
        id: row.get("id"),
        name: row.get("name"),
        expected_item_count: row.get("expected_item_count"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at")),
        updated_at: parse_timestamp(&row.get::<String, _>("updated_at")),
    }
}

fn row_to_custom_field(row: &sqlx::sqlite::SqliteRow) -> DbCustomField {
    DbCustomField {
        id: row.get("id"),
        name: row.get("name"),
        field_type: row.get("field_type"),
        is_public: row.get("is_public"),
        position: row.get("position"),
        lines: row.get("lines"),
        options: row.get("options"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at")),
        updated_at: parse_timestamp(&row.get::<String, _>("updated_at")),
    }
}

fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> DbCollectionItem {
    DbCollectionItem {
        id: row.get("id"),
        rating: row.get("rating"),
        date_added: row.get("date_added"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at")),
        updated_at: parse_timestamp(&row.get::<String, _>("updated_at")),
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}
