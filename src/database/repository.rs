/*!
 * Repository layer for database operations.
 *
 * This module provides a high-level API for all database operations,
 * abstracting away the SQL details and providing type-safe access.
 */

use anyhow::Result;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::errors::DatasetError;
use super::connection::{DatabaseConnection, DatabaseStats};
use super::models::{
    DatasetLanguageRecord, DatasetRecord, FieldRow, KeyRecord, LanguageRecord, NewField,
    RecordRow, RecordWithFields, TranslatorRecord,
};

const DATASET_LANGUAGE_SELECT: &str = r#"
    SELECT dl.id, dl.dataset_id, d.name, dl.language_id, l.code, l.name,
           dl.file_path, dl.file_hash, dl.imported, dl.created_at
    FROM dataset_languages dl
    JOIN datasets d ON d.id = dl.dataset_id
    JOIN languages l ON l.id = dl.language_id
"#;

const FIELD_SELECT: &str = r#"
    SELECT f.id, f.key_id, k.name, f.value, f.json_object_id,
           f.source_field_id, f.translator_id, f.valid
    FROM json_fields f
    JOIN keys k ON k.id = f.key_id
"#;

fn map_dataset_language(row: &Row) -> rusqlite::Result<DatasetLanguageRecord> {
    Ok(DatasetLanguageRecord {
        id: row.get(0)?,
        dataset_id: row.get(1)?,
        dataset_name: row.get(2)?,
        language_id: row.get(3)?,
        language_code: row.get(4)?,
        language_name: row.get(5)?,
        file_path: row.get(6)?,
        file_hash: row.get(7)?,
        imported: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn map_field(row: &Row) -> rusqlite::Result<FieldRow> {
    Ok(FieldRow {
        id: row.get(0)?,
        key_id: row.get(1)?,
        key_name: row.get(2)?,
        value: row.get(3)?,
        record_id: row.get(4)?,
        source_field_id: row.get(5)?,
        translator_id: row.get(6)?,
        valid: row.get(7)?,
    })
}

fn map_record(row: &Row) -> rusqlite::Result<RecordRow> {
    Ok(RecordRow {
        id: row.get(0)?,
        dataset_language_id: row.get(1)?,
        created_at: row.get(2)?,
    })
}

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> Result<Self> {
        let db = DatabaseConnection::new_default()?;
        Ok(Self::new(db))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Database statistics
    pub fn stats(&self) -> Result<DatabaseStats> {
        self.db.stats()
    }

    // =========================================================================
    // Reference data
    // =========================================================================

    /// Register a new language
    pub async fn create_language(&self, code: &str, name: &str) -> Result<LanguageRecord> {
        let code = code.trim().to_string();
        let name = name.trim().to_string();

        self.db
            .execute_async(move |conn| {
                let exists: bool = conn.query_row(
                    "SELECT COUNT(*) FROM languages WHERE code = ?1 OR name = ?2",
                    params![code, name],
                    |row| row.get(0),
                )?;
                if exists {
                    return Err(DatasetError::AlreadyExists { entity: "Language", name: format!("{} ({})", name, code) }.into());
                }

                conn.execute("INSERT INTO languages (code, name) VALUES (?1, ?2)", params![code, name])?;
                Ok(LanguageRecord { id: conn.last_insert_rowid(), code, name })
            })
            .await
    }

    /// Find a language by its code
    pub async fn get_language_by_code(&self, code: &str) -> Result<Option<LanguageRecord>> {
        let code = code.to_string();

        self.db
            .execute_async(move |conn| {
                let result = conn
                    .query_row(
                        "SELECT id, code, name FROM languages WHERE code = ?1",
                        [&code],
                        |row| Ok(LanguageRecord { id: row.get(0)?, code: row.get(1)?, name: row.get(2)? }),
                    )
                    .optional()?;
                Ok(result)
            })
            .await
    }

    /// List all languages ordered by code
    pub async fn list_languages(&self) -> Result<Vec<LanguageRecord>> {
        self.db
            .execute_async(|conn| {
                let mut stmt = conn.prepare("SELECT id, code, name FROM languages ORDER BY code")?;
                let rows = stmt.query_map([], |row| {
                    Ok(LanguageRecord { id: row.get(0)?, code: row.get(1)?, name: row.get(2)? })
                })?;
                Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
            })
            .await
    }

    /// Register a new dataset
    pub async fn create_dataset(&self, name: &str) -> Result<DatasetRecord> {
        let name = name.trim().to_string();

        self.db
            .execute_async(move |conn| {
                let id = Self::insert_unique_name(conn, "datasets", "Dataset", &name)?;
                Ok(DatasetRecord { id, name })
            })
            .await
    }

    /// Find a dataset by name
    pub async fn get_dataset_by_name(&self, name: &str) -> Result<Option<DatasetRecord>> {
        let name = name.to_string();

        self.db
            .execute_async(move |conn| {
                let result = Self::find_id_by_name(conn, "datasets", &name)?
                    .map(|id| DatasetRecord { id, name });
                Ok(result)
            })
            .await
    }

    /// Find a dataset by name, creating it when missing
    pub async fn get_or_create_dataset(&self, name: &str) -> Result<DatasetRecord> {
        let name = name.trim().to_string();

        self.db
            .execute_async(move |conn| {
                conn.execute("INSERT OR IGNORE INTO datasets (name) VALUES (?1)", [&name])?;
                let id: i64 = conn.query_row("SELECT id FROM datasets WHERE name = ?1", [&name], |row| row.get(0))?;
                Ok(DatasetRecord { id, name })
            })
            .await
    }

    /// List all datasets ordered by name
    pub async fn list_datasets(&self) -> Result<Vec<DatasetRecord>> {
        self.db
            .execute_async(|conn| {
                let mut stmt = conn.prepare("SELECT id, name FROM datasets ORDER BY name")?;
                let rows = stmt.query_map([], |row| Ok(DatasetRecord { id: row.get(0)?, name: row.get(1)? }))?;
                Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
            })
            .await
    }

    /// Register a new translator identity
    pub async fn create_translator(&self, name: &str) -> Result<TranslatorRecord> {
        let name = name.trim().to_string();

        self.db
            .execute_async(move |conn| {
                let id = Self::insert_unique_name(conn, "translators", "Translator", &name)?;
                Ok(TranslatorRecord { id, name })
            })
            .await
    }

    /// Find a translator by name
    pub async fn get_translator_by_name(&self, name: &str) -> Result<Option<TranslatorRecord>> {
        let name = name.to_string();

        self.db
            .execute_async(move |conn| {
                let result = Self::find_id_by_name(conn, "translators", &name)?
                    .map(|id| TranslatorRecord { id, name });
                Ok(result)
            })
            .await
    }

    /// List all translators ordered by name
    pub async fn list_translators(&self) -> Result<Vec<TranslatorRecord>> {
        self.db
            .execute_async(|conn| {
                let mut stmt = conn.prepare("SELECT id, name FROM translators ORDER BY name")?;
                let rows = stmt.query_map([], |row| Ok(TranslatorRecord { id: row.get(0)?, name: row.get(1)? }))?;
                Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
            })
            .await
    }

    /// Look up a key in the registry, registering it when unseen
    pub async fn get_or_create_key(&self, name: &str) -> Result<KeyRecord> {
        let name = name.to_string();

        self.db
            .execute_async(move |conn| {
                let id = Self::get_or_create_key_sync(conn, &name)?;
                Ok(KeyRecord { id, name })
            })
            .await
    }

    /// List all registered keys ordered by name
    pub async fn list_keys(&self) -> Result<Vec<KeyRecord>> {
        self.db
            .execute_async(|conn| {
                let mut stmt = conn.prepare("SELECT id, name FROM keys ORDER BY name")?;
                let rows = stmt.query_map([], |row| Ok(KeyRecord { id: row.get(0)?, name: row.get(1)? }))?;
                Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
            })
            .await
    }

    // The unique constraint on keys.name makes this safe under concurrent writers
    fn get_or_create_key_sync(conn: &Connection, name: &str) -> Result<i64> {
        conn.execute("INSERT OR IGNORE INTO keys (name) VALUES (?1)", [name])?;
        let id = conn.query_row("SELECT id FROM keys WHERE name = ?1", [name], |row| row.get(0))?;
        Ok(id)
    }

    fn insert_unique_name(conn: &Connection, table: &str, entity: &'static str, name: &str) -> Result<i64> {
        if Self::find_id_by_name(conn, table, name)?.is_some() {
            return Err(DatasetError::AlreadyExists { entity, name: name.to_string() }.into());
        }
        conn.execute(&format!("INSERT INTO {} (name) VALUES (?1)", table), [name])?;
        Ok(conn.last_insert_rowid())
    }

    fn find_id_by_name(conn: &Connection, table: &str, name: &str) -> Result<Option<i64>> {
        let id = conn
            .query_row(&format!("SELECT id FROM {} WHERE name = ?1", table), [name], |row| row.get(0))
            .optional()?;
        Ok(id)
    }

    // =========================================================================
    // Dataset languages
    // =========================================================================

    /// Get the dataset language for a (dataset, language) pair, creating it when missing
    ///
    /// Returns the record and whether it was created by this call.
    pub async fn get_or_create_dataset_language(
        &self,
        dataset_id: i64,
        language_id: i64,
    ) -> Result<(DatasetLanguageRecord, bool)> {
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .execute_async(move |conn| {
                let inserted = conn.execute(
                    r#"
                    INSERT OR IGNORE INTO dataset_languages (dataset_id, language_id, imported, created_at)
                    VALUES (?1, ?2, 0, ?3)
                    "#,
                    params![dataset_id, language_id, now],
                )?;

                let record = conn.query_row(
                    &format!("{} WHERE dl.dataset_id = ?1 AND dl.language_id = ?2", DATASET_LANGUAGE_SELECT),
                    params![dataset_id, language_id],
                    map_dataset_language,
                )?;

                Ok((record, inserted > 0))
            })
            .await
    }

    /// Get the dataset language for a (dataset, language) pair
    pub async fn get_dataset_language(
        &self,
        dataset_id: i64,
        language_id: i64,
    ) -> Result<Option<DatasetLanguageRecord>> {
        self.db
            .execute_async(move |conn| {
                let result = conn
                    .query_row(
                        &format!("{} WHERE dl.dataset_id = ?1 AND dl.language_id = ?2", DATASET_LANGUAGE_SELECT),
                        params![dataset_id, language_id],
                        map_dataset_language,
                    )
                    .optional()?;
                Ok(result)
            })
            .await
    }

    /// Get a dataset language by id
    pub async fn get_dataset_language_by_id(&self, id: i64) -> Result<Option<DatasetLanguageRecord>> {
        self.db
            .execute_async(move |conn| {
                let result = conn
                    .query_row(
                        &format!("{} WHERE dl.id = ?1", DATASET_LANGUAGE_SELECT),
                        [id],
                        map_dataset_language,
                    )
                    .optional()?;
                Ok(result)
            })
            .await
    }

    /// List dataset languages, optionally filtered by dataset name and language code
    pub async fn list_dataset_languages(
        &self,
        dataset_name: Option<&str>,
        language_code: Option<&str>,
    ) -> Result<Vec<DatasetLanguageRecord>> {
        let dataset_name = dataset_name.map(str::to_string);
        let language_code = language_code.map(str::to_string);

        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE (?1 IS NULL OR d.name = ?1) AND (?2 IS NULL OR l.code = ?2) ORDER BY d.name, l.code",
                    DATASET_LANGUAGE_SELECT
                ))?;
                let rows = stmt.query_map(params![dataset_name, language_code], map_dataset_language)?;
                Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
            })
            .await
    }

    /// Record the stored file of a dataset language
    pub async fn attach_file(&self, dataset_language_id: i64, file_path: &str, file_hash: &str) -> Result<()> {
        let file_path = file_path.to_string();
        let file_hash = file_hash.to_string();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    "UPDATE dataset_languages SET file_path = ?1, file_hash = ?2 WHERE id = ?3",
                    params![file_path, file_hash, dataset_language_id],
                )?;
                Ok(())
            })
            .await
    }

    /// Update the imported flag of a dataset language
    pub async fn set_imported(&self, dataset_language_id: i64, imported: bool) -> Result<()> {
        self.db
            .execute_async(move |conn| {
                conn.execute(
                    "UPDATE dataset_languages SET imported = ?1 WHERE id = ?2",
                    params![imported, dataset_language_id],
                )?;
                Ok(())
            })
            .await
    }

    // =========================================================================
    // Records and fields
    // =========================================================================

    /// Count the records owned by a dataset language
    pub async fn count_records(&self, dataset_language_id: i64) -> Result<i64> {
        self.db
            .execute_async(move |conn| {
                let count = conn.query_row(
                    "SELECT COUNT(*) FROM json_objects WHERE dataset_language_id = ?1",
                    [dataset_language_id],
                    |row| row.get(0),
                )?;
                Ok(count)
            })
            .await
    }

    /// List the records of a dataset language in creation order
    pub async fn list_records(&self, dataset_language_id: i64) -> Result<Vec<RecordRow>> {
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, dataset_language_id, created_at FROM json_objects WHERE dataset_language_id = ?1 ORDER BY id",
                )?;
                let rows = stmt.query_map([dataset_language_id], map_record)?;
                Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
            })
            .await
    }

    /// Create an empty record under a dataset language
    pub async fn create_record(&self, dataset_language_id: i64) -> Result<RecordRow> {
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    "INSERT INTO json_objects (dataset_language_id, created_at) VALUES (?1, ?2)",
                    params![dataset_language_id, now],
                )?;
                Ok(RecordRow { id: conn.last_insert_rowid(), dataset_language_id, created_at: now })
            })
            .await
    }

    /// Insert a single field into a record, returning its id
    pub async fn insert_field(&self, record_id: i64, field: NewField) -> Result<i64> {
        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO json_fields (key_id, value, json_object_id, source_field_id, translator_id, valid)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    "#,
                    params![
                        field.key_id,
                        field.value,
                        record_id,
                        field.source_field_id,
                        field.translator_id,
                        field.valid,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
    }

    /// Create a record together with its fields, registering unseen keys
    ///
    /// Imported fields are valid and carry no provenance.
    pub async fn insert_record_with_fields(
        &self,
        dataset_language_id: i64,
        fields: Vec<(String, String)>,
    ) -> Result<i64> {
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .transaction_async(move |tx| {
                tx.execute(
                    "INSERT INTO json_objects (dataset_language_id, created_at) VALUES (?1, ?2)",
                    params![dataset_language_id, now],
                )?;
                let record_id = tx.last_insert_rowid();

                for (key, value) in fields {
                    let key_id = Self::get_or_create_key_sync(tx, &key)?;
                    tx.execute(
                        "INSERT INTO json_fields (key_id, value, json_object_id, valid) VALUES (?1, ?2, ?3, 1)",
                        params![key_id, value, record_id],
                    )?;
                }

                Ok(record_id)
            })
            .await
    }

    /// List the fields of a record in insertion order
    pub async fn list_fields(&self, record_id: i64) -> Result<Vec<FieldRow>> {
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(&format!("{} WHERE f.json_object_id = ?1 ORDER BY f.id", FIELD_SELECT))?;
                let rows = stmt.query_map([record_id], map_field)?;
                Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
            })
            .await
    }

    /// Get a single field by id
    pub async fn get_field(&self, field_id: i64) -> Result<Option<FieldRow>> {
        self.db
            .execute_async(move |conn| {
                let result = conn
                    .query_row(&format!("{} WHERE f.id = ?1", FIELD_SELECT), [field_id], map_field)
                    .optional()?;
                Ok(result)
            })
            .await
    }

    /// Load every record of a dataset language with its fields, in order
    pub async fn list_records_with_fields(&self, dataset_language_id: i64) -> Result<Vec<RecordWithFields>> {
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, dataset_language_id, created_at FROM json_objects WHERE dataset_language_id = ?1 ORDER BY id",
                )?;
                let records = stmt
                    .query_map([dataset_language_id], map_record)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                let mut field_stmt = conn.prepare(&format!(
                    "{} JOIN json_objects o ON o.id = f.json_object_id WHERE o.dataset_language_id = ?1 ORDER BY f.json_object_id, f.id",
                    FIELD_SELECT
                ))?;
                let fields = field_stmt
                    .query_map([dataset_language_id], map_field)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                let mut result: Vec<RecordWithFields> = records
                    .into_iter()
                    .map(|record| RecordWithFields { record, fields: Vec::new() })
                    .collect();

                // Both lists are sorted by record id
                let mut index = 0;
                for field in fields {
                    while index < result.len() && result[index].record.id != field.record_id {
                        index += 1;
                    }
                    if let Some(entry) = result.get_mut(index) {
                        entry.fields.push(field);
                    }
                }

                Ok(result)
            })
            .await
    }

    /// Delete a record and its fields
    ///
    /// Returns false when no such record exists.
    pub async fn delete_record(&self, record_id: i64) -> Result<bool> {
        self.db
            .execute_async(move |conn| {
                let deleted = conn.execute("DELETE FROM json_objects WHERE id = ?1", [record_id])?;
                if deleted > 0 {
                    debug!("Deleted record {}", record_id);
                }
                Ok(deleted > 0)
            })
            .await
    }
}
