/*!
 * Database entity models.
 *
 * These structures map directly to database tables and provide
 * type-safe access to persisted data.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// A language a dataset can be materialized in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageRecord {
    /// Row id
    pub id: i64,
    /// Unique language code (e.g. "en")
    pub code: String,
    /// Unique display name (e.g. "English"), used in provider prompts
    pub name: String,
}

impl fmt::Display for LanguageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.code)
    }
}

/// Entry of the global key registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Row id
    pub id: i64,
    /// Unique key name
    pub name: String,
}

/// A named collection of translatable content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRecord {
    /// Row id
    pub id: i64,
    /// Unique dataset name
    pub name: String,
}

/// A named translation provider identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatorRecord {
    /// Row id
    pub id: i64,
    /// Unique translator name (e.g. "openai")
    pub name: String,
}

/// One dataset materialized in one language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetLanguageRecord {
    /// Row id
    pub id: i64,
    /// Owning dataset
    pub dataset_id: i64,
    /// Dataset name (joined)
    pub dataset_name: String,
    /// Language of this materialization
    pub language_id: i64,
    /// Language code (joined)
    pub language_code: String,
    /// Language display name (joined)
    pub language_name: String,
    /// Stored JSON file, if one was attached
    pub file_path: Option<String>,
    /// SHA-256 of the stored file
    pub file_hash: Option<String>,
    /// Whether the attached file has been imported
    pub imported: bool,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
}

impl DatasetLanguageRecord {
    /// File name used when exporting this dataset language
    pub fn export_file_name(&self) -> String {
        format!("{}_{}.json", self.dataset_name, self.language_code)
    }
}

impl fmt::Display for DatasetLanguageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.dataset_name, self.language_name)
    }
}

/// One structured item owned by a dataset language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRow {
    /// Row id, monotonic in creation order
    pub id: i64,
    /// Owning dataset language
    pub dataset_language_id: i64,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
}

/// One key/value pair of a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRow {
    /// Row id
    pub id: i64,
    /// Registry key id
    pub key_id: i64,
    /// Registry key name (joined)
    pub key_name: String,
    /// Field value
    pub value: String,
    /// Owning record
    pub record_id: i64,
    /// Field this one was translated from
    pub source_field_id: Option<i64>,
    /// Translator that produced this field
    pub translator_id: Option<i64>,
    /// Validity flag
    pub valid: bool,
}

impl FieldRow {
    /// A field whose translation failed: it has a source field but no translator
    pub fn is_failed_translation(&self) -> bool {
        self.source_field_id.is_some() && self.translator_id.is_none()
    }
}

impl fmt::Display for FieldRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JSON field: {} - Valid: {}", self.key_name, self.valid)
    }
}

/// Field to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewField {
    /// Key id from the registry
    pub key_id: i64,
    /// Field value
    pub value: String,
    /// Field this one was translated from
    pub source_field_id: Option<i64>,
    /// Translator that produced this field
    pub translator_id: Option<i64>,
    /// Validity flag
    pub valid: bool,
}

impl NewField {
    /// A field copied from `source` into a target record, attributed to `translator_id`
    pub fn translated_from(source: &FieldRow, value: String, translator_id: i64) -> Self {
        Self {
            key_id: source.key_id,
            value,
            source_field_id: Some(source.id),
            translator_id: Some(translator_id),
            valid: false,
        }
    }

    /// Placeholder for a field the translator could not handle
    ///
    /// Keeps the source value and links back to `source`, but records no
    /// translator.
    pub fn failed_translation_of(source: &FieldRow) -> Self {
        Self {
            key_id: source.key_id,
            value: source.value.clone(),
            source_field_id: Some(source.id),
            translator_id: None,
            valid: false,
        }
    }
}

/// A record with its fields, as shown by the inspection commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordWithFields {
    /// The record itself
    pub record: RecordRow,
    /// Fields in insertion order
    pub fields: Vec<FieldRow>,
}
