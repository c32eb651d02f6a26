/*!
 * Dataset file attachment and import.
 *
 * A dataset file is a UTF-8 JSON document holding a top-level array of flat
 * objects. Attaching copies it into the storage directory; importing turns
 * every object into one record with one field per key.
 */

use log::{debug, info, warn};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::database::models::DatasetLanguageRecord;
use crate::database::Repository;
use crate::errors::{AppError, DatasetError};
use crate::file_utils::{FileManager, DATASET_EXTENSION};

/// Fields of one parsed record, in document order
pub type ParsedRecord = Vec<(String, String)>;

/// Result of importing one dataset language
#[derive(Debug)]
pub struct ImportOutcome {
    /// The dataset language that was processed
    pub dataset_language: DatasetLanguageRecord,
    /// Number of records created, or why the import failed
    pub result: Result<usize, AppError>,
}

/// Convert a JSON value into the text stored in a field
///
/// Strings are kept as-is, `null` becomes the empty string, and every other
/// value is stored as its compact JSON text.
pub fn field_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Parse and validate a dataset document without touching the database
pub fn parse_dataset(path: &str, content: &str) -> Result<Vec<ParsedRecord>, DatasetError> {
    let malformed = |reason: String| DatasetError::MalformedDataset {
        path: path.to_string(),
        reason,
    };

    let document: Value =
        serde_json::from_str(content).map_err(|e| malformed(format!("invalid JSON: {}", e)))?;

    let Value::Array(items) = document else {
        return Err(malformed("top-level value is not an array".to_string()));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(object) => Ok(object
                .into_iter()
                .map(|(key, value)| {
                    let text = field_text(&value);
                    (key, text)
                })
                .collect()),
            _ => Err(malformed(format!("element {} is not an object", index))),
        })
        .collect()
}

/// Attaches and imports dataset files
pub struct DatasetImporter {
    repo: Repository,
    storage_dir: PathBuf,
}

impl DatasetImporter {
    /// Create an importer storing attached files under `storage_dir`
    pub fn new(repo: Repository, storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo,
            storage_dir: storage_dir.into(),
        }
    }

    /// Attach `file` to the (dataset, language) pair
    ///
    /// The dataset is created when missing; the language must exist.
    pub async fn attach(
        &self,
        dataset_name: &str,
        language_code: &str,
        file: &Path,
    ) -> Result<DatasetLanguageRecord, AppError> {
        let language = self
            .repo
            .get_language_by_code(language_code)
            .await?
            .ok_or_else(|| DatasetError::not_found("Language", language_code))?;
        let dataset = self.repo.get_or_create_dataset(dataset_name).await?;

        let (dataset_language, _) = self
            .repo
            .get_or_create_dataset_language(dataset.id, language.id)
            .await?;
        if dataset_language.imported {
            return Err(DatasetError::AlreadyImported(dataset_language.to_string()).into());
        }

        let stored = FileManager::store_dataset_file(file, &self.storage_dir)?;
        let stored_path = stored.path.to_string_lossy().to_string();
        self.repo
            .attach_file(dataset_language.id, &stored_path, &stored.hash)
            .await?;

        info!("Attached {:?} to {} as {}", file, dataset_language, stored_path);

        self.repo
            .get_dataset_language_by_id(dataset_language.id)
            .await?
            .ok_or_else(|| DatasetError::not_found("Dataset language", dataset_language.to_string()).into())
    }

    /// Attach every `{dataset}_{code}.json` file found under `dir`
    pub async fn attach_directory(&self, dir: &Path) -> Result<Vec<(PathBuf, Result<DatasetLanguageRecord, AppError>)>, AppError> {
        let mut outcomes = Vec::new();

        for path in FileManager::find_files(dir, DATASET_EXTENSION)? {
            let Some((dataset_name, language_code)) = FileManager::parse_dataset_file_name(&path) else {
                warn!("Skipping {:?}: name does not follow {{dataset}}_{{code}}.json", path);
                continue;
            };

            let result = self.attach(&dataset_name, &language_code, &path).await;
            outcomes.push((path, result));
        }

        Ok(outcomes)
    }

    /// Import the attached file of one dataset language
    pub async fn import(&self, dataset_language: &DatasetLanguageRecord) -> Result<usize, AppError> {
        if dataset_language.imported {
            return Err(DatasetError::AlreadyImported(dataset_language.to_string()).into());
        }

        let file_path = dataset_language.file_path.as_deref().ok_or_else(|| DatasetError::InvalidFile {
            path: dataset_language.to_string(),
            reason: "no file attached".to_string(),
        })?;

        let content = std::fs::read_to_string(file_path).map_err(|e| DatasetError::InvalidFile {
            path: file_path.to_string(),
            reason: e.to_string(),
        })?;

        let records = parse_dataset(file_path, &content)?;
        let total = records.len();

        for (index, fields) in records.into_iter().enumerate() {
            let record_id = self
                .repo
                .insert_record_with_fields(dataset_language.id, fields)
                .await?;
            debug!("Imported record {}/{} as {}", index + 1, total, record_id);
        }

        self.repo.set_imported(dataset_language.id, true).await?;
        info!("Imported {} records into {}", total, dataset_language);

        Ok(total)
    }

    /// Import several dataset languages; one failure does not stop the others
    pub async fn import_many(&self, dataset_languages: &[DatasetLanguageRecord]) -> Vec<ImportOutcome> {
        let mut outcomes = Vec::with_capacity(dataset_languages.len());

        for dataset_language in dataset_languages {
            let result = self.import(dataset_language).await;
            if let Err(e) = &result {
                warn!("Import of {} failed: {}", dataset_language, e);
            }
            outcomes.push(ImportOutcome {
                dataset_language: dataset_language.clone(),
                result,
            });
        }

        outcomes
    }
}
