/*!
 * Dataset export.
 *
 * Renders one dataset language back into the array-of-objects document it
 * was imported from. Field metadata (validity, translator, source field) is
 * not part of the output.
 */

use log::info;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Serializer, Value};
use std::path::{Path, PathBuf};

use crate::database::models::{DatasetLanguageRecord, RecordWithFields};
use crate::database::Repository;
use crate::errors::{AppError, DatasetError};
use crate::file_utils::FileManager;

/// A rendered export, ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    /// `{dataset}_{language_code}.json`
    pub file_name: String,
    /// Pretty-printed JSON array
    pub content: String,
}

impl ExportDocument {
    /// Write the document into `dir` under its file name
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, AppError> {
        let path = dir.join(&self.file_name);
        FileManager::write_to_file(&path, &self.content)?;
        Ok(path)
    }
}

/// Render records as a JSON array with 4-space indentation
///
/// Non-ASCII text is written literally.
pub fn render_records(records: &[RecordWithFields]) -> Result<String, AppError> {
    let document: Vec<Value> = records
        .iter()
        .map(|record| {
            let object: Map<String, Value> = record
                .fields
                .iter()
                .map(|field| (field.key_name.clone(), Value::String(field.value.clone())))
                .collect();
            Value::Object(object)
        })
        .collect();

    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
    document
        .serialize(&mut serializer)
        .map_err(|e| AppError::File(format!("Failed to render export: {}", e)))?;

    String::from_utf8(buffer).map_err(|e| AppError::File(format!("Export is not valid UTF-8: {}", e)))
}

/// Exports dataset languages
pub struct DatasetExporter {
    repo: Repository,
}

impl DatasetExporter {
    /// Create an exporter
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Export one dataset language
    pub async fn export(&self, dataset_language: &DatasetLanguageRecord) -> Result<ExportDocument, AppError> {
        let records = self.repo.list_records_with_fields(dataset_language.id).await?;
        let content = render_records(&records)?;

        info!("Exported {} records from {}", records.len(), dataset_language);

        Ok(ExportDocument {
            file_name: dataset_language.export_file_name(),
            content,
        })
    }

    /// Export a selection, which must hold exactly one dataset language
    pub async fn export_selection(&self, selection: &[DatasetLanguageRecord]) -> Result<ExportDocument, AppError> {
        match selection {
            [dataset_language] => self.export(dataset_language).await,
            _ => Err(DatasetError::ExportSelection(selection.len()).into()),
        }
    }
}
