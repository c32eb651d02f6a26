/*!
 * # dataset-translator
 *
 * A Rust library for translating JSON datasets with AI providers.
 *
 * ## Features
 *
 * - Attach and import JSON files holding an array of flat objects
 * - Translate every text field of a dataset into another language using:
 *   - OpenAI API
 *   - Anthropic API
 * - Resume interrupted runs without re-translating finished records
 * - Export any dataset language back to pretty-printed JSON
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `database`: SQLite persistence of languages, datasets, records and fields
 * - `dataset_io`: Attachment, import and export of dataset files
 * - `translation`: Translation runs:
 *   - `translation::adapter`: Provider-backed text translators
 *   - `translation::job`: Resolution and the resumable record loop
 *   - `translation::runner`: Background tasks serialized per language pair
 * - `providers`: Client implementations for LLM providers
 * - `file_utils`: File system operations
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod database;
pub mod dataset_io;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::{Config, FailurePolicy, TranslationProvider};
pub use database::Repository;
pub use dataset_io::{DatasetExporter, DatasetImporter, ExportDocument};
pub use errors::{AppError, DatasetError, ProviderError, TranslationError};
pub use language_utils::get_language_name;
pub use translation::{
    translate_dataset, RunOptions, RunSummary, TaskHandle, TaskRunner, TextTranslator, TranslationRequest,
};
