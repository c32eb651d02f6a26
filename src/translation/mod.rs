/*!
 * Dataset translation using AI providers.
 *
 * - `adapter`: binds a provider to a `TextTranslator`
 * - `job`: resolves a request and translates the remaining records
 * - `runner`: background tasks serialized per dataset and language pair
 */

// Re-export main types for easier usage
pub use self::adapter::{build_translator, test_translator_connection, ProviderTranslator, TextTranslator};
pub use self::job::{
    translate_dataset, translate_dataset_with, DatasetTranslator, ResolvedRun, RunOptions, RunSummary,
    TranslationRequest,
};
pub use self::runner::{wait_all, RunGuard, RunKey, RunLocks, TaskHandle, TaskRunner};

// Submodules
pub mod adapter;
pub mod job;
pub mod runner;
