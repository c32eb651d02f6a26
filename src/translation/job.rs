/*!
 * Dataset translation runs.
 *
 * A run copies every not-yet-translated record of a source dataset language
 * into the target dataset language, translating field values on the way.
 * Runs resume by position: the number of records already present in the
 * target is the number of source records skipped.
 */

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::fmt;

use crate::app_config::{FailurePolicy, TranslationCommonConfig, TranslationConfig, TranslationProvider};
use crate::database::models::{
    DatasetLanguageRecord, DatasetRecord, FieldRow, LanguageRecord, NewField, TranslatorRecord,
};
use crate::database::Repository;
use crate::errors::{DatasetError, TranslationError};
use crate::translation::adapter::{build_translator, TextTranslator};
use crate::translation::runner::RunKey;

/// What to translate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    /// Dataset name
    pub dataset_name: String,
    /// Source language code
    pub source_language: String,
    /// Target language code
    pub target_language: String,
    /// Translator name, which selects the provider
    pub translator_name: String,
    /// Keys whose values are copied untranslated
    pub keys_to_skip: HashSet<String>,
}

impl TranslationRequest {
    /// Request with an empty skip list
    pub fn new(
        dataset_name: impl Into<String>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
        translator_name: impl Into<String>,
    ) -> Self {
        Self {
            dataset_name: dataset_name.into(),
            source_language: source_language.into(),
            target_language: target_language.into(),
            translator_name: translator_name.into(),
            keys_to_skip: HashSet::new(),
        }
    }

    /// Add keys to the skip list
    pub fn with_skip_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys_to_skip.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Same request for another target language
    pub fn for_target(&self, target_language: impl Into<String>) -> Self {
        Self {
            target_language: target_language.into(),
            ..self.clone()
        }
    }

    /// Serialization key of this request
    pub fn run_key(&self) -> RunKey {
        RunKey::new(&self.dataset_name, &self.source_language, &self.target_language)
    }
}

/// Per-run behavior
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// What to do when a field cannot be translated
    pub failure_policy: FailurePolicy,
    /// Progress display the run attaches its bar to
    pub progress: Option<MultiProgress>,
}

impl RunOptions {
    /// Options taken from the common translation settings
    pub fn from_config(common: &TranslationCommonConfig) -> Self {
        Self {
            failure_policy: common.failure_policy,
            progress: None,
        }
    }

    /// Override the failure policy
    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    /// Show a progress bar inside `progress`
    pub fn with_progress(mut self, progress: MultiProgress) -> Self {
        self.progress = Some(progress);
        self
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Dataset name
    pub dataset_name: String,
    /// Source language display name
    pub source_language: String,
    /// Target language display name
    pub target_language: String,
    /// Target records present before the run
    pub already_done: usize,
    /// Target records created by this run
    pub records_created: usize,
    /// Fields sent through the translator
    pub fields_translated: usize,
    /// Fields copied unchanged (skipped key or empty value)
    pub fields_copied: usize,
    /// Fields stored with their source value after a failed translation
    pub fields_failed: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Translation completed for dataset {} from {} to {}: {} records created ({} already done)",
            self.dataset_name,
            self.source_language,
            self.target_language,
            self.records_created,
            self.already_done
        )?;
        if self.fields_failed > 0 {
            write!(f, ", {} fields could not be translated and were marked invalid", self.fields_failed)?;
        }
        Ok(())
    }
}

/// Entities a request refers to, all looked up before any write
#[derive(Debug, Clone)]
pub struct ResolvedRun {
    /// The dataset
    pub dataset: DatasetRecord,
    /// Source language
    pub source_language: LanguageRecord,
    /// Target language
    pub target_language: LanguageRecord,
    /// Translator recorded on every produced field
    pub translator: TranslatorRecord,
    /// Source dataset language
    pub source: DatasetLanguageRecord,
}

impl ResolvedRun {
    /// Look up every entity named by `request`
    pub async fn resolve(repo: &Repository, request: &TranslationRequest) -> Result<Self, TranslationError> {
        if request.source_language.trim() == request.target_language.trim() {
            return Err(DatasetError::SameLanguage(request.source_language.clone()).into());
        }

        let dataset = repo
            .get_dataset_by_name(&request.dataset_name)
            .await?
            .ok_or_else(|| DatasetError::not_found("Dataset", &request.dataset_name))?;

        let source_language = repo
            .get_language_by_code(&request.source_language)
            .await?
            .ok_or_else(|| DatasetError::not_found("Source language", &request.source_language))?;

        let target_language = repo
            .get_language_by_code(&request.target_language)
            .await?
            .ok_or_else(|| DatasetError::not_found("Target language", &request.target_language))?;

        let translator = repo
            .get_translator_by_name(&request.translator_name)
            .await?
            .ok_or_else(|| DatasetError::not_found("Translator", &request.translator_name))?;

        let source = repo
            .get_dataset_language(dataset.id, source_language.id)
            .await?
            .ok_or_else(|| {
                DatasetError::not_found(
                    "Source dataset language",
                    format!("{} - {}", dataset.name, source_language.name),
                )
            })?;

        Ok(Self {
            dataset,
            source_language,
            target_language,
            translator,
            source,
        })
    }
}

/// Drives one translation run over a resolved request
pub struct DatasetTranslator<'a> {
    repo: &'a Repository,
    translator: &'a dyn TextTranslator,
    options: RunOptions,
}

impl<'a> DatasetTranslator<'a> {
    /// Create a run driver
    pub fn new(repo: &'a Repository, translator: &'a dyn TextTranslator, options: RunOptions) -> Self {
        Self {
            repo,
            translator,
            options,
        }
    }

    /// Translate the records of `resolved.source` not yet present in the target
    pub async fn run(
        &self,
        resolved: &ResolvedRun,
        keys_to_skip: &HashSet<String>,
    ) -> Result<RunSummary, TranslationError> {
        let (target, created) = self
            .repo
            .get_or_create_dataset_language(resolved.dataset.id, resolved.target_language.id)
            .await?;
        if created {
            info!("Created dataset language {}", target);
        }

        let already_done = self.repo.count_records(target.id).await?.max(0) as usize;
        let remaining: Vec<_> = self
            .repo
            .list_records(resolved.source.id)
            .await?
            .into_iter()
            .skip(already_done)
            .collect();

        info!(
            "Translating {} with {}: {} records already done, {} remaining",
            target,
            self.translator.name(),
            already_done,
            remaining.len()
        );

        let mut summary = RunSummary {
            dataset_name: resolved.dataset.name.clone(),
            source_language: resolved.source_language.name.clone(),
            target_language: resolved.target_language.name.clone(),
            already_done,
            records_created: 0,
            fields_translated: 0,
            fields_copied: 0,
            fields_failed: 0,
        };

        let progress_bar = self.create_progress_bar(remaining.len() as u64, &target);

        for source_record in remaining {
            let target_record = self.repo.create_record(target.id).await?;
            let fields = self.repo.list_fields(source_record.id).await?;
            debug!(
                "Record {} -> {} ({} fields)",
                source_record.id,
                target_record.id,
                fields.len()
            );

            for field in &fields {
                let new_field = match self.translate_field(field, resolved, keys_to_skip, &mut summary).await {
                    Ok(new_field) => new_field,
                    Err(e) => {
                        if let Some(pb) = &progress_bar {
                            pb.abandon_with_message("failed");
                        }
                        return Err(e);
                    }
                };
                self.repo.insert_field(target_record.id, new_field).await?;
            }

            summary.records_created += 1;
            if let Some(pb) = &progress_bar {
                pb.inc(1);
            }
        }

        if let Some(pb) = &progress_bar {
            pb.finish_with_message("done");
        }

        info!("{}", summary);
        Ok(summary)
    }

    /// Build the target field for one source field
    async fn translate_field(
        &self,
        field: &FieldRow,
        resolved: &ResolvedRun,
        keys_to_skip: &HashSet<String>,
        summary: &mut RunSummary,
    ) -> Result<NewField, TranslationError> {
        let translator_id = resolved.translator.id;

        if keys_to_skip.contains(&field.key_name) || field.value.is_empty() {
            summary.fields_copied += 1;
            return Ok(NewField::translated_from(field, field.value.clone(), translator_id));
        }

        match self
            .translator
            .translate(&field.value, &resolved.source_language.name, &resolved.target_language.name)
            .await
        {
            Ok(translated) => {
                summary.fields_translated += 1;
                Ok(NewField::translated_from(field, translated, translator_id))
            }
            Err(e) => match self.options.failure_policy {
                FailurePolicy::Abort => {
                    error!("Translation of field {} (key '{}') failed: {}", field.id, field.key_name, e);
                    Err(e.into())
                }
                FailurePolicy::MarkInvalid => {
                    warn!(
                        "Translation of field {} (key '{}') failed, keeping source value: {}",
                        field.id, field.key_name, e
                    );
                    summary.fields_failed += 1;
                    Ok(NewField::failed_translation_of(field))
                }
            },
        }
    }

    fn create_progress_bar(&self, total: u64, target: &DatasetLanguageRecord) -> Option<ProgressBar> {
        let multi_progress = self.options.progress.as_ref()?;

        let progress_bar = multi_progress.add(ProgressBar::new(total));
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} records ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar.set_message(target.to_string());

        Some(progress_bar)
    }
}

/// Translate a dataset with the provider its translator name selects
///
/// Entities and the provider are resolved before anything is written.
pub async fn translate_dataset(
    repo: &Repository,
    config: &TranslationConfig,
    request: &TranslationRequest,
    options: RunOptions,
) -> Result<RunSummary, TranslationError> {
    let resolved = ResolvedRun::resolve(repo, request).await?;
    let provider = TranslationProvider::from_translator_name(&resolved.translator.name)?;
    let translator = build_translator(provider, config)?;

    DatasetTranslator::new(repo, translator.as_ref(), options)
        .run(&resolved, &request.keys_to_skip)
        .await
}

/// Translate a dataset with an already built translator
pub async fn translate_dataset_with(
    repo: &Repository,
    translator: &dyn TextTranslator,
    request: &TranslationRequest,
    options: RunOptions,
) -> Result<RunSummary, TranslationError> {
    let resolved = ResolvedRun::resolve(repo, request).await?;

    DatasetTranslator::new(repo, translator, options)
        .run(&resolved, &request.keys_to_skip)
        .await
}

/// Status line for a finished run
pub fn status_message(result: &Result<RunSummary, TranslationError>) -> String {
    match result {
        Ok(summary) => summary.to_string(),
        Err(e) => format!("Error: {}", e),
    }
}
