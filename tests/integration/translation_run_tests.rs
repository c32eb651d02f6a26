/*!
 * Integration tests for translation runs against the mock translator
 */

use anyhow::Result;
use std::collections::HashSet;

use dataset_translator::app_config::{FailurePolicy, TranslationConfig};
use dataset_translator::database::Repository;
use dataset_translator::errors::{DatasetError, TranslationError};
use dataset_translator::providers::mock::MockTranslator;
use dataset_translator::translation::{translate_dataset, translate_dataset_with, RunOptions, TranslationRequest};
use crate::common;

const REVIEWS_FR_PARTIAL: &str = r#"[
    {"id": "1", "title": "Super téléphone", "body": "La batterie tient deux jours."}
]"#;

async fn repo_with_reviews() -> Result<(Repository, tempfile::TempDir)> {
    let repo = common::seeded_repo().await?;
    let storage = common::create_temp_dir()?;
    common::import_json(&repo, &storage, "reviews", "en", common::REVIEWS_EN).await?;
    Ok((repo, storage))
}

fn reviews_request(target: &str) -> TranslationRequest {
    TranslationRequest::new("reviews", "en", target, "mock").with_skip_keys(["id"])
}

#[tokio::test]
async fn test_translate_withPartialTarget_shouldOnlyTranslateMissingRecords() -> Result<()> {
    let (repo, storage) = repo_with_reviews().await?;
    common::import_json(&repo, &storage, "reviews", "fr", REVIEWS_FR_PARTIAL).await?;
    let translator = MockTranslator::working();

    let summary = translate_dataset_with(&repo, &translator, &reviews_request("fr"), RunOptions::default()).await?;

    assert_eq!(summary.already_done, 1);
    assert_eq!(summary.records_created, 2);
    assert_eq!(summary.fields_translated, 3);
    assert_eq!(summary.fields_copied, 3);
    assert_eq!(translator.received_texts(), vec!["Meh", "Broken screen", "Arrived cracked."]);
    assert_eq!(common::record_count(&repo, "reviews", "fr").await?, 3);
    assert_eq!(
        summary.to_string(),
        "Translation completed for dataset reviews from English to French: 2 records created (1 already done)"
    );

    let french = &repo.list_dataset_languages(Some("reviews"), Some("fr")).await?[0];
    let records = repo.list_records_with_fields(french.id).await?;
    let last: Vec<&str> = records[2].fields.iter().map(|f| f.value.as_str()).collect();
    assert_eq!(last, vec!["3", "[French] Broken screen", "[French] Arrived cracked."]);

    Ok(())
}

#[tokio::test]
async fn test_translate_twice_shouldBeIdempotent() -> Result<()> {
    let (repo, _storage) = repo_with_reviews().await?;
    let translator = MockTranslator::working();

    let first = translate_dataset_with(&repo, &translator, &reviews_request("fr"), RunOptions::default()).await?;
    let calls_after_first = translator.call_count();
    let second = translate_dataset_with(&repo, &translator, &reviews_request("fr"), RunOptions::default()).await?;

    assert_eq!(first.records_created, 3);
    assert_eq!(second.records_created, 0);
    assert_eq!(second.already_done, 3);
    assert_eq!(translator.call_count(), calls_after_first);
    assert_eq!(common::record_count(&repo, "reviews", "fr").await?, 3);
    Ok(())
}

#[tokio::test]
async fn test_translate_afterInterruption_shouldResumeWithoutDuplicates() -> Result<()> {
    let (repo, _storage) = repo_with_reviews().await?;

    // title and body of the first review go through, "Meh" fails
    let flaky = MockTranslator::fail_after(2);
    let error = translate_dataset_with(&repo, &flaky, &reviews_request("fr"), RunOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(error, TranslationError::TransientProvider(_)));
    assert!(error.is_retryable());
    assert_eq!(common::record_count(&repo, "reviews", "fr").await?, 2);

    let summary = translate_dataset_with(&repo, &MockTranslator::working(), &reviews_request("fr"), RunOptions::default()).await?;
    assert_eq!(summary.already_done, 2);
    assert_eq!(summary.records_created, 1);

    let french = &repo.list_dataset_languages(Some("reviews"), Some("fr")).await?[0];
    let source_ids: Vec<i64> = repo
        .list_records_with_fields(french.id)
        .await?
        .into_iter()
        .flat_map(|r| r.fields)
        .filter_map(|f| f.source_field_id)
        .collect();
    let unique: HashSet<i64> = source_ids.iter().copied().collect();
    assert_eq!(unique.len(), source_ids.len());
    assert_eq!(common::record_count(&repo, "reviews", "fr").await?, 3);

    Ok(())
}

#[tokio::test]
async fn test_translate_shouldRecordProvenanceOnEveryField() -> Result<()> {
    let (repo, _storage) = repo_with_reviews().await?;
    let translator = MockTranslator::working();

    translate_dataset_with(&repo, &translator, &reviews_request("de"), RunOptions::default()).await?;

    let english = &repo.list_dataset_languages(Some("reviews"), Some("en")).await?[0];
    let german = &repo.list_dataset_languages(Some("reviews"), Some("de")).await?[0];
    let mock_id = repo.get_translator_by_name("mock").await?.unwrap().id;

    let source_records = repo.list_records_with_fields(english.id).await?;
    let target_records = repo.list_records_with_fields(german.id).await?;

    for (source, target) in source_records.iter().zip(&target_records) {
        assert_eq!(source.fields.len(), target.fields.len());
        for (source_field, target_field) in source.fields.iter().zip(&target.fields) {
            assert_eq!(target_field.source_field_id, Some(source_field.id));
            assert_eq!(target_field.translator_id, Some(mock_id));
            assert_eq!(target_field.key_id, source_field.key_id);
            assert!(!target_field.valid);
            if source_field.key_name == "id" {
                assert_eq!(target_field.value, source_field.value);
            }
        }
    }

    Ok(())
}

#[tokio::test]
async fn test_translate_withEmptyValues_shouldNotCallTranslator() -> Result<()> {
    let (repo, _storage) = repo_with_reviews().await?;
    let translator = MockTranslator::working();

    translate_dataset_with(&repo, &translator, &reviews_request("fr"), RunOptions::default()).await?;

    assert!(translator.received_texts().iter().all(|text| !text.is_empty()));
    assert_eq!(translator.call_count(), 5);
    Ok(())
}

#[tokio::test]
async fn test_translate_withUnknownEntities_shouldNotCreateTarget() -> Result<()> {
    let (repo, _storage) = repo_with_reviews().await?;
    let translator = MockTranslator::working();

    let cases = [
        (TranslationRequest::new("faq", "en", "fr", "mock"), "Dataset"),
        (TranslationRequest::new("reviews", "xx", "fr", "mock"), "Source language"),
        (TranslationRequest::new("reviews", "en", "xx", "mock"), "Target language"),
        (TranslationRequest::new("reviews", "en", "fr", "deepl"), "Translator"),
        (TranslationRequest::new("reviews", "de", "fr", "mock"), "Source dataset language"),
    ];

    for (request, expected_entity) in cases {
        let error = translate_dataset_with(&repo, &translator, &request, RunOptions::default())
            .await
            .unwrap_err();
        match error {
            TranslationError::Dataset(DatasetError::NotFound { entity, .. }) => assert_eq!(entity, expected_entity),
            other => panic!("unexpected error for {:?}: {other:?}", request),
        }
    }

    assert!(repo.list_dataset_languages(Some("reviews"), Some("fr")).await?.is_empty());
    assert_eq!(translator.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_translate_toSameLanguage_shouldBeRefused() -> Result<()> {
    let (repo, _storage) = repo_with_reviews().await?;

    let error = translate_dataset_with(
        &repo,
        &MockTranslator::working(),
        &TranslationRequest::new("reviews", "en", "en", "mock"),
        RunOptions::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(error, TranslationError::Dataset(DatasetError::SameLanguage(_))));
    Ok(())
}

#[tokio::test]
async fn test_translateDataset_withUnsupportedProvider_shouldNotCreateTarget() -> Result<()> {
    let (repo, _storage) = repo_with_reviews().await?;

    let error = translate_dataset(&repo, &TranslationConfig::default(), &reviews_request("de"), RunOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(error, TranslationError::Dataset(DatasetError::UnsupportedProvider(_))));
    assert!(repo.list_dataset_languages(Some("reviews"), Some("de")).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_translateDataset_withoutApiKey_shouldBeConfigurationError() -> Result<()> {
    let (repo, _storage) = repo_with_reviews().await?;
    let request = TranslationRequest::new("reviews", "en", "fr", "openai");

    let error = translate_dataset(&repo, &TranslationConfig::default(), &request, RunOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(error, TranslationError::Configuration(_)));
    assert!(repo.list_dataset_languages(Some("reviews"), Some("fr")).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_translate_markInvalid_shouldKeepSourceValues() -> Result<()> {
    let (repo, _storage) = repo_with_reviews().await?;
    let options = RunOptions::default().with_failure_policy(FailurePolicy::MarkInvalid);

    let summary = translate_dataset_with(&repo, &MockTranslator::failing(false), &reviews_request("fr"), options).await?;

    assert_eq!(summary.records_created, 3);
    assert_eq!(summary.fields_failed, 5);
    assert!(summary.to_string().ends_with(", 5 fields could not be translated and were marked invalid"));

    let english = &repo.list_dataset_languages(Some("reviews"), Some("en")).await?[0];
    let french = &repo.list_dataset_languages(Some("reviews"), Some("fr")).await?[0];
    let values = |records: Vec<dataset_translator::database::models::RecordWithFields>| -> Vec<String> {
        records.into_iter().flat_map(|r| r.fields).map(|f| f.value).collect()
    };
    assert_eq!(
        values(repo.list_records_with_fields(french.id).await?),
        values(repo.list_records_with_fields(english.id).await?)
    );
    assert_eq!(repo.stats()?.failed_translations, 5);
    Ok(())
}

#[tokio::test]
async fn test_translate_markInvalid_shouldTellFailedFieldsApart() -> Result<()> {
    let (repo, _storage) = repo_with_reviews().await?;
    let options = RunOptions::default().with_failure_policy(FailurePolicy::MarkInvalid);

    // both fields of the first review go through, every later call fails
    let summary = translate_dataset_with(&repo, &MockTranslator::fail_after(2), &reviews_request("fr"), options).await?;

    assert_eq!(summary.records_created, 3);
    assert_eq!(summary.fields_translated, 2);
    assert_eq!(summary.fields_copied, 4);
    assert_eq!(summary.fields_failed, 3);

    let mock_id = repo.get_translator_by_name("mock").await?.unwrap().id;
    let french = &repo.list_dataset_languages(Some("reviews"), Some("fr")).await?[0];
    let fields: Vec<_> = repo
        .list_records_with_fields(french.id)
        .await?
        .into_iter()
        .flat_map(|r| r.fields)
        .collect();

    let failed: Vec<(&str, &str)> = fields
        .iter()
        .filter(|f| f.is_failed_translation())
        .map(|f| (f.key_name.as_str(), f.value.as_str()))
        .collect();
    assert_eq!(failed, vec![("title", "Meh"), ("title", "Broken screen"), ("body", "Arrived cracked.")]);
    assert!(fields.iter().filter(|f| f.is_failed_translation()).all(|f| f.translator_id.is_none() && !f.valid));

    let translated = &fields[1];
    assert_eq!(translated.value, "[French] Great phone");
    assert_eq!(translated.translator_id, Some(mock_id));
    assert!(!translated.is_failed_translation());
    assert!(fields.iter().all(|f| f.source_field_id.is_some()));

    assert_eq!(repo.stats()?.failed_translations, 3);
    Ok(())
}

#[tokio::test]
async fn test_translate_abortOnPermanentFailure_shouldNotBeRetryable() -> Result<()> {
    let (repo, _storage) = repo_with_reviews().await?;

    let error = translate_dataset_with(&repo, &MockTranslator::failing(false), &reviews_request("fr"), RunOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(error, TranslationError::PermanentProvider(_)));
    assert!(!error.is_retryable());
    Ok(())
}
