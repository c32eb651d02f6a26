/*!
 * Integration tests for background translation tasks
 */

use anyhow::Result;
use std::collections::HashSet;
use std::sync::Arc;

use dataset_translator::providers::mock::MockTranslator;
use dataset_translator::translation::{wait_all, RunKey, RunOptions, TaskRunner, TranslationRequest};
use crate::common;

async fn runner_with(translator: MockTranslator) -> Result<(TaskRunner, dataset_translator::database::Repository, tempfile::TempDir)> {
    let repo = common::seeded_repo().await?;
    let storage = common::create_temp_dir()?;
    common::import_json(&repo, &storage, "reviews", "en", common::REVIEWS_EN).await?;

    let runner = TaskRunner::with_translator(repo.clone(), Arc::new(translator), RunOptions::default());
    Ok((runner, repo, storage))
}

#[tokio::test]
async fn test_submit_sameTripleThreeTimes_shouldTranslateEachRecordOnce() -> Result<()> {
    let translator = MockTranslator::slow(5);
    let (runner, repo, _storage) = runner_with(translator.clone()).await?;
    let request = TranslationRequest::new("reviews", "en", "fr", "mock").with_skip_keys(["id"]);

    let handles = runner.submit_all(vec![request.clone(), request.clone(), request]);
    let results = wait_all(handles).await;

    let mut created = 0;
    for (_, result) in results {
        created += result?.records_created;
    }
    assert_eq!(created, 3);
    assert_eq!(common::record_count(&repo, "reviews", "fr").await?, 3);
    assert_eq!(translator.call_count(), 5);
    assert!(!runner.locks().is_locked(&RunKey::new("reviews", "en", "fr")));
    assert!(runner.locks().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_submit_differentTargets_shouldBothComplete() -> Result<()> {
    let (runner, repo, _storage) = runner_with(MockTranslator::slow(5)).await?;
    let request = TranslationRequest::new("reviews", "en", "fr", "mock");

    let handles = runner.submit_all(vec![request.clone(), request.for_target("de")]);
    let results = wait_all(handles).await;

    let targets: Vec<String> = results.iter().map(|(request, _)| request.target_language.clone()).collect();
    assert_eq!(targets, vec!["fr", "de"]);
    assert!(results.iter().all(|(_, result)| result.is_ok()));
    assert_eq!(common::record_count(&repo, "reviews", "fr").await?, 3);
    assert_eq!(common::record_count(&repo, "reviews", "de").await?, 3);
    Ok(())
}

#[tokio::test]
async fn test_statusMessage_shouldDescribeOutcome() -> Result<()> {
    let (runner, _repo, _storage) = runner_with(MockTranslator::working()).await?;

    let ok = runner
        .submit(TranslationRequest::new("reviews", "en", "de", "mock"))
        .status_message()
        .await;
    let failed = runner
        .submit(TranslationRequest::new("faq", "en", "de", "mock"))
        .status_message()
        .await;

    assert_eq!(
        ok,
        "Translation completed for dataset reviews from English to German: 3 records created (0 already done)"
    );
    assert_eq!(failed, "Error: Dataset not found: faq");
    Ok(())
}

#[tokio::test]
async fn test_submit_shouldAssignUniqueTaskIds() -> Result<()> {
    let (runner, _repo, _storage) = runner_with(MockTranslator::working()).await?;
    let request = TranslationRequest::new("reviews", "en", "fr", "mock");

    let handles = runner.submit_all((0..4).map(|_| request.clone()));
    let ids: HashSet<_> = handles.iter().map(|handle| handle.id()).collect();

    assert_eq!(ids.len(), 4);
    for (_, result) in wait_all(handles).await {
        result?;
    }
    Ok(())
}
