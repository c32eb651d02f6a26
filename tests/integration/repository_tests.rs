/*!
 * Integration tests for reference data and record management
 */

use anyhow::Result;
use dataset_translator::database::{DatabaseConnection, Repository};
use dataset_translator::errors::DatasetError;
use crate::common;

#[tokio::test]
async fn test_fileDatabase_reopened_shouldKeepData() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let db_path = dir.path().join("nested").join("translator.db");

    {
        let repo = Repository::new(DatabaseConnection::new(&db_path)?);
        repo.create_language("en", "English").await?;
        repo.create_dataset("reviews").await?;
    }

    let repo = Repository::new(DatabaseConnection::new(&db_path)?);
    assert_eq!(repo.list_languages().await?.len(), 1);
    assert!(repo.get_dataset_by_name("reviews").await?.is_some());
    assert!(repo.stats()?.file_size_bytes > 0);

    Ok(())
}

#[tokio::test]
async fn test_createLanguage_withDuplicateCodeOrName_shouldBeRefused() -> Result<()> {
    let repo = common::seeded_repo().await?;

    let by_code = repo.create_language("en", "Anglais").await.unwrap_err();
    assert!(matches!(by_code.downcast_ref::<DatasetError>(), Some(DatasetError::AlreadyExists { .. })));

    let by_name = repo.create_language("eng", "English").await.unwrap_err();
    assert!(matches!(by_name.downcast_ref::<DatasetError>(), Some(DatasetError::AlreadyExists { .. })));

    assert_eq!(repo.list_languages().await?.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_stats_afterImport_shouldCountEverything() -> Result<()> {
    let repo = common::seeded_repo().await?;
    let storage = common::create_temp_dir()?;
    common::import_json(&repo, &storage, "reviews", "en", common::REVIEWS_EN).await?;

    let stats = repo.stats()?;
    assert_eq!(stats.language_count, 3);
    assert_eq!(stats.dataset_count, 1);
    assert_eq!(stats.dataset_language_count, 1);
    assert_eq!(stats.imported_dataset_languages, 1);
    assert_eq!(stats.record_count, 3);
    assert_eq!(stats.field_count, 9);
    assert_eq!(stats.invalid_fields, 0);
    assert_eq!(stats.failed_translations, 0);

    Ok(())
}

#[tokio::test]
async fn test_deleteRecord_shouldLetItBeRetranslated() -> Result<()> {
    let repo = common::seeded_repo().await?;
    let storage = common::create_temp_dir()?;
    let english = common::import_json(&repo, &storage, "reviews", "en", common::REVIEWS_EN).await?;

    let records = repo.list_records(english.id).await?;
    assert!(repo.delete_record(records[2].id).await?);

    assert_eq!(repo.count_records(english.id).await?, 2);
    assert_eq!(repo.stats()?.field_count, 6);
    Ok(())
}
