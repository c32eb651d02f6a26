/*!
 * Integration tests for attaching, importing and exporting dataset files
 */

use anyhow::Result;
use std::collections::BTreeMap;

use dataset_translator::dataset_io::{DatasetExporter, DatasetImporter};
use dataset_translator::errors::{AppError, DatasetError};
use dataset_translator::file_utils::FileManager;
use crate::common;

#[tokio::test]
async fn test_attach_shouldStoreCopyWithHash() -> Result<()> {
    let repo = common::seeded_repo().await?;
    let dir = common::create_temp_dir()?;
    let source = common::create_test_file(dir.path(), "reviews_en.json", common::REVIEWS_EN)?;
    let importer = DatasetImporter::new(repo.clone(), dir.path().join("stored"));

    let attached = importer.attach("reviews", "en", &source).await?;

    let stored_path = attached.file_path.clone().expect("file should be attached");
    assert!(stored_path.starts_with(&dir.path().join("stored").to_string_lossy().to_string()));
    assert_eq!(attached.file_hash, Some(FileManager::sha256_file(&source)?));
    assert!(!attached.imported);
    assert_eq!(repo.count_records(attached.id).await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_attach_withUnknownLanguage_shouldFailWithoutCreatingDataset() -> Result<()> {
    let repo = common::seeded_repo().await?;
    let dir = common::create_temp_dir()?;
    let source = common::create_test_file(dir.path(), "faq_it.json", "[]")?;
    let importer = DatasetImporter::new(repo.clone(), dir.path());

    let error = importer.attach("faq", "it", &source).await.unwrap_err();

    assert!(matches!(error, AppError::Dataset(DatasetError::NotFound { entity: "Language", .. })));
    assert!(repo.get_dataset_by_name("faq").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_attach_withNonJsonFile_shouldBeInvalidFile() -> Result<()> {
    let repo = common::seeded_repo().await?;
    let dir = common::create_temp_dir()?;
    let source = common::create_test_file(dir.path(), "reviews_en.csv", "id,title")?;
    let importer = DatasetImporter::new(repo, dir.path());

    let error = importer.attach("reviews", "en", &source).await.unwrap_err();

    assert!(matches!(error, AppError::Dataset(DatasetError::InvalidFile { .. })));
    Ok(())
}

#[tokio::test]
async fn test_import_shouldCreateValidRecordsAndRegisterKeys() -> Result<()> {
    let repo = common::seeded_repo().await?;
    let storage = common::create_temp_dir()?;

    let english = common::import_json(&repo, &storage, "reviews", "en", common::REVIEWS_EN).await?;

    assert!(english.imported);
    let records = repo.list_records_with_fields(english.id).await?;
    assert_eq!(records.len(), 3);
    assert!(records.iter().flat_map(|r| &r.fields).all(|f| f.valid && f.translator_id.is_none()));
    assert_eq!(records[0].fields[1].value, "Great phone");

    let keys: Vec<String> = repo.list_keys().await?.into_iter().map(|k| k.name).collect();
    assert_eq!(keys, vec!["body", "id", "title"]);

    Ok(())
}

#[tokio::test]
async fn test_import_twice_shouldBeRefusedWithoutDuplicates() -> Result<()> {
    let repo = common::seeded_repo().await?;
    let storage = common::create_temp_dir()?;
    let english = common::import_json(&repo, &storage, "reviews", "en", common::REVIEWS_EN).await?;
    let importer = DatasetImporter::new(repo.clone(), storage.path());

    let error = importer.import(&english).await.unwrap_err();

    assert!(matches!(error, AppError::Dataset(DatasetError::AlreadyImported(_))));
    assert_eq!(repo.count_records(english.id).await?, 3);
    Ok(())
}

#[tokio::test]
async fn test_import_withObjectTopLevel_shouldLeaveNotImported() -> Result<()> {
    let repo = common::seeded_repo().await?;
    let dir = common::create_temp_dir()?;
    let source = common::create_test_file(dir.path(), "reviews_en.json", r#"{"id": "1"}"#)?;
    let importer = DatasetImporter::new(repo.clone(), dir.path().join("stored"));
    let attached = importer.attach("reviews", "en", &source).await?;

    let error = importer.import(&attached).await.unwrap_err();

    assert!(matches!(error, AppError::Dataset(DatasetError::MalformedDataset { .. })));
    let reloaded = repo.get_dataset_language_by_id(attached.id).await?.unwrap();
    assert!(!reloaded.imported);
    assert_eq!(repo.count_records(attached.id).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_importMany_withOneMalformedFile_shouldImportTheOthers() -> Result<()> {
    let repo = common::seeded_repo().await?;
    let dir = common::create_temp_dir()?;
    let importer = DatasetImporter::new(repo.clone(), dir.path().join("stored"));

    let good = common::create_test_file(dir.path(), "reviews_en.json", common::REVIEWS_EN)?;
    let bad = common::create_test_file(dir.path(), "reviews_fr.json", "[1, 2, 3]")?;
    let english = importer.attach("reviews", "en", &good).await?;
    let french = importer.attach("reviews", "fr", &bad).await?;

    let outcomes = importer.import_many(&[french.clone(), english.clone()]).await;

    assert_eq!(outcomes.len(), 2);
    assert!(matches!(
        &outcomes[0].result,
        Err(AppError::Dataset(DatasetError::MalformedDataset { reason, .. })) if reason == "element 0 is not an object"
    ));
    assert_eq!(outcomes[1].result.as_ref().ok(), Some(&3));
    assert!(repo.get_dataset_language_by_id(english.id).await?.unwrap().imported);
    assert!(!repo.get_dataset_language_by_id(french.id).await?.unwrap().imported);
    Ok(())
}

#[tokio::test]
async fn test_attachDirectory_shouldRegisterFilesByName() -> Result<()> {
    let repo = common::seeded_repo().await?;
    let dir = common::create_temp_dir()?;
    let inbox = dir.path().join("inbox");
    std::fs::create_dir_all(&inbox)?;
    common::create_test_file(&inbox, "faq_en.json", "[]")?;
    common::create_test_file(&inbox, "faq_de.json", "[]")?;
    common::create_test_file(&inbox, "notes.json", "[]")?;
    common::create_test_file(&inbox, "faq_fr.txt", "")?;
    let importer = DatasetImporter::new(repo.clone(), dir.path().join("stored"));

    let outcomes = importer.attach_directory(&inbox).await?;

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|(_, result)| result.is_ok()));
    let codes: Vec<String> = repo
        .list_dataset_languages(Some("faq"), None)
        .await?
        .into_iter()
        .map(|dl| dl.language_code)
        .collect();
    assert_eq!(codes, vec!["de", "en"]);
    Ok(())
}

#[tokio::test]
async fn test_export_shouldUseDatasetAndLanguageInFileName() -> Result<()> {
    let repo = common::seeded_repo().await?;
    let storage = common::create_temp_dir()?;
    let english = common::import_json(&repo, &storage, "reviews", "en", common::REVIEWS_EN).await?;

    let document = DatasetExporter::new(repo.clone()).export_selection(&[english]).await?;
    let path = document.write_to(&storage.path().join("out"))?;

    assert_eq!(document.file_name, "reviews_en.json");
    assert!(path.ends_with("out/reviews_en.json"));
    assert!(document.content.starts_with("[\n    {\n        \"id\": \"1\","));
    Ok(())
}

#[tokio::test]
async fn test_exportThenImport_shouldReproduceKeyValueMaps() -> Result<()> {
    let repo = common::seeded_repo().await?;
    let storage = common::create_temp_dir()?;
    let english = common::import_json(&repo, &storage, "reviews", "en", common::REVIEWS_EN).await?;

    let document = DatasetExporter::new(repo.clone()).export(&english).await?;
    let copy = common::import_json(&repo, &storage, "reviews_copy", "en", &document.content).await?;

    let as_maps = |records: Vec<dataset_translator::database::models::RecordWithFields>| -> Vec<BTreeMap<String, String>> {
        records
            .into_iter()
            .map(|r| r.fields.into_iter().map(|f| (f.key_name, f.value)).collect())
            .collect()
    };
    let original = as_maps(repo.list_records_with_fields(english.id).await?);
    let reimported = as_maps(repo.list_records_with_fields(copy.id).await?);

    assert_eq!(original, reimported);
    Ok(())
}
