use anyhow::{Result, Context};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::errors::DatasetError;

// @module: File and directory utilities

/// Extension accepted for dataset files
pub const DATASET_EXTENSION: &str = "json";

/// A dataset file copied into the storage directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Location inside the storage directory
    pub path: PathBuf,
    /// Hex SHA-256 of the content
    pub hash: String,
}

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Find files with a specific extension in a directory, sorted by path
    pub fn find_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();
        let normalized_ext = extension.trim_start_matches('.');

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() && Self::has_extension(path, normalized_ext) {
                result.push(path.to_path_buf());
            }
        }

        result.sort();
        Ok(result)
    }

    /// Whether `path` ends in `.extension`, ignoring case
    pub fn has_extension<P: AsRef<Path>>(path: P, extension: &str) -> bool {
        path.as_ref()
            .extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension.trim_start_matches('.')))
            .unwrap_or(false)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                Self::ensure_dir(parent)?;
            }
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Copy a file from one location to another, ensuring the target directory exists
    pub fn copy_file<P1: AsRef<Path>, P2: AsRef<Path>>(from: P1, to: P2) -> Result<()> {
        let from = from.as_ref();
        let to = to.as_ref();

        if !from.exists() {
            return Err(anyhow::anyhow!("Source file does not exist: {:?}", from));
        }

        // Ensure the target directory exists
        if let Some(parent) = to.parent() {
            Self::ensure_dir(parent)?;
        }

        fs::copy(from, to)
            .with_context(|| format!("Failed to copy {:?} to {:?}", from, to))?;

        Ok(())
    }

    /// Hex SHA-256 of a file's content
    pub fn sha256_file<P: AsRef<Path>>(path: P) -> Result<String> {
        let path = path.as_ref();
        let mut file = fs::File::open(path)
            .with_context(|| format!("Failed to open file: {:?}", path))?;

        let mut hasher = Sha256::new();
        let mut buffer = [0u8; 8192];
        loop {
            let read = file.read(&mut buffer)
                .with_context(|| format!("Failed to read file: {:?}", path))?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }

        Ok(hasher
            .finalize()
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect())
    }

    /// Copy a `.json` dataset file into `storage_dir` under a hash-suffixed name
    ///
    /// The same content always lands on the same stored path.
    pub fn store_dataset_file<P1: AsRef<Path>, P2: AsRef<Path>>(source: P1, storage_dir: P2) -> Result<StoredFile> {
        let source = source.as_ref();

        if !Self::has_extension(source, DATASET_EXTENSION) {
            return Err(DatasetError::InvalidFile {
                path: source.display().to_string(),
                reason: "only .json files can be attached".to_string(),
            }
            .into());
        }
        if !Self::file_exists(source) {
            return Err(DatasetError::InvalidFile {
                path: source.display().to_string(),
                reason: "file does not exist".to_string(),
            }
            .into());
        }

        let hash = Self::sha256_file(source)?;
        let stem = source
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| "dataset".to_string());
        let stored_path = storage_dir
            .as_ref()
            .join(format!("{}_{}.{}", stem, &hash[..12], DATASET_EXTENSION));

        if !Self::file_exists(&stored_path) {
            Self::copy_file(source, &stored_path)?;
        }

        Ok(StoredFile { path: stored_path, hash })
    }

    /// Split a `{dataset}_{code}.json` file name into dataset name and language code
    pub fn parse_dataset_file_name<P: AsRef<Path>>(path: P) -> Option<(String, String)> {
        let path = path.as_ref();
        if !Self::has_extension(path, DATASET_EXTENSION) {
            return None;
        }

        let stem = path.file_stem()?.to_string_lossy().to_string();
        let (dataset, code) = stem.rsplit_once('_')?;
        if dataset.is_empty() || code.is_empty() {
            return None;
        }

        Some((dataset.to_string(), code.to_string()))
    }
}
