/*!
 * Error types for the dataset translator.
 *
 * This module contains custom error types for the different layers of the
 * application, using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Whether retrying the same call later may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed(_) | Self::ConnectionError(_) | Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code, .. } => matches!(status_code, 408 | 429) || *status_code >= 500,
            Self::ParseError(_) | Self::AuthenticationError(_) => false,
        }
    }
}

/// Errors raised by dataset bookkeeping, import and export
#[derive(Error, Debug)]
pub enum DatasetError {
    /// A referenced dataset, language, translator or dataset language is missing
    #[error("{entity} not found: {name}")]
    NotFound {
        /// Kind of entity that was looked up
        entity: &'static str,
        /// Lookup value (name or code)
        name: String,
    },

    /// The translator name does not map to a supported provider
    #[error("Unsupported translation provider: {0}")]
    UnsupportedProvider(String),

    /// Import file is not valid JSON or not an array of objects
    #[error("Malformed dataset file {path}: {reason}")]
    MalformedDataset {
        /// Path of the offending file
        path: String,
        /// What is wrong with it
        reason: String,
    },

    /// File cannot be attached or read
    #[error("Invalid dataset file {path}: {reason}")]
    InvalidFile {
        /// Path of the offending file
        path: String,
        /// What is wrong with it
        reason: String,
    },

    /// A uniquely named entity already exists
    #[error("{entity} already exists: {name}")]
    AlreadyExists {
        /// Kind of entity
        entity: &'static str,
        /// Conflicting value
        name: String,
    },

    /// The dataset language has already been imported
    #[error("Dataset language {0} has already been imported")]
    AlreadyImported(String),

    /// Source and target language of a translation are the same
    #[error("Source and target language are both '{0}'")]
    SameLanguage(String),

    /// Export needs exactly one dataset language
    #[error("Please select only one dataset language for export ({0} selected)")]
    ExportSelection(usize),
}

impl DatasetError {
    /// Shorthand for a `NotFound` error
    pub fn not_found(entity: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound { entity, name: name.into() }
    }
}

/// Errors that can occur during a dataset translation run
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Resolution or validation of the request failed
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// Provider call failed in a way that may succeed on retry
    #[error("Transient provider error: {0}")]
    TransientProvider(ProviderError),

    /// Provider call failed in a way that will not succeed on retry
    #[error("Permanent provider error: {0}")]
    PermanentProvider(ProviderError),

    /// Provider settings are unusable (e.g. missing API key)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Persistence layer failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// The background task running the translation panicked or was cancelled
    #[error("Translation task failed: {0}")]
    Task(String),
}

impl TranslationError {
    /// Whether resubmitting the same run may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientProvider(_))
    }
}

impl From<ProviderError> for TranslationError {
    fn from(error: ProviderError) -> Self {
        if error.is_transient() {
            Self::TransientProvider(error)
        } else {
            Self::PermanentProvider(error)
        }
    }
}

impl From<anyhow::Error> for TranslationError {
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<DatasetError>() {
            Ok(dataset_error) => Self::Dataset(dataset_error),
            Err(error) => Self::Storage(format!("{:#}", error)),
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from dataset bookkeeping, import or export
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<DatasetError>() {
            Ok(dataset_error) => Self::Dataset(dataset_error),
            Err(error) => Self::Unknown(format!("{:#}", error)),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
