/*!
 * Database module for persistent storage of datasets and their translations.
 *
 * This module provides SQLite-based persistence for:
 * - Reference data (languages, datasets, translators, the key registry)
 * - Dataset languages and their attached files
 * - Records and fields, including translation provenance
 */

pub mod schema;
pub mod connection;
pub mod repository;
pub mod models;

// Re-export main types
pub use connection::{DatabaseConnection, DatabaseStats};
pub use repository::Repository;
