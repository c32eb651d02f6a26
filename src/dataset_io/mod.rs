/*!
 * JSON dataset files: attachment, import and export.
 */

pub mod exporter;
pub mod importer;

pub use exporter::{render_records, DatasetExporter, ExportDocument};
pub use importer::{field_text, parse_dataset, DatasetImporter, ImportOutcome, ParsedRecord};
