//! unitsheet - Unit-segmented spreadsheet record extraction and styled XLSX reports
//!
//! This crate extracts records from spreadsheets whose first worksheet is divided
//! into named units (a marker row such as `SESC - Unidade A`, followed by a header
//! row and data rows), normalizes the values, and composes styled XLSX reports
//! from one or more extraction results.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use unitsheet::ExtractorBuilder;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Create an extractor with default settings
//!     let extractor = ExtractorBuilder::new().build()?;
//!
//!     // Load the first worksheet of the document
//!     let sheet = extractor.open_sheet_from_path("planilha.xlsx")?;
//!
//!     // List the units present in the sheet
//!     for unit in extractor.list_units(&sheet) {
//!         println!("{}", unit);
//!     }
//!
//!     // Export one unit as a styled report
//!     let selector = extractor.selector("SESC - Unidade A");
//!     let report = extractor.export_filtered(&sheet, &selector)?;
//!     std::fs::write(extractor.suggested_file_name(&selector), report)?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # In-memory Sheets
//!
//! The extraction core works on an in-memory [`Sheet`], so callers that already
//! hold cell values can skip the XLSX loader:
//!
//! ```rust
//! use unitsheet::{CellValue, ExtractorBuilder, Sheet, UnitSelector};
//!
//! let row = |cells: &[&str]| cells.iter().map(|s| CellValue::from(*s)).collect::<Vec<_>>();
//! let sheet = Sheet::from_rows(vec![
//!     row(&["SESC - Unidade A"]),
//!     row(&["Item", "Descrição", "Valor"]),
//!     row(&["1", "Cadeira", "150,00"]),
//! ]);
//!
//! let extractor = ExtractorBuilder::new().build().unwrap();
//! let preview = extractor.preview(&sheet, &UnitSelector::All);
//! assert_eq!(preview.header, vec!["Item", "Descrição", "Valor"]);
//! ```
//!
//! # Merging Documents
//!
//! ```rust,no_run
//! use unitsheet::{ExtractorBuilder, MergeInput, UnitSelector, MERGED_FILE_NAME};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let extractor = ExtractorBuilder::new().build()?;
//!
//!     let inputs = vec![
//!         MergeInput {
//!             label: "janeiro.xlsx".to_string(),
//!             unit: UnitSelector::Named("SESC - Unidade A".to_string()),
//!             data: std::fs::read("janeiro.xlsx")?,
//!         },
//!         MergeInput {
//!             label: "fevereiro.xlsx".to_string(),
//!             unit: UnitSelector::All,
//!             data: std::fs::read("fevereiro.xlsx")?,
//!         },
//!     ];
//!
//!     std::fs::write(MERGED_FILE_NAME, extractor.merge(&inputs)?)?;
//!     Ok(())
//! }
//! ```

mod api;
mod builder;
mod error;
mod formatter;
mod output;
mod parser;
mod security;
mod types;

// 公開API
pub use api::{MetadataCoordinates, MetadataStrategy, UnitSelector};
pub use builder::{
    Extractor, ExtractorBuilder, DEFAULT_FOOTER_KEYWORDS, DEFAULT_HEADER_KEYWORDS,
    DEFAULT_METADATA_SCAN_ROWS, DEFAULT_NUMERIC_COLUMNS, DEFAULT_PREVIEW_ROWS,
    DEFAULT_UNIT_PREFIX, DEFAULT_WILDCARD, MERGED_FILE_NAME,
};
pub use error::UnitSheetError;
pub use types::{
    CellCoord, CellValue, ExtractionResult, FieldValue, MergeInput, Metadata, Preview, Record,
    ReportGroup, Sheet, METADATA_PLACEHOLDER,
};
