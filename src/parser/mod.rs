//! Parser Module
//!
//! 入力ドキュメントの読み込みと、メタデータ・ユニット別レコードの抽出を行います。
//! 読み込みはcalamineに委譲し、抽出処理はメモリ上の`Sheet`のみを対象にします。

mod metadata;
mod sections;
mod workbook;

pub(crate) use metadata::MetadataExtractor;
pub(crate) use sections::{SectionParser, SectionRules};
pub(crate) use workbook::WorkbookLoader;
