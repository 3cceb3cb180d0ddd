//! Metadata Extractor
//!
//! シート先頭の行からメタデータ（契約番号、対象、交渉、有効期間）を抽出します。
//! ラベル照合と固定座標の2つの戦略をサポートします。

use crate::api::{MetadataCoordinates, MetadataStrategy};
use crate::formatter::DateFormatter;
use crate::types::{CellValue, Metadata, Sheet, METADATA_PLACEHOLDER};

/// メタデータの項目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MetadataField {
    ContractNumber,
    Subject,
    Negotiation,
    StartDate,
    EndDate,
}

impl MetadataField {
    /// すべての項目（出力順）
    pub const ALL: [MetadataField; 5] = [
        MetadataField::ContractNumber,
        MetadataField::Subject,
        MetadataField::Negotiation,
        MetadataField::StartDate,
        MetadataField::EndDate,
    ];

    /// ラベル照合で使用するラベル（小文字）
    pub fn label(self) -> &'static str {
        match self {
            MetadataField::ContractNumber => "número da ata",
            MetadataField::Subject => "objeto",
            MetadataField::Negotiation => "negociação",
            MetadataField::StartDate => "início da vigência",
            MetadataField::EndDate => "final da vigência",
        }
    }

    fn is_date(self) -> bool {
        matches!(self, MetadataField::StartDate | MetadataField::EndDate)
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// メタデータ抽出器
#[derive(Debug)]
pub(crate) struct MetadataExtractor<'a> {
    strategy: &'a MetadataStrategy,
    scan_rows: usize,
}

impl<'a> MetadataExtractor<'a> {
    /// 新しいMetadataExtractorインスタンスを生成
    ///
    /// # 引数
    ///
    /// * `strategy` - 抽出戦略
    /// * `scan_rows` - ラベル照合で走査する先頭行数
    pub fn new(strategy: &'a MetadataStrategy, scan_rows: usize) -> Self {
        Self {
            strategy,
            scan_rows,
        }
    }

    /// シートからメタデータを抽出
    ///
    /// 見つからない項目はプレースホルダーになります。
    /// 開始日・終了日は日付の規則で正規化されます。
    pub fn extract(&self, sheet: &Sheet) -> Metadata {
        let values = match self.strategy {
            MetadataStrategy::LabelScan => self.scan_labels(sheet),
            MetadataStrategy::FixedCoordinates(coords) => Self::read_fixed(sheet, coords),
        };
        build_metadata(values)
    }

    /// ラベル照合で各項目の値を探す
    fn scan_labels<'s>(&self, sheet: &'s Sheet) -> [Option<&'s CellValue>; 5] {
        let mut found: [Option<&CellValue>; 5] = [None; 5];
        let mut found_count = 0;
        let row_bound = self.scan_rows.min(sheet.row_count());

        for (_, row) in sheet.rows().take(row_bound) {
            if found_count == MetadataField::ALL.len() {
                break;
            }

            for (col, cell) in row.iter().enumerate() {
                let Some(text) = cell.as_text() else {
                    continue;
                };
                let text = text.trim().to_lowercase();

                for field in MetadataField::ALL {
                    if found[field.index()].is_some() || !text.starts_with(field.label()) {
                        continue;
                    }
                    // 同じ行で右側にある最初の空でないセルを値とする
                    if let Some(value) = row[col + 1..].iter().find(|c| !c.is_empty()) {
                        found[field.index()] = Some(value);
                        found_count += 1;
                    }
                }
            }
        }

        tracing::debug!(found = found_count, "metadata label scan finished");
        found
    }

    /// 固定座標から各項目の値を読み取る
    fn read_fixed<'s>(sheet: &'s Sheet, coords: &MetadataCoordinates) -> [Option<&'s CellValue>; 5] {
        coords.as_array().map(|coord| {
            let cell = sheet.cell(coord);
            (!cell.is_empty()).then_some(cell)
        })
    }
}

fn build_metadata(values: [Option<&CellValue>; 5]) -> Metadata {
    let [contract_number, subject, negotiation, start_date, end_date] =
        MetadataField::ALL.map(|field| field_text(field, values[field.index()]));

    Metadata {
        contract_number,
        subject,
        negotiation,
        start_date,
        end_date,
    }
}

fn field_text(field: MetadataField, value: Option<&CellValue>) -> String {
    let text = match value {
        Some(cell) if field.is_date() => DateFormatter::format(cell),
        Some(cell) => cell.to_display_string(),
        None => String::new(),
    };
    if text.is_empty() {
        METADATA_PLACEHOLDER.to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellCoord;

    fn text(s: &str) -> CellValue {
        CellValue::from(s)
    }

    fn labelled_sheet() -> Sheet {
        Sheet::from_rows(vec![
            vec![text("RELAÇÃO DE ITENS")],
            vec![text("Número da Ata:"), CellValue::Empty, CellValue::Number(123.0)],
            vec![text("Objeto"), text("Aquisição de mobiliário")],
            vec![text("Negociação"), text("Pregão 45/2024")],
            vec![
                text("Início da Vigência"),
                CellValue::Empty,
                CellValue::Number(45000.0),
            ],
            vec![text("Final da Vigência"), text("até 31/12/2024")],
        ])
    }

    #[test]
    fn test_label_scan_finds_all_fields() {
        let strategy = MetadataStrategy::LabelScan;
        let metadata = MetadataExtractor::new(&strategy, 30).extract(&labelled_sheet());

        assert_eq!(metadata.contract_number, "123");
        assert_eq!(metadata.subject, "Aquisição de mobiliário");
        assert_eq!(metadata.negotiation, "Pregão 45/2024");
        assert_eq!(metadata.start_date, "15/03/2023");
        assert_eq!(metadata.end_date, "31/12/2024");
    }

    #[test]
    fn test_label_scan_missing_fields_use_placeholder() {
        let sheet = Sheet::from_rows(vec![vec![text("Objeto"), text("Cadeiras")]]);
        let strategy = MetadataStrategy::LabelScan;
        let metadata = MetadataExtractor::new(&strategy, 30).extract(&sheet);

        assert_eq!(metadata.subject, "Cadeiras");
        assert_eq!(metadata.contract_number, METADATA_PLACEHOLDER);
        assert_eq!(metadata.start_date, METADATA_PLACEHOLDER);
    }

    #[test]
    fn test_label_without_value_is_not_found() {
        let sheet = Sheet::from_rows(vec![
            vec![text("Objeto"), CellValue::Empty],
            vec![text("Objeto"), text("Segunda ocorrência")],
        ]);
        let strategy = MetadataStrategy::LabelScan;
        let metadata = MetadataExtractor::new(&strategy, 30).extract(&sheet);

        assert_eq!(metadata.subject, "Segunda ocorrência");
    }

    #[test]
    fn test_first_occurrence_wins() {
        let sheet = Sheet::from_rows(vec![
            vec![text("Objeto"), text("Primeiro")],
            vec![text("Objeto"), text("Segundo")],
        ]);
        let strategy = MetadataStrategy::LabelScan;
        let metadata = MetadataExtractor::new(&strategy, 30).extract(&sheet);

        assert_eq!(metadata.subject, "Primeiro");
    }

    #[test]
    fn test_label_scan_respects_row_bound() {
        let mut rows: Vec<Vec<CellValue>> = (0..5).map(|_| vec![CellValue::Empty]).collect();
        rows.push(vec![text("Objeto"), text("fora da janela")]);
        let sheet = Sheet::from_rows(rows);
        let strategy = MetadataStrategy::LabelScan;

        let metadata = MetadataExtractor::new(&strategy, 5).extract(&sheet);
        assert_eq!(metadata.subject, METADATA_PLACEHOLDER);

        let metadata = MetadataExtractor::new(&strategy, 6).extract(&sheet);
        assert_eq!(metadata.subject, "fora da janela");
    }

    #[test]
    fn test_rich_text_value_is_flattened() {
        let sheet = Sheet::from_rows(vec![vec![
            CellValue::RichText(vec!["Obj".to_string(), "eto".to_string()]),
            CellValue::RichText(vec!["Mesas ".to_string(), "e cadeiras".to_string()]),
        ]]);
        let strategy = MetadataStrategy::LabelScan;
        let metadata = MetadataExtractor::new(&strategy, 30).extract(&sheet);

        assert_eq!(metadata.subject, "Mesas e cadeiras");
    }

    #[test]
    fn test_fixed_coordinates() {
        let coords = MetadataCoordinates {
            contract_number: CellCoord::new(1, 2),
            subject: CellCoord::new(2, 1),
            negotiation: CellCoord::new(3, 1),
            start_date: CellCoord::new(4, 2),
            end_date: CellCoord::new(40, 0),
        };
        let strategy = MetadataStrategy::FixedCoordinates(coords);
        let metadata = MetadataExtractor::new(&strategy, 30).extract(&labelled_sheet());

        assert_eq!(metadata.contract_number, "123");
        assert_eq!(metadata.subject, "Aquisição de mobiliário");
        assert_eq!(metadata.start_date, "15/03/2023");
        assert_eq!(metadata.end_date, METADATA_PLACEHOLDER);
    }
}
