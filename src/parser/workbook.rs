//! Workbook Loader
//!
//! calamineを使用して、XLSXドキュメントの先頭ワークシートを
//! メモリ上の`Sheet`モデルに読み込みます。

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use chrono::{NaiveDate, NaiveDateTime};
use std::io::{Cursor, Read};

use crate::error::UnitSheetError;
use crate::formatter::serial_to_datetime;
use crate::security::InputLimits;
use crate::types::{CellValue, Sheet};

/// ワークブックローダー
///
/// calamineのラッパーとして、ドキュメントの読み込みとセル型の変換を行います。
/// 読み込みの失敗は、すべて`UnitSheetError::Read`として呼び出し側に返されます。
pub(crate) struct WorkbookLoader<'a> {
    limits: &'a InputLimits,
}

impl<'a> WorkbookLoader<'a> {
    pub fn new(limits: &'a InputLimits) -> Self {
        Self { limits }
    }

    /// ドキュメントを読み込み、先頭ワークシートを返す
    ///
    /// # 引数
    ///
    /// * `reader` - XLSXドキュメントを読み込むためのリーダー
    ///
    /// # 戻り値
    ///
    /// * `Ok(Sheet)` - 先頭ワークシート
    /// * `Err(UnitSheetError::InputLimit)` - サイズ制限を超えた場合
    /// * `Err(UnitSheetError::Read)` - ドキュメントが壊れている、またはXLSX形式でない場合
    /// * `Err(UnitSheetError::NoSheet)` - ワークシートが存在しない場合
    pub fn load_first_sheet<R: Read>(&self, mut reader: R) -> Result<Sheet, UnitSheetError> {
        // 上限+1バイトまでしか読み込まない
        let mut buffer = Vec::new();
        let bytes_read = reader
            .by_ref()
            .take(self.limits.max_input_file_size.saturating_add(1))
            .read_to_end(&mut buffer)?;
        self.limits.check_input_size(bytes_read as u64)?;

        let mut workbook = match open_workbook_auto_from_rs(Cursor::new(buffer))? {
            Sheets::Xlsx(workbook) => workbook,
            _ => {
                return Err(UnitSheetError::Read(calamine::Error::Msg(
                    "Only XLSX format is supported",
                )))
            }
        };

        let range = workbook
            .worksheet_range_at(0)
            .ok_or(UnitSheetError::NoSheet)?
            .map_err(|e| UnitSheetError::Read(e.into()))?;

        self.range_to_sheet(&range)
    }

    /// calamineの範囲を`Sheet`に変換
    ///
    /// 範囲の開始位置（先頭の空行・空列）を保持し、座標が
    /// ワークシート上の絶対位置と一致するようにします。
    fn range_to_sheet(&self, range: &Range<Data>) -> Result<Sheet, UnitSheetError> {
        let (start_row, start_col) = match range.start() {
            Some(start) => (start.0 as usize, start.1 as usize),
            None => return Ok(Sheet::default()),
        };

        self.limits.check_row_count(start_row + range.height())?;

        let mut rows = Vec::with_capacity(start_row + range.height());
        rows.resize_with(start_row, Vec::new);

        for row in range.rows() {
            let mut cells = Vec::with_capacity(start_col + row.len());
            cells.resize(start_col, CellValue::Empty);
            cells.extend(row.iter().map(convert_cell));
            rows.push(cells);
        }

        Ok(Sheet::from_rows(rows))
    }
}

/// calamineのセル値を`CellValue`に変換
pub(crate) fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            match serial_to_datetime(serial) {
                Some(value) => CellValue::Date(value),
                None => CellValue::Number(serial),
            }
        }
        Data::DateTimeIso(s) => parse_iso_datetime(s)
            .map(CellValue::Date)
            .unwrap_or_else(|| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
        _ => CellValue::Empty,
    }
}

fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_scalar_cells() {
        assert_eq!(convert_cell(&Data::Int(3)), CellValue::Number(3.0));
        assert_eq!(convert_cell(&Data::Float(1.5)), CellValue::Number(1.5));
        assert_eq!(
            convert_cell(&Data::String("SESC - Unidade A".to_string())),
            CellValue::Text("SESC - Unidade A".to_string())
        );
        assert_eq!(convert_cell(&Data::String(String::new())), CellValue::Empty);
        assert_eq!(
            convert_cell(&Data::Bool(true)),
            CellValue::Text("true".to_string())
        );
        assert_eq!(convert_cell(&Data::Empty), CellValue::Empty);
    }

    #[test]
    fn test_convert_iso_datetime() {
        let expected = NaiveDate::from_ymd_opt(2024, 2, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(
            convert_cell(&Data::DateTimeIso("2024-02-01".to_string())),
            CellValue::Date(expected)
        );
        assert_eq!(
            convert_cell(&Data::DateTimeIso("2024-02-01T00:00:00".to_string())),
            CellValue::Date(expected)
        );
        assert_eq!(
            convert_cell(&Data::DateTimeIso("not a date".to_string())),
            CellValue::Text("not a date".to_string())
        );
    }

    #[test]
    fn test_load_rejects_invalid_document() {
        let limits = InputLimits::default();
        let loader = WorkbookLoader::new(&limits);
        let result = loader.load_first_sheet(Cursor::new(b"not a workbook".to_vec()));
        assert!(matches!(result, Err(UnitSheetError::Read(_))));
    }

    #[test]
    fn test_load_rejects_oversized_input() {
        let limits = InputLimits {
            max_input_file_size: 4,
            ..Default::default()
        };
        let loader = WorkbookLoader::new(&limits);
        let result = loader.load_first_sheet(Cursor::new(vec![0u8; 16]));
        assert!(matches!(result, Err(UnitSheetError::InputLimit(_))));
    }
}
