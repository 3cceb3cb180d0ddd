//! Report Composer Module
//!
//! 抽出結果をスタイル付きのXLSXレポートに出力するモジュール。
//!
//! レイアウトは2種類です。
//!
//! - `ReportLayout::Filtered`: ラベルなしの単一グループ。タイトル、メタデータ、表、生成日時
//! - `ReportLayout::Merged`: 複数グループ。グループごとに見出し、メタデータ、表を並べ、
//!   最後に生成日時を1行だけ出力
//!
//! 列幅は表を書き終えた時点で確定し、生成日時の行は列幅の計算に含めません。

mod styles;
mod widths;

use chrono::NaiveDateTime;
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::error::UnitSheetError;
use crate::formatter::{OutputValue, ValueNormalizer};
use crate::types::{Metadata, Record, ReportGroup};

pub(crate) use styles::ReportStyles;
pub(crate) use widths::ColumnWidths;

/// 抽出レポートのシート名（ユニット名が使えない場合）
pub(crate) const FILTERED_SHEET_NAME: &str = "Dados Filtrados";

/// マージレポートのシート名
pub(crate) const MERGED_SHEET_NAME: &str = "Dados Mesclados";

/// 生成日時の表示形式
const TIMESTAMP_FORMAT: &str = "%d/%m/%Y, %H:%M:%S";

/// 結合範囲の最終列（F列）
const WIDE_LAST_COL: u16 = 5;

/// 短い値の結合範囲の最終列（C列）
const NARROW_LAST_COL: u16 = 2;

/// 抽出レポートのメタデータ開始行（3行目）
const FILTERED_METADATA_ROW: u32 = 2;

/// 抽出レポートのヘッダー行（10行目）
const FILTERED_HEADER_ROW: u32 = 9;

/// 最終データ行の次の行から生成日時の行までの間隔
const FOOTER_GAP: u32 = 2;

/// マージレポートのグループ間の間隔
const GROUP_GAP: u32 = 2;

/// メタデータのうち、長さで結合範囲を変える項目（対象）の位置
const SUBJECT_INDEX: usize = 1;

/// 列数の上限（XLSXの最大列数）
const MAX_COLUMNS: usize = 16_384;

/// レポートのレイアウト
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReportLayout {
    /// 単一グループの抽出レポート（見出しなし）
    Filtered,
    /// 複数グループのマージレポート
    Merged,
}

impl ReportLayout {
    /// グループ構成からレイアウトを決定
    ///
    /// ラベルのない単一グループのみ`Filtered`になります。
    pub fn for_groups(groups: &[ReportGroup]) -> Self {
        match groups {
            [group] if group.label.is_none() => ReportLayout::Filtered,
            _ => ReportLayout::Merged,
        }
    }
}

/// レポートの出力オプション
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ReportOptions {
    /// 抽出レポートのタイトル
    pub title: String,
    /// 列幅の上限
    pub max_column_width: usize,
    /// 対象（objeto）の値がこの文字数を超えるとF列まで結合する
    pub wide_merge_threshold: usize,
    /// 生成日時（`None`の場合は現在のローカル時刻）
    pub generated_at: Option<NaiveDateTime>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            title: "RELATÓRIO DE DADOS FILTRADOS".to_string(),
            max_column_width: 50,
            wide_merge_threshold: 50,
            generated_at: None,
        }
    }
}

/// レポートコンポーザー
#[derive(Debug)]
pub(crate) struct ReportComposer<'a> {
    options: &'a ReportOptions,
    normalizer: ValueNormalizer<'a>,
    styles: ReportStyles,
}

impl<'a> ReportComposer<'a> {
    /// 新しいReportComposerインスタンスを生成
    pub fn new(options: &'a ReportOptions, normalizer: ValueNormalizer<'a>) -> Self {
        Self {
            options,
            normalizer,
            styles: ReportStyles::default(),
        }
    }

    /// グループを1つのXLSXドキュメントに出力
    ///
    /// # 引数
    ///
    /// * `groups` - 出力するグループ（この順序で出力）
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<u8>)` - XLSXドキュメントのバイト列
    /// * `Err(UnitSheetError::NothingToExport)` - 全グループのレコードが0件の場合
    /// * `Err(UnitSheetError::Write)` - 書き込みに失敗した場合
    pub fn compose(&self, groups: &[ReportGroup]) -> Result<Vec<u8>, UnitSheetError> {
        let total_records: usize = groups.iter().map(|g| g.records.len()).sum();
        if total_records == 0 {
            return Err(UnitSheetError::NothingToExport);
        }

        let layout = ReportLayout::for_groups(groups);
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        let mut widths = ColumnWidths::new(self.options.max_column_width);

        let footer_row = match layout {
            ReportLayout::Filtered => {
                let group = &groups[0];
                worksheet.set_name(worksheet_name(&group.unit, FILTERED_SHEET_NAME))?;
                self.write_filtered(worksheet, group, &mut widths)?
            }
            ReportLayout::Merged => {
                worksheet.set_name(MERGED_SHEET_NAME)?;
                self.write_merged(worksheet, groups, &mut widths)?
            }
        };

        widths.apply(worksheet)?;
        self.write_footer(worksheet, footer_row)?;

        tracing::info!(
            ?layout,
            groups = groups.len(),
            records = total_records,
            "report composed"
        );

        Ok(workbook.save_to_buffer()?)
    }

    /// 抽出レポートの本体を出力し、生成日時の行番号を返す
    fn write_filtered(
        &self,
        worksheet: &mut Worksheet,
        group: &ReportGroup,
        widths: &mut ColumnWidths,
    ) -> Result<u32, UnitSheetError> {
        let title = self.options.title.as_str();
        worksheet.merge_range(0, 0, 0, WIDE_LAST_COL, title, &self.styles.title)?;
        widths.observe(0, title);

        for (idx, (label, value)) in group.metadata.labeled_fields().into_iter().enumerate() {
            let row = FILTERED_METADATA_ROW + idx as u32;
            let label = format!("{}:", label);
            worksheet.write_string_with_format(row, 0, &label, &self.styles.metadata_label)?;
            widths.observe(0, &label);

            let last_col = if idx == SUBJECT_INDEX {
                self.merge_end(value)
            } else {
                NARROW_LAST_COL
            };
            worksheet.merge_range(row, 1, row, last_col, value, &self.styles.metadata_value)?;
            widths.observe(1, value);
        }

        let next_row = self.write_table(worksheet, FILTERED_HEADER_ROW, &group.records, widths)?;
        Ok(next_row + FOOTER_GAP)
    }

    /// マージレポートの本体を出力し、生成日時の行番号を返す
    ///
    /// レコードが0件のグループは見出しも含めて出力しません。
    fn write_merged(
        &self,
        worksheet: &mut Worksheet,
        groups: &[ReportGroup],
        widths: &mut ColumnWidths,
    ) -> Result<u32, UnitSheetError> {
        let mut row = 0;

        for group in groups.iter().filter(|g| !g.records.is_empty()) {
            let banner = format!(
                "Planilha: {} | Unidade: {}",
                group.label.as_deref().unwrap_or_default(),
                group.unit
            );
            worksheet.merge_range(row, 0, row, WIDE_LAST_COL, &banner, &self.styles.banner)?;
            widths.observe(0, &banner);
            row += 1;

            row = self.write_metadata_lines(worksheet, row, &group.metadata, widths)?;
            row = self.write_table(worksheet, row, &group.records, widths)?;
            row += GROUP_GAP;
        }

        Ok(row)
    }

    /// メタデータを"ラベル: 値"の行として出力し、表のヘッダー行を返す
    fn write_metadata_lines(
        &self,
        worksheet: &mut Worksheet,
        first_row: u32,
        metadata: &Metadata,
        widths: &mut ColumnWidths,
    ) -> Result<u32, UnitSheetError> {
        let fields = metadata.labeled_fields();

        for (idx, (label, value)) in fields.iter().enumerate() {
            let row = first_row + idx as u32;
            let line = format!("{}: {}", label, value);
            let last_col = if idx == SUBJECT_INDEX {
                self.merge_end(&line)
            } else {
                NARROW_LAST_COL
            };
            worksheet.merge_range(row, 0, row, last_col, &line, &self.styles.metadata_line)?;
            widths.observe(0, &line);
        }

        // メタデータの後に空行を1行
        Ok(first_row + fields.len() as u32 + 1)
    }

    /// ヘッダー行とデータ行を出力し、最終データ行の次の行番号を返す
    ///
    /// 列は先頭レコードのキーの順です。
    fn write_table(
        &self,
        worksheet: &mut Worksheet,
        header_row: u32,
        records: &[Record],
        widths: &mut ColumnWidths,
    ) -> Result<u32, UnitSheetError> {
        let columns: Vec<&str> = records
            .first()
            .map(|record| record.keys().collect())
            .unwrap_or_default();
        if columns.len() > MAX_COLUMNS {
            return Err(UnitSheetError::Config(format!(
                "Too many columns: {} (max: {})",
                columns.len(),
                MAX_COLUMNS
            )));
        }

        for (idx, column) in columns.iter().enumerate() {
            let col = idx as u16;
            worksheet.write_string_with_format(header_row, col, *column, &self.styles.header)?;
            widths.observe(col, column);
        }

        for (offset, record) in records.iter().enumerate() {
            let row = header_row + 1 + offset as u32;
            let striped = offset % 2 == 0;

            for (idx, column) in columns.iter().enumerate() {
                let col = idx as u16;
                match self.normalizer.output_value(column, record.get(column)) {
                    OutputValue::Number(n) => {
                        worksheet.write_number_with_format(row, col, n, self.styles.number(striped))?;
                        if n == 0.0 {
                            widths.observe_empty(col);
                        } else {
                            widths.observe(col, &n.to_string());
                        }
                    }
                    OutputValue::Text(text) if text.is_empty() => {
                        worksheet.write_blank(row, col, self.styles.text(striped))?;
                        widths.observe_empty(col);
                    }
                    OutputValue::Text(text) => {
                        worksheet.write_string_with_format(row, col, &text, self.styles.text(striped))?;
                        widths.observe(col, &text);
                    }
                }
            }
        }

        Ok(header_row + 1 + records.len() as u32)
    }

    fn write_footer(&self, worksheet: &mut Worksheet, row: u32) -> Result<(), UnitSheetError> {
        let generated_at = self
            .options
            .generated_at
            .unwrap_or_else(|| chrono::Local::now().naive_local());
        let text = format!("Gerado em: {}", generated_at.format(TIMESTAMP_FORMAT));
        worksheet.merge_range(row, 0, row, WIDE_LAST_COL, &text, &self.styles.footer)?;
        Ok(())
    }

    fn merge_end(&self, text: &str) -> u16 {
        if text.chars().count() > self.options.wide_merge_threshold {
            WIDE_LAST_COL
        } else {
            NARROW_LAST_COL
        }
    }
}

/// Excelのシート名の規則に合わせてユニット名を整える
///
/// 使用できない文字（`[]:*?/\`）は`_`に置き換え、31文字に切り詰めます。
/// 空になる場合、予約名（History）の場合は`fallback`を使用します。
pub(crate) fn worksheet_name(unit: &str, fallback: &str) -> String {
    let cleaned: String = unit
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            other => other,
        })
        .collect();
    let trimmed: String = cleaned
        .trim()
        .trim_matches('\'')
        .chars()
        .take(31)
        .collect();

    if trimmed.trim().is_empty() || trimmed.eq_ignore_ascii_case("history") {
        fallback.to_string()
    } else {
        trimmed
    }
}
