//! Builder Module
//!
//! Fluent Builder APIを提供し、`Extractor`インスタンスを段階的に構築する。

use crate::api::{MetadataStrategy, UnitSelector};
use crate::error::UnitSheetError;
use crate::formatter::ValueNormalizer;
use crate::output::{ReportComposer, ReportOptions};
use crate::parser::{MetadataExtractor, SectionParser, SectionRules, WorkbookLoader};
use crate::security::InputLimits;
use crate::types::{ExtractionResult, MergeInput, Metadata, Preview, ReportGroup, Sheet};
use chrono::NaiveDateTime;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

/// ユニット名の接頭辞（デフォルト）
pub const DEFAULT_UNIT_PREFIX: &str = "SESC -";

/// すべてのユニットを表す選択テキスト（デフォルト）
pub const DEFAULT_WILDCARD: &str = "Todas";

/// ヘッダー行のキーワード（デフォルト）
pub const DEFAULT_HEADER_KEYWORDS: [&str; 3] = ["descrição", "item", "código"];

/// フッター行のキーワード（デフォルト）
pub const DEFAULT_FOOTER_KEYWORDS: [&str; 4] =
    ["itens por unidade", "total", "observações", "subtotal"];

/// 数値列の列名（デフォルト）
pub const DEFAULT_NUMERIC_COLUMNS: [&str; 6] = [
    "Valor",
    "Saldo",
    "Inicial",
    "Solicitada",
    "Consumida",
    "Saldo Atual",
];

/// メタデータのラベル照合で走査する行数（デフォルト）
pub const DEFAULT_METADATA_SCAN_ROWS: usize = 30;

/// プレビューのレコード数（デフォルト）
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// マージレポートのファイル名
pub const MERGED_FILE_NAME: &str = "planilhas_mescladas.xlsx";

/// XLSXの最大行数
const MAX_SHEET_ROWS: u32 = 1_048_576;

/// XLSXの最大列数
const MAX_SHEET_COLUMNS: u32 = 16_384;

/// 抽出処理の設定を保持する内部構造体
#[derive(Debug, Clone)]
pub(crate) struct ExtractionConfig {
    /// ユニット名の接頭辞
    pub unit_prefix: String,

    /// すべてのユニットを表す選択テキスト
    pub wildcard: String,

    /// ヘッダー行のキーワード（小文字）
    pub header_keywords: Vec<String>,

    /// フッター行のキーワード（小文字）
    pub footer_keywords: Vec<String>,

    /// 数値列の列名（大文字小文字を区別）
    pub numeric_columns: Vec<String>,

    /// メタデータのラベル照合で走査する行数
    pub metadata_scan_rows: usize,

    /// メタデータの抽出戦略
    pub metadata_strategy: MetadataStrategy,

    /// プレビューのレコード数
    pub preview_rows: usize,

    /// レポートの出力オプション
    pub report: ReportOptions,

    /// 入力制限
    pub limits: InputLimits,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            unit_prefix: DEFAULT_UNIT_PREFIX.to_string(),
            wildcard: DEFAULT_WILDCARD.to_string(),
            header_keywords: to_strings(DEFAULT_HEADER_KEYWORDS),
            footer_keywords: to_strings(DEFAULT_FOOTER_KEYWORDS),
            numeric_columns: to_strings(DEFAULT_NUMERIC_COLUMNS),
            metadata_scan_rows: DEFAULT_METADATA_SCAN_ROWS,
            metadata_strategy: MetadataStrategy::LabelScan,
            preview_rows: DEFAULT_PREVIEW_ROWS,
            report: ReportOptions::default(),
            limits: InputLimits::default(),
        }
    }
}

fn to_strings<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

/// キーワードを比較用に正規化（前後の空白を除去して小文字化、空のものは除外）
fn normalize_keywords(keywords: Vec<String>) -> Vec<String> {
    keywords
        .into_iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Fluent Builder APIを提供する構造体
///
/// `Extractor`インスタンスを段階的に構築するためのビルダーです。
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust
/// use unitsheet::{ExtractorBuilder, MetadataStrategy};
///
/// # fn main() -> Result<(), unitsheet::UnitSheetError> {
/// let extractor = ExtractorBuilder::new()
///     .with_unit_prefix("SESC -")
///     .with_metadata_strategy(MetadataStrategy::LabelScan)
///     .with_preview_rows(10)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ExtractorBuilder {
    /// 内部設定（構築中）
    config: ExtractionConfig,
}

impl Default for ExtractorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractorBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - ユニット名の接頭辞: `"SESC -"`
    /// - ワイルドカード: `"Todas"`
    /// - ヘッダーキーワード: `descrição`, `item`, `código`
    /// - フッターキーワード: `itens por unidade`, `total`, `observações`, `subtotal`
    /// - 数値列: `Valor`, `Saldo`, `Inicial`, `Solicitada`, `Consumida`, `Saldo Atual`
    /// - メタデータ: ラベル照合、先頭30行
    /// - プレビュー: 5件
    /// - レポート: 列幅の上限50、対象の結合しきい値50文字
    pub fn new() -> Self {
        Self {
            config: ExtractionConfig::default(),
        }
    }

    /// ユニット名の接頭辞を指定する
    ///
    /// 前後の空白を除去したセルのテキストがこの接頭辞で始まる行が、
    /// ユニットの境界行になります。
    pub fn with_unit_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.unit_prefix = prefix.into();
        self
    }

    /// すべてのユニットを表す選択テキストを指定する
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use unitsheet::{ExtractorBuilder, UnitSelector};
    ///
    /// let extractor = ExtractorBuilder::new().with_wildcard("*").build().unwrap();
    /// assert_eq!(extractor.selector("*"), UnitSelector::All);
    /// ```
    pub fn with_wildcard(mut self, wildcard: impl Into<String>) -> Self {
        self.config.wildcard = wildcard.into();
        self
    }

    /// ヘッダー行のキーワードを指定する（大文字小文字を区別しない部分一致）
    pub fn with_header_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.header_keywords = to_strings(keywords);
        self
    }

    /// フッター行のキーワードを指定する（大文字小文字を区別しない部分一致）
    pub fn with_footer_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.footer_keywords = to_strings(keywords);
        self
    }

    /// 数値列の列名を指定する（大文字小文字を区別した完全一致）
    pub fn with_numeric_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.numeric_columns = to_strings(columns);
        self
    }

    /// メタデータのラベル照合で走査する行数を指定する
    pub fn with_metadata_scan_rows(mut self, rows: usize) -> Self {
        self.config.metadata_scan_rows = rows;
        self
    }

    /// メタデータの抽出戦略を指定する
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use unitsheet::{CellCoord, ExtractorBuilder, MetadataCoordinates, MetadataStrategy};
    ///
    /// let coords = MetadataCoordinates {
    ///     contract_number: CellCoord::new(1, 2),
    ///     subject: CellCoord::new(2, 2),
    ///     negotiation: CellCoord::new(3, 2),
    ///     start_date: CellCoord::new(4, 2),
    ///     end_date: CellCoord::new(5, 2),
    /// };
    /// let builder = ExtractorBuilder::new()
    ///     .with_metadata_strategy(MetadataStrategy::FixedCoordinates(coords));
    /// ```
    pub fn with_metadata_strategy(mut self, strategy: MetadataStrategy) -> Self {
        self.config.metadata_strategy = strategy;
        self
    }

    /// プレビューのレコード数を指定する
    pub fn with_preview_rows(mut self, rows: usize) -> Self {
        self.config.preview_rows = rows;
        self
    }

    /// 抽出レポートのタイトルを指定する
    pub fn with_report_title(mut self, title: impl Into<String>) -> Self {
        self.config.report.title = title.into();
        self
    }

    /// レポートの列幅の上限を指定する
    pub fn with_max_column_width(mut self, width: usize) -> Self {
        self.config.report.max_column_width = width;
        self
    }

    /// 対象（objeto）の値をF列まで結合する文字数のしきい値を指定する
    pub fn with_wide_merge_threshold(mut self, chars: usize) -> Self {
        self.config.report.wide_merge_threshold = chars;
        self
    }

    /// レポートの生成日時を固定する
    ///
    /// 指定しない場合は、出力時点のローカル時刻が使用されます。
    pub fn with_generated_at(mut self, generated_at: NaiveDateTime) -> Self {
        self.config.report.generated_at = Some(generated_at);
        self
    }

    /// 入力ファイルの最大サイズ（バイト）を指定する
    pub fn with_max_input_size(mut self, bytes: u64) -> Self {
        self.config.limits.max_input_file_size = bytes;
        self
    }

    /// シートの最大行数を指定する
    pub fn with_max_rows(mut self, rows: usize) -> Self {
        self.config.limits.max_rows = rows;
        self
    }

    /// 設定を検証し、`Extractor`インスタンスを生成する
    ///
    /// # 戻り値
    ///
    /// * `Ok(Extractor)`: 設定が有効な場合、Extractorインスタンス
    /// * `Err(UnitSheetError::Config)`: 設定が無効な場合
    ///
    /// # 発生し得るエラー
    ///
    /// * 接頭辞、ワイルドカードが空
    /// * ヘッダー・フッターのキーワードが空
    /// * ラベル照合で走査行数が0
    /// * 列幅の上限が0
    /// * 固定座標がXLSXの範囲外
    pub fn build(mut self) -> Result<Extractor, UnitSheetError> {
        // 1. 接頭辞とワイルドカードの検証
        if self.config.unit_prefix.trim().is_empty() {
            return Err(UnitSheetError::Config(
                "Unit prefix must not be empty".to_string(),
            ));
        }
        if self.config.wildcard.is_empty() {
            return Err(UnitSheetError::Config(
                "Wildcard selector text must not be empty".to_string(),
            ));
        }

        // 2. キーワードの正規化と検証
        self.config.header_keywords = normalize_keywords(self.config.header_keywords);
        self.config.footer_keywords = normalize_keywords(self.config.footer_keywords);
        if self.config.header_keywords.is_empty() {
            return Err(UnitSheetError::Config(
                "Header keywords must not be empty".to_string(),
            ));
        }
        if self.config.footer_keywords.is_empty() {
            return Err(UnitSheetError::Config(
                "Footer keywords must not be empty".to_string(),
            ));
        }

        // 3. メタデータ戦略の検証
        match &self.config.metadata_strategy {
            MetadataStrategy::LabelScan if self.config.metadata_scan_rows == 0 => {
                return Err(UnitSheetError::Config(
                    "Metadata scan rows must be greater than 0".to_string(),
                ));
            }
            MetadataStrategy::FixedCoordinates(coords) => {
                for coord in coords.as_array() {
                    if coord.row >= MAX_SHEET_ROWS || coord.col >= MAX_SHEET_COLUMNS {
                        return Err(UnitSheetError::Config(format!(
                            "Metadata coordinate out of range: ({}, {})",
                            coord.row, coord.col
                        )));
                    }
                }
            }
            _ => {}
        }

        // 4. レポートオプションの検証
        if self.config.report.max_column_width == 0 {
            return Err(UnitSheetError::Config(
                "Maximum column width must be greater than 0".to_string(),
            ));
        }

        Ok(Extractor::new(self.config))
    }
}

/// 抽出処理のファサード
///
/// ユニット別のレコード抽出、プレビュー、レポート生成のメインエントリーポイントです。
/// `ExtractorBuilder`を使用して構築された設定に基づいて処理を実行します。
/// 呼び出しの間で状態を持たないため、複数のスレッドから同時に使用できます。
///
/// # 使用例
///
/// ```rust,no_run
/// use unitsheet::ExtractorBuilder;
///
/// # fn main() -> Result<(), unitsheet::UnitSheetError> {
/// let extractor = ExtractorBuilder::new().build()?;
/// let sheet = extractor.open_sheet_from_path("planilha.xlsx")?;
/// let selector = extractor.selector("SESC - Unidade A");
/// let report = extractor.export_filtered(&sheet, &selector)?;
/// std::fs::write(extractor.suggested_file_name(&selector), report)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Extractor {
    /// 抽出設定
    config: ExtractionConfig,
}

impl Extractor {
    pub(crate) fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    /// XLSXドキュメントの先頭ワークシートを読み込む
    ///
    /// # 引数
    ///
    /// * `input` - XLSXドキュメントを読み込むためのリーダー
    ///
    /// # 戻り値
    ///
    /// * `Ok(Sheet)` - 先頭ワークシート
    /// * `Err(UnitSheetError)` - 読み込みに失敗した場合
    pub fn open_sheet<R: Read>(&self, input: R) -> Result<Sheet, UnitSheetError> {
        WorkbookLoader::new(&self.config.limits).load_first_sheet(input)
    }

    /// ファイルパスからXLSXドキュメントの先頭ワークシートを読み込む
    pub fn open_sheet_from_path<P: AsRef<Path>>(&self, path: P) -> Result<Sheet, UnitSheetError> {
        let file = File::open(path)?;
        self.open_sheet(BufReader::new(file))
    }

    /// 選択テキストを`UnitSelector`に変換
    ///
    /// ワイルドカードのテキストは`UnitSelector::All`になります。
    pub fn selector(&self, text: &str) -> UnitSelector {
        UnitSelector::parse(text, &self.config.wildcard)
    }

    /// シート上のユニット名を重複なしで、ソートして返す
    pub fn list_units(&self, sheet: &Sheet) -> Vec<String> {
        self.section_parser().list_units(sheet)
    }

    /// シート全体からメタデータを抽出
    pub fn extract_metadata(&self, sheet: &Sheet) -> Metadata {
        MetadataExtractor::new(
            &self.config.metadata_strategy,
            self.config.metadata_scan_rows,
        )
        .extract(sheet)
    }

    /// 選択に一致するユニットのメタデータとレコードを抽出
    ///
    /// メタデータはシート全体から1回だけ抽出されます。
    /// 一致するユニットがない場合は、レコードが空の結果を返します（エラーではありません）。
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use unitsheet::{CellValue, ExtractorBuilder, Sheet, UnitSelector};
    ///
    /// let row = |cells: &[&str]| cells.iter().map(|s| CellValue::from(*s)).collect::<Vec<_>>();
    /// let sheet = Sheet::from_rows(vec![
    ///     row(&["SESC - Unidade A"]),
    ///     row(&["Item", "Descrição", "Valor"]),
    ///     row(&["1", "Cadeira", "150,00"]),
    /// ]);
    ///
    /// let extractor = ExtractorBuilder::new().build().unwrap();
    /// let result = extractor.extract(&sheet, &UnitSelector::Named("SESC - Unidade A".into()));
    /// assert_eq!(result.records.len(), 1);
    /// assert_eq!(result.records[0].get("Valor").map(|v| v.to_string()), Some("150".to_string()));
    /// ```
    pub fn extract(&self, sheet: &Sheet, selector: &UnitSelector) -> ExtractionResult {
        ExtractionResult {
            metadata: self.extract_metadata(sheet),
            records: self.section_parser().parse(sheet, selector),
        }
    }

    /// すべてのユニットを、ユニットごとに抽出
    ///
    /// ユニットはシート上で最初に現れた順に並びます。各結果のメタデータは
    /// シート全体から抽出した同じ値です。
    pub fn extract_all(&self, sheet: &Sheet) -> Vec<(String, ExtractionResult)> {
        let metadata = self.extract_metadata(sheet);
        self.section_parser()
            .parse_by_unit(sheet)
            .into_iter()
            .map(|(unit, records)| {
                (
                    unit,
                    ExtractionResult {
                        metadata: metadata.clone(),
                        records,
                    },
                )
            })
            .collect()
    }

    /// 先頭N件のレコードと列名を返す
    pub fn preview(&self, sheet: &Sheet, selector: &UnitSelector) -> Preview {
        let mut records = self.section_parser().parse(sheet, selector);
        records.truncate(self.config.preview_rows);

        let header = records
            .first()
            .map(|record| record.keys().map(str::to_string).collect())
            .unwrap_or_default();

        Preview {
            header,
            rows: records,
        }
    }

    /// プレビューをJSON文字列として返す
    ///
    /// 形式: `{"cabecalho": [列名...], "preview": [レコード...]}`
    pub fn preview_json(&self, sheet: &Sheet, selector: &UnitSelector) -> Result<String, UnitSheetError> {
        Ok(serde_json::to_string(&self.preview(sheet, selector))?)
    }

    /// グループをXLSXレポートに出力
    ///
    /// ラベルのない単一グループは抽出レポート、それ以外はマージレポートになります。
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<u8>)` - XLSXドキュメントのバイト列
    /// * `Err(UnitSheetError::NothingToExport)` - 全グループのレコードが0件の場合
    pub fn compose(&self, groups: &[ReportGroup]) -> Result<Vec<u8>, UnitSheetError> {
        let normalizer = ValueNormalizer::new(&self.config.numeric_columns);
        ReportComposer::new(&self.config.report, normalizer).compose(groups)
    }

    /// 選択に一致するユニットを抽出レポートとして出力
    pub fn export_filtered(&self, sheet: &Sheet, selector: &UnitSelector) -> Result<Vec<u8>, UnitSheetError> {
        let result = self.extract(sheet, selector);
        let group = ReportGroup::new(None, self.unit_label(selector), result);
        self.compose(&[group])
    }

    /// 複数のドキュメントから抽出し、1つのマージレポートに出力
    ///
    /// ドキュメントの読み込みと抽出は並列に行い、出力は入力の順序に従います。
    /// 1つでも読み込めない入力があれば、マージ全体がエラーになります。
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<u8>)` - XLSXドキュメントのバイト列
    /// * `Err(UnitSheetError::Read)` - 読み込めない入力がある場合
    /// * `Err(UnitSheetError::InputLimit)` - 入力制限を超えた入力がある場合
    /// * `Err(UnitSheetError::NothingToExport)` - 全入力のレコードが0件の場合
    pub fn merge(&self, inputs: &[MergeInput]) -> Result<Vec<u8>, UnitSheetError> {
        let mut groups: Vec<(usize, ReportGroup)> = inputs
            .par_iter()
            .enumerate()
            .map(|(idx, input)| -> Result<(usize, ReportGroup), UnitSheetError> {
                let sheet = self.open_sheet(Cursor::new(&input.data)).map_err(|err| {
                    tracing::warn!(label = %input.label, error = %err, "merge input could not be loaded");
                    err
                })?;
                let result = self.extract(&sheet, &input.unit);
                let group = ReportGroup::new(
                    Some(input.label.clone()),
                    self.unit_label(&input.unit),
                    result,
                );
                Ok((idx, group))
            })
            .collect::<Result<Vec<_>, _>>()?;

        // 結果をインデックス順にソート（並列処理の順序を保証）
        groups.sort_by_key(|(idx, _)| *idx);

        let groups: Vec<ReportGroup> = groups.into_iter().map(|(_, group)| group).collect();
        self.compose(&groups)
    }

    /// 抽出レポートのファイル名を返す
    ///
    /// 例: `planilha_filtrada_SESC - Unidade A.xlsx`、すべてのユニットは
    /// ワイルドカードのテキストを使用して`planilha_filtrada_Todas.xlsx`
    pub fn suggested_file_name(&self, selector: &UnitSelector) -> String {
        let unit = match selector {
            UnitSelector::Named(name) if !name.trim().is_empty() => name.trim(),
            _ => self.config.wildcard.as_str(),
        };
        let unit: String = unit
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
            .collect();
        format!("planilha_filtrada_{}.xlsx", unit)
    }

    fn unit_label(&self, selector: &UnitSelector) -> String {
        match selector {
            UnitSelector::All => self.config.wildcard.clone(),
            UnitSelector::Named(name) => name.clone(),
        }
    }

    fn section_parser(&self) -> SectionParser<'_> {
        SectionParser::new(
            SectionRules {
                unit_prefix: &self.config.unit_prefix,
                header_keywords: &self.config.header_keywords,
                footer_keywords: &self.config.footer_keywords,
            },
            ValueNormalizer::new(&self.config.numeric_columns),
        )
    }
}
