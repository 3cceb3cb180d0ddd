//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。
//! 入力シートのモデル（`Sheet` / `CellValue`）と、抽出結果のモデル
//! （`Metadata` / `Record` / `ExtractionResult`）、レポート生成の入力
//! （`ReportGroup` / `MergeInput`）をまとめています。

use chrono::{NaiveDate, NaiveDateTime};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;

use crate::api::UnitSelector;

/// メタデータが存在しない場合のプレースホルダー
pub const METADATA_PLACEHOLDER: &str = "-";

/// 出力セルに使用する日付形式（DD/MM/YYYY）
pub(crate) const DATE_DISPLAY_FORMAT: &str = "%d/%m/%Y";

/// セルの値を表す列挙型
///
/// 入出力層から渡されるシートのセル値です。型は空・文字列・数値・日付の
/// いずれかで、リッチテキストは文字列ランの列として保持し、参照時に連結します。
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// 空セル
    Empty,

    /// 文字列
    Text(String),

    /// リッチテキスト（テキストランの列）
    RichText(Vec<String>),

    /// 数値（f64）
    Number(f64),

    /// 日付（ネイティブの日付値）
    Date(NaiveDateTime),
}

impl CellValue {
    /// 値が空かどうかを判定（空セル、または空文字列）
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            CellValue::RichText(runs) => runs.iter().all(|r| r.is_empty()),
            CellValue::Number(_) | CellValue::Date(_) => false,
        }
    }

    /// 値が空白のみかどうかを判定（前後の空白を除去した結果が空）
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::RichText(runs) => runs.iter().all(|r| r.trim().is_empty()),
            CellValue::Number(_) | CellValue::Date(_) => false,
        }
    }

    /// 文字列型のセルであればテキストを返す
    ///
    /// リッチテキストはランを連結した文字列になります。
    /// 数値・日付・空セルは`None`です。
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            CellValue::Text(s) => Some(Cow::Borrowed(s.as_str())),
            CellValue::RichText(runs) => Some(Cow::Owned(runs.concat())),
            _ => None,
        }
    }

    /// 値を文字列として取得
    ///
    /// - 数値は整数なら小数点なし（`1`）、それ以外は最短表現（`1.5`）
    /// - 日付は`DD/MM/YYYY`
    /// - 空セルは空文字列
    pub fn to_display_string(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::RichText(runs) => runs.concat(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Date(dt) => dt.format(DATE_DISPLAY_FORMAT).to_string(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s)
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(d: NaiveDate) -> Self {
        CellValue::Date(d.and_time(chrono::NaiveTime::MIN))
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(dt: NaiveDateTime) -> Self {
        CellValue::Date(dt)
    }
}

/// セル座標（0始まり）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellCoord {
    pub row: u32,
    pub col: u32,
}

impl CellCoord {
    /// 新しい座標を生成
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// 入力シート
///
/// 行の順序付き列で、各行はセル値の順序付き列です。1リクエストの間だけ
/// 保持される読み取り専用の入力で、抽出処理はこれを変更しません。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    rows: Vec<Vec<CellValue>>,
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl Sheet {
    /// 行データからシートを生成
    pub fn from_rows(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    /// 行数
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// 指定行のセル列を取得（0始まり）
    pub fn row(&self, index: usize) -> Option<&[CellValue]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// 行番号（0始まり）付きで全行を走査
    pub fn rows(&self) -> impl Iterator<Item = (usize, &[CellValue])> {
        self.rows.iter().enumerate().map(|(i, r)| (i, r.as_slice()))
    }

    /// 指定座標のセル値を取得（範囲外は空セル）
    pub fn cell(&self, coord: CellCoord) -> &CellValue {
        self.rows
            .get(coord.row as usize)
            .and_then(|r| r.get(coord.col as usize))
            .unwrap_or(&EMPTY_CELL)
    }
}

/// メタデータ
///
/// ユニットに付随する5つの固定項目です。値が見つからない項目は
/// `METADATA_PLACEHOLDER`で埋められ、`None`や空文字列にはなりません。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    /// 契約番号（ata番号）
    #[serde(rename = "numeroAta")]
    pub contract_number: String,
    /// 対象（objeto）
    #[serde(rename = "objeto")]
    pub subject: String,
    /// 交渉（negociação）
    #[serde(rename = "negociacao")]
    pub negotiation: String,
    /// 有効期間の開始日
    #[serde(rename = "inicioVigencia")]
    pub start_date: String,
    /// 有効期間の終了日
    #[serde(rename = "finalVigencia")]
    pub end_date: String,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            contract_number: METADATA_PLACEHOLDER.to_string(),
            subject: METADATA_PLACEHOLDER.to_string(),
            negotiation: METADATA_PLACEHOLDER.to_string(),
            start_date: METADATA_PLACEHOLDER.to_string(),
            end_date: METADATA_PLACEHOLDER.to_string(),
        }
    }
}

impl Metadata {
    /// レポートに出力するラベルと値の組（固定順）
    pub fn labeled_fields(&self) -> [(&'static str, &str); 5] {
        [
            ("Número da Ata", self.contract_number.as_str()),
            ("Objeto", self.subject.as_str()),
            ("Negociação", self.negotiation.as_str()),
            ("Início Vigência", self.start_date.as_str()),
            ("Final Vigência", self.end_date.as_str()),
        ]
    }
}

/// レコードの正規化済みフィールド値
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// 文字列値
    Text(String),
    /// 数値列の値（常に有限値）
    Number(f64),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

/// 1データ行から生成されたレコード
///
/// 列名から正規化済みの値への対応です。キーの順序は最初に挿入された順で、
/// 同名の列はあとから挿入された値で上書きされます（位置は最初のまま）。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    /// 空のレコードを生成
    pub fn new() -> Self {
        Self::default()
    }

    /// 値を設定する（同名キーは上書き）
    pub fn insert(&mut self, column: impl Into<String>, value: FieldValue) {
        let column = column.into();
        match self.fields.iter_mut().find(|(k, _)| *k == column) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((column, value)),
        }
    }

    /// 列名で値を取得
    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(k, _)| k == column)
            .map(|(_, v)| v)
    }

    /// 列名を挿入順で返す
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// 列名と値の組を挿入順で返す
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v.into());
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// 抽出結果
///
/// 抽出処理の唯一の出力で、呼び出しごとに新しく生成されます。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractionResult {
    pub metadata: Metadata,
    pub records: Vec<Record>,
}

/// プレビュー（先頭N件のレコードと、その列名）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preview {
    /// 先頭レコードの列名（レコードがなければ空）
    #[serde(rename = "cabecalho")]
    pub header: Vec<String>,
    /// 先頭N件のレコード
    #[serde(rename = "preview")]
    pub rows: Vec<Record>,
}

/// レポート生成の入力グループ
///
/// `label`が`None`の単一グループは、バナーなしの抽出レポートとして出力されます。
#[derive(Debug, Clone, PartialEq)]
pub struct ReportGroup {
    /// 入力元の表示名（ファイル名など）
    pub label: Option<String>,
    /// ユニット名
    pub unit: String,
    pub metadata: Metadata,
    pub records: Vec<Record>,
}

impl ReportGroup {
    /// 抽出結果からグループを生成
    pub fn new(label: Option<String>, unit: impl Into<String>, result: ExtractionResult) -> Self {
        Self {
            label,
            unit: unit.into(),
            metadata: result.metadata,
            records: result.records,
        }
    }
}

/// マージ入力（1ドキュメント分）
#[derive(Debug, Clone)]
pub struct MergeInput {
    /// 入力元の表示名（ファイル名など）
    pub label: String,
    /// 抽出対象のユニット
    pub unit: UnitSelector,
    /// XLSXドキュメントのバイト列
    pub data: Vec<u8>,
}
