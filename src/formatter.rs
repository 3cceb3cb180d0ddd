//! Formatter Module
//!
//! セル値の正規化処理を提供するモジュール。
//! 列名が数値列に含まれるかどうかだけで数値／文字列を決定し、
//! セルの検出型には依存しません。

use chrono::{DateTime, NaiveDateTime};
use regex::Regex;
use std::sync::OnceLock;

use crate::types::{CellValue, FieldValue, DATE_DISPLAY_FORMAT};

/// Excelシリアル値とUNIXエポック（1970-01-01）の差（日数）
const UNIX_EPOCH_SERIAL: f64 = 25569.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// 数値列の解析結果
///
/// 解析できない値は0として扱われます。呼び出し側が各分岐を区別できるよう、
/// 結果は名前付きのバリアントで返します。
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NumericOutcome {
    /// 数値として解析できた
    Parsed(f64),
    /// 空セル（0として扱う）
    Blank,
    /// 解析できなかった（0として扱う）
    Unparseable(String),
}

impl NumericOutcome {
    /// 出力に使用する値（常に有限値）
    pub fn value(&self) -> f64 {
        match self {
            NumericOutcome::Parsed(n) => *n,
            NumericOutcome::Blank | NumericOutcome::Unparseable(_) => 0.0,
        }
    }
}

/// 出力セルの型付き値
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum OutputValue {
    /// 数値（小数点以下2桁、右寄せで出力）
    Number(f64),
    /// 文字列（左寄せで出力）
    Text(String),
}

/// 値ノーマライザー
///
/// 数値列の判定は、固定の列名リストに対する大文字小文字を区別した完全一致です。
#[derive(Debug)]
pub(crate) struct ValueNormalizer<'a> {
    numeric_columns: &'a [String],
}

impl<'a> ValueNormalizer<'a> {
    /// 新しいValueNormalizerインスタンスを生成
    pub fn new(numeric_columns: &'a [String]) -> Self {
        Self { numeric_columns }
    }

    /// 列が数値列かどうか
    pub fn is_numeric_column(&self, column: &str) -> bool {
        self.numeric_columns.iter().any(|c| c == column)
    }

    /// レコードに格納する値を生成
    ///
    /// # 引数
    ///
    /// * `column` - 列名
    /// * `raw` - 生のセル値
    ///
    /// # 戻り値
    ///
    /// 数値列なら`FieldValue::Number`、それ以外は文字列表現の`FieldValue::Text`
    pub fn normalize(&self, column: &str, raw: &CellValue) -> FieldValue {
        if self.is_numeric_column(column) {
            let outcome = NumberNormalizer::parse(raw);
            if let NumericOutcome::Unparseable(ref text) = outcome {
                tracing::warn!(column, value = %text, "unparseable numeric value resolved to zero");
            }
            FieldValue::Number(outcome.value())
        } else {
            FieldValue::Text(raw.to_display_string())
        }
    }

    /// レポートのセルに書き込む値を生成
    ///
    /// レコードの値を再度正規化します。列が存在しないレコードは空として扱い、
    /// 数値列では0になります。
    pub fn output_value(&self, column: &str, value: Option<&FieldValue>) -> OutputValue {
        if self.is_numeric_column(column) {
            let n = match value {
                Some(FieldValue::Number(n)) if n.is_finite() => *n,
                Some(FieldValue::Number(_)) | None => 0.0,
                Some(FieldValue::Text(s)) => NumberNormalizer::parse_text(s).value(),
            };
            OutputValue::Number(n)
        } else {
            OutputValue::Text(value.map(|v| v.to_string()).unwrap_or_default())
        }
    }
}

/// 数値ノーマライザー
///
/// 空白を除去し、小数点のカンマをピリオドに変換し、数字・`.`・`-`以外の
/// 文字を取り除いてから解析します。
#[derive(Debug)]
pub(crate) struct NumberNormalizer;

impl NumberNormalizer {
    /// セル値を数値として解析
    pub fn parse(raw: &CellValue) -> NumericOutcome {
        match raw {
            CellValue::Empty => NumericOutcome::Blank,
            CellValue::Number(n) if n.is_finite() => NumericOutcome::Parsed(*n),
            other => Self::parse_text(&other.to_display_string()),
        }
    }

    /// 文字列を数値として解析
    pub fn parse_text(text: &str) -> NumericOutcome {
        if text.is_empty() {
            return NumericOutcome::Blank;
        }

        let cleaned: String = text
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| if c == ',' { '.' } else { c })
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
            .collect();

        if cleaned.is_empty() {
            // 記号だけの値（例: "R$"）は0になる
            return NumericOutcome::Parsed(0.0);
        }

        match cleaned.parse::<f64>() {
            Ok(n) if n.is_finite() => NumericOutcome::Parsed(n),
            _ => NumericOutcome::Unparseable(text.to_string()),
        }
    }
}

/// 日付フォーマッター
///
/// 日付らしい値を`DD/MM/YYYY`形式に変換します。
///
/// - `DD/MM/YYYY`を含む文字列は、その部分をそのまま取り出す
/// - ネイティブの日付値は`DD/MM/YYYY`で出力
/// - 数値はExcelのシリアル日付として、1970-01-01から`serial - 25569`日後に変換
/// - それ以外は文字列表現のまま
#[derive(Debug)]
pub(crate) struct DateFormatter;

impl DateFormatter {
    /// セル値を日付文字列に変換
    pub fn format(raw: &CellValue) -> String {
        match raw {
            CellValue::Empty => String::new(),
            CellValue::Date(dt) => dt.format(DATE_DISPLAY_FORMAT).to_string(),
            CellValue::Number(serial) => match serial_to_datetime(*serial) {
                Some(dt) => dt.format(DATE_DISPLAY_FORMAT).to_string(),
                None => raw.to_display_string(),
            },
            CellValue::Text(_) | CellValue::RichText(_) => {
                let text = raw.to_display_string();
                match date_pattern().find(&text) {
                    Some(m) => m.as_str().to_string(),
                    None => text,
                }
            }
        }
    }
}

/// Excelのシリアル日付値を日時に変換
///
/// 範囲外の値（オーバーフローするシリアル値）は`None`です。
pub(crate) fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let seconds = ((serial - UNIX_EPOCH_SERIAL) * SECONDS_PER_DAY).round();
    if seconds.abs() > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp(seconds as i64, 0).map(|dt| dt.naive_utc())
}

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d{2}/\d{2}/\d{4}").expect("Hardcode regex pattern"))
}
