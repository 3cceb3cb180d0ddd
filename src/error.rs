//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use thiserror::Error;

/// unitsheetクレート全体で使用するエラー型
///
/// ワークブックの読み込み、レコード抽出、レポート生成の各処理で発生する
/// エラーを統一的に扱うために使用されます。
///
/// # エラーの種類
///
/// - `Io`: I/O操作中に発生したエラー
/// - `Read`: ドキュメントの読み込みに失敗したエラー（calamine由来）
/// - `Write`: 出力ワークブックの生成に失敗したエラー（rust_xlsxwriter由来）
/// - `Json`: プレビューのJSONシリアライズに失敗したエラー
/// - `Config`: 設定の検証に失敗したエラー
/// - `NoSheet`: ワークブックにワークシートが存在しない
/// - `NothingToExport`: 出力対象のレコードが1件もない
/// - `InputLimit`: 入力サイズの上限を超えた
///
/// 抽出処理そのものはエラーを返しません。マーカーのないシートや存在しない
/// ユニットは、空のレコード列として扱われます。
#[derive(Error, Debug)]
pub enum UnitSheetError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ドキュメントの読み込みに失敗したエラー
    ///
    /// 破損したファイル、XLSX以外の形式などが原因となります。
    /// 抽出処理は正しく読み込まれたシートを前提とするため、
    /// 構造上の読み込み失敗はすべてこのバリアントに集約されます。
    #[error("Failed to read document: {0}")]
    Read(#[from] calamine::Error),

    /// 出力ワークブックの生成に失敗したエラー
    #[error("Failed to write report: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    /// プレビューのJSONシリアライズに失敗したエラー
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// 設定の検証に失敗したエラー
    ///
    /// `ExtractorBuilder::build()`時に設定を検証し、無効な設定が検出された
    /// 場合に発生します。例えば、ユニット接頭辞が空の場合や、
    /// ヘッダーキーワードが1つも指定されていない場合などです。
    ///
    /// # 例
    ///
    /// ```rust
    /// use unitsheet::{ExtractorBuilder, UnitSheetError};
    ///
    /// let result = ExtractorBuilder::new()
    ///     .with_unit_prefix("")
    ///     .build();
    ///
    /// assert!(matches!(result, Err(UnitSheetError::Config(_))));
    /// ```
    #[error("Configuration error: {0}")]
    Config(String),

    /// ワークブックにワークシートが存在しない
    #[error("Workbook has no worksheet")]
    NoSheet,

    /// 出力対象のレコードが1件もない
    ///
    /// 内部の解析エラーとは区別され、呼び出し側は「エクスポートするデータがない」
    /// 状態として扱うことを想定しています。
    #[error("No data to export")]
    NothingToExport,

    /// 入力サイズの上限を超えた
    #[error("Input limit exceeded: {0}")]
    InputLimit(String),
}
