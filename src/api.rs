//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。

use crate::types::CellCoord;

/// 抽出対象ユニットの選択方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitSelector {
    /// すべてのユニット（ワイルドカード）
    ///
    /// メタデータはシート全体から1回だけ抽出され、一致したすべての
    /// セグメントのレコードが行順に連結されます。
    All,

    /// ユニット名指定
    ///
    /// 境界マーカーのテキスト（前後の空白を除去したもの）と完全一致で比較します。
    ///
    /// 例: `UnitSelector::Named("SESC - Unidade A".to_string())`
    Named(String),
}

impl UnitSelector {
    /// テキストから選択方式を生成する
    ///
    /// `wildcard`と完全一致するテキストは`All`になります。
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use unitsheet::UnitSelector;
    ///
    /// assert_eq!(UnitSelector::parse("Todas", "Todas"), UnitSelector::All);
    /// assert_eq!(
    ///     UnitSelector::parse("SESC - Unidade A", "Todas"),
    ///     UnitSelector::Named("SESC - Unidade A".to_string())
    /// );
    /// ```
    pub fn parse(text: &str, wildcard: &str) -> Self {
        if text == wildcard {
            UnitSelector::All
        } else {
            UnitSelector::Named(text.to_string())
        }
    }

    /// 境界マーカーのテキストがこの選択に一致するか
    pub fn matches(&self, marker: &str) -> bool {
        match self {
            UnitSelector::All => true,
            UnitSelector::Named(name) => name == marker,
        }
    }
}

/// メタデータの抽出戦略
///
/// ドキュメントのレイアウトの固さに応じて選択します。
/// 1回の抽出呼び出しの中で2つの戦略が混在することはありません。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum MetadataStrategy {
    /// ラベル照合（デフォルト）
    ///
    /// 先頭の行（デフォルト30行）を走査し、既知のラベルで始まるセルを見つけたら、
    /// 同じ行で右側にある最初の空でないセルを値として採用します。
    #[default]
    LabelScan,

    /// 固定座標
    ///
    /// 5つの項目を指定された座標から直接読み取ります。
    /// 高速ですが、レイアウトのずれに弱い戦略です。
    FixedCoordinates(MetadataCoordinates),
}

/// 固定座標戦略で使用する5項目のセル座標（0始まり）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataCoordinates {
    pub contract_number: CellCoord,
    pub subject: CellCoord,
    pub negotiation: CellCoord,
    pub start_date: CellCoord,
    pub end_date: CellCoord,
}

impl MetadataCoordinates {
    /// 座標を項目順（契約番号、対象、交渉、開始日、終了日）で返す
    pub fn as_array(&self) -> [CellCoord; 5] {
        [
            self.contract_number,
            self.subject,
            self.negotiation,
            self.start_date,
            self.end_date,
        ]
    }
}
