//! Column Widths
//!
//! 書き込んだセルの表示幅から、列幅を自動調整します。

use rust_xlsxwriter::{Worksheet, XlsxError};
use std::collections::BTreeMap;
use unicode_width::UnicodeWidthStr;

/// 空セルとして数える幅
const EMPTY_CELL_WIDTH: usize = 10;

/// 最長値に加える余白
const PADDING: usize = 2;

/// 列ごとの最大表示幅を記録するトラッカー
#[derive(Debug, Clone)]
pub(crate) struct ColumnWidths {
    max_width: usize,
    widths: BTreeMap<u16, usize>,
}

impl ColumnWidths {
    /// 新しいトラッカーを生成
    ///
    /// # 引数
    ///
    /// * `max_width` - 列幅の上限
    pub fn new(max_width: usize) -> Self {
        Self {
            max_width,
            widths: BTreeMap::new(),
        }
    }

    /// 列に書き込んだ値を記録
    pub fn observe(&mut self, col: u16, text: &str) {
        let width = if text.is_empty() {
            EMPTY_CELL_WIDTH
        } else {
            text.width()
        };
        let entry = self.widths.entry(col).or_insert(0);
        *entry = (*entry).max(width);
    }

    /// 値のないセル（0を含む）を記録
    pub fn observe_empty(&mut self, col: u16) {
        self.observe(col, "");
    }

    /// 列番号と確定した列幅を返す
    pub fn resolved(&self) -> impl Iterator<Item = (u16, usize)> + '_ {
        self.widths
            .iter()
            .map(|(&col, &width)| (col, (width + PADDING).min(self.max_width)))
    }

    /// ワークシートに列幅を設定
    pub fn apply(&self, worksheet: &mut Worksheet) -> Result<(), XlsxError> {
        for (col, width) in self.resolved() {
            worksheet.set_column_width(col, width as f64)?;
        }
        Ok(())
    }
}
