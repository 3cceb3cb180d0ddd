//! Security Module
//!
//! 入力ドキュメントのサイズ制限を実装するモジュール。
//! 想定する入力は数千行程度のドキュメントで、それを大きく超える入力は
//! 抽出前に拒否します。

use crate::error::UnitSheetError;

/// 入力制限の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InputLimits {
    /// 入力ファイルの最大サイズ（バイト）
    /// デフォルト: 64MB (67_108_864 bytes)
    pub max_input_file_size: u64,
    /// シートの最大行数
    /// デフォルト: 100000
    pub max_rows: usize,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            max_input_file_size: 67_108_864, // 64MB
            max_rows: 100_000,
        }
    }
}

impl InputLimits {
    /// 入力サイズを検証
    pub fn check_input_size(&self, bytes: u64) -> Result<(), UnitSheetError> {
        if bytes > self.max_input_file_size {
            return Err(UnitSheetError::InputLimit(format!(
                "Input file size exceeds maximum: {} bytes (max: {} bytes)",
                bytes, self.max_input_file_size
            )));
        }
        Ok(())
    }

    /// シートの行数を検証
    pub fn check_row_count(&self, rows: usize) -> Result<(), UnitSheetError> {
        if rows > self.max_rows {
            return Err(UnitSheetError::InputLimit(format!(
                "Sheet row count exceeds maximum: {} rows (max: {} rows)",
                rows, self.max_rows
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_size_within_limit() {
        let limits = InputLimits::default();
        assert!(limits.check_input_size(1024).is_ok());
        assert!(limits.check_input_size(67_108_864).is_ok());
    }

    #[test]
    fn test_input_size_over_limit() {
        let limits = InputLimits {
            max_input_file_size: 10,
            ..Default::default()
        };
        match limits.check_input_size(11) {
            Err(UnitSheetError::InputLimit(msg)) => assert!(msg.contains("11 bytes")),
            _ => panic!("Expected InputLimit error"),
        }
    }

    #[test]
    fn test_row_count_over_limit() {
        let limits = InputLimits {
            max_rows: 3,
            ..Default::default()
        };
        assert!(limits.check_row_count(3).is_ok());
        assert!(limits.check_row_count(4).is_err());
    }
}
