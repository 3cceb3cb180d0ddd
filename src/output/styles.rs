//! Report Styles
//!
//! レポートで使用するセル書式（rust_xlsxwriterの`Format`）をまとめたモジュール。

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, FormatPattern};

/// 数値セルの表示形式（小数点以下2桁、桁区切りあり）
pub(crate) const NUMBER_FORMAT: &str = "#,##0.00";

const TITLE_FILL: u32 = 0xD9D9D9;
const LABEL_FILL: u32 = 0xF2F2F2;
const BANNER_FILL: u32 = 0xE6E6E6;
const HEADER_FILL: u32 = 0x1F4E78;
const STRIPE_FILL: u32 = 0xF9F9F9;
const FOOTER_FONT: u32 = 0x666666;

/// レポートのセル書式一式
#[derive(Debug, Clone)]
pub(crate) struct ReportStyles {
    /// 抽出レポートのタイトル
    pub title: Format,
    /// メタデータのラベルセル
    pub metadata_label: Format,
    /// メタデータの値セル
    pub metadata_value: Format,
    /// マージレポートのグループ見出し
    pub banner: Format,
    /// マージレポートのメタデータ行（"ラベル: 値"）
    pub metadata_line: Format,
    /// 表のヘッダー行
    pub header: Format,
    number: Format,
    number_striped: Format,
    text: Format,
    text_striped: Format,
    /// 生成日時の行
    pub footer: Format,
}

impl Default for ReportStyles {
    fn default() -> Self {
        let number = bordered()
            .set_num_format(NUMBER_FORMAT)
            .set_align(FormatAlign::Right)
            .set_align(FormatAlign::VerticalCenter);
        let text = bordered()
            .set_align(FormatAlign::Left)
            .set_align(FormatAlign::VerticalCenter);

        Self {
            title: Format::new()
                .set_bold()
                .set_font_size(16.0)
                .set_align(FormatAlign::Center)
                .set_background_color(Color::RGB(TITLE_FILL))
                .set_pattern(FormatPattern::Solid),
            metadata_label: bordered()
                .set_bold()
                .set_background_color(Color::RGB(LABEL_FILL))
                .set_pattern(FormatPattern::Solid),
            metadata_value: bordered(),
            banner: Format::new()
                .set_bold()
                .set_font_size(14.0)
                .set_background_color(Color::RGB(BANNER_FILL))
                .set_pattern(FormatPattern::Solid),
            metadata_line: bordered().set_italic(),
            header: bordered()
                .set_bold()
                .set_font_color(Color::White)
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter)
                .set_background_color(Color::RGB(HEADER_FILL))
                .set_pattern(FormatPattern::Solid),
            number_striped: striped(number.clone()),
            number,
            text_striped: striped(text.clone()),
            text,
            footer: Format::new()
                .set_italic()
                .set_font_color(Color::RGB(FOOTER_FONT))
                .set_align(FormatAlign::Right),
        }
    }
}

impl ReportStyles {
    /// 数値セルの書式（偶数行は網掛け）
    pub fn number(&self, striped: bool) -> &Format {
        if striped {
            &self.number_striped
        } else {
            &self.number
        }
    }

    /// 文字列セルの書式（偶数行は網掛け）
    pub fn text(&self, striped: bool) -> &Format {
        if striped {
            &self.text_striped
        } else {
            &self.text
        }
    }
}

fn bordered() -> Format {
    Format::new().set_border(FormatBorder::Thin)
}

fn striped(format: Format) -> Format {
    format
        .set_background_color(Color::RGB(STRIPE_FILL))
        .set_pattern(FormatPattern::Solid)
}
