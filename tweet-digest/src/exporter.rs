use crate::config::Config;
use crate::summarizer::FALLBACK_SUMMARY;
use crate::types::{Dataset, Result};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, FormatUnderline, Url, Workbook};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const SHEET_NAME: &str = "Twitter Summary";
pub const NO_POSTS_TEXT: &str = "暂无推文";

/// Header label and width of every column, left to right.
pub const COLUMNS: [(&str, f64); 9] = [
    ("日期", 12.0),
    ("用户名", 15.0),
    ("显示名称", 18.0),
    ("AI摘要", 50.0),
    ("推文内容", 60.0),
    ("原始链接", 40.0),
    ("点赞数", 10.0),
    ("转发数", 10.0),
    ("发布时间", 18.0),
];

const HEADER_FILL: u32 = 0xC2185B;
const SUMMARY_FILL: u32 = 0xF8BBD0;
const TEXT_COLOR: u32 = 0x1D1D1F;
const LINK_COLOR: u32 = 0x0563C1;
const ROW_HEIGHT: f64 = 30.0;

/// One spreadsheet row: a single post, or a placeholder for an account
/// without posts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRow {
    pub date: String,
    pub username: String,
    pub display_name: String,
    pub ai_summary: String,
    pub text: String,
    pub url: String,
    pub likes: u64,
    pub retweets: u64,
    pub created_at: String,
    /// First row of an account; its summary cell is highlighted.
    pub is_summary_row: bool,
}

/// Lays the dataset out as rows, grouped by account in dataset order.
pub fn build_rows(dataset: &Dataset) -> Vec<SheetRow> {
    let mut rows = Vec::new();

    for account in &dataset.accounts {
        let summary = account.ai_summary.as_deref().unwrap_or(FALLBACK_SUMMARY);
        let base = SheetRow {
            date: dataset.date.clone(),
            username: format!("@{}", account.username),
            display_name: account.display_name.clone(),
            ai_summary: String::new(),
            text: String::new(),
            url: String::new(),
            likes: 0,
            retweets: 0,
            created_at: String::new(),
            is_summary_row: false,
        };

        if account.tweets.is_empty() {
            rows.push(SheetRow {
                ai_summary: summary.to_string(),
                text: NO_POSTS_TEXT.to_string(),
                ..base
            });
            continue;
        }

        for (i, post) in account.tweets.iter().enumerate() {
            let first = i == 0;
            rows.push(SheetRow {
                ai_summary: if first { summary.to_string() } else { String::new() },
                text: post.text.clone(),
                url: post.url.clone(),
                likes: post.likes,
                retweets: post.retweets,
                created_at: post.created_at.clone(),
                is_summary_row: first,
                ..base.clone()
            });
        }
    }

    rows
}

/// `output/<dataset file stem>.xlsx`
pub fn export_path(config: &Config, dataset_path: &Path) -> PathBuf {
    let stem = dataset_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export".to_string());
    config.output_dir.join(format!("{}.xlsx", stem))
}

/// Renders rows into a file.
pub trait SpreadsheetWriter: Send + Sync {
    fn write(&self, rows: &[SheetRow], path: &Path) -> Result<()>;
}

struct Styles {
    header: Format,
    regular_center: Format,
    regular_left: Format,
    regular_wrap: Format,
    summary: Format,
    link: Format,
    count: Format,
}

impl Styles {
    fn new() -> Self {
        let base = Format::new()
            .set_font_name("Arial")
            .set_font_size(10)
            .set_font_color(Color::RGB(TEXT_COLOR))
            .set_border(FormatBorder::Thin)
            .set_align(FormatAlign::Top);

        Self {
            header: Format::new()
                .set_font_name("Arial")
                .set_font_size(11)
                .set_bold()
                .set_font_color(Color::White)
                .set_background_color(Color::RGB(HEADER_FILL))
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter)
                .set_border(FormatBorder::Thin),
            regular_center: base.clone().set_align(FormatAlign::Center),
            regular_left: base.clone().set_align(FormatAlign::Left),
            regular_wrap: base.clone().set_align(FormatAlign::Left).set_text_wrap(),
            summary: base
                .clone()
                .set_align(FormatAlign::Left)
                .set_text_wrap()
                .set_bold()
                .set_background_color(Color::RGB(SUMMARY_FILL)),
            link: base
                .clone()
                .set_align(FormatAlign::Left)
                .set_font_color(Color::RGB(LINK_COLOR))
                .set_underline(FormatUnderline::Single),
            count: base.set_align(FormatAlign::Right).set_num_format("#,##0"),
        }
    }
}

/// Styled `.xlsx` output.
#[derive(Debug, Default)]
pub struct XlsxWriter;

impl XlsxWriter {
    pub fn render(rows: &[SheetRow]) -> Result<Vec<u8>> {
        let styles = Styles::new();
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME)?;

        for (col, (label, width)) in COLUMNS.iter().enumerate() {
            let col = col as u16;
            sheet.write_string_with_format(0, col, *label, &styles.header)?;
            sheet.set_column_width(col, *width)?;
        }
        debug!("Headers written");

        for (i, row) in rows.iter().enumerate() {
            let r = (i + 1) as u32;
            sheet.write_string_with_format(r, 0, &row.date, &styles.regular_center)?;
            sheet.write_string_with_format(r, 1, &row.username, &styles.regular_left)?;
            sheet.write_string_with_format(r, 2, &row.display_name, &styles.regular_left)?;

            let summary_format = if row.is_summary_row && !row.ai_summary.is_empty() {
                &styles.summary
            } else {
                &styles.regular_wrap
            };
            sheet.write_string_with_format(r, 3, &row.ai_summary, summary_format)?;
            sheet.write_string_with_format(r, 4, &row.text, &styles.regular_wrap)?;

            if row.url.is_empty() {
                sheet.write_string_with_format(r, 5, "", &styles.regular_left)?;
            } else {
                sheet.write_url_with_format(r, 5, Url::new(row.url.as_str()), &styles.link)?;
            }

            sheet.write_number_with_format(r, 6, row.likes as f64, &styles.count)?;
            sheet.write_number_with_format(r, 7, row.retweets as f64, &styles.count)?;
            sheet.write_string_with_format(r, 8, &row.created_at, &styles.regular_center)?;
            sheet.set_row_height(r, ROW_HEIGHT)?;
        }

        sheet.set_freeze_panes(1, 0)?;
        debug!("Formatting applied");

        Ok(workbook.save_to_buffer()?)
    }
}

impl SpreadsheetWriter for XlsxWriter {
    fn write(&self, rows: &[SheetRow], path: &Path) -> Result<()> {
        let bytes = Self::render(rows)?;
        interfaces::state::write_atomic(path, &bytes)?;
        info!("Excel file saved to {}", path.display());
        Ok(())
    }
}
