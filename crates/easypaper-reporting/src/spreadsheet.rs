use easypaper_core::PaperAnalysis;
use rust_xlsxwriter::{Format, Workbook};

use crate::ExportError;

pub const BATCH_EXPORT_FILENAME: &str = "EasyPaper_Batch_Export.xlsx";
pub const SHEET_NAME: &str = "Summaries";

/// Header row. Figures/tables and references are not flattened.
pub const SUMMARY_COLUMNS: [&str; 10] = [
    "Title",
    "Year",
    "Author",
    "Journal",
    "Keywords",
    "Question",
    "Results",
    "Conclusion",
    "Evaluation",
    "Limitations",
];

/// One row per analysis, cells in [`SUMMARY_COLUMNS`] order.
pub fn summary_rows<'a>(analyses: &[&'a PaperAnalysis]) -> Vec<[&'a str; 10]> {
    analyses
        .iter()
        .map(|a| {
            [
                a.basic_info.title.as_str(),
                a.basic_info.year.as_str(),
                a.basic_info.first_author.as_str(),
                a.basic_info.journal.as_str(),
                a.basic_info.keywords.as_str(),
                a.research_question.as_str(),
                a.results.as_str(),
                a.conclusion.as_str(),
                a.evaluation.as_str(),
                a.limitations.as_str(),
            ]
        })
        .collect()
}

/// Single-sheet workbook with a bold header row.
pub fn to_xlsx(analyses: &[&PaperAnalysis]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, name) in SUMMARY_COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &header)?;
    }
    for (row, cells) in summary_rows(analyses).iter().enumerate() {
        for (col, value) in cells.iter().enumerate() {
            sheet.write_string(row as u32 + 1, col as u16, *value)?;
        }
    }
    sheet.set_column_width(0, 40)?;

    Ok(workbook.save_to_buffer()?)
}
