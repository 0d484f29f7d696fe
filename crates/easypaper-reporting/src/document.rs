//! Best-effort PDF export using only the PDF base-14 Courier fonts.
//!
//! Base-14 fonts cover Latin-1 at most. When an analysis contains anything
//! outside that range (CJK text, for instance) the export degrades to a short
//! ASCII preview and a notice pointing at the Markdown and Excel exports.

use easypaper_core::PaperAnalysis;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, StringFormat, dictionary};

use crate::ExportError;
use crate::markdown::{SECTION_TITLES, narrative, section_title};

// A4 in points.
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 50;

/// Courier glyphs are 0.6 em wide: (595 - 2 * 50) / (10 * 0.6).
const BODY_CHARS_PER_LINE: usize = 82;
const HEADING_CHARS_PER_LINE: usize = 68;

pub const TITLE_PREVIEW_CHARS: usize = 50;

pub const DISCLAIMER: [&str; 2] = [
    "Note: this PDF uses a built-in font that cannot display the paper's script.",
    "Please use the Markdown or Excel export for the full summary.",
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Banner(String),
    Heading(String),
    Body(String),
    Blank,
}

impl Line {
    fn font(&self) -> (&'static str, i64) {
        match self {
            Line::Banner(_) => ("F2", 16),
            Line::Heading(_) => ("F2", 12),
            Line::Body(_) | Line::Blank => ("F1", 10),
        }
    }

    fn height(&self) -> i64 {
        match self {
            Line::Banner(_) => 24,
            Line::Heading(_) => 18,
            Line::Body(_) | Line::Blank => 14,
        }
    }

    fn text(&self) -> Option<&str> {
        match self {
            Line::Banner(t) | Line::Heading(t) | Line::Body(t) => Some(t),
            Line::Blank => None,
        }
    }
}

/// Whether every character can be drawn with a base-14 font.
///
/// U+0080..U+009F are excluded: WinAnsiEncoding maps those bytes to other
/// glyphs (the euro sign, curly quotes and so on).
pub fn is_latin1(analysis: &PaperAnalysis) -> bool {
    let info = &analysis.basic_info;
    let fields = [
        &info.title,
        &info.year,
        &info.first_author,
        &info.journal,
        &info.volume_issue,
        &info.keywords,
    ];
    let figures = analysis
        .figures_tables
        .iter()
        .flat_map(|f| [&f.number, &f.title, &f.content]);
    let sections = narrative(analysis);

    fields
        .into_iter()
        .chain(figures)
        .chain(analysis.key_references.iter())
        .map(String::as_str)
        .chain(sections)
        .all(|s| s.chars().all(winansi_safe))
}

fn winansi_safe(c: char) -> bool {
    c <= '\u{7F}' || ('\u{A0}'..='\u{FF}').contains(&c)
}

/// Printable ASCII, everything else replaced by `?`.
pub fn ascii_safe(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
        .collect()
}

/// Render the analysis as a PDF document.
pub fn render(analysis: &PaperAnalysis) -> Result<Vec<u8>, ExportError> {
    let lines = if is_latin1(analysis) {
        full_report(analysis)
    } else {
        tracing::debug!("non Latin-1 text, exporting PDF preview only");
        preview(analysis)
    };
    write_pdf(&lines)
}

fn preview(analysis: &PaperAnalysis) -> Vec<Line> {
    let title: String = analysis
        .basic_info
        .title
        .chars()
        .take(TITLE_PREVIEW_CHARS)
        .collect();

    let mut lines = vec![Line::Banner("EasyPaper Summary".into()), Line::Blank];
    lines.extend(DISCLAIMER.iter().map(|d| Line::Body(d.to_string())));
    lines.push(Line::Blank);
    lines.push(Line::Body(format!("Title: {}...", ascii_safe(&title))));
    lines.push(Line::Body(format!(
        "Year: {}",
        ascii_safe(&analysis.basic_info.year)
    )));
    lines
}

fn full_report(analysis: &PaperAnalysis) -> Vec<Line> {
    let info = &analysis.basic_info;
    let mut lines = vec![Line::Banner("EasyPaper Summary".into()), Line::Blank];

    lines.extend(wrap(&info.title, HEADING_CHARS_PER_LINE).into_iter().map(Line::Heading));
    let meta = [
        format!("Year: {} | First Author: {}", info.year, info.first_author),
        format!("Journal: {} ({})", info.journal, info.volume_issue),
        format!("Keywords: {}", info.keywords),
    ];
    for entry in &meta {
        lines.extend(wrap(entry, BODY_CHARS_PER_LINE).into_iter().map(Line::Body));
    }

    for (i, body) in narrative(analysis).iter().enumerate() {
        lines.push(Line::Blank);
        lines.push(Line::Heading(section_title(analysis, i)));
        lines.extend(wrap(body, BODY_CHARS_PER_LINE).into_iter().map(Line::Body));
    }

    lines.push(Line::Blank);
    lines.push(Line::Heading(SECTION_TITLES[8].into()));
    for figure in &analysis.figures_tables {
        let entry = format!("- {} {}: {}", figure.number, figure.title, figure.content);
        lines.extend(wrap(&entry, BODY_CHARS_PER_LINE).into_iter().map(Line::Body));
    }

    lines.push(Line::Blank);
    lines.push(Line::Heading(SECTION_TITLES[9].into()));
    for reference in &analysis.key_references {
        let entry = format!("- {}", reference);
        lines.extend(wrap(&entry, BODY_CHARS_PER_LINE).into_iter().map(Line::Body));
    }

    lines
}

/// Greedy word wrap on character counts. Words longer than `width` are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut out = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::new();
        let mut len = 0;
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > width {
                if len > 0 {
                    out.push(std::mem::take(&mut line));
                    len = 0;
                }
                let rest = word.split_off(width);
                out.push(word.into_iter().collect());
                word = rest;
            }
            if word.is_empty() {
                continue;
            }
            if len > 0 && len + 1 + word.len() > width {
                out.push(std::mem::take(&mut line));
                len = 0;
            }
            if len > 0 {
                line.push(' ');
                len += 1;
            }
            len += word.len();
            line.extend(word);
        }
        out.push(line);
    }
    out
}

/// Split lines into pages by their rendered height.
fn paginate(lines: &[Line]) -> Vec<&[Line]> {
    let usable = PAGE_HEIGHT - 2 * MARGIN;
    let mut pages = Vec::new();
    let mut start = 0;
    let mut used = 0;
    for (i, line) in lines.iter().enumerate() {
        if used + line.height() > usable && i > start {
            pages.push(&lines[start..i]);
            start = i;
            used = 0;
        }
        used += line.height();
    }
    pages.push(&lines[start..]);
    pages
}

fn latin1_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(c).unwrap_or(b'?'))
        .collect()
}

fn write_pdf(lines: &[Line]) -> Result<Vec<u8>, ExportError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for page in paginate(lines) {
        let mut operations = Vec::new();
        let mut y = PAGE_HEIGHT - MARGIN;
        for line in page {
            y -= line.height();
            let Some(text) = line.text() else {
                continue;
            };
            let (font, size) = line.font();
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec![font.into(), size.into()]));
            operations.push(Operation::new("Td", vec![MARGIN.into(), y.into()]));
            operations.push(Operation::new(
                "Tj",
                vec![Object::String(latin1_bytes(text), StringFormat::Literal)],
            ));
            operations.push(Operation::new("ET", vec![]));
        }

        let content = Content { operations }.encode()?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::analysis;

    fn contains(haystack: &[u8], needle: &str) -> bool {
        haystack
            .windows(needle.len())
            .any(|w| w == needle.as_bytes())
    }

    fn page_count(bytes: &[u8]) -> usize {
        Document::load_mem(bytes).unwrap().get_pages().len()
    }

    #[test]
    fn latin_analysis_renders_full_report() {
        let bytes = render(&analysis("On Computable Numbers")).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        assert!(contains(&bytes, "EasyPaper Summary"));
        assert!(contains(&bytes, "On Computable Numbers"));
        assert!(contains(&bytes, "5. Results"));
        assert!(contains(&bytes, "No decisive objection holds"));
        assert!(!contains(&bytes, "Please use the Markdown"));
        assert_eq!(page_count(&bytes), 1);
    }

    #[test]
    fn cjk_analysis_degrades_to_preview() {
        let mut a = analysis(&"深度学习".repeat(20));
        a.basic_info.year = "2023".into();
        let bytes = render(&a).unwrap();
        assert!(contains(&bytes, "EasyPaper Summary"));
        assert!(contains(&bytes, "Please use the Markdown or Excel export"));
        assert!(contains(&bytes, &format!("Title: {}...", "?".repeat(50))));
        assert!(contains(&bytes, "Year: 2023"));
        assert!(!contains(&bytes, "No decisive objection holds"));
    }

    #[test]
    fn long_report_spans_several_pages() {
        let mut a = analysis("Long");
        a.results = "word ".repeat(6000);
        let bytes = render(&a).unwrap();
        assert!(page_count(&bytes) > 1);
    }

    #[test]
    fn latin1_accents_keep_full_report() {
        let mut a = analysis("Über die Théorie");
        a.basic_info.first_author = "Gödel".into();
        assert!(is_latin1(&a));
        let bytes = render(&a).unwrap();
        assert!(contains(&bytes, "No decisive objection holds"));
    }

    #[test]
    fn c1_controls_fall_back_to_preview() {
        let mut a = analysis("Cost in \u{80} units");
        assert!(!is_latin1(&a));
        a.basic_info.title = "Cost in \u{A3} units".into();
        assert!(is_latin1(&a));
        a.methods = "step\u{9F}two".into();
        let bytes = render(&a).unwrap();
        assert!(contains(&bytes, "Please use the Markdown or Excel export"));
    }

    #[test]
    fn wrap_respects_width() {
        let lines = wrap("alpha beta gamma delta", 11);
        assert_eq!(lines, ["alpha beta", "gamma delta"]);
        let lines = wrap("abcdefghij", 4);
        assert_eq!(lines, ["abcd", "efgh", "ij"]);
        assert!(wrap("one\ntwo", 80).len() == 2);
    }

    #[test]
    fn ascii_safe_replaces_non_ascii() {
        assert_eq!(ascii_safe("Año 深度"), "A?o ??");
    }
}
