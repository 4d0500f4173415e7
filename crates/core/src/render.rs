use std::path::{Path, PathBuf};

use crate::protocol::SearchRequest;
use crate::source::SourceFile;
use crate::window::ContextWindow;

const NUMBER_WIDTH: usize = 4;
const GAP_WIDTH: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLine {
    pub text: String,
    pub is_gap_marker: bool,
    pub is_file_header: bool,
    pub source_file: Option<PathBuf>,
    pub source_line: Option<usize>,
}

impl RenderedLine {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_gap_marker: false,
            is_file_header: false,
            source_file: None,
            source_line: None,
        }
    }

    fn file_header(file: &Path) -> Self {
        Self {
            text: format!("{}:", file.display()),
            is_file_header: true,
            source_file: Some(file.to_path_buf()),
            ..Self::plain("")
        }
    }

    fn gap_marker(next_line: usize) -> Self {
        let digits = digit_count(next_line);
        Self {
            text: format!(
                "{}{}",
                " ".repeat(GAP_WIDTH.saturating_sub(digits)),
                ".".repeat(digits)
            ),
            is_gap_marker: true,
            ..Self::plain("")
        }
    }

    fn content(file: &Path, number: usize, text: &str, is_match: bool) -> Self {
        Self {
            text: format_content_line(number, text, is_match),
            source_file: Some(file.to_path_buf()),
            source_line: Some(number),
            ..Self::plain("")
        }
    }

    pub fn is_content(&self) -> bool {
        self.source_line.is_some()
    }
}

/// Byte range of an identifier occurrence within `lines[line]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightSpan {
    pub line: usize,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedDocument {
    pub lines: Vec<RenderedLine>,
    pub highlights: Vec<HighlightSpan>,
    /// Regex-escaped identifier for presentation layers that search by pattern.
    pub highlight_pattern: String,
    pub file_count: usize,
    pub match_count: usize,
}

impl RenderedDocument {
    pub fn line_texts(&self) -> Vec<String> {
        self.lines.iter().map(|l| l.text.clone()).collect()
    }

    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A window paired with the source it was built from.
#[derive(Debug, Clone)]
pub struct FileContext {
    pub window: ContextWindow,
    pub source: SourceFile,
}

impl FileContext {
    pub fn new(source: SourceFile, line_numbers: &[usize]) -> Self {
        let window =
            crate::window::build(source.path.clone(), line_numbers, source.line_count());
        Self { window, source }
    }
}

/// Builds the results document, shaped like this (context abridged):
///
/// ```text
/// Matched 2 files for foo
///
/// /x/a.go:
///    3  let a = 1;
///    5: foo(a)
///   ...
///  120: foo(b)
///
/// /x/b.go:
///    1: foo()
/// 3 matches across 2 file(s)
/// ```
///
/// File headers are `{path}:` with nothing else on the line; the navigator
/// relies on that shape. Content lines always start with the padded line
/// number.
pub fn render(query: &SearchRequest, files: &[FileContext]) -> RenderedDocument {
    let file_count = files.len();
    let match_count: usize = files.iter().map(|f| f.window.match_count()).sum();

    let mut lines = vec![RenderedLine::plain(format!(
        "Matched {file_count} files for {}",
        query.identifier
    ))];

    for ctx in files {
        let window = &ctx.window;
        lines.push(RenderedLine::plain(""));
        lines.push(RenderedLine::file_header(&window.file));

        let mut previous: Option<usize> = None;
        for &number in &window.lines {
            if previous.is_some_and(|prev| number > prev + 1) {
                lines.push(RenderedLine::gap_marker(number));
            }
            previous = Some(number);

            let text = ctx.source.line(number).unwrap_or_default();
            lines.push(RenderedLine::content(
                &window.file,
                number,
                text,
                window.match_lines.contains(&number),
            ));
        }
    }

    lines.push(RenderedLine::plain(format!(
        "{match_count} matches across {file_count} file(s)"
    )));

    let highlights = find_highlights(&lines, &query.identifier);

    RenderedDocument {
        lines,
        highlights,
        highlight_pattern: regex::escape(&query.identifier),
        file_count,
        match_count,
    }
}

pub fn format_content_line(number: usize, text: &str, is_match: bool) -> String {
    let pad = " ".repeat(NUMBER_WIDTH.saturating_sub(digit_count(number)));
    let marker = if is_match { ':' } else { ' ' };
    format!("{pad}{number}{marker} {text}")
}

fn find_highlights(lines: &[RenderedLine], identifier: &str) -> Vec<HighlightSpan> {
    if identifier.is_empty() {
        return Vec::new();
    }
    lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.is_content())
        .flat_map(|(idx, l)| {
            l.text
                .match_indices(identifier)
                .map(move |(start, m)| HighlightSpan {
                    line: idx,
                    start,
                    end: start + m.len(),
                })
        })
        .collect()
}

fn digit_count(n: usize) -> usize {
    n.to_string().len()
}
