use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationTarget {
    pub file: PathBuf,
    /// `None` means open the file without positioning.
    pub line: Option<usize>,
}

fn line_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\d+).+").unwrap())
}

fn file_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.+):$").unwrap())
}

/// Resolves the source position behind `cursor_line` (0-based) of a rendered
/// results document, checking header paths against the filesystem.
pub fn resolve<S: AsRef<str>>(document: &[S], cursor_line: usize) -> Option<NavigationTarget> {
    resolve_with(document, cursor_line, |p| p.exists())
}

/// Like [`resolve`], with a caller-supplied existence check for header paths.
///
/// A content line ending in `:` whose prefix happens to name an existing
/// path is taken as a header. The document keeps no index, so this cannot be
/// told apart from a real header.
pub fn resolve_with<S, F>(
    document: &[S],
    cursor_line: usize,
    exists: F,
) -> Option<NavigationTarget>
where
    S: AsRef<str>,
    F: Fn(&Path) -> bool,
{
    let cursor_text = document.get(cursor_line)?.as_ref();
    let line = parse_line_number(cursor_text);

    let file = document[..=cursor_line]
        .iter()
        .rev()
        .filter_map(|l| file_header_re().captures(l.as_ref()))
        .map(|caps| PathBuf::from(&caps[1]))
        .find(|path| exists(path.as_path()))?;

    tracing::debug!(file = %file.display(), ?line, "Resolved navigation target");
    Some(NavigationTarget { file, line })
}

fn parse_line_number(text: &str) -> Option<usize> {
    line_number_re()
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
}
