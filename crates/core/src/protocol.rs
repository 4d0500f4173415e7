use std::path::PathBuf;

use crate::error::SearchError;

#[cfg(windows)]
pub const PATH_LIST_SEPARATOR: char = ';';
#[cfg(not(windows))]
pub const PATH_LIST_SEPARATOR: char = ':';

const NOT_FOUND: &str = "NotFound";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub identifier: String,
    pub origin_file: PathBuf,
    pub search_root: String,
}

impl SearchRequest {
    pub fn new(
        identifier: impl Into<String>,
        origin_file: impl Into<PathBuf>,
        search_root: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            origin_file: origin_file.into(),
            search_root: search_root.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMatchBlock {
    pub file: PathBuf,
    /// As emitted by the backend: 1-based, unsorted, duplicates allowed.
    pub line_numbers: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchSet {
    Matches(Vec<RawMatchBlock>),
    NotFound,
}

impl MatchSet {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// A single line `identifier=originFile<SEP>searchRoot` with no terminator;
/// the caller signals end of request by closing the backend's stdin.
pub fn encode_request(request: &SearchRequest) -> Vec<u8> {
    format!(
        "{}={}{}{}",
        request.identifier,
        request.origin_file.display(),
        PATH_LIST_SEPARATOR,
        request.search_root
    )
    .into_bytes()
}

/// Parses alternating `file` / `comma-separated line numbers` lines, or the
/// literal `NotFound`.
pub fn decode_response(payload: &[u8]) -> Result<MatchSet, SearchError> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| SearchError::protocol(format!("response is not valid UTF-8: {e}")))?;

    let trimmed = text.trim();
    if trimmed == NOT_FOUND {
        return Ok(MatchSet::NotFound);
    }
    if trimmed.is_empty() {
        return Err(SearchError::protocol("empty response"));
    }

    let lines: Vec<&str> = text
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty())
        .collect();

    if lines.len() % 2 != 0 {
        return Err(SearchError::protocol(format!(
            "expected file/line-number pairs, got {} non-empty lines",
            lines.len()
        )));
    }

    let blocks = lines
        .chunks_exact(2)
        .map(|pair| {
            Ok(RawMatchBlock {
                file: PathBuf::from(pair[0]),
                line_numbers: parse_line_numbers(pair[1])
                    .map_err(|e| SearchError::protocol(format!("{}: {e}", pair[0])))?,
            })
        })
        .collect::<Result<Vec<_>, SearchError>>()?;

    Ok(MatchSet::Matches(blocks))
}

fn parse_line_numbers(list: &str) -> Result<Vec<usize>, String> {
    list.split(',')
        .map(|raw| {
            let raw = raw.trim();
            if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
                return Err(format!("invalid line number '{raw}'"));
            }
            if raw.starts_with('0') {
                return Err(format!(
                    "line numbers are 1-based without leading zeros, got '{raw}'"
                ));
            }
            raw.parse::<usize>()
                .map_err(|e| format!("invalid line number '{raw}': {e}"))
        })
        .collect()
}
