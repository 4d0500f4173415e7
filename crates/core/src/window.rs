use std::collections::BTreeSet;
use std::path::PathBuf;

/// Lines shown before each hit.
pub const CONTEXT_BEFORE: usize = 2;
/// Lines shown after each hit.
pub const CONTEXT_AFTER: usize = 3;

/// The lines of one file to display around its hits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextWindow {
    pub file: PathBuf,
    pub lines: BTreeSet<usize>,
    pub match_lines: BTreeSet<usize>,
}

impl ContextWindow {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn match_count(&self) -> usize {
        self.match_lines.len()
    }
}

/// Expands every hit `L` into `L - 2 ..= L + 3` clipped to `1..=total_line_count`
/// and unions the neighborhoods. Overlapping neighborhoods coalesce through
/// the set; gaps are left for the renderer to mark.
pub fn build(
    file: impl Into<PathBuf>,
    line_numbers: &[usize],
    total_line_count: usize,
) -> ContextWindow {
    let file = file.into();
    let hits: BTreeSet<usize> = line_numbers.iter().copied().collect();

    let mut lines = BTreeSet::new();
    let mut match_lines = BTreeSet::new();
    for &hit in &hits {
        if hit == 0 || hit > total_line_count {
            tracing::debug!(
                file = %file.display(),
                line = hit,
                total = total_line_count,
                "Dropping hit outside file bounds"
            );
            continue;
        }
        let start = hit.saturating_sub(CONTEXT_BEFORE).max(1);
        let end = (hit + CONTEXT_AFTER).min(total_line_count);
        lines.extend(start..=end);
        match_lines.insert(hit);
    }

    ContextWindow {
        file,
        lines,
        match_lines,
    }
}
