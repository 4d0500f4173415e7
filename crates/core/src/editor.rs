use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::SearchError;
use crate::navigate::{self, NavigationTarget};
use crate::render::RenderedDocument;

/// A named document that displays rendered results.
pub trait ResultsView: Send + Sync {
    fn name(&self) -> &str;

    /// Replaces the whole view. Either every line lands or the previous
    /// contents stay.
    fn replace_contents(&self, document: &RenderedDocument) -> std::io::Result<()>;

    fn contents(&self) -> Vec<String>;
}

pub type ViewHandle = Arc<dyn ResultsView>;

/// Services the core consumes from the host editor.
#[async_trait]
pub trait Editor: Send + Sync {
    fn current_selection_text(&self) -> Option<String>;

    fn current_file_path(&self) -> Option<PathBuf>;

    /// `None` when the user dismisses the prompt.
    async fn prompt_for_input(&self, label: &str, default: &str) -> Option<String>;

    fn find_or_create_named_view(&self, name: &str) -> ViewHandle;

    fn open_file_at_position(&self, path: &Path, line: Option<usize>) -> std::io::Result<()>;

    fn status_message(&self, message: &str);
}

pub fn render_results(view: &ViewHandle, document: &RenderedDocument) -> Result<(), SearchError> {
    view.replace_contents(document).map_err(SearchError::View)?;
    tracing::debug!(
        view = view.name(),
        lines = document.lines.len(),
        highlights = document.highlights.len(),
        "Results view updated"
    );
    Ok(())
}

/// Resolves the cursor position in `view` and asks the editor to open it.
/// Returns `Ok(None)` when no file header precedes the cursor.
pub fn navigate_from_cursor(
    editor: &dyn Editor,
    view: &ViewHandle,
    cursor_line: usize,
) -> std::io::Result<Option<NavigationTarget>> {
    let contents = view.contents();
    let Some(target) = navigate::resolve(&contents, cursor_line) else {
        return Ok(None);
    };
    editor.open_file_at_position(&target.file, target.line)?;
    Ok(Some(target))
}

/// Results view kept in memory.
#[derive(Debug, Default)]
pub struct MemoryView {
    name: String,
    lines: Mutex<Vec<String>>,
    highlight_pattern: Mutex<String>,
}

impl MemoryView {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn highlight_pattern(&self) -> String {
        self.highlight_pattern
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

impl ResultsView for MemoryView {
    fn name(&self) -> &str {
        &self.name
    }

    fn replace_contents(&self, document: &RenderedDocument) -> std::io::Result<()> {
        let mut lines = self
            .lines
            .lock()
            .map_err(|_| std::io::Error::other("results view lock poisoned"))?;
        *lines = document.line_texts();
        if let Ok(mut pattern) = self.highlight_pattern.lock() {
            *pattern = document.highlight_pattern.clone();
        }
        Ok(())
    }

    fn contents(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }
}
