use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use callsite_core::{Editor, RenderedDocument, ResultsView, ViewHandle};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Results view persisted as a plain text file, one rendered line per line.
pub struct FileView {
    name: String,
    path: PathBuf,
    last: Mutex<Option<RenderedDocument>>,
}

impl FileView {
    pub fn open(dir: &Path, name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: dir.join(format!("{name}.txt")),
            last: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The document written by this process, with its highlight spans.
    pub fn last_document(&self) -> Option<RenderedDocument> {
        self.last.lock().ok().and_then(|d| d.clone())
    }
}

impl ResultsView for FileView {
    fn name(&self) -> &str {
        &self.name
    }

    fn replace_contents(&self, document: &RenderedDocument) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Write aside and rename so readers never see a half-written view.
        let tmp = self.path.with_extension("txt.tmp");
        {
            let mut file = std::fs::File::create(&tmp)?;
            file.write_all(document.text().as_bytes())?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, &self.path)?;

        if let Ok(mut last) = self.last.lock() {
            *last = Some(document.clone());
        }
        Ok(())
    }

    fn contents(&self) -> Vec<String> {
        std::fs::read_to_string(&self.path)
            .map(|text| text.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

/// Editor collaborator backed by the terminal and the filesystem.
pub struct TerminalHost {
    selection: Option<String>,
    file: Option<PathBuf>,
    results_dir: PathBuf,
    editor_command: Option<String>,
    views: Mutex<Vec<Arc<FileView>>>,
}

impl TerminalHost {
    pub fn new(results_dir: PathBuf, editor_command: Option<String>) -> Self {
        Self {
            selection: None,
            file: None,
            results_dir,
            editor_command,
            views: Mutex::new(Vec::new()),
        }
    }

    pub fn with_selection(mut self, selection: Option<String>, file: Option<PathBuf>) -> Self {
        self.selection = selection;
        self.file = file;
        self
    }

    pub fn view(&self, name: &str) -> Arc<FileView> {
        let mut views = match self.views.lock() {
            Ok(views) => views,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(existing) = views.iter().find(|v| v.name() == name) {
            return existing.clone();
        }
        let view = Arc::new(FileView::open(&self.results_dir, name));
        views.push(view.clone());
        view
    }
}

#[async_trait]
impl Editor for TerminalHost {
    fn current_selection_text(&self) -> Option<String> {
        self.selection.clone()
    }

    fn current_file_path(&self) -> Option<PathBuf> {
        self.file.clone()
    }

    async fn prompt_for_input(&self, label: &str, default: &str) -> Option<String> {
        eprint!("{label} ");
        if let Err(e) = std::io::stderr().flush() {
            tracing::debug!(error = %e, "Failed to flush prompt");
        }

        let mut line = String::new();
        let mut stdin = BufReader::new(tokio::io::stdin());
        match stdin.read_line(&mut line).await {
            Ok(0) | Err(_) => None,
            Ok(_) => {
                let answer = line.trim();
                if answer.is_empty() {
                    Some(default.to_string())
                } else {
                    Some(answer.to_string())
                }
            }
        }
    }

    fn find_or_create_named_view(&self, name: &str) -> ViewHandle {
        self.view(name)
    }

    fn open_file_at_position(&self, path: &Path, line: Option<usize>) -> std::io::Result<()> {
        let Some(command) = self.editor_command.as_deref() else {
            match line {
                Some(line) => println!("{}:{line}", path.display()),
                None => println!("{}", path.display()),
            }
            return Ok(());
        };

        let mut parts = command.split_whitespace();
        let program = parts.next().unwrap_or(command);
        let mut cmd = std::process::Command::new(program);
        cmd.args(parts);
        if let Some(line) = line {
            cmd.arg(format!("+{line}"));
        }
        cmd.arg(path);

        tracing::debug!(editor = program, file = %path.display(), ?line, "Opening editor");
        let status = cmd.status()?;
        if !status.success() {
            return Err(std::io::Error::other(format!("{program} exited with {status}")));
        }
        Ok(())
    }

    fn status_message(&self, message: &str) {
        eprintln!("{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callsite_core::render::{render, FileContext};
    use callsite_core::{navigate_from_cursor, SearchRequest, SourceFile};

    fn sample_document(dir: &Path) -> (PathBuf, RenderedDocument) {
        let file = dir.join("lib.go");
        std::fs::write(&file, "package lib\n\nfunc A() {\n\tB()\n}\n").unwrap();
        let doc = render(
            &SearchRequest::new("B", "main.go", ""),
            &[FileContext::new(SourceFile::read(&file).unwrap(), &[4])],
        );
        (file, doc)
    }

    #[test]
    fn file_view_round_trips_lines() {
        let dir = tempfile::tempdir().unwrap();
        let (_, doc) = sample_document(dir.path());
        let view = FileView::open(&dir.path().join("results"), "Find Results");

        assert!(view.contents().is_empty());
        view.replace_contents(&doc).unwrap();
        assert_eq!(view.contents(), doc.line_texts());
        assert_eq!(view.last_document(), Some(doc));
        assert!(view.path().ends_with("Find Results.txt"));
    }

    #[test]
    fn same_name_yields_same_view() {
        let dir = tempfile::tempdir().unwrap();
        let host = TerminalHost::new(dir.path().to_path_buf(), None);
        let a = host.view("Find Results");
        let b = host.view("Find Results");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn navigation_through_saved_view() {
        let dir = tempfile::tempdir().unwrap();
        let (_, doc) = sample_document(dir.path());
        let host = TerminalHost::new(dir.path().join("results"), None);
        let view = host.find_or_create_named_view("Find Results");
        view.replace_contents(&doc).unwrap();

        // A fresh host reads what the previous process saved.
        let reopened = TerminalHost::new(dir.path().join("results"), None);
        let view = reopened.find_or_create_named_view("Find Results");
        let cursor = view
            .contents()
            .iter()
            .position(|l| l.starts_with("   4:"))
            .unwrap();
        let target = navigate_from_cursor(&reopened, &view, cursor)
            .unwrap()
            .unwrap();
        assert_eq!(target.file, dir.path().join("lib.go"));
        assert_eq!(target.line, Some(4));
    }
}
