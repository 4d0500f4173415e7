use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use callsite_config::Config;
use tokio_util::sync::CancellationToken;

use crate::backend::SearchBackend;
use crate::editor::{render_results, Editor};
use crate::error::SearchError;
use crate::protocol::{MatchSet, SearchRequest};
use crate::render::{render, FileContext};
use crate::source::SourceFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingInput,
    QueryInFlight,
    Rendering,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Rendered {
        file_count: usize,
        match_count: usize,
        /// Matched files that could not be read and were left out.
        skipped: Vec<PathBuf>,
    },
    NotFound,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub prompt_on_empty_selection: bool,
    pub results_view_name: String,
    pub search_root: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            prompt_on_empty_selection: false,
            results_view_name: "Find Results".to_string(),
            search_root: String::new(),
        }
    }
}

impl SessionOptions {
    /// Reads the search root from the environment variable named in
    /// `backend.search_root_env`; unset means empty.
    pub fn from_config(config: &Config) -> Self {
        Self {
            prompt_on_empty_selection: config.session.prompt_on_empty_selection,
            results_view_name: config.session.results_view_name.clone(),
            search_root: std::env::var(&config.backend.search_root_env).unwrap_or_default(),
        }
    }
}

/// Runs one query at a time: identifier, backend exchange, windows, render.
pub struct SearchSession {
    backend: Arc<dyn SearchBackend>,
    options: SessionOptions,
    /// Observable state and the id of the search that owns it. Only the most
    /// recently started search moves the state.
    state: Mutex<(u64, SessionState)>,
    in_flight: Mutex<Option<(u64, CancellationToken)>>,
    next_query: AtomicU64,
    render_lock: tokio::sync::Mutex<()>,
}

impl SearchSession {
    pub fn new(backend: Arc<dyn SearchBackend>, options: SessionOptions) -> Self {
        Self {
            backend,
            options,
            state: Mutex::new((0, SessionState::Idle)),
            in_flight: Mutex::new(None),
            next_query: AtomicU64::new(1),
            render_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn state(&self) -> SessionState {
        self.state.lock().map(|s| s.1).unwrap_or(SessionState::Idle)
    }

    /// Cancels the in-flight query, if any. Nothing is rendered for it.
    pub fn cancel(&self) {
        if let Ok(mut in_flight) = self.in_flight.lock() {
            if let Some((id, token)) = in_flight.take() {
                tracing::debug!(query = id, "Cancelling in-flight search");
                token.cancel();
            }
        }
    }

    /// Runs a search to completion and reports the result through the
    /// editor's status line. The session is `Idle` again on return unless a
    /// newer search has started in the meantime.
    pub async fn search(&self, editor: &dyn Editor) -> Result<SearchOutcome, SearchError> {
        let id = self.claim();
        let result = self.run(editor, id).await;
        self.set_state(id, SessionState::Idle);

        match &result {
            Ok(SearchOutcome::Rendered {
                file_count,
                skipped,
                ..
            }) => {
                if !skipped.is_empty() {
                    tracing::warn!(
                        skipped = skipped.len(),
                        "Some matched files were unreadable"
                    );
                }
                editor.status_message(&format!("Matched {file_count} files"));
            }
            Ok(SearchOutcome::NotFound) => editor.status_message("Warning! Selection not found"),
            Err(e) => {
                tracing::warn!(error = %e, "Search aborted");
                editor.status_message(&e.status_message());
            }
        }
        result
    }

    async fn run(&self, editor: &dyn Editor, id: u64) -> Result<SearchOutcome, SearchError> {
        self.set_state(id, SessionState::AwaitingInput);
        let identifier = self.obtain_identifier(editor).await?;
        let request = SearchRequest::new(
            identifier,
            editor.current_file_path().unwrap_or_default(),
            self.options.search_root.clone(),
        );

        self.set_state(id, SessionState::QueryInFlight);
        let query = self.begin_query(id);
        tracing::info!(
            identifier = %request.identifier,
            query = query.id,
            "Searching for callers"
        );

        let matches = tokio::select! {
            biased;
            _ = query.token.cancelled() => return Err(SearchError::Cancelled),
            result = self.backend.query(&request) => result?,
        };

        let blocks = match matches {
            MatchSet::NotFound => return Ok(SearchOutcome::NotFound),
            MatchSet::Matches(blocks) => blocks,
        };

        let mut files = Vec::with_capacity(blocks.len());
        let mut skipped = Vec::new();
        for block in blocks {
            match SourceFile::read_async(&block.file).await {
                Ok(source) => files.push(FileContext::new(source, &block.line_numbers)),
                Err(e) => {
                    tracing::warn!(
                        file = %block.file.display(),
                        error = %e,
                        "Skipping unreadable file"
                    );
                    skipped.push(block.file);
                }
            }
        }

        self.set_state(id, SessionState::Rendering);
        let document = render(&request, &files);
        let view = editor.find_or_create_named_view(&self.options.results_view_name);
        {
            let _guard = self.render_lock.lock().await;
            if query.token.is_cancelled() {
                return Err(SearchError::Cancelled);
            }
            render_results(&view, &document)?;
        }

        Ok(SearchOutcome::Rendered {
            file_count: document.file_count,
            match_count: document.match_count,
            skipped,
        })
    }

    async fn obtain_identifier(&self, editor: &dyn Editor) -> Result<String, SearchError> {
        let identifier = match non_empty(editor.current_selection_text()) {
            Some(selection) => selection,
            None if self.options.prompt_on_empty_selection => {
                let answer = editor.prompt_for_input("Enter word to find:", "").await;
                non_empty(answer).ok_or(SearchError::NoSelection)?
            }
            None => return Err(SearchError::NoSelection),
        };
        // The request is a single line.
        if identifier.contains(['\r', '\n']) {
            tracing::debug!(identifier = ?identifier, "Rejecting multi-line identifier");
            return Err(SearchError::NoSelection);
        }
        Ok(identifier)
    }

    fn claim(&self) -> u64 {
        let id = self.next_query.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut state) = self.state.lock() {
            state.0 = id;
        }
        id
    }

    fn begin_query(&self, id: u64) -> QueryGuard<'_> {
        let token = CancellationToken::new();
        if let Ok(mut in_flight) = self.in_flight.lock() {
            if let Some((previous, old)) = in_flight.replace((id, token.clone())) {
                tracing::debug!(query = previous, "Superseded by a new search");
                old.cancel();
            }
        }
        QueryGuard {
            session: self,
            id,
            token,
        }
    }

    fn set_state(&self, id: u64, next: SessionState) {
        if let Ok(mut state) = self.state.lock() {
            if state.0 == id && state.1 != next {
                tracing::debug!(query = id, from = ?state.1, to = ?next, "Session state");
                state.1 = next;
            }
        }
    }
}

struct QueryGuard<'a> {
    session: &'a SearchSession,
    id: u64,
    token: CancellationToken,
}

impl Drop for QueryGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.session.in_flight.lock() {
            if in_flight.as_ref().is_some_and(|(id, _)| *id == self.id) {
                *in_flight = None;
            }
        }
    }
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}
