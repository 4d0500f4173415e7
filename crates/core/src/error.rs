use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Malformed backend response: {0}")]
    Protocol(String),

    #[error("Search backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Cannot read {}: {source}", .path.display())]
    UnreadableSourceFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to update results view: {0}")]
    View(#[source] std::io::Error),

    #[error("No selection made")]
    NoSelection,

    #[error("Search cancelled")]
    Cancelled,
}

impl SearchError {
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Short text suitable for an editor status bar.
    pub fn status_message(&self) -> String {
        match self {
            Self::NoSelection => "Warning! No selection made".to_string(),
            Self::Cancelled => "Search cancelled".to_string(),
            other => format!("Error: {other}"),
        }
    }
}
