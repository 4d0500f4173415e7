pub mod backend;
pub mod editor;
pub mod error;
pub mod navigate;
pub mod protocol;
pub mod render;
pub mod session;
pub mod source;
pub mod window;

pub use backend::{ProcessBackend, SearchBackend};
pub use editor::{
    navigate_from_cursor, render_results, Editor, MemoryView, ResultsView, ViewHandle,
};
pub use error::SearchError;
pub use navigate::NavigationTarget;
pub use protocol::{MatchSet, RawMatchBlock, SearchRequest};
pub use render::{FileContext, HighlightSpan, RenderedDocument, RenderedLine};
pub use session::{SearchOutcome, SearchSession, SessionOptions, SessionState};
pub use source::SourceFile;
pub use window::ContextWindow;
