use std::path::{Path, PathBuf};

use crate::error::SearchError;

/// A matched file's text, split into lines with terminators stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    lines: Vec<String>,
}

impl SourceFile {
    pub fn from_text(path: impl Into<PathBuf>, text: &str) -> Self {
        Self {
            path: path.into(),
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    pub fn read(path: &Path) -> Result<Self, SearchError> {
        let bytes = std::fs::read(path).map_err(|source| SearchError::UnreadableSourceFile {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_text(path, &String::from_utf8_lossy(&bytes)))
    }

    pub async fn read_async(path: &Path) -> Result<Self, SearchError> {
        let bytes =
            tokio::fs::read(path)
                .await
                .map_err(|source| SearchError::UnreadableSourceFile {
                    path: path.to_path_buf(),
                    source,
                })?;
        Ok(Self::from_text(path, &String::from_utf8_lossy(&bytes)))
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// 1-based access.
    pub fn line(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|idx| self.lines.get(idx))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_one_based() {
        let src = SourceFile::from_text("a.go", "first\nsecond\r\nthird\n");
        assert_eq!(src.line_count(), 3);
        assert_eq!(src.line(0), None);
        assert_eq!(src.line(1), Some("first"));
        assert_eq!(src.line(2), Some("second"));
        assert_eq!(src.line(4), None);
    }

    #[test]
    fn read_preserves_non_ascii() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("u.go");
        std::fs::write(&path, "// héllo wörld\nfunc main() {}\n").unwrap();
        let src = SourceFile::read(&path).unwrap();
        assert_eq!(src.line(1), Some("// héllo wörld"));
    }

    #[test]
    fn missing_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let err = SourceFile::read(&dir.path().join("gone.go")).unwrap_err();
        assert!(matches!(err, SearchError::UnreadableSourceFile { .. }));
    }

    #[tokio::test]
    async fn read_async_matches_sync() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.go");
        std::fs::write(&path, "one\ntwo\n").unwrap();
        let a = SourceFile::read(&path).unwrap();
        let b = SourceFile::read_async(&path).await.unwrap();
        assert_eq!(a, b);
    }
}
