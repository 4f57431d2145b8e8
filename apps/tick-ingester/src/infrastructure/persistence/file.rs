//! File-backed history backend.
//!
//! Each symbol is stored as a JSON array of points in its own file:
//!
//! ```text
//! <dir>/BTC-USD.json      [{"t":1700000000000,"p":74250.65}, ...]
//! <dir>/BRK%2EB.json
//! ```
//!
//! Symbols are percent-encoded into file names; only ASCII alphanumerics,
//! `-` and `_` pass through unchanged. Sequences are replaced by writing a
//! temporary file and renaming it over the old one, so a reader sees either
//! the previous or the new sequence.

use std::fmt::Write as _;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::application::ports::{HistoryBackend, StoreError};
use crate::domain::tick::HistoryPoint;

/// History backend storing one JSON file per symbol.
#[derive(Debug)]
pub struct FileHistoryBackend {
    dir: PathBuf,
    temp_seq: AtomicU64,
}

impl FileHistoryBackend {
    /// Open (and create if needed) a history directory.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the directory cannot be created.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| io_error(&dir, &e))?;
        Ok(Self {
            dir,
            temp_seq: AtomicU64::new(0),
        })
    }

    /// Directory holding the history files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_symbol(symbol)))
    }
}

#[async_trait]
impl HistoryBackend for FileHistoryBackend {
    async fn load(&self, symbol: &str) -> Result<Vec<HistoryPoint>, StoreError> {
        let path = self.path_for(symbol);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&path, &e)),
        };

        serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
            message: format!("{}: {e}", path.display()),
        })
    }

    async fn replace(&self, symbol: &str, points: Vec<HistoryPoint>) -> Result<(), StoreError> {
        let path = self.path_for(symbol);
        let json = serde_json::to_vec(&points).map_err(|e| StoreError::Serialization {
            message: e.to_string(),
        })?;

        let seq = self.temp_seq.fetch_add(1, Ordering::Relaxed);
        let temp = path.with_extension(format!("json.tmp{seq}"));

        tokio::fs::write(&temp, &json)
            .await
            .map_err(|e| io_error(&temp, &e))?;
        if let Err(e) = tokio::fs::rename(&temp, &path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(io_error(&path, &e));
        }
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "file"
    }
}

/// Percent-encode a symbol into a file stem.
fn encode_symbol(symbol: &str) -> String {
    let mut out = String::with_capacity(symbol.len());
    for byte in symbol.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}

fn io_error(path: &Path, err: &std::io::Error) -> StoreError {
    StoreError::Io {
        message: format!("{}: {err}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_encode_to_safe_names() {
        assert_eq!(encode_symbol("BTC-USD"), "BTC-USD");
        assert_eq!(encode_symbol("BRK.B"), "BRK%2EB");
        assert_eq!(encode_symbol("../etc"), "%2E%2E%2Fetc");
        assert_eq!(encode_symbol("a b"), "a%20b");
    }

    #[test]
    fn distinct_symbols_get_distinct_files() {
        assert_ne!(encode_symbol("A/B"), encode_symbol("A%2FB"));
    }

    #[tokio::test]
    async fn replace_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileHistoryBackend::open(dir.path()).await.unwrap();

        let points = vec![HistoryPoint::new(1, 1.5), HistoryPoint::new(2, 2.5)];
        backend.replace("BTC-USD", points.clone()).await.unwrap();

        assert_eq!(backend.load("BTC-USD").await.unwrap(), points);
        assert!(dir.path().join("BTC-USD.json").exists());
    }

    #[tokio::test]
    async fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileHistoryBackend::open(dir.path()).await.unwrap();
        assert!(backend.load("ETH-USD").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn history_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let backend = FileHistoryBackend::open(dir.path()).await.unwrap();
            backend
                .replace("SOL-USD", vec![HistoryPoint::new(9, 9.0)])
                .await
                .unwrap();
        }

        let backend = FileHistoryBackend::open(dir.path()).await.unwrap();
        assert_eq!(
            backend.load("SOL-USD").await.unwrap(),
            vec![HistoryPoint::new(9, 9.0)]
        );
    }

    #[tokio::test]
    async fn no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileHistoryBackend::open(dir.path()).await.unwrap();
        for i in 0..5 {
            backend
                .replace("BTC-USD", vec![HistoryPoint::new(i, 0.0)])
                .await
                .unwrap();
        }

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[tokio::test]
    async fn corrupt_file_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("BTC-USD.json"), b"not json").unwrap();
        let backend = FileHistoryBackend::open(dir.path()).await.unwrap();

        let err = backend.load("BTC-USD").await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization { .. }));
    }

    #[tokio::test]
    async fn nested_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let backend = FileHistoryBackend::open(&nested).await.unwrap();
        assert!(backend.dir().is_dir());
    }
}
