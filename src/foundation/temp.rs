use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// A file under the system temp directory that is removed when dropped.
#[derive(Debug)]
pub struct TempFile(Option<PathBuf>);

impl TempFile {
    /// Reserve a unique path `folio_<tag>_<pid>_<nanos>_<seq><suffix>` without creating the file.
    pub fn reserve(tag: &str, suffix: &str) -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "folio_{tag}_{}_{nanos}_{seq}{suffix}",
            std::process::id()
        ));
        Self(Some(path))
    }

    /// Take ownership of an existing path; it will be removed on drop.
    pub fn adopt(path: impl Into<PathBuf>) -> Self {
        Self(Some(path.into()))
    }

    /// Borrow the guarded path.
    pub fn path(&self) -> &Path {
        // Only `drop` clears the option.
        self.0.as_deref().unwrap_or_else(|| Path::new(""))
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}
