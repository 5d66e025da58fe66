use std::path::{Path, PathBuf};

use sha2::Digest as _;

use crate::foundation::error::{TranscodeError, TranscodeResult};
use crate::pipeline::transcode::OutputArtifact;

/// Descriptive metadata persisted alongside a payload.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MediaMetadata {
    /// Original filename; the stored key is derived from it.
    pub filename: String,
    /// MIME type of the payload.
    pub mime_type: String,
    /// Pixel width, when the payload is visual media.
    pub width: Option<u32>,
    /// Pixel height, when the payload is visual media.
    pub height: Option<u32>,
    /// Duration in seconds, when known.
    pub duration_sec: Option<f64>,
}

/// Result of a successful store.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StoredMedia {
    /// Storage key relative to the store root.
    pub key: String,
    /// Public URL of the payload.
    pub url: String,
    /// Payload size in bytes.
    pub size: u64,
    /// Lowercase hex SHA-256 of the payload.
    pub sha256: String,
}

/// Persists finished payloads and returns where they can be fetched.
pub trait MediaStore {
    /// Store `bytes` described by `meta`.
    fn store(&self, bytes: &[u8], meta: &MediaMetadata) -> TranscodeResult<StoredMedia>;
}

/// [`MediaStore`] writing into a local directory that is served at `base_url`.
///
/// Each payload lands at `<root>/media/<unix_millis>-<sanitized filename>` with a
/// `<same>.json` sidecar describing it.
#[derive(Clone, Debug)]
pub struct DirMediaStore {
    root: PathBuf,
    base_url: String,
}

#[derive(serde::Serialize)]
struct Sidecar<'a> {
    #[serde(flatten)]
    meta: &'a MediaMetadata,
    size: u64,
    sha256: &'a str,
    stored_at_ms: u128,
}

impl DirMediaStore {
    /// Store under `root`; URLs are `base_url` + `/` + key.
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    /// Directory payloads are written under.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl MediaStore for DirMediaStore {
    fn store(&self, bytes: &[u8], meta: &MediaMetadata) -> TranscodeResult<StoredMedia> {
        use anyhow::Context as _;

        if bytes.is_empty() {
            return Err(TranscodeError::storage(format!(
                "refusing to store empty payload for '{}'",
                meta.filename
            )));
        }

        let stored_at_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let key = format!("media/{stored_at_ms}-{}", sanitize_filename(&meta.filename));
        let path = self.root.join(&key);
        ensure_parent_dir(&path)?;
        if path.exists() {
            return Err(TranscodeError::storage(format!("key '{key}' already exists")));
        }

        std::fs::write(&path, bytes)
            .with_context(|| format!("failed to write '{}'", path.display()))?;

        let sha256 = hex_digest(bytes);
        let size = bytes.len() as u64;
        let sidecar = Sidecar {
            meta,
            size,
            sha256: &sha256,
            stored_at_ms,
        };
        let sidecar_path = self.root.join(format!("{key}.json"));
        let json = serde_json::to_vec_pretty(&sidecar)
            .map_err(|e| TranscodeError::storage(format!("metadata encode failed: {e}")))?;
        std::fs::write(&sidecar_path, json)
            .with_context(|| format!("failed to write '{}'", sidecar_path.display()))?;

        tracing::info!(key = %key, size, "stored media");
        Ok(StoredMedia {
            url: format!("{}/{key}", self.base_url),
            key,
            size,
            sha256,
        })
    }
}

/// Store a transcode result, naming it after `filename` with the container's extension.
pub fn publish(
    store: &dyn MediaStore,
    artifact: &OutputArtifact,
    filename: &str,
) -> TranscodeResult<StoredMedia> {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "video".to_owned());
    let geometry = artifact.stats.geometry;
    let duration = artifact.stats.source.duration_sec;
    let meta = MediaMetadata {
        filename: format!("{stem}.{}", artifact.stats.encoder.container.extension),
        mime_type: artifact.mime_type.clone(),
        width: Some(geometry.output_width),
        height: Some(geometry.output_height),
        duration_sec: (duration > 0.0).then_some(duration),
    };
    store.store(&artifact.bytes, &meta)
}

/// Keep ASCII alphanumerics, `.`, `-` and `_`; everything else becomes `_`.
pub fn sanitize_filename(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_owned()
    } else {
        cleaned.to_owned()
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> TranscodeResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory '{}'", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/storage/store.rs"]
mod tests;
