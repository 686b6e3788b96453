use std::path::{Path, PathBuf};

use {
    base64::{Engine, engine::general_purpose::STANDARD as BASE64},
    tracing::{debug, warn},
};

use crate::error::{Context, Result};

/// A downloaded image waiting to be reviewed.
///
/// The file is owned by the submission it belongs to and is deleted with
/// [`release`](Self::release) once feedback has been delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub path: PathBuf,
    pub mime_type: String,
}

impl ImageRef {
    pub fn new(path: impl Into<PathBuf>, mime_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Write `bytes` to a fresh, uniquely named file in `dir`.
    pub async fn store(dir: &Path, prefix: &str, mime_type: &str, bytes: &[u8]) -> Result<Self> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating download dir {}", dir.display()))?;
        let (_, path) = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(extension_for(mime_type))
            .tempfile_in(dir)?
            .keep()
            .map_err(|e| e.error)?;
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), size = bytes.len(), "stored image");
        Ok(Self::new(path, mime_type))
    }

    /// Read the file as a `data:` URI for vision APIs.
    pub async fn data_uri(&self) -> Result<String> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("reading {}", self.path.display()))?;
        Ok(format!(
            "data:{};base64,{}",
            self.mime_type,
            BASE64.encode(bytes)
        ))
    }

    /// Delete the backing file. A file that is already gone counts as released.
    pub async fn release(&self) -> std::io::Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Delete every file, logging failures instead of returning them.
///
/// Returns how many files could not be removed.
pub async fn release_all(images: &[ImageRef]) -> usize {
    let results = futures::future::join_all(images.iter().map(ImageRef::release)).await;
    let mut failed = 0;
    for (image, result) in images.iter().zip(results) {
        if let Err(e) = result {
            failed += 1;
            warn!(path = %image.path.display(), error = %e, "failed to remove temporary image");
        }
    }
    failed
}

/// Guess an image mime type from a file name, defaulting to JPEG.
pub fn mime_from_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => ".png",
        "image/webp" => ".webp",
        "image/gif" => ".gif",
        _ => ".jpg",
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[tokio::test]
    async fn store_creates_unique_files_with_extension() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("downloads");
        let a = ImageRef::store(&nested, "photo-", "image/png", b"one")
            .await
            .unwrap();
        let b = ImageRef::store(&nested, "photo-", "image/png", b"two")
            .await
            .unwrap();
        assert_ne!(a.path, b.path);
        assert_eq!(a.path.extension().unwrap(), "png");
        assert_eq!(std::fs::read(&b.path).unwrap(), b"two");
    }

    #[tokio::test]
    async fn data_uri_encodes_contents() {
        let dir = tempfile::tempdir().unwrap();
        let image = ImageRef::store(dir.path(), "x-", "image/jpeg", b"abc")
            .await
            .unwrap();
        assert_eq!(image.data_uri().await.unwrap(), "data:image/jpeg;base64,YWJj");
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let image = ImageRef::store(dir.path(), "x-", "image/jpeg", b"abc")
            .await
            .unwrap();
        image.release().await.unwrap();
        assert!(!image.path.exists());
        image.release().await.unwrap();
    }

    #[tokio::test]
    async fn release_all_counts_failures() {
        let dir = tempfile::tempdir().unwrap();
        let file = ImageRef::store(dir.path(), "x-", "image/jpeg", b"abc")
            .await
            .unwrap();
        // A directory cannot be removed with remove_file.
        let not_a_file = ImageRef::new(dir.path(), "image/jpeg");
        assert_eq!(release_all(&[file.clone(), not_a_file]).await, 1);
        assert!(!file.path.exists());
    }

    #[rstest]
    #[case("a.PNG", "image/png")]
    #[case("a.webp", "image/webp")]
    #[case("a.jpeg", "image/jpeg")]
    #[case("noext", "image/jpeg")]
    fn guesses_mime(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(mime_from_path(Path::new(name)), expected);
    }
}
