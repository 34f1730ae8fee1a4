//! Reading upload candidates from disk.

use std::path::{Path, PathBuf};

use shelfscan_domain::{
    DomainError, ImageBatch, ImageUpload, RejectionReason, UploadPolicy, UploadRejection,
};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while reading an upload candidate.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The file could not be read.
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file does not make a valid candidate.
    #[error(transparent)]
    Invalid(#[from] DomainError),
}

/// Reads one file into an upload candidate. The content type is guessed
/// from the extension.
///
/// # Errors
///
/// Returns `UploadError::Read` if the file cannot be read.
pub async fn load_image(path: &Path) -> Result<ImageUpload, UploadError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| UploadError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image")
        .to_string();

    let content_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string();

    debug!(file = %path.display(), %content_type, size = bytes.len(), "loaded upload candidate");
    Ok(ImageUpload::new(file_name, content_type, bytes)?)
}

/// Reads every path and splits the candidates with `policy`.
///
/// A file larger than the policy's ceiling is rejected from its metadata
/// without being read. Unreadable files are rejected rather than skipped, so
/// every path ends up either accepted or rejected.
pub async fn load_images(paths: &[PathBuf], policy: &UploadPolicy) -> ImageBatch {
    let mut candidates = Vec::with_capacity(paths.len());
    let mut refused = Vec::new();

    for path in paths {
        let rejection = |reason| UploadRejection {
            file_name: path.display().to_string(),
            reason,
        };
        let size = match tokio::fs::metadata(path).await {
            Ok(metadata) => usize::try_from(metadata.len()).unwrap_or(usize::MAX),
            Err(source) => {
                let error = UploadError::Read {
                    path: path.clone(),
                    source,
                };
                refused.push(rejection(RejectionReason::Unreadable {
                    message: error.to_string(),
                }));
                continue;
            }
        };
        if size > policy.max_bytes() {
            debug!(file = %path.display(), size, "upload candidate over the size ceiling, not read");
            refused.push(rejection(RejectionReason::TooLarge {
                size,
                max: policy.max_bytes(),
            }));
            continue;
        }

        match load_image(path).await {
            Ok(upload) => candidates.push(upload),
            Err(e) => refused.push(rejection(RejectionReason::Unreadable {
                message: e.to_string(),
            })),
        }
    }

    let mut batch = ImageBatch::partition(policy, candidates);
    for rejection in refused {
        batch.reject(rejection);
    }
    batch
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[tokio::test]
    async fn test_load_image_guesses_type() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "shelf.jpg", &[0xFF, 0xD8, 0xFF]);

        let upload = load_image(&path).await.unwrap();
        assert_eq!(upload.file_name(), "shelf.jpg");
        assert_eq!(upload.content_type(), "image/jpeg");
        assert_eq!(upload.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = load_image(&dir.path().join("absent.png")).await;
        assert!(matches!(result, Err(UploadError::Read { .. })));
    }

    #[tokio::test]
    async fn test_load_images_accounts_for_every_path() {
        let dir = TempDir::new().unwrap();
        let paths = vec![
            write(&dir, "a.png", &[1, 2, 3]),
            write(&dir, "notes.txt", b"hello"),
            write(&dir, "big.webp", &[0; 64]),
            dir.path().join("missing.gif"),
        ];

        let batch = load_images(&paths, &UploadPolicy::with_max_bytes(32)).await;

        let accepted: Vec<_> = batch.accepted().iter().map(ImageUpload::file_name).collect();
        assert_eq!(accepted, vec!["a.png"]);
        assert_eq!(batch.rejected().len(), 3);
        assert!(matches!(
            batch.rejected()[0].reason,
            RejectionReason::UnsupportedType { .. }
        ));
        assert!(matches!(
            batch.rejected()[1].reason,
            RejectionReason::TooLarge { size: 64, max: 32 }
        ));
        assert!(matches!(
            batch.rejected()[2].reason,
            RejectionReason::Unreadable { .. }
        ));
    }

    #[tokio::test]
    async fn test_oversized_file_is_rejected_without_reading() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("huge.jpg");
        let file = std::fs::File::create(&path).unwrap();
        file.set_len(4 << 30).unwrap();

        let batch = load_images(&[path], &UploadPolicy::with_max_bytes(1024)).await;

        assert!(batch.is_empty());
        assert_eq!(batch.rejected().len(), 1);
        assert_eq!(batch.rejected()[0].file_name, dir.path().join("huge.jpg").display().to_string());
        assert!(matches!(
            batch.rejected()[0].reason,
            RejectionReason::TooLarge { size, max: 1024 } if size == 4 << 30
        ));
    }
}
