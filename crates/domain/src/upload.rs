//! Image upload candidates and the client-side acceptance policy.

use std::fmt;

use mime::Mime;

use crate::error::{DomainError, DomainResult};

/// Per-file size ceiling accepted by the upload endpoint (10 MiB).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Image subtypes the upload endpoint accepts.
pub const ACCEPTED_IMAGE_SUBTYPES: [&str; 5] = ["jpeg", "png", "webp", "gif", "bmp"];

/// One image ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

impl ImageUpload {
    /// Creates an upload candidate.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidUpload` for an empty file name.
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> DomainResult<Self> {
        let file_name = file_name.into();
        if file_name.trim().is_empty() {
            return Err(DomainError::InvalidUpload("file name is empty".to_string()));
        }
        Ok(Self {
            file_name,
            content_type: content_type.into(),
            bytes,
        })
    }

    /// File name sent in the multipart part.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Declared media type.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// File contents.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true for a zero-byte file.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Why a candidate was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    /// The file exceeds the size ceiling.
    TooLarge {
        /// Actual size.
        size: usize,
        /// Ceiling.
        max: usize,
    },
    /// The media type is not an accepted image type.
    UnsupportedType {
        /// Declared media type.
        content_type: String,
    },
    /// The file holds no bytes.
    Empty,
    /// The file could not be read.
    Unreadable {
        /// Underlying error.
        message: String,
    },
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLarge { size, max } => {
                write!(f, "File is larger than {max} bytes ({size} bytes)")
            }
            Self::UnsupportedType { content_type } => write!(
                f,
                "File type must be one of image/{} (got {content_type})",
                ACCEPTED_IMAGE_SUBTYPES.join(", image/")
            ),
            Self::Empty => write!(f, "File is empty"),
            Self::Unreadable { message } => write!(f, "Could not read file: {message}"),
        }
    }
}

/// A refused candidate and the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRejection {
    /// Name of the refused file.
    pub file_name: String,
    /// Why it was refused.
    pub reason: RejectionReason,
}

impl fmt::Display for UploadRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file_name, self.reason)
    }
}

/// Client-side acceptance rules for uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPolicy {
    max_bytes: usize,
}

impl UploadPolicy {
    /// Policy with a custom size ceiling.
    #[must_use]
    pub const fn with_max_bytes(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    /// Size ceiling.
    #[must_use]
    pub const fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Returns true if `content_type` is an accepted image type.
    #[must_use]
    pub fn accepts_type(content_type: &str) -> bool {
        content_type.parse::<Mime>().is_ok_and(|mime| {
            mime.type_() == mime::IMAGE
                && ACCEPTED_IMAGE_SUBTYPES.contains(&mime.subtype().as_str())
        })
    }

    /// Checks one candidate.
    ///
    /// # Errors
    ///
    /// Returns the rejection when the candidate breaks the policy.
    pub fn check(&self, upload: &ImageUpload) -> Result<(), UploadRejection> {
        let reason = if !Self::accepts_type(upload.content_type()) {
            Some(RejectionReason::UnsupportedType {
                content_type: upload.content_type().to_string(),
            })
        } else if upload.is_empty() {
            Some(RejectionReason::Empty)
        } else if upload.len() > self.max_bytes {
            Some(RejectionReason::TooLarge {
                size: upload.len(),
                max: self.max_bytes,
            })
        } else {
            None
        };

        reason.map_or(Ok(()), |reason| {
            Err(UploadRejection {
                file_name: upload.file_name().to_string(),
                reason,
            })
        })
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::with_max_bytes(MAX_UPLOAD_BYTES)
    }
}

/// Candidates split into what will be sent and what was refused.
///
/// Every candidate ends up in exactly one of the two lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageBatch {
    accepted: Vec<ImageUpload>,
    rejected: Vec<UploadRejection>,
}

impl ImageBatch {
    /// Partitions `candidates` with `policy`, preserving order.
    pub fn partition(policy: &UploadPolicy, candidates: impl IntoIterator<Item = ImageUpload>) -> Self {
        let mut batch = Self::default();
        for candidate in candidates {
            match policy.check(&candidate) {
                Ok(()) => batch.accepted.push(candidate),
                Err(rejection) => batch.rejected.push(rejection),
            }
        }
        batch
    }

    /// Adds a rejection found before a candidate could be built, e.g. an
    /// unreadable file.
    pub fn reject(&mut self, rejection: UploadRejection) {
        self.rejected.push(rejection);
    }

    /// Accepted uploads.
    #[must_use]
    pub fn accepted(&self) -> &[ImageUpload] {
        &self.accepted
    }

    /// Refused candidates.
    #[must_use]
    pub fn rejected(&self) -> &[UploadRejection] {
        &self.rejected
    }

    /// Returns true if nothing was accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }
}
