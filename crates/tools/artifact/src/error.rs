//! Error types for artifact installs.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for artifact operations.
pub type Result<T> = std::result::Result<T, ArtifactError>;

/// Errors raised while downloading, verifying or extracting an artifact.
#[derive(Error, Debug)]
pub enum ArtifactError {
    /// The HTTP client could not be constructed.
    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request failed before a response arrived (DNS, TLS, timeout, ...).
    #[error("Failed to download {url}: {source}")]
    Request {
        /// The artifact URL.
        url: String,
        /// The transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("Failed to download {url} (HTTP {status})")]
    Http {
        /// The artifact URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The archive does not hash to the declared SHA-256.
    #[error("Checksum mismatch for {}: expected {expected}, got {actual}", file.display())]
    ChecksumMismatch {
        /// The file that was hashed.
        file: PathBuf,
        /// Declared digest.
        expected: String,
        /// Computed digest.
        actual: String,
    },

    /// An archive member would land outside the extraction directory.
    #[error("Archive member '{member}' escapes the extraction directory")]
    PathTraversal {
        /// The offending member name.
        member: String,
    },

    /// The wanted member is not a regular file in the archive.
    #[error("'{member}' not found in archive")]
    MemberNotFound {
        /// The member that was looked for.
        member: String,
    },

    /// The archive could not be read.
    #[error("Invalid archive: {0}")]
    Archive(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking task panicked or was aborted.
    #[error("Background task failed: {0}")]
    Task(String),

    /// The caller cancelled the operation.
    #[error("Cancelled")]
    Cancelled,
}

impl ArtifactError {
    /// Create a checksum mismatch error.
    #[must_use]
    pub fn checksum_mismatch(
        file: impl Into<PathBuf>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::ChecksumMismatch {
            file: file.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a path traversal error.
    #[must_use]
    pub fn path_traversal(member: impl Into<String>) -> Self {
        Self::PathTraversal {
            member: member.into(),
        }
    }

    /// Create an invalid archive error.
    #[must_use]
    pub fn archive(message: impl Into<String>) -> Self {
        Self::Archive(message.into())
    }
}

impl From<zip::result::ZipError> for ArtifactError {
    fn from(e: zip::result::ZipError) -> Self {
        match e {
            zip::result::ZipError::Io(io) => Self::Io(io),
            other => Self::Archive(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ArtifactError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}
