//! SHA-256 integrity gate.

use crate::error::{ArtifactError, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Hex SHA-256 of a file, streamed.
pub fn sha256_file(path: &Path) -> std::io::Result<String> {
    let _span = tracing::trace_span!("sha256_file", path = %path.display()).entered();
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Check `path` against `expected` (hex, any case).
pub fn verify_sha256(path: &Path, expected: &str) -> Result<()> {
    let actual = sha256_file(path)?;
    let expected = expected.trim();
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(ArtifactError::checksum_mismatch(
            path,
            expected.to_ascii_lowercase(),
            actual,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // sha256("hello world")
    const HELLO: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn test_sha256_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, b"hello world").unwrap();
        assert_eq!(sha256_file(&path).unwrap(), HELLO);
    }

    #[test]
    fn test_verify_is_case_insensitive() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, b"hello world").unwrap();
        verify_sha256(&path, &HELLO.to_ascii_uppercase()).unwrap();
    }

    #[test]
    fn test_verify_mismatch() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, b"tampered").unwrap();
        let err = verify_sha256(&path, HELLO).unwrap_err();
        match err {
            ArtifactError::ChecksumMismatch {
                expected, actual, ..
            } => {
                assert_eq!(expected, HELLO);
                assert_ne!(actual, HELLO);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
