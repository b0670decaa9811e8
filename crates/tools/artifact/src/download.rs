//! Cancellable, bounded HTTP downloads into the archive cache.

use crate::error::{ArtifactError, Result};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tooldock_core::CancellationToken;
use tracing::debug;

/// Default bound on a single download.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Streams artifacts to disk.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
}

impl Downloader {
    /// Create a downloader whose requests (body included) are bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("tooldock/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(ArtifactError::Client)?;
        Ok(Self { client })
    }

    /// Download `url` to `dest`.
    ///
    /// Bytes are streamed into `<dest>.tmp` and renamed into place once
    /// complete. On failure or cancellation the temporary file is removed and
    /// `dest` is never created.
    pub async fn fetch(&self, url: &str, dest: &Path, cancel: &CancellationToken) -> Result<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = tmp_path(dest);
        debug!(%url, dest = %dest.display(), "Downloading artifact");

        let result = tokio::select! {
            () = cancel.cancelled() => Err(ArtifactError::Cancelled),
            result = self.stream_to(url, &tmp) => result,
        };

        match result {
            Ok(bytes) => {
                tokio::fs::rename(&tmp, dest).await?;
                debug!(%url, bytes, "Download complete");
                Ok(())
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&tmp).await;
                Err(e)
            }
        }
    }

    async fn stream_to(&self, url: &str, tmp: &Path) -> Result<u64> {
        let request_error = |source| ArtifactError::Request {
            url: url.to_string(),
            source,
        };
        let mut response = self.client.get(url).send().await.map_err(request_error)?;
        if !response.status().is_success() {
            return Err(ArtifactError::Http {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(tmp).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await.map_err(request_error)? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }
}

/// `<dest>.tmp`
#[must_use]
pub fn tmp_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_tmp_path() {
        assert_eq!(
            tmp_path(Path::new("/c/syft/1.0/syft.tar.gz")),
            PathBuf::from("/c/syft/1.0/syft.tar.gz.tmp")
        );
    }

    #[tokio::test]
    async fn test_fetch_writes_dest() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tool.tar.gz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"payload".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let dest = dir.path().join("nested").join("tool.tar.gz");
        Downloader::new(DEFAULT_TIMEOUT)
            .unwrap()
            .fetch(
                &format!("{}/tool.tar.gz", server.uri()),
                &dest,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"payload");
        assert!(!tmp_path(&dest).exists());
    }

    #[tokio::test]
    async fn test_http_error_leaves_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let dest = dir.path().join("tool.zip");
        let err = Downloader::new(DEFAULT_TIMEOUT)
            .unwrap()
            .fetch(
                &format!("{}/tool.zip", server.uri()),
                &dest,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ArtifactError::Http { status: 404, .. }));
        assert!(!dest.exists());
        assert!(!tmp_path(&dest).exists());
    }

    #[tokio::test]
    async fn test_cancelled_download_leaves_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"slow".to_vec())
                    .set_delay(Duration::from_secs(10)),
            )
            .mount(&server)
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let dest = dir.path().join("tool.tar.gz");
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let err = Downloader::new(DEFAULT_TIMEOUT)
            .unwrap()
            .fetch(&format!("{}/tool.tar.gz", server.uri()), &dest, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, ArtifactError::Cancelled));
        assert!(!dest.exists());
        assert!(!tmp_path(&dest).exists());
    }

    #[tokio::test]
    async fn test_timeout_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let dest = dir.path().join("tool.tar.gz");
        let err = Downloader::new(Duration::from_millis(200))
            .unwrap()
            .fetch(
                &format!("{}/tool.tar.gz", server.uri()),
                &dest,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ArtifactError::Request { .. }));
        assert!(!dest.exists());
    }
}
