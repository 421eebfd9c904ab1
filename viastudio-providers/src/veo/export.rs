//! Saving finished videos to disk.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use viastudio_core::VideoReference;
use viastudio_fetch::{FetchError, HttpClient, HttpError};

/// Downloads videos behind a [`VideoReference`].
#[derive(Debug, Clone)]
pub struct VideoExporter {
    http: Arc<HttpClient>,
}

impl VideoExporter {
    /// Creates an exporter using the given HTTP client.
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    /// Downloads the video and writes it to `path`.
    ///
    /// The file is written to a temporary sibling first and renamed into
    /// place, so a failed download never leaves a partial file behind.
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns an error if the download fails or the file cannot be written.
    #[instrument(skip(self, reference), fields(video = %reference.redacted(), path = %path.display()))]
    pub async fn export(&self, reference: &VideoReference, path: &Path) -> Result<u64, FetchError> {
        let response = self.http.get(reference.as_str()).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Api {
                status: status.as_u16(),
                message: format!("Video download failed with HTTP {status}"),
            });
        }

        let bytes = response.bytes().await.map_err(HttpError::from)?;
        debug!(bytes = bytes.len(), "Video downloaded");

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp_path = part_path(path);
        let written = match tokio::fs::write(&tmp_path, &bytes).await {
            Ok(()) => tokio::fs::rename(&tmp_path, path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp_path).await {
                debug!(error = %cleanup, "No partial file to remove");
            }
            warn!(error = %e, "Failed to write video");
            return Err(e.into());
        }

        info!(bytes = bytes.len(), "Video exported");
        Ok(bytes.len() as u64)
    }
}

/// `<file>.part` next to `path`, keeping the original extension.
fn part_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(|| OsString::from("video"), OsString::from);
    name.push(".part");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_export_writes_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/v1:download"))
            .and(query_param("key", "abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fake-mp4".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("renders").join("fox.mp4");
        let reference = VideoReference::new(format!(
            "{}/files/v1:download?alt=media&key=abc123",
            server.uri()
        ))
        .unwrap();

        let exporter = VideoExporter::new(Arc::new(HttpClient::new().unwrap()));
        let written = exporter.export(&reference, &target).await.unwrap();

        assert_eq!(written, 8);
        assert_eq!(std::fs::read(&target).unwrap(), b"fake-mp4");
        assert!(!dir.path().join("renders").join("fox.mp4.part").exists());
    }

    #[test]
    fn test_part_path_keeps_extension() {
        assert_eq!(part_path(Path::new("out/a.mp4")), PathBuf::from("out/a.mp4.part"));
        assert_ne!(part_path(Path::new("a.mp4")), part_path(Path::new("a.mov")));
    }

    #[tokio::test]
    async fn test_failed_write_removes_partial_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fake-mp4".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("fox.mp4");
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(target.join("keep"), b"x").unwrap();
        let reference = VideoReference::new(format!("{}/files/v1?key=abc", server.uri())).unwrap();

        let exporter = VideoExporter::new(Arc::new(HttpClient::new().unwrap()));
        let err = exporter.export(&reference, &target).await.unwrap_err();

        assert!(matches!(err, FetchError::Io(_)), "got {err:?}");
        assert!(!dir.path().join("fox.mp4.part").exists());
        assert!(target.join("keep").exists());
    }

    #[tokio::test]
    async fn test_export_failure_leaves_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("fox.mp4");
        let reference = VideoReference::new(format!("{}/files/v1?key=bad", server.uri())).unwrap();

        let exporter = VideoExporter::new(Arc::new(HttpClient::new().unwrap()));
        let err = exporter.export(&reference, &target).await.unwrap_err();

        assert!(matches!(err, FetchError::Api { status: 403, .. }));
        assert!(!target.exists());
    }
}
