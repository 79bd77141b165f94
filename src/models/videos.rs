use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Where a generated video lives. Delivery code matches on the variant
/// instead of sniffing string prefixes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoSource {
    Remote(String),
    Local(PathBuf),
}

impl VideoSource {
    pub fn kind(&self) -> &'static str {
        match self {
            VideoSource::Remote(_) => "remote",
            VideoSource::Local(_) => "local",
        }
    }

    pub fn location(&self) -> String {
        match self {
            VideoSource::Remote(url) => url.clone(),
            VideoSource::Local(path) => path.to_string_lossy().into_owned(),
        }
    }

    pub fn from_columns(kind: &str, value: &str) -> Option<VideoSource> {
        match kind {
            "remote" => Some(VideoSource::Remote(value.to_string())),
            "local" => Some(VideoSource::Local(PathBuf::from(value))),
            _ => None,
        }
    }

    pub fn as_local_path(&self) -> Option<&Path> {
        match self {
            VideoSource::Remote(_) => None,
            VideoSource::Local(path) => Some(path),
        }
    }

    /// Best-effort disposal of the transient scratch file once the video has
    /// been delivered. Remote sources have nothing to dispose; a failed
    /// delete is logged and swallowed.
    pub async fn cleanup(&self) {
        if let VideoSource::Local(path) = self {
            if let Err(err) = tokio::fs::remove_file(path).await {
                log::warn!("could not delete scratch video {}: {}", path.display(), err);
            }
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct VideoRecord {
    pub id: String,
    pub user_id: String,
    pub prompt: String,
    pub source_kind: String,
    pub source: String,
    pub created_at: chrono::NaiveDateTime,
    pub used_free: bool,
    pub used_stars: i64,
}

impl VideoRecord {
    pub fn video_source(&self) -> Option<VideoSource> {
        VideoSource::from_columns(&self.source_kind, &self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_round_trip_both_variants() {
        let remote = VideoSource::Remote("https://example.com/clip.mp4".to_string());
        let local = VideoSource::Local(PathBuf::from("/tmp/clip.mp4"));

        assert_eq!(
            VideoSource::from_columns(remote.kind(), &remote.location()),
            Some(remote)
        );
        assert_eq!(
            VideoSource::from_columns(local.kind(), &local.location()),
            Some(local)
        );
        assert_eq!(VideoSource::from_columns("ftp", "whatever"), None);
    }

    #[tokio::test]
    async fn cleanup_removes_local_file_and_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        tokio::fs::write(&path, b"video").await.unwrap();

        let source = VideoSource::Local(path.clone());
        source.cleanup().await;
        assert!(!path.exists());

        // Second cleanup fails to delete; logged, not fatal.
        source.cleanup().await;

        VideoSource::Remote("https://example.com/clip.mp4".to_string())
            .cleanup()
            .await;
    }
}
