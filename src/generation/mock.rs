use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use super::{download_to, GenerationError, VideoGenerator};
use crate::models::videos::VideoSource;

/// Publicly hosted stock clips handed out instead of real generations.
pub const SAMPLE_VIDEOS: &[&str] = &[
    "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/BigBuckBunny.mp4",
    "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/ElephantsDream.mp4",
    "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/ForBiggerBlazes.mp4",
    "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/ForBiggerEscapes.mp4",
    "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/ForBiggerFun.mp4",
];

/// Development strategy: waits a configurable moment, picks a stock sample
/// uniformly, and downloads it into the scratch directory. A failed download
/// degrades to handing back the remote URL; this strategy never reports a
/// generation failure.
pub struct MockGenerator {
    samples: Vec<String>,
    delay: Duration,
    videos_dir: PathBuf,
    http: reqwest::Client,
}

impl MockGenerator {
    pub fn new(videos_dir: PathBuf, delay: Duration) -> Self {
        let samples = SAMPLE_VIDEOS.iter().map(|url| url.to_string()).collect();
        Self::with_samples(videos_dir, delay, samples)
    }

    /// `samples` must be non-empty.
    pub fn with_samples(videos_dir: PathBuf, delay: Duration, samples: Vec<String>) -> Self {
        MockGenerator {
            samples,
            delay,
            videos_dir,
            http: reqwest::Client::new(),
        }
    }

    fn pick_sample(&self) -> &str {
        let index = (Uuid::new_v4().as_u128() % self.samples.len() as u128) as usize;
        &self.samples[index]
    }
}

#[async_trait]
impl VideoGenerator for MockGenerator {
    async fn generate(
        &self,
        prompt: &str,
        _duration_secs: u32,
    ) -> Result<VideoSource, GenerationError> {
        log::info!("mock generation for prompt: '{}'", prompt);
        tokio::time::sleep(self.delay).await;

        let url = self.pick_sample().to_string();
        let dest = self
            .videos_dir
            .join(format!("mock_video_{}.mp4", Uuid::new_v4().hyphenated()));

        match download_to(&self.http, &url, &dest).await {
            Ok(path) => {
                log::info!("sample video downloaded to {}", path.display());
                Ok(VideoSource::Local(path))
            }
            Err(err) => {
                log::error!("sample download failed ({}), returning remote url", err);
                Ok(VideoSource::Remote(url))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_sample_stays_in_bounds() {
        let generator = MockGenerator::new(PathBuf::from("videos"), Duration::ZERO);
        for _ in 0..100 {
            let url = generator.pick_sample();
            assert!(SAMPLE_VIDEOS.contains(&url));
        }
    }
}
