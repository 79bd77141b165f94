//! Client for the Replicate predictions API (Stable Video Diffusion).

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{download_to, GenerationError, PollPolicy, VideoGenerator};
use crate::models::videos::VideoSource;

/// Pinned Stable Video Diffusion release. Part of the provider contract;
/// changing it changes which model runs.
pub const MODEL_VERSION: &str =
    "3f0457e4619daac51203dedb472816fd4af51f3149fa7a9e0b5ffcf1b8172438";

const VIDEO_LENGTH: &str = "14_frames_with_svd";
const SIZING_STRATEGY: &str = "maintain_aspect_ratio";
const FRAMES_PER_SECOND: u32 = 7;
const MOTION_BUCKET_ID: u32 = 40;
const COND_AUG: f64 = 0.02;
const DECODING_T: u32 = 7;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct PredictionRequest<'a> {
    version: &'static str,
    input: PredictionInput<'a>,
}

#[derive(Debug, Serialize)]
struct PredictionInput<'a> {
    prompt: &'a str,
    video_length: &'static str,
    sizing_strategy: &'static str,
    frames_per_second: u32,
    motion_bucket_id: u32,
    cond_aug: f64,
    decoding_t: u32,
}

impl<'a> PredictionRequest<'a> {
    fn for_prompt(prompt: &'a str) -> Self {
        PredictionRequest {
            version: MODEL_VERSION,
            input: PredictionInput {
                prompt,
                video_length: VIDEO_LENGTH,
                sizing_strategy: SIZING_STRATEGY,
                frames_per_second: FRAMES_PER_SECOND,
                motion_bucket_id: MOTION_BUCKET_ID,
                cond_aug: COND_AUG,
                decoding_t: DECODING_T,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    output: Option<Vec<String>>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

impl Prediction {
    fn error_text(&self) -> String {
        match &self.error {
            Some(serde_json::Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => "no error detail".to_string(),
        }
    }
}

/// One status check, folded into the three transitions the poll loop
/// distinguishes.
#[derive(Debug)]
enum PredictionState {
    InProgress,
    Succeeded(String),
    Failed(String),
}

/// Remote strategy: submit a prediction, poll it to a terminal state under a
/// bounded schedule, then download the output.
pub struct ReplicateClient {
    api_token: String,
    base_url: String,
    videos_dir: PathBuf,
    policy: PollPolicy,
    http: reqwest::Client,
}

impl ReplicateClient {
    /// Fails immediately when no API token is configured, so a misconfigured
    /// deployment is caught at startup rather than on the first prompt.
    pub fn new(
        api_token: String,
        base_url: String,
        videos_dir: PathBuf,
        policy: PollPolicy,
    ) -> Result<Self, GenerationError> {
        if api_token.is_empty() {
            return Err(GenerationError::MissingApiToken);
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(ReplicateClient {
            api_token,
            base_url,
            videos_dir,
            policy,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submits the prediction. Anything other than a created response with a
    /// job id is a hard failure; submission is never retried.
    async fn submit(&self, prompt: &str) -> Result<String, GenerationError> {
        let response = self
            .http
            .post(format!("{}/predictions", self.base_url))
            .header("Authorization", format!("Token {}", self.api_token))
            .json(&PredictionRequest::for_prompt(prompt))
            .send()
            .await?;

        if response.status() != StatusCode::CREATED {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unreadable body".to_string());
            return Err(GenerationError::Submission(format!(
                "unexpected status {}: {}",
                status, body
            )));
        }

        let prediction: Prediction = response.json().await?;
        prediction
            .id
            .ok_or_else(|| GenerationError::Submission("no prediction id in response".to_string()))
    }

    async fn check(&self, prediction_id: &str) -> Result<PredictionState, GenerationError> {
        let response = self
            .http
            .get(format!("{}/predictions/{}", self.base_url, prediction_id))
            .header("Authorization", format!("Token {}", self.api_token))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GenerationError::Poll(format!(
                "unexpected status {}",
                response.status()
            )));
        }

        let prediction: Prediction = response.json().await?;
        let status = prediction.status.as_deref().unwrap_or("");

        match status {
            "succeeded" => match prediction.output.as_ref().and_then(|urls| urls.first()) {
                Some(url) => Ok(PredictionState::Succeeded(url.clone())),
                None => Ok(PredictionState::Failed(
                    "prediction succeeded without output".to_string(),
                )),
            },
            "failed" => Ok(PredictionState::Failed(prediction.error_text())),
            "starting" | "processing" => Ok(PredictionState::InProgress),
            other => Ok(PredictionState::Failed(format!(
                "unrecognized prediction status: {}",
                other
            ))),
        }
    }

    /// Polls until a terminal state or the attempt ceiling. A failed status
    /// check is tolerated as transient but still spends an attempt, so the
    /// total wait is bounded even against a dead provider.
    async fn await_completion(&self, prediction_id: &str) -> Result<String, GenerationError> {
        for attempt in 1..=self.policy.max_attempts {
            match self.check(prediction_id).await {
                Ok(PredictionState::Succeeded(url)) => return Ok(url),
                Ok(PredictionState::Failed(reason)) => {
                    return Err(GenerationError::Failed(reason))
                }
                Ok(PredictionState::InProgress) => {
                    log::debug!(
                        "prediction {} in progress ({}/{})",
                        prediction_id,
                        attempt,
                        self.policy.max_attempts
                    );
                }
                Err(err) => {
                    log::warn!(
                        "status check for {} failed ({}/{}): {}",
                        prediction_id,
                        attempt,
                        self.policy.max_attempts,
                        err
                    );
                }
            }

            tokio::time::sleep(self.policy.interval).await;
        }

        Err(GenerationError::TimedOut {
            attempts: self.policy.max_attempts,
        })
    }
}

#[async_trait]
impl VideoGenerator for ReplicateClient {
    async fn generate(
        &self,
        prompt: &str,
        _duration_secs: u32,
    ) -> Result<VideoSource, GenerationError> {
        let prediction_id = self.submit(prompt).await?;
        log::info!("prediction started with id {}", prediction_id);

        let output_url = self.await_completion(&prediction_id).await?;
        log::info!("prediction {} succeeded: {}", prediction_id, output_url);

        let dest = self
            .videos_dir
            .join(format!("replicate_video_{}.mp4", Uuid::new_v4().hyphenated()));

        match download_to(&self.http, &output_url, &dest).await {
            Ok(path) => Ok(VideoSource::Local(path)),
            Err(err) => {
                log::error!(
                    "download of {} failed ({}), returning remote url",
                    output_url,
                    err
                );
                Ok(VideoSource::Remote(output_url))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_matches_provider_contract() {
        let body = serde_json::to_value(PredictionRequest::for_prompt("sunset over mountains"))
            .unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "version": MODEL_VERSION,
                "input": {
                    "prompt": "sunset over mountains",
                    "video_length": "14_frames_with_svd",
                    "sizing_strategy": "maintain_aspect_ratio",
                    "frames_per_second": 7,
                    "motion_bucket_id": 40,
                    "cond_aug": 0.02,
                    "decoding_t": 7
                }
            })
        );
    }

    #[test]
    fn missing_token_fails_at_construction() {
        let result = ReplicateClient::new(
            String::new(),
            "https://api.replicate.com/v1".to_string(),
            PathBuf::from("videos"),
            PollPolicy::default(),
        );

        assert!(matches!(result, Err(GenerationError::MissingApiToken)));
    }

    #[test]
    fn prediction_error_text_handles_shapes() {
        let with_text: Prediction = serde_json::from_str(
            r#"{"id": "p1", "status": "failed", "error": "NSFW content detected"}"#,
        )
        .unwrap();
        assert_eq!(with_text.error_text(), "NSFW content detected");

        let without: Prediction = serde_json::from_str(r#"{"id": "p1", "status": "failed"}"#).unwrap();
        assert_eq!(without.error_text(), "no error detail");
    }
}
