use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::filter::ProfanityFilter;
use crate::generation::VideoGenerator;
use crate::models::videos::VideoSource;
use crate::repositories::{RepositoryError, UserRepository, VideoRepository};

/// What the front end renders after a prompt. Every variant is a normal,
/// recoverable outcome; transport and storage faults surface separately as
/// `ServiceError`.
#[derive(Clone, Debug, PartialEq)]
pub enum PromptOutcome {
    /// Prompt tripped the content filter; nothing was charged or stored.
    Blocked,
    /// Unknown external id; the user should register first.
    NotRegistered,
    /// No free generations left; the purchase path applies.
    QuotaExhausted { stars: i64 },
    /// The provider produced no video; the quota was not touched.
    GenerationFailed,
    Success {
        source: VideoSource,
        remaining_free: i64,
    },
}

pub enum PromptRequest {
    Generate {
        external_id: i64,
        prompt: String,
        response: oneshot::Sender<Result<PromptOutcome, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct PromptRequestHandler {
    filter: ProfanityFilter,
    users: UserRepository,
    videos: VideoRepository,
    generator: Arc<dyn VideoGenerator>,
    default_duration_secs: u32,
}

impl PromptRequestHandler {
    pub fn new(
        sql_conn: SqlitePool,
        filter: ProfanityFilter,
        generator: Arc<dyn VideoGenerator>,
        default_duration_secs: u32,
    ) -> Self {
        // The prompt flow never creates users, so the repository's creation
        // default is irrelevant here.
        let users = UserRepository::new(sql_conn.clone(), 0);
        let videos = VideoRepository::new(sql_conn);

        PromptRequestHandler {
            filter,
            users,
            videos,
            generator,
            default_duration_secs,
        }
    }

    /// The full prompt-to-video flow. The quota is only spent after a
    /// confirmed successful generation; a failed one costs nothing.
    pub async fn handle_prompt(
        &self,
        external_id: i64,
        prompt: &str,
    ) -> Result<PromptOutcome, ServiceError> {
        if !self.filter.is_safe(prompt) {
            log::info!("prompt from {} rejected by content filter", external_id);
            return Ok(PromptOutcome::Blocked);
        }

        let user = match self
            .users
            .get_user(external_id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?
        {
            Some(user) => user,
            None => return Ok(PromptOutcome::NotRegistered),
        };

        if !user.has_available_free_generation() {
            return Ok(PromptOutcome::QuotaExhausted { stars: user.stars });
        }

        let source = match self
            .generator
            .generate(prompt, self.default_duration_secs)
            .await
        {
            Ok(source) => source,
            Err(err) => {
                log::error!("video generation failed for user {}: {}", external_id, err);
                return Ok(PromptOutcome::GenerationFailed);
            }
        };

        self.videos
            .record_video(&user.id, prompt, &source, true, 0)
            .await
            .map_err(|e| ServiceError::Repository("Videos".to_string(), e.to_string()))?;

        let remaining_free = match self.users.consume_free_generation(&user.id).await {
            Ok(remaining) => remaining,
            Err(RepositoryError::NoFreeGenerations) => {
                // A concurrent request won the decrement; the video is
                // already produced and recorded, so report an empty balance.
                log::warn!("free quota raced to zero for user {}", external_id);
                0
            }
            Err(err) => return Err(ServiceError::Database(err.to_string())),
        };

        Ok(PromptOutcome::Success {
            source,
            remaining_free,
        })
    }
}

#[async_trait]
impl RequestHandler<PromptRequest> for PromptRequestHandler {
    async fn handle_request(&self, request: PromptRequest) {
        match request {
            PromptRequest::Generate {
                external_id,
                prompt,
                response,
            } => {
                let outcome = self.handle_prompt(external_id, &prompt).await;
                let _ = response.send(outcome);
            }
        }
    }
}

pub struct PromptService;

impl PromptService {
    pub fn new() -> Self {
        PromptService {}
    }
}

impl Default for PromptService {
    fn default() -> Self {
        PromptService::new()
    }
}

#[async_trait]
impl Service<PromptRequest, PromptRequestHandler> for PromptService {}
