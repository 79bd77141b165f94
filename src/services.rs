use async_trait::async_trait;
use sqlx::SqlitePool;
use tokio::sync::mpsc;

use crate::filter::ProfanityFilter;
use crate::generation;
use crate::settings::Settings;

pub mod notifications;
pub mod prompts;
pub mod users;

const CHANNEL_CAPACITY: usize = 512;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("internal error: {0}")]
    Internal(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("repository error: {0} - {1}")]
    Repository(String, String),
    #[error("generation error: {0}")]
    Generation(String),
}

#[async_trait]
pub trait RequestHandler<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle_request(&self, request: T);
}

/// Drains a request channel, handling each request in its own task so a
/// slow request (a two-minute generation) never holds up the queue.
#[async_trait]
pub trait Service<T, H>: Send + Sync + 'static
where
    T: Send + 'static,
    H: RequestHandler<T> + Clone + Send,
{
    async fn run(&mut self, handler: H, receiver: &mut mpsc::Receiver<T>) {
        while let Some(request) = receiver.recv().await {
            let handler = handler.clone();

            tokio::spawn(async move {
                handler.handle_request(request).await;
            });
        }
    }
}

/// Request channels held by the front-end collaborator.
pub struct Handles {
    pub users: mpsc::Sender<users::UserRequest>,
    pub prompts: mpsc::Sender<prompts::PromptRequest>,
    pub notifications: mpsc::Sender<notifications::NotificationRequest>,
}

pub async fn start_services(
    pool: SqlitePool,
    settings: Settings,
) -> Result<Handles, anyhow::Error> {
    let generator = generation::from_settings(&settings)?;
    let filter = ProfanityFilter::new(&settings.content.blocked_words);

    let (notification_tx, mut notification_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (user_tx, mut user_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (prompt_tx, mut prompt_rx) = mpsc::channel(CHANNEL_CAPACITY);

    let mut notification_service = notifications::NotificationService::new();
    let mut user_service = users::UserService::new();
    let mut prompt_service = prompts::PromptService::new();

    log::info!("starting notification service");
    tokio::spawn(async move {
        let handler = notifications::NotificationRequestHandler::new(std::sync::Arc::new(
            notifications::LoggingNotifier,
        ));
        notification_service
            .run(handler, &mut notification_rx)
            .await;
    });

    log::info!("starting user service");
    let user_pool = pool.clone();
    let user_notification_tx = notification_tx.clone();
    let free_generations = settings.generation.free_generations;
    tokio::spawn(async move {
        user_service
            .run(
                users::UserRequestHandler::new(user_pool, free_generations, user_notification_tx),
                &mut user_rx,
            )
            .await;
    });

    log::info!("starting prompt service");
    let prompt_pool = pool.clone();
    let default_duration = settings.generation.default_duration_secs;
    tokio::spawn(async move {
        prompt_service
            .run(
                prompts::PromptRequestHandler::new(
                    prompt_pool,
                    filter,
                    generator,
                    default_duration,
                ),
                &mut prompt_rx,
            )
            .await;
    });

    Ok(Handles {
        users: user_tx,
        prompts: prompt_tx,
        notifications: notification_tx,
    })
}
