use std::sync::Arc;

use async_trait::async_trait;

use super::{RequestHandler, Service};

/// Fire-and-forget messages pushed back to users through the chat
/// collaborator. There is no response channel on purpose: senders must not
/// depend on delivery.
pub enum NotificationRequest {
    Send { external_user_id: i64, text: String },
}

#[derive(Debug, thiserror::Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Boundary to the excluded chat front end.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, external_user_id: i64, text: &str) -> Result<(), NotifyError>;
}

/// Default stand-in that records the message in the service log.
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn notify(&self, external_user_id: i64, text: &str) -> Result<(), NotifyError> {
        log::info!("notify [{}]: {}", external_user_id, text);
        Ok(())
    }
}

#[derive(Clone)]
pub struct NotificationRequestHandler {
    notifier: Arc<dyn Notifier>,
}

impl NotificationRequestHandler {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        NotificationRequestHandler { notifier }
    }
}

#[async_trait]
impl RequestHandler<NotificationRequest> for NotificationRequestHandler {
    async fn handle_request(&self, request: NotificationRequest) {
        match request {
            NotificationRequest::Send {
                external_user_id,
                text,
            } => {
                if let Err(err) = self.notifier.notify(external_user_id, &text).await {
                    log::warn!("dropping notification for {}: {}", external_user_id, err);
                }
            }
        }
    }
}

pub struct NotificationService;

impl NotificationService {
    pub fn new() -> Self {
        NotificationService {}
    }
}

impl Default for NotificationService {
    fn default() -> Self {
        NotificationService::new()
    }
}

#[async_trait]
impl Service<NotificationRequest, NotificationRequestHandler> for NotificationService {}
