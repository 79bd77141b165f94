use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tokio::sync::{mpsc, oneshot};

use super::notifications::NotificationRequest;
use super::{RequestHandler, Service, ServiceError};
use crate::models::users::{Registration, UserBalance};
use crate::repositories::UserRepository;

const REFERRAL_BONUS_TEXT: &str =
    "Someone used your referral code! You've earned 1 free video generation.";

pub enum UserRequest {
    Register {
        external_id: i64,
        display_name: Option<String>,
        referral_code: Option<String>,
        response: oneshot::Sender<Result<Registration, ServiceError>>,
    },
    Balance {
        external_id: i64,
        response: oneshot::Sender<Result<Option<UserBalance>, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct UserRequestHandler {
    repository: UserRepository,
    notifications: mpsc::Sender<NotificationRequest>,
}

impl UserRequestHandler {
    pub fn new(
        sql_conn: SqlitePool,
        default_free_generations: i64,
        notifications: mpsc::Sender<NotificationRequest>,
    ) -> Self {
        let repository = UserRepository::new(sql_conn, default_free_generations);

        UserRequestHandler {
            repository,
            notifications,
        }
    }

    async fn register(
        &self,
        external_id: i64,
        display_name: Option<&str>,
        referral_code: Option<&str>,
    ) -> Result<Registration, ServiceError> {
        let registration = self
            .repository
            .create_user(external_id, display_name, referral_code)
            .await
            .map_err(|e| ServiceError::Repository("Users".to_string(), e.to_string()))?;

        // The referrer bonus message must never fail registration; hand it
        // to the notification service and move on.
        if registration.created {
            if let Some(referrer) = &registration.credited_referrer {
                let notifications = self.notifications.clone();
                let referrer_external_id = referrer.external_id;

                tokio::spawn(async move {
                    let _ = notifications
                        .send(NotificationRequest::Send {
                            external_user_id: referrer_external_id,
                            text: REFERRAL_BONUS_TEXT.to_string(),
                        })
                        .await;
                });
            }
        }

        Ok(registration)
    }

    async fn balance(&self, external_id: i64) -> Result<Option<UserBalance>, ServiceError> {
        let user = self
            .repository
            .get_user(external_id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;

        let now = Utc::now().naive_utc();
        Ok(user.map(|user| UserBalance::of(&user, now)))
    }
}

#[async_trait]
impl RequestHandler<UserRequest> for UserRequestHandler {
    async fn handle_request(&self, request: UserRequest) {
        match request {
            UserRequest::Register {
                external_id,
                display_name,
                referral_code,
                response,
            } => {
                let registration = self
                    .register(external_id, display_name.as_deref(), referral_code.as_deref())
                    .await;
                let _ = response.send(registration);
            }
            UserRequest::Balance {
                external_id,
                response,
            } => {
                let balance = self.balance(external_id).await;
                let _ = response.send(balance);
            }
        }
    }
}

pub struct UserService;

impl UserService {
    pub fn new() -> Self {
        UserService {}
    }
}

impl Default for UserService {
    fn default() -> Self {
        UserService::new()
    }
}

#[async_trait]
impl Service<UserRequest, UserRequestHandler> for UserService {}
