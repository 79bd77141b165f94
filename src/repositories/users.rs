use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::RepositoryError;
use crate::models::users::{Registration, User, FREE_PLAN_DAYS};

const REFERRAL_CODE_LEN: usize = 8;
const REFERRAL_CODE_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct UserRepository {
    conn: SqlitePool,
    default_free_generations: i64,
}

impl UserRepository {
    pub fn new(conn: SqlitePool, default_free_generations: i64) -> Self {
        UserRepository {
            conn,
            default_free_generations,
        }
    }

    /// Registers the external id, or returns the existing profile untouched.
    ///
    /// A referral code that resolves to a different user credits that
    /// referrer with one free generation and records the attribution on the
    /// new row; the user's own code, or an unknown one, is silently ignored.
    pub async fn create_user(
        &self,
        external_id: i64,
        display_name: Option<&str>,
        referral_code_used: Option<&str>,
    ) -> Result<Registration, RepositoryError> {
        if let Some(existing) = self.get_user(external_id).await? {
            return Ok(Registration {
                user: existing,
                created: false,
                credited_referrer: None,
            });
        }

        let referrer = match referral_code_used {
            Some(code) => self
                .find_by_referral_code(code)
                .await?
                .filter(|referrer| referrer.external_id != external_id),
            None => None,
        };

        let user_id = Uuid::new_v4().hyphenated().to_string();
        let referral_code = self.allocate_referral_code().await?;
        let created_at = Utc::now().naive_utc();
        let free_plan_expires_at = created_at + Duration::days(FREE_PLAN_DAYS);

        let mut tx = self.conn.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users
            (id, external_id, display_name, free_generations, stars,
             referral_code, referred_by, created_at, free_plan_expires_at)
            VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&user_id)
        .bind(external_id)
        .bind(display_name)
        .bind(self.default_free_generations)
        .bind(&referral_code)
        .bind(referrer.as_ref().map(|r| r.referral_code.as_str()))
        .bind(created_at)
        .bind(free_plan_expires_at)
        .execute(&mut *tx)
        .await?;

        if let Some(referrer) = &referrer {
            sqlx::query("UPDATE users SET free_generations = free_generations + 1 WHERE id = ?1")
                .bind(&referrer.id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        let user = self
            .get_user(external_id)
            .await?
            .ok_or(RepositoryError::UserNotFound)?;

        Ok(Registration {
            user,
            created: true,
            credited_referrer: referrer,
        })
    }

    pub async fn get_user(&self, external_id: i64) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE external_id = ?1")
            .bind(external_id)
            .fetch_optional(&self.conn)
            .await?;

        Ok(user)
    }

    pub async fn find_by_referral_code(
        &self,
        code: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE referral_code = ?1")
            .bind(code)
            .fetch_optional(&self.conn)
            .await?;

        Ok(user)
    }

    /// Atomic conditional decrement. The WHERE clause keeps the counter from
    /// ever going negative under concurrent requests; an affected-row count
    /// of zero means the quota was already spent. Returns the remaining
    /// count.
    pub async fn consume_free_generation(&self, user_id: &str) -> Result<i64, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET free_generations = free_generations - 1
            WHERE id = ?1 AND free_generations > 0
            "#,
        )
        .bind(user_id)
        .execute(&self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NoFreeGenerations);
        }

        let remaining =
            sqlx::query_scalar::<_, i64>("SELECT free_generations FROM users WHERE id = ?1")
                .bind(user_id)
                .fetch_optional(&self.conn)
                .await?
                .ok_or(RepositoryError::UserNotFound)?;

        Ok(remaining)
    }

    async fn allocate_referral_code(&self) -> Result<String, RepositoryError> {
        for _ in 0..REFERRAL_CODE_ATTEMPTS {
            let candidate = Uuid::new_v4().simple().to_string()[..REFERRAL_CODE_LEN].to_string();

            let taken =
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE referral_code = ?1")
                    .bind(&candidate)
                    .fetch_one(&self.conn)
                    .await?;

            if taken == 0 {
                return Ok(candidate);
            }
        }

        Err(RepositoryError::ReferralCodeExhausted)
    }
}
