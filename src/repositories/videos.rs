use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::RepositoryError;
use crate::models::videos::{VideoRecord, VideoSource};

#[derive(Clone)]
pub struct VideoRepository {
    conn: SqlitePool,
}

impl VideoRepository {
    pub fn new(conn: SqlitePool) -> Self {
        VideoRepository { conn }
    }

    /// Inserts the generation record. Rows are written exactly once per
    /// successful generation and never updated afterwards.
    pub async fn record_video(
        &self,
        user_id: &str,
        prompt: &str,
        source: &VideoSource,
        used_free: bool,
        used_stars: i64,
    ) -> Result<VideoRecord, RepositoryError> {
        let video_id = Uuid::new_v4().hyphenated().to_string();
        let created_at = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO videos
            (id, user_id, prompt, source_kind, source, created_at, used_free, used_stars)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&video_id)
        .bind(user_id)
        .bind(prompt)
        .bind(source.kind())
        .bind(source.location())
        .bind(created_at)
        .bind(used_free)
        .bind(used_stars)
        .execute(&self.conn)
        .await?;

        Ok(VideoRecord {
            id: video_id,
            user_id: user_id.to_string(),
            prompt: prompt.to_string(),
            source_kind: source.kind().to_string(),
            source: source.location(),
            created_at,
            used_free,
            used_stars,
        })
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<VideoRecord>, RepositoryError> {
        let videos = sqlx::query_as::<_, VideoRecord>(
            "SELECT * FROM videos WHERE user_id = ?1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.conn)
        .await?;

        Ok(videos)
    }

    pub async fn count_for_user(&self, user_id: &str) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM videos WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(&self.conn)
            .await?;

        Ok(count)
    }
}
