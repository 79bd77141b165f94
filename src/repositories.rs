use sqlx::SqlitePool;

pub mod users;
pub mod videos;

pub use users::UserRepository;
pub use videos::VideoRepository;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("user not found")]
    UserNotFound,
    #[error("no free generations left")]
    NoFreeGenerations,
    #[error("could not allocate a unique referral code")]
    ReferralCodeExhausted,
}

/// Creates the schema on a fresh database. Safe to run on every startup.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), RepositoryError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            external_id INTEGER NOT NULL UNIQUE,
            display_name TEXT,
            free_generations INTEGER NOT NULL DEFAULT 3,
            stars INTEGER NOT NULL DEFAULT 0,
            referral_code TEXT NOT NULL UNIQUE,
            referred_by TEXT,
            created_at DATETIME NOT NULL,
            free_plan_expires_at DATETIME NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS videos (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            prompt TEXT NOT NULL,
            source_kind TEXT NOT NULL,
            source TEXT NOT NULL,
            created_at DATETIME NOT NULL,
            used_free BOOLEAN NOT NULL DEFAULT FALSE,
            used_stars INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_videos_user_id ON videos (user_id)")
        .execute(pool)
        .await?;

    Ok(())
}
