use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::filter::DEFAULT_BLOCKED_WORDS;

#[derive(Debug, Deserialize)]
pub struct Bot {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct Generation {
    pub use_mock: bool,
    pub use_replicate: bool,
    pub default_duration_secs: u32,
    pub free_generations: i64,
    pub mock_delay_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct Replicate {
    pub api_token: String,
    pub base_url: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
    pub videos_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct Content {
    pub blocked_words: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub bot: Bot,
    pub database: Database,
    pub generation: Generation,
    pub replicate: Replicate,
    pub storage: Storage,
    pub content: Content,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_file("config")
    }

    /// Loads settings from an optional TOML file, then applies the
    /// `REELSMITH__SECTION__KEY` environment overlay. Every key has a coded
    /// default, so a missing file is not an error.
    pub fn from_file(name: &str) -> Result<Self, ConfigError> {
        let blocked_words: Vec<String> = DEFAULT_BLOCKED_WORDS
            .iter()
            .map(|word| word.to_string())
            .collect();

        let config = Config::builder()
            .set_default("bot.token", "")?
            .set_default("database.url", "sqlite://reelsmith.db?mode=rwc")?
            .set_default("generation.use_mock", true)?
            .set_default("generation.use_replicate", false)?
            .set_default("generation.default_duration_secs", 4)?
            .set_default("generation.free_generations", 3)?
            .set_default("generation.mock_delay_ms", 2000)?
            .set_default("replicate.api_token", "")?
            .set_default("replicate.base_url", "https://api.replicate.com/v1")?
            .set_default("storage.videos_dir", "videos")?
            .set_default("content.blocked_words", blocked_words)?
            .add_source(File::with_name(name).required(false))
            .add_source(
                Environment::with_prefix("REELSMITH")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        config.try_deserialize()
    }
}
