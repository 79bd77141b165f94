use std::path::Path;

use clap::Parser;
use sqlx::sqlite::SqlitePoolOptions;

use reelsmith::{repositories, services, settings::Settings, utils};

#[derive(Parser)]
#[command(name = "reelsmith", about = "Prompt-to-video generation service")]
struct Cli {
    /// Name of the configuration file (without extension).
    #[arg(long, default_value = "config")]
    config: String,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    utils::init_logging(Path::new("reelsmith.log")).expect("Could not initialize logging.");

    let config = Settings::from_file(&cli.config).expect("Could not load configuration.");

    if config.bot.token.is_empty() {
        log::warn!("bot token is not configured; the chat front end cannot authenticate");
    }

    tokio::fs::create_dir_all(&config.storage.videos_dir)
        .await
        .expect("Could not create the videos directory.");

    let conn = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database.url)
        .await
        .expect("Could not connect to database.");

    repositories::run_migrations(&conn)
        .await
        .expect("Could not initialize the database schema.");

    log::info!("starting services");
    // The handles are what a chat front end drives; the binary only keeps
    // the services alive until shutdown.
    let _handles = services::start_services(conn, config)
        .await
        .expect("Could not start services.");

    tokio::signal::ctrl_c()
        .await
        .expect("Could not listen for the shutdown signal.");
    log::info!("shutting down");
}
