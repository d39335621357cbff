use std::path::Path;
use std::sync::Arc;

use teloxide::Bot;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;

use racebot::config::Config;
use racebot::ergast::ErgastClient;
use racebot::service::F1Service;
use racebot::telegram;
use racebot::vk::VkBot;

fn init_logging(log_dir: &Path) -> std::io::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("racebot.log"))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(log_file);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();
    Ok(guard)
}

#[tokio::main]
async fn main() {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    let _guard = match init_logging(&config.log_dir) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to open log file in {}: {e}", config.log_dir.display());
            std::process::exit(1);
        }
    };

    info!("Starting racebot");
    info!("Upstream: {}, display zone: {}", config.ergast_url, config.display_tz);

    let storage = match ErgastClient::new(config.ergast_url.clone()) {
        Ok(storage) => storage,
        Err(e) => {
            error!("Failed to build upstream client: {e}");
            std::process::exit(1);
        }
    };
    let service = Arc::new(F1Service::new(storage, config.display_tz));

    let vk_bot = match VkBot::new(&config, service.clone()) {
        Ok(bot) => bot,
        Err(e) => {
            error!("Failed to build VK client: {e}");
            std::process::exit(1);
        }
    };
    let vk_task = tokio::spawn(async move {
        if let Err(e) = vk_bot.run().await {
            error!("VK bot stopped: {e}");
        }
    });

    telegram::run(Bot::new(&config.telegram_bot_token), service).await;

    vk_task.abort();
    info!("Stopped");
}
