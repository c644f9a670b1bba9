mod bot;
mod commands;
mod config;
mod health;
mod platform;
mod relay;
mod transport;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, HEALTH_ADDR};
use crate::health::HealthCheck;
use crate::platform::telegram::{build_bot, TelegramPlatform};
use crate::platform::Platform;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize logging
    let default_filter = if config.debug {
        "info,nozomi=debug,teloxide=debug"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config.debug {
        info!("Running in debug mode due to DEBUG environment variable");
    }

    let bot = build_bot(&config.token)?;
    let telegram = TelegramPlatform::new(bot.clone());
    telegram.authorize().await?;
    let platform: Arc<dyn Platform> = Arc::new(telegram);

    let source = transport::select(&bot, &config).await?;
    health::spawn(HEALTH_ADDR, HealthCheck::new(source.mode(), Arc::clone(&platform)));

    tokio::select! {
        _ = bot::run(platform, source) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl-C, shutting down");
        }
    }

    Ok(())
}
