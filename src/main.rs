use anyhow::{Context, Result};
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{info, warn};

use nutribot::analysis::{AnalysisClient, NutritionAnalyzer};
use nutribot::bot::{self, BotController};
use nutribot::config::AppConfig;
use nutribot::db::PgHistoryStore;
use nutribot::history::{HistoryStore, InMemoryHistoryStore};
use nutribot::localization::init_localization;
use nutribot::observability::init_tracing;
use nutribot::preprocessing::ImagePreprocessor;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let config = AppConfig::from_env()?;

    init_tracing(config.log_format)?;
    info!("Starting NutriBot");
    info!(?config, "Configuration loaded");

    init_localization();

    let store: Arc<dyn HistoryStore> = match &config.database_url {
        Some(database_url) => {
            info!("Initializing PostgreSQL history store");
            Arc::new(PgHistoryStore::connect(database_url).await?)
        }
        None => {
            warn!("DATABASE_URL not set, history is kept in memory and lost on restart");
            Arc::new(InMemoryHistoryStore::new())
        }
    };

    let analyzer: Arc<dyn NutritionAnalyzer> = Arc::new(AnalysisClient::new(config.analysis.clone())?);

    let bot = Bot::new(config.telegram_token.clone());
    let me = bot.get_me().await.context("Failed to fetch bot info")?;

    let mut controller = BotController::new(
        store,
        analyzer,
        ImagePreprocessor::new(config.preprocess.clone()),
        config.request_timeout,
    );
    if let Some(username) = me.user.username.clone() {
        info!(username = %username, "Running as bot");
        controller = controller.with_bot_username(username);
    }
    let controller = Arc::new(controller);

    info!("Bot initialized, starting dispatcher");

    let handler = dptree::entry().branch(Update::filter_message().endpoint({
        let controller = Arc::clone(&controller);
        move |bot: Bot, msg: Message| {
            let controller = Arc::clone(&controller);
            async move { bot::message_handler(bot, msg, controller).await }
        }
    }));

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Dispatcher stopped");
    Ok(())
}
