use std::sync::Arc;

use news_digest::bot::{ChannelStore, DigestBot};
use news_digest::config::Config;
use news_digest::llm::{LlmAnalyst, create_provider};
use news_digest::pipeline::DigestPipeline;
use news_digest::sources::TelegramSource;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  required: TELEGRAM_BOT_TOKEN, LLM_API_KEY");
        std::process::exit(1);
    });

    eprintln!("📰 news-digest v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);
    eprintln!("   Limit per channel: {}", config.default_limit_per_channel);
    eprintln!("   Data dir: {}\n", config.data_dir.display());

    let llm = create_provider(&config.llm);
    let analyst = Arc::new(LlmAnalyst::new(llm));
    let source = Arc::new(TelegramSource::new(config.bot_token.clone()));
    let pipeline = Arc::new(DigestPipeline::new(source, analyst));

    let store = ChannelStore::load(config.data_dir.join("user_channels.json")).await?;

    let bot = DigestBot::new(
        config.bot_token,
        pipeline,
        store,
        config.default_limit_per_channel,
        config.max_channels_per_user,
    );
    bot.run().await?;

    Ok(())
}
