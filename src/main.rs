mod commands;
mod config;
mod docs;
mod error;
mod llm;
mod rag;
mod state;

use std::sync::Arc;

use poise::serenity_prelude as serenity;
use poise::{Framework, FrameworkOptions};
use tracing::{error, info};

use config::Settings;
use docs::cache::FreshnessCache;
use docs::ingest::{Acquirer, HttpFetcher};
use docs::PageArchive;
use llm::LlmClient;
use rag::synth::Synthesizer;
use rag::RagEngine;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load env
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_max_level(config::log_level_from_env())
        .init();

    let settings = Settings::from_env();

    let token = dotenv::var("DISCORD_TOKEN").expect("DISCORD_TOKEN required");
    let guild_id: Option<serenity::GuildId> = dotenv::var("DISCORD_GUILD_ID")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(serenity::GuildId::new);

    let sources = settings.sources()?;
    let weights = settings.keyword_weights()?;
    info!(
        sources = sources.len(),
        keywords = weights.weights.len(),
        "Configuration loaded"
    );

    // Init storage
    let archive = Arc::new(PageArchive::new(&settings.data_dir).await?);
    info!("Page archive initialized at {:?}", settings.data_dir);

    // Init LLM client
    let llm_client = Arc::new(LlmClient::from_env()?);
    info!(model = llm_client.model(), "LLM client initialized");

    let fetcher = Arc::new(HttpFetcher::new(settings.fetch_timeout)?);
    let acquirer = Acquirer::new(fetcher, sources, settings.fetch_delay);
    let cache = Arc::new(FreshnessCache::new(acquirer, settings.cache_ttl));
    let synthesizer = Arc::new(Synthesizer::new(llm_client, settings.model_timeout));
    let engine = Arc::new(
        RagEngine::new(cache, synthesizer, weights).with_archive(archive.clone()),
    );

    if !settings.admin_ids.is_empty() {
        info!(count = settings.admin_ids.len(), "Admin users configured");
    }

    // Warm the cache so the first question rarely waits on the fetch.
    {
        let engine = engine.clone();
        tokio::spawn(async move {
            let summary = engine.force_refresh().await;
            info!(
                live = summary.live,
                fallback = summary.fallback,
                "Initial refresh complete"
            );
        });
    }

    let app_state = AppState {
        engine,
        archive,
        admin_ids: settings.admin_ids.clone(),
    };

    let intents =
        serenity::GatewayIntents::GUILDS | serenity::GatewayIntents::GUILD_MESSAGES;

    let framework = Framework::builder()
        .options(FrameworkOptions {
            commands: vec![commands::campus()],
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Bot connected as: {} ({})", ready.user.name, ready.user.id);

                let commands = &framework.options().commands;
                info!("Registering {} top-level command(s):", commands.len());
                for cmd in commands {
                    info!("  /{} ({} subcommands)", cmd.name, cmd.subcommands.len());
                    for sub in &cmd.subcommands {
                        info!("    /{} {}", cmd.name, sub.name);
                    }
                }

                if let Some(gid) = guild_id {
                    info!("Registering to guild {} (instant)", gid);
                    poise::builtins::register_in_guild(
                        ctx,
                        &framework.options().commands,
                        gid,
                    )
                    .await?;
                } else {
                    info!("Registering globally (up to 1 hour delay)");
                    poise::builtins::register_globally(
                        ctx,
                        &framework.options().commands,
                    )
                    .await?;
                }

                Ok(app_state)
            })
        })
        .build();

    info!("Starting campus assistant bot...");

    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create client: {}", e))?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            shard_manager.shutdown_all().await;
        }
    });

    if let Err(e) = client.start().await {
        error!("Client error: {}", e);
    }

    info!("Bot stopped");
    Ok(())
}
