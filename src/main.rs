mod analysis;
mod commands;
mod gemini;
mod schedule;
mod state;
mod store;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use poise::serenity_prelude as serenity;
use poise::{Framework, FrameworkOptions};
use tokio::sync::RwLock;
use tracing::{error, info, warn, Level};

use gemini::GeminiClient;
use state::{AppState, DeskConfig};
use store::EpisodeStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .init();

    // Load env
    let _ = dotenv::dotenv();
    let token = dotenv::var("DISCORD_TOKEN").expect("DISCORD_TOKEN required");
    let guild_id: Option<serenity::GuildId> = dotenv::var("DISCORD_GUILD_ID")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(serenity::GuildId::new);

    // Init storage
    let data_dir = std::path::PathBuf::from(
        dotenv::var("DATA_DIR").unwrap_or_else(|_| "./data/episodes".to_string()),
    );
    let store = Arc::new(EpisodeStore::new(&data_dir).await?);
    info!("Episode store initialized at {:?}", data_dir);

    // Init AI client
    let gemini = Arc::new(GeminiClient::from_env()?);
    info!("Gemini client initialized");

    // Parse operator user IDs from env
    let operator_ids: HashSet<u64> = dotenv::var("OPERATOR_USER_IDS")
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse::<u64>().ok())
        .collect();
    if operator_ids.is_empty() {
        warn!("OPERATOR_USER_IDS is empty: every guild member can use the desk");
    } else {
        info!(count = operator_ids.len(), "Operators configured");
    }

    let app_state = AppState {
        store,
        gemini,
        operator_ids,
        desk_config: Arc::new(RwLock::new(DeskConfig::default())),
        drafts: Arc::new(RwLock::new(HashMap::new())),
    };

    let intents = serenity::GatewayIntents::GUILDS;

    let framework = Framework::builder()
        .options(FrameworkOptions {
            commands: vec![commands::episodes()],
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

    info!("Starting sermon desk bot...");

    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create client: {}", e))?;

    if let Err(e) = client.start().await {
        error!("Client error: {}", e);
    }

    Ok(())
}
