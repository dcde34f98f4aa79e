use super::require_operator;
use crate::schedule::dashboard::check_window_days;
use crate::state::Context;

/// View or change desk settings (operators only)
#[poise::command(slash_command, guild_only)]
pub async fn config(
    ctx: Context<'_>,
    #[description = "window_days | max_slots_per_site"] param: Option<String>,
    #[description = "New value"] value: Option<u32>,
) -> Result<(), anyhow::Error> {
    if !require_operator(&ctx).await? {
        return Ok(());
    }

    match (param.as_deref(), value) {
        // Show current config
        (None, _) => {
            let config = ctx.data().desk_config.read().await;
            ctx.say(format!(
                "**Desk configuration:**\n\
                 `window_days`: {}\n\
                 `max_slots_per_site`: {}",
                config.window_days, config.max_slots_per_site
            ))
            .await?;
        }
        // Set a parameter
        (Some(key), Some(val)) => {
            let mut config = ctx.data().desk_config.write().await;
            match key {
                "window_days" => match check_window_days(val) {
                    Ok(days) => {
                        config.window_days = days;
                        ctx.say(format!("`window_days` set to {}", days)).await?;
                    }
                    Err(e) => {
                        ctx.say(format!("`window_days` not changed: {}", e)).await?;
                    }
                },
                "max_slots_per_site" if val > 0 => {
                    config.max_slots_per_site = val as usize;
                    ctx.say(format!("`max_slots_per_site` set to {}", val))
                        .await?;
                }
                "max_slots_per_site" => {
                    ctx.say("`max_slots_per_site` must be at least 1").await?;
                }
                _ => {
                    ctx.say(format!(
                        "Unknown param `{}`. Valid: `window_days`, `max_slots_per_site`",
                        key
                    ))
                    .await?;
                }
            }
        }
        (Some(_), None) => {
            ctx.say("Provide both `param` and `value`. Example: `/episodes config window_days 60`")
                .await?;
        }
    }

    Ok(())
}
