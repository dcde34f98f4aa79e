use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::render::{send_analysis, slot_label};
use super::{autocomplete_slot, canonical_slot_id, require_operator, send_chunked};
use crate::schedule::sites::lookup_slot;
use crate::schedule::ServiceSlot;
use crate::state::Context;

/// Save a reviewed draft as the service's episode
#[poise::command(slash_command, guild_only)]
pub async fn save(
    ctx: Context<'_>,
    #[description = "Service slot id"]
    #[autocomplete = "autocomplete_slot"]
    slot: String,
) -> Result<(), anyhow::Error> {
    if !require_operator(&ctx).await? {
        return Ok(());
    }
    let slot_id = canonical_slot_id(&slot);
    let slot = slot_id.as_str();

    let draft = ctx.data().drafts.write().await.remove(slot);
    let Some(draft) = draft else {
        ctx.say(format!(
            "No draft for `{}`. Run `/episodes analyze` first.",
            slot
        ))
        .await?;
        return Ok(());
    };

    ctx.defer().await?;
    let saved_by = ctx.author().name.clone();

    match ctx
        .data()
        .store
        .publish(&draft.slot, draft.analysis.clone(), &saved_by)
        .await
    {
        Ok(record) => {
            info!(
                slot = %record.id,
                saved_by,
                drafted_by = draft.created_by,
                images = record.images.len(),
                "Episode saved"
            );
            ctx.say(format!(
                "Saved **{}** to the history ({} image(s) uploaded).",
                slot_label(&draft.slot),
                record.images.len()
            ))
            .await?;
        }
        Err(e) => {
            warn!(slot, "Saving episode failed: {:#}", e);
            ctx.data()
                .drafts
                .write()
                .await
                .insert(slot.to_string(), draft);
            ctx.say(format!(
                "Could not save: {:#}\nThe draft is kept; try `/episodes save` again.",
                e
            ))
            .await?;
        }
    }
    Ok(())
}

/// Show a saved episode, or the pending draft if there is none
#[poise::command(slash_command, guild_only)]
pub async fn show(
    ctx: Context<'_>,
    #[description = "Service slot id"]
    #[autocomplete = "autocomplete_slot"]
    slot: String,
) -> Result<(), anyhow::Error> {
    if !require_operator(&ctx).await? {
        return Ok(());
    }
    let slot_id = canonical_slot_id(&slot);
    let slot = slot_id.as_str();
    ctx.defer().await?;

    if let Some(record) = ctx.data().store.get_episode(slot).await? {
        let service = ServiceSlot::new(&record.site_id, record.date, &record.time);
        ctx.say(format!(
            "**{}**\nSaved by {} on {}",
            slot_label(&service),
            record.saved_by,
            format_saved_at(record.saved_at)
        ))
        .await?;
        return send_analysis(&ctx, &record.ai_analysis).await;
    }

    let draft = ctx
        .data()
        .drafts
        .read()
        .await
        .get(slot)
        .map(|d| (d.slot.clone(), d.analysis.clone(), d.created_by.clone()));
    match draft {
        Some((service, analysis, created_by)) => {
            ctx.say(format!(
                "**{}**\nUnsaved draft by {}. Run `/episodes save {}` to keep it.",
                slot_label(&service),
                created_by,
                service.id
            ))
            .await?;
            send_analysis(&ctx, &analysis).await
        }
        None => {
            let hint = if lookup_slot(slot).is_some() {
                "Nothing saved for this service yet."
            } else {
                "Not a scheduled service."
            };
            ctx.say(format!("`{}`: {}", slot, hint)).await?;
            Ok(())
        }
    }
}

/// List recently saved episodes
#[poise::command(slash_command, guild_only)]
pub async fn list(
    ctx: Context<'_>,
    #[description = "Max episodes to show"] limit: Option<u32>,
) -> Result<(), anyhow::Error> {
    if !require_operator(&ctx).await? {
        return Ok(());
    }
    let limit = limit.unwrap_or(20) as usize;
    let records = ctx.data().store.list_episodes(limit).await?;

    if records.is_empty() {
        ctx.say("No episodes saved yet. Use `/episodes analyze` to create one.")
            .await?;
        return Ok(());
    }

    let mut output = String::from("**Saved episodes**\n\n");
    for record in &records {
        let service = ServiceSlot::new(&record.site_id, record.date, &record.time);
        let title = record
            .ai_analysis
            .spotify_titles
            .first()
            .map(String::as_str)
            .unwrap_or("(untitled)");
        output.push_str(&format!(
            "- `{}` {}\n  {} · saved by {} on {}\n",
            record.id,
            slot_label(&service),
            title,
            record.saved_by,
            format_saved_at(record.saved_at)
        ));
    }

    send_chunked(&ctx, &output).await
}

/// Drop an unsaved draft
#[poise::command(slash_command, guild_only)]
pub async fn discard(
    ctx: Context<'_>,
    #[description = "Service slot id"]
    #[autocomplete = "autocomplete_slot"]
    slot: String,
) -> Result<(), anyhow::Error> {
    if !require_operator(&ctx).await? {
        return Ok(());
    }
    let slot = canonical_slot_id(&slot);
    let removed = ctx.data().drafts.write().await.remove(&slot);
    let reply = match removed {
        Some(_) => format!("Draft for `{}` discarded.", slot),
        None => format!("No draft for `{}`.", slot),
    };
    ctx.say(reply).await?;
    Ok(())
}

/// Delete a saved episode and its artwork
#[poise::command(slash_command, guild_only)]
pub async fn remove(
    ctx: Context<'_>,
    #[description = "Service slot id"]
    #[autocomplete = "autocomplete_slot"]
    slot: String,
) -> Result<(), anyhow::Error> {
    if !require_operator(&ctx).await? {
        return Ok(());
    }
    let slot_id = canonical_slot_id(&slot);
    let slot = slot_id.as_str();

    if ctx.data().store.delete_episode(slot).await? {
        info!(user = ctx.author().name, slot, "Episode removed");
        ctx.say(format!("Removed `{}`. The service is pending again.", slot))
            .await?;
    } else {
        ctx.say(format!("No saved episode for `{}`.", slot)).await?;
    }
    Ok(())
}

fn format_saved_at(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}
