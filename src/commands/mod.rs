mod analyze;
mod config;
mod dashboard;
mod episode;
mod render;

use std::collections::HashSet;

use chrono::Local;
use tracing::warn;

use crate::schedule::sites::{all_sites, lookup_slot};
use crate::schedule::{generate, reconcile, CompletedIds};
use crate::state::Context;

/// Discord's message limit, with some headroom.
const CHUNK_LEN: usize = 1990;

/// Sermon desk: track processed services and publish episode content
#[poise::command(
    slash_command,
    subcommands(
        "dashboard::dashboard",
        "analyze::analyze",
        "analyze::new",
        "episode::save",
        "episode::show",
        "episode::list",
        "episode::discard",
        "episode::remove",
        "config::config"
    )
)]
pub async fn episodes(_ctx: Context<'_>) -> Result<(), anyhow::Error> {
    Ok(())
}

/// Refuse the command unless the author is an operator. Returns whether to continue.
async fn require_operator(ctx: &Context<'_>) -> Result<bool, anyhow::Error> {
    let user_id = ctx.author().id.get();
    if ctx.data().is_operator(user_id) {
        return Ok(true);
    }
    warn!(user = ctx.author().name, user_id, "Rejected non-operator");
    ctx.say("Only desk operators can use this command.").await?;
    Ok(false)
}

/// Split `text` into pieces of at most `max` bytes, preferring line then word breaks.
fn split_chunks(text: &str, max: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        let split_at = if remaining.len() <= max {
            remaining.len()
        } else {
            let mut end = max;
            while !remaining.is_char_boundary(end) {
                end -= 1;
            }
            if end == 0 {
                end = remaining.chars().next().map_or(remaining.len(), char::len_utf8);
            }
            remaining[..end]
                .rfind('\n')
                .or_else(|| remaining[..end].rfind(' '))
                .map(|i| i + 1)
                .unwrap_or(end)
        };
        chunks.push(&remaining[..split_at]);
        remaining = &remaining[split_at..];
    }
    chunks
}

/// The canonical id for what the user typed. Unknown ids come back trimmed.
fn canonical_slot_id(input: &str) -> String {
    let input = input.trim();
    lookup_slot(input)
        .map(|slot| slot.id)
        .unwrap_or_else(|| input.to_string())
}

/// Send a message in Discord-safe chunks.
/// Uses ctx.say() for all chunks so follow-ups go through the interaction
/// webhook (no Send Messages channel permission required).
async fn send_chunked(ctx: &Context<'_>, text: &str) -> Result<(), anyhow::Error> {
    for chunk in split_chunks(text, CHUNK_LEN) {
        ctx.say(chunk).await?;
    }
    Ok(())
}

/// Autocomplete for site ids.
async fn autocomplete_site(_ctx: Context<'_>, partial: &str) -> Vec<String> {
    let partial = partial.to_lowercase();
    all_sites()
        .into_iter()
        .map(|s| s.id)
        .filter(|id| id.contains(&partial))
        .collect()
}

/// A failed lookup leaves every slot pending, and is logged.
fn completed_or_empty(lookup: anyhow::Result<HashSet<String>>) -> HashSet<String> {
    lookup.unwrap_or_else(|e| {
        warn!("Slot lookup failed, listing all as pending: {:#}", e);
        HashSet::new()
    })
}

/// Autocomplete for slot ids in the current window, pending services first.
async fn autocomplete_slot(ctx: Context<'_>, partial: &str) -> Vec<String> {
    let window_days = ctx.data().desk_config.read().await.window_days;
    let completed = completed_or_empty(ctx.data().store.list_completed_ids().await);
    let today = Local::now().date_naive();

    let (pending, published): (Vec<_>, Vec<_>) = all_sites()
        .iter()
        .flat_map(|site| reconcile(generate(site, today, window_days), &completed))
        .filter(|slot| slot.id.contains(partial))
        .partition(|slot| !slot.is_published());

    pending
        .into_iter()
        .chain(published)
        .map(|slot| slot.id)
        .take(25)
        .collect()
}
