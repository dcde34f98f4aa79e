use chrono::Local;
use tracing::info;

use super::{autocomplete_site, require_operator, send_chunked};
use crate::schedule::dashboard::{check_window_days, load_dashboard, Dashboard};
use crate::schedule::sites::{all_sites, SiteId};
use crate::state::Context;

/// Show which services already have a saved episode
#[poise::command(slash_command, guild_only)]
pub async fn dashboard(
    ctx: Context<'_>,
    #[description = "Site (default: all)"]
    #[autocomplete = "autocomplete_site"]
    site: Option<String>,
    #[description = "Days to look back (default from config)"] days: Option<u32>,
) -> Result<(), anyhow::Error> {
    if !require_operator(&ctx).await? {
        return Ok(());
    }

    let sites = match site.as_deref() {
        Some(s) => match s.parse::<SiteId>() {
            Ok(id) => vec![id.site()],
            Err(e) => {
                ctx.say(format!("{}. Known sites: `campos85`, `campos153`", e))
                    .await?;
                return Ok(());
            }
        },
        None => all_sites(),
    };

    let config = ctx.data().desk_config.read().await;
    let window_days = days.unwrap_or(config.window_days);
    let max_slots = config.max_slots_per_site;
    drop(config);

    let window_days = match check_window_days(window_days) {
        Ok(days) => days,
        Err(e) => {
            ctx.say(format!("Invalid `days`: {}", e)).await?;
            return Ok(());
        }
    };

    ctx.defer().await?;

    let today = Local::now().date_naive();
    let board = load_dashboard(ctx.data().store.as_ref(), &sites, today, window_days).await;

    info!(
        user = ctx.author().name,
        window_days,
        sites = board.columns.len(),
        lookup_failed = board.lookup_error.is_some(),
        "Dashboard served"
    );

    send_chunked(&ctx, &render_dashboard(&board, window_days, max_slots)).await
}

fn render_dashboard(board: &Dashboard, window_days: u32, max_slots: usize) -> String {
    let mut output = format!("**Service dashboard** (last {} days)\n", window_days);

    if let Some(err) = &board.lookup_error {
        output.push_str(&format!(
            "\n⚠️ Could not check saved episodes: {}\nEvery service is shown as pending. Try again shortly.\n",
            err
        ));
    }

    for column in &board.columns {
        output.push_str(&format!(
            "\n**{}** · {} published · {} pending\n",
            column.site.display_name,
            column.published_count(),
            column.pending_count()
        ));
        if column.slots.is_empty() {
            output.push_str("  No services in this window.\n");
            continue;
        }
        for slot in column.slots.iter().take(max_slots) {
            let (marker, state) = if slot.is_published() {
                ("✅", "processed and saved")
            } else {
                ("🟡", "awaiting analysis")
            };
            output.push_str(&format!(
                "{} `{}` {}, {} · {} ({})\n",
                marker,
                slot.id,
                slot.week_day(),
                slot.formatted_date(),
                slot.time,
                state
            ));
        }
        if column.slots.len() > max_slots {
            output.push_str(&format!(
                "  …and {} older services\n",
                column.slots.len() - max_slots
            ));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::dashboard::SiteColumn;
    use crate::schedule::{generate, Site, SlotStatus};
    use chrono::NaiveDate;

    fn board(lookup_error: Option<String>) -> Dashboard {
        let site = Site::new("a", "Site A", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .with_rule(0, &["08:00", "10:30"]);
        let mut slots = generate(&site, NaiveDate::from_ymd_opt(2024, 5, 15).unwrap(), 14);
        slots[0].status = SlotStatus::Published;
        Dashboard {
            columns: vec![SiteColumn { site, slots }],
            lookup_error,
        }
    }

    #[test]
    fn test_render_dashboard_counts_and_truncation() {
        let text = render_dashboard(&board(None), 14, 3);
        assert!(text.contains("**Site A** · 1 published · 3 pending"));
        assert!(text.contains("✅ `a_20240512_1030`"));
        assert!(text.contains("🟡 `a_20240512_0800`"));
        assert!(text.contains("…and 1 older services"));
        assert!(!text.contains("Could not check"));
    }

    #[test]
    fn test_render_dashboard_shows_lookup_error() {
        let text = render_dashboard(&board(Some("timeout".to_string())), 14, 10);
        assert!(text.contains("Could not check saved episodes: timeout"));
    }
}
