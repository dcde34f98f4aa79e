use poise::serenity_prelude as serenity;
use tracing::warn;

use super::send_chunked;
use crate::analysis::{decode_data_url, is_data_url, AnalysisResult, GeneratedImages};
use crate::schedule::sites::SiteId;
use crate::schedule::ServiceSlot;
use crate::state::Context;
use crate::store::{COVER_FILE, THUMBNAIL_FILE};

/// One line describing a slot, e.g. "Campos 85 · domingo, 12 de maio · 19:30".
pub fn slot_label(slot: &ServiceSlot) -> String {
    let site_name = slot
        .site_id
        .parse::<SiteId>()
        .map(|id| id.site().display_name)
        .unwrap_or_else(|_| slot.site_id.clone());
    format!(
        "{} · {}, {} · {}",
        site_name,
        slot.week_day(),
        slot.formatted_date(),
        slot.time
    )
}

fn copy_block(text: &str) -> String {
    format!("```text\n{}\n```", text.replace("```", "'''"))
}

/// The analysis as separate Discord messages. Copyable fields go in code blocks.
pub fn render_sections(result: &AnalysisResult) -> Vec<String> {
    let mut sections = Vec::new();

    let mut titles = String::from("**Episode titles**\n");
    for (i, title) in result.spotify_titles.iter().enumerate() {
        titles.push_str(&format!("{}. {}\n", i + 1, copy_block(title)));
    }
    sections.push(titles);

    sections.push(format!(
        "**Show notes**\n{}",
        copy_block(&result.full_description())
    ));

    sections.push(format!(
        "**Spotify poll**\n{}\n**Tags**\n{}",
        copy_block(&result.poll_text()),
        copy_block(&result.tags_text())
    ));

    if !result.key_moments.is_empty() {
        let mut moments = String::from("**Key moments**\n");
        for moment in &result.key_moments {
            moments.push_str(&format!(
                "- `{}` **{}**\n  Hook: {}\n  Context: {}\n  _Why: {}_\n",
                moment.timestamp,
                moment.title,
                moment.hook,
                moment.estimated_context,
                moment.reasoning
            ));
        }
        sections.push(moments);
    }

    if !result.marketing_hooks.is_empty() {
        let mut hooks = String::from("**Marketing hooks**\n");
        for hook in &result.marketing_hooks {
            hooks.push_str(&copy_block(hook));
            hooks.push('\n');
        }
        sections.push(hooks);
    }

    sections
}

pub async fn send_analysis(
    ctx: &Context<'_>,
    result: &AnalysisResult,
) -> Result<(), anyhow::Error> {
    for section in render_sections(result) {
        send_chunked(ctx, &section).await?;
    }
    if let Some(images) = &result.generated_images {
        send_artwork(ctx, images).await?;
    }
    Ok(())
}

/// Attach the artwork. Values may be data URLs (drafts), store paths (saved
/// episodes) or plain links.
async fn send_artwork(
    ctx: &Context<'_>,
    images: &GeneratedImages,
) -> Result<(), anyhow::Error> {
    let mut reply = poise::CreateReply::default();
    let mut notes = vec!["**Artwork** (16:9 thumbnail, 1:1 cover)".to_string()];

    for (value, file_name) in [
        (&images.thumbnail_16_9, THUMBNAIL_FILE),
        (&images.artwork_1_1, COVER_FILE),
    ] {
        let bytes = if is_data_url(value) {
            decode_data_url(value).map(|(_, bytes)| bytes)
        } else if value.starts_with("http://") || value.starts_with("https://") {
            notes.push(format!("- [{}]({})", file_name, value));
            continue;
        } else {
            ctx.data().store.get_image(value).await
        };

        match bytes {
            Ok(bytes) => {
                reply = reply.attachment(serenity::CreateAttachment::bytes(bytes, file_name));
            }
            Err(e) => {
                warn!(file_name, "Artwork unavailable: {}", e);
                notes.push(format!("- {} is unavailable", file_name));
            }
        }
    }

    ctx.send(reply.content(notes.join("\n"))).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::sample_result;
    use chrono::NaiveDate;

    #[test]
    fn test_slot_label() {
        let slot = ServiceSlot::new(
            "campos85",
            NaiveDate::from_ymd_opt(2024, 5, 12).unwrap(),
            "19:30",
        );
        let label = slot_label(&slot);
        assert!(label.starts_with("Campos 85 · "));
        assert!(label.ends_with(" · 19:30"));

        let unknown = ServiceSlot::new("elsewhere", slot.date, "08:00");
        assert!(slot_label(&unknown).starts_with("elsewhere · "));
    }

    #[test]
    fn test_render_sections() {
        let sections = render_sections(&sample_result());
        assert_eq!(sections.len(), 5);
        assert!(sections[0].contains("1. ```text\nVença seus gigantes pela fé\n```"));
        assert!(sections[1].contains("💬 Qual é o seu gigante?"));
        assert!(sections[2].contains("fé, coragem"));
        assert!(sections[3].contains("`12:30 - 14:00` **O gigante caiu**"));
    }

    #[test]
    fn test_render_skips_empty_lists() {
        let mut result = sample_result();
        result.key_moments.clear();
        result.marketing_hooks.clear();
        assert_eq!(render_sections(&result).len(), 3);
    }
}
