use anyhow::Result;
use poise::serenity_prelude as serenity;
use tracing::{info, warn};

use super::render::{send_analysis, slot_label};
use super::{autocomplete_slot, require_operator};
use crate::analysis::{AnalysisResult, Photo, SermonInput};
use crate::gemini::GeminiClient;
use crate::schedule::sites::lookup_slot;
use crate::state::{Context, Draft};

/// Analyze a service's sermon and keep the result as a draft
#[poise::command(slash_command, guild_only)]
pub async fn analyze(
    ctx: Context<'_>,
    #[description = "Service slot id, e.g. campos85_20240512_1930"]
    #[autocomplete = "autocomplete_slot"]
    slot: String,
    #[description = "YouTube link of the sermon"] youtube_url: String,
    #[description = "Preacher name"] preacher: String,
    #[description = "Sermon title"] title: String,
    #[description = "Preacher photo, used to generate artwork"] photo: Option<serenity::Attachment>,
    #[description = "Re-analyze even if an episode is already saved"] overwrite: Option<bool>,
) -> Result<(), anyhow::Error> {
    if !require_operator(&ctx).await? {
        return Ok(());
    }

    let Some(slot) = lookup_slot(slot.trim()) else {
        ctx.say(format!(
            "`{}` is not a scheduled service. Pick one from `/episodes dashboard`.",
            slot
        ))
        .await?;
        return Ok(());
    };

    ctx.defer().await?;

    let input = match read_input(&youtube_url, &preacher, &title, photo.as_ref()).await {
        Ok(input) => input,
        Err(e) => {
            ctx.say(format!("Invalid input: {:#}", e)).await?;
            return Ok(());
        }
    };

    if !overwrite.unwrap_or(false) {
        if let Some(existing) = ctx.data().store.get_episode(&slot.id).await? {
            ctx.say(format!(
                "**{}** is already saved (by {}). Showing the saved episode; pass `overwrite: true` to analyze again.",
                slot_label(&slot),
                existing.saved_by
            ))
            .await?;
            return send_analysis(&ctx, &existing.ai_analysis).await;
        }
    }

    info!(
        user = ctx.author().name,
        slot = %slot.id,
        title = %input.title,
        with_photo = input.photo.is_some(),
        "Analysis started"
    );

    let analysis = match run_analysis(&ctx.data().gemini, &input).await {
        Ok(analysis) => analysis,
        Err(e) => {
            warn!(slot = %slot.id, "Analysis failed: {:#}", e);
            ctx.say("The analysis failed. Check the API key and try again.")
                .await?;
            return Ok(());
        }
    };

    ctx.say(format!(
        "Draft ready for **{}**. Review it below, then run `/episodes save {}`.",
        slot_label(&slot),
        slot.id
    ))
    .await?;
    send_analysis(&ctx, &analysis).await?;

    let slot_id = slot.id.clone();
    ctx.data().drafts.write().await.insert(
        slot_id,
        Draft {
            slot,
            analysis,
            created_by: ctx.author().name.clone(),
        },
    );
    Ok(())
}

/// Analyze a sermon without tying it to a service (nothing is saved)
#[poise::command(slash_command, guild_only)]
pub async fn new(
    ctx: Context<'_>,
    #[description = "YouTube link of the sermon"] youtube_url: String,
    #[description = "Preacher name"] preacher: String,
    #[description = "Sermon title"] title: String,
    #[description = "Preacher photo, used to generate artwork"] photo: Option<serenity::Attachment>,
) -> Result<(), anyhow::Error> {
    if !require_operator(&ctx).await? {
        return Ok(());
    }
    ctx.defer().await?;

    let input = match read_input(&youtube_url, &preacher, &title, photo.as_ref()).await {
        Ok(input) => input,
        Err(e) => {
            ctx.say(format!("Invalid input: {:#}", e)).await?;
            return Ok(());
        }
    };

    info!(user = ctx.author().name, title = %input.title, "Ad-hoc analysis started");

    match run_analysis(&ctx.data().gemini, &input).await {
        Ok(analysis) => {
            ctx.say(format!("Analysis of **{}**:", input.title)).await?;
            send_analysis(&ctx, &analysis).await
        }
        Err(e) => {
            warn!("Ad-hoc analysis failed: {:#}", e);
            ctx.say("The analysis failed. Check the API key and try again.")
                .await?;
            Ok(())
        }
    }
}

async fn read_input(
    youtube_url: &str,
    preacher: &str,
    title: &str,
    photo: Option<&serenity::Attachment>,
) -> Result<SermonInput> {
    let input = SermonInput::new(youtube_url, preacher, title)?;
    let Some(attachment) = photo else {
        return Ok(input);
    };

    let mime_type = attachment.content_type.clone().unwrap_or_default();
    let bytes = attachment.download().await?;
    Ok(input.with_photo(Photo::new(bytes, &mime_type)?))
}

/// Text analysis, then artwork when a photo was given. Artwork failures are
/// logged and the analysis is returned without images.
async fn run_analysis(gemini: &GeminiClient, input: &SermonInput) -> Result<AnalysisResult> {
    let mut analysis = gemini.analyze_sermon(input).await?;

    if let Some(photo) = &input.photo {
        match gemini
            .generate_images(photo, &input.title, &input.preacher_name)
            .await
        {
            Ok(images) => analysis.generated_images = Some(images),
            Err(e) => warn!("Artwork generation failed, continuing without images: {:#}", e),
        }
    }

    Ok(analysis)
}
