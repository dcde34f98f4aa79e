use serde_json::{json, Value};

use super::SermonInput;

pub const ANALYSIS_TEMPERATURE: f64 = 0.7;

/// Build the analysis prompt for one sermon.
pub fn analysis_prompt(input: &SermonInput) -> String {
    format!(
        r#"Context: "{title}" preached by {preacher}. Video: {url}

You are an SEO/PSO specialist for evangelical podcasts on Spotify. Using the most likely
content of this sermon (inferred from its theme, preacher and link), produce metadata
optimised for ranking and discovery. You cannot watch the video: rely on what you know
about this preacher and the biblical themes involved, and structure the most probable
content.

Write every field in Brazilian Portuguese.

1. Key moments: pick 3 to 5 moments suitable for Reels/Shorts cuts. Estimate the
   timestamp (e.g. 10:00) where each subject most likely appears in a typical sermon.
2. Episode titles: 3 options, each concise and built as action + benefit + primary keyword.
3. Show notes:
   - SEO snippet (max 120 characters): the most engaging possible opening sentence,
     containing the primary keyword.
   - Body: the summary, naming the preacher, with the 3-5 main takeaways as bullet points.
     Do not include the call to action here.
   - Call to action: an engaging question for listeners to answer in the comments.
4. Spotify poll: an engaging poll question and 5 answer options about the theme.
5. Biblical references: every reference likely cited (Book Chapter:Verse).
6. 10-15 SEO tags and 3 short marketing sentences."#,
        title = input.title,
        preacher = input.preacher_name,
        url = input.youtube_url,
    )
}

pub fn thumbnail_prompt(title: &str) -> String {
    format!(
        r#"Edit this image to create a professional YouTube thumbnail.
1. Keep the person in the image visible and prominent on the right side.
2. Change the background to a dark, modern, abstract gradient (deep blue/purple tones).
3. Add the text "{title}" on the left side in big, bold, white font.
4. Make it look high-contrast and cinematic."#
    )
}

pub fn cover_prompt(title: &str) -> String {
    format!(
        r#"Edit this image to create a square podcast cover art.
1. Center the person's face in a square 1:1 frame.
2. Change the background to a clean, solid or gradient color.
3. Add the text "{title}" clearly at the bottom or top.
4. Ensure high legibility and professional finish."#
    )
}

fn string_array(description: &str) -> Value {
    json!({
        "type": "ARRAY",
        "items": { "type": "STRING" },
        "description": description,
    })
}

/// JSON schema the model must answer with. Field names match `AnalysisResult`.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "keyMoments": {
                "type": "ARRAY",
                "description": "3-5 moments with viral potential, with timestamps.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING", "description": "Catchy title for the clip" },
                        "timestamp": { "type": "STRING", "description": "Estimated range, e.g. '04:30 - 05:45'" },
                        "reasoning": { "type": "STRING", "description": "Why this moment should engage" },
                        "hook": { "type": "STRING", "description": "Short social media caption hook" },
                        "estimatedContext": { "type": "STRING", "description": "What likely happens in this segment" }
                    },
                    "required": ["title", "timestamp", "reasoning", "hook", "estimatedContext"]
                }
            },
            "spotifyTitles": string_array("3 distinct SEO-optimised title options."),
            "spotifyDescriptionSnippet": { "type": "STRING", "description": "SEO snippet, max 120 chars." },
            "spotifyDescriptionBody": { "type": "STRING", "description": "Show notes body with takeaways, without the CTA." },
            "spotifyCTA": { "type": "STRING", "description": "Call-to-action question for the comments." },
            "spotifyPollQuestion": { "type": "STRING", "description": "Engaging poll question about the sermon topic." },
            "spotifyPollOptions": string_array("5 poll options related to the sermon topic."),
            "biblicalReferences": string_array("Biblical references (Book Chapter:Verse)."),
            "tags": string_array("10-15 SEO keywords."),
            "marketingHooks": string_array("3 short promotional sentences.")
        },
        "required": [
            "keyMoments", "spotifyTitles", "spotifyDescriptionSnippet", "spotifyDescriptionBody",
            "spotifyCTA", "spotifyPollQuestion", "spotifyPollOptions", "biblicalReferences",
            "tags", "marketingHooks"
        ]
    })
}
