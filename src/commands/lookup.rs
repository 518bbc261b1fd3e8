use super::send_chunked;
use crate::state::Context;

/// Search the archived copies of the university pages
#[poise::command(slash_command, guild_only)]
pub async fn lookup(
    ctx: Context<'_>,
    #[description = "Words to look for"] query: String,
    #[description = "Max excerpts to show"] limit: Option<u32>,
) -> Result<(), anyhow::Error> {
    let limit = limit.unwrap_or(3).clamp(1, 10) as usize;
    let hits = ctx.data().archive.search(&query, limit).await?;

    if hits.is_empty() {
        ctx.say(format!("No archived page mentions **{}**.", query))
            .await?;
        return Ok(());
    }

    let mut output = format!("**Archived excerpts for:** {}\n", query);
    for hit in &hits {
        output.push_str(&format!(
            "\n<{}> (offset {}, {} keyword(s))\n```\n{}\n```\n",
            hit.source_url,
            hit.offset,
            hit.match_count,
            hit.content.trim()
        ));
    }
    send_chunked(&ctx, &output).await
}
